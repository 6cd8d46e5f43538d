//! `keys status` command handler.

use kwdb_searchad::{CredentialStatus, DeactivationReason};

/// Lists every configured credential with its label and daily quota.
///
/// Usage counters are process-local, so a fresh CLI process reports zero
/// usage; the running server exposes live counters at `/api/v1/keys/status`.
pub(crate) fn run_keys_status(config: &kwdb_core::AppConfig) -> anyhow::Result<()> {
    let clients = crate::build_clients(config)?;

    let search_ad = clients.search_ad.pool();
    print_pool(search_ad.name(), search_ad.daily_limit(), &search_ad.status());
    let doc_count = clients.doc_count.pool();
    print_pool(doc_count.name(), doc_count.daily_limit(), &doc_count.status());
    Ok(())
}

fn print_pool(name: &str, daily_limit: u32, credentials: &[CredentialStatus]) {
    println!("{name}: {} credentials, {daily_limit} calls/day each", credentials.len());
    for cred in credentials {
        println!(
            "  [{}] {:<20} {:>6}/{:<6} {}",
            cred.id,
            cred.label,
            cred.usage,
            cred.daily_limit,
            state_label(cred),
        );
    }
}

fn state_label(cred: &CredentialStatus) -> &'static str {
    match cred.deactivated {
        None if cred.active => "active",
        None => "inactive",
        Some(DeactivationReason::DailyLimit) => "daily limit reached",
        Some(DeactivationReason::RateLimited { .. }) => "rate limited",
    }
}
