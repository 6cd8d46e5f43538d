//! `expand` and `research` command handlers.

use std::sync::Arc;

use kwdb_db::{RunType, TriggerSource};
use kwdb_research::{AutoCollector, CollectorSettings, KeywordExpander, ResearchOutcome};

use crate::fail_run_best_effort;

/// Prints every term discovered from `seed`. Touches neither the database nor
/// the document-search API.
pub(crate) async fn run_expand(
    config: &kwdb_core::AppConfig,
    seed: &str,
    rounds: Option<u32>,
) -> anyhow::Result<()> {
    let seed = seed.trim();
    if seed.is_empty() {
        anyhow::bail!("seed must not be empty");
    }

    let clients = crate::build_clients(config)?;
    let mut options = CollectorSettings::from_config(config).expand;
    if let Some(rounds) = rounds {
        options.max_rounds = rounds.max(1);
    }

    let expander = KeywordExpander::new(Arc::new(clients.search_ad), options);
    let expansion = expander.expand(seed).await?;

    for term in &expansion.terms {
        println!("{term}");
    }
    eprintln!(
        "{} terms from {} calls over {} rounds ({} failed batches{})",
        expansion.terms.len(),
        expansion.calls,
        expansion.round_sizes.len(),
        expansion.failed_batches,
        if expansion.exhausted {
            ", credentials exhausted"
        } else {
            ""
        }
    );
    Ok(())
}

/// Runs the full pipeline for one seed and prints the best `show` results.
///
/// Unless `dry_run` is set, fresh records are stored and the run is tracked
/// in `collection_runs`.
pub(crate) async fn run_research(
    pool: &sqlx::PgPool,
    collector: &AutoCollector,
    seed: &str,
    dry_run: bool,
    show: usize,
) -> anyhow::Result<()> {
    let seed = seed.trim();
    if seed.is_empty() {
        anyhow::bail!("seed must not be empty");
    }

    if dry_run {
        let outcome = collector.research(seed, false).await?;
        print_outcome(&outcome, show, true);
        return Ok(());
    }

    let run =
        kwdb_db::create_collection_run(pool, RunType::Research, TriggerSource::Cli, None).await?;
    if let Err(e) = kwdb_db::start_collection_run(pool, run.id).await {
        fail_run_best_effort(pool, run.id, "research", &format!("{e:#}")).await;
        return Err(e.into());
    }

    let outcome = match collector.research(seed, true).await {
        Ok(outcome) => outcome,
        Err(e) => {
            fail_run_best_effort(pool, run.id, "research", &e.to_string()).await;
            return Err(e.into());
        }
    };

    if let Some(error) = &outcome.persistence_error {
        fail_run_best_effort(pool, run.id, "research", error).await;
        print_outcome(&outcome, show, false);
        anyhow::bail!("keywords could not be stored: {error}");
    }

    let inserted = u32::try_from(outcome.inserted).unwrap_or(u32::MAX);
    kwdb_db::complete_collection_run(pool, run.id, inserted, 1).await?;
    print_outcome(&outcome, show, false);
    Ok(())
}

fn print_outcome(outcome: &ResearchOutcome, show: usize, dry_run: bool) {
    println!(
        "{:<30} {:>10} {:>10} {:>10} {:>8}",
        "keyword", "volume", "docs", "score", "comp"
    );
    for record in outcome.records.iter().take(show) {
        println!(
            "{:<30} {:>10} {:>10} {:>10.2} {:>8}",
            record.term(),
            record.candidate.total_search_volume(),
            record.total_docs(),
            record.potential_score(),
            record.candidate.competition.as_str(),
        );
    }

    let verb = if dry_run { "would store" } else { "stored" };
    let stored = if dry_run {
        outcome.records.len()
    } else {
        outcome.inserted
    };
    println!(
        "\nseed '{}': {} discovered, {} dropped, {} skipped, {} duplicates, {verb} {stored}",
        outcome.seed,
        outcome.discovered,
        outcome.dropped,
        outcome.skipped,
        outcome.duplicates,
    );
}
