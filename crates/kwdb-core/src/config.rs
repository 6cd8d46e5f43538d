use std::str::FromStr;

use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Upstream limit on hint terms per related-keyword call.
const MAX_HINT_TERMS: usize = 5;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so tests can drive it with a `HashMap`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let database_url = require("DATABASE_URL")?;
    let env = parse_environment(&or_default("KWDB_ENV", "development"))?;

    let bind_addr: SocketAddr = parse_var(&or_default, "KWDB_BIND_ADDR", "0.0.0.0:3000")?;
    let log_level = or_default("KWDB_LOG_LEVEL", "info");
    let credentials_path = PathBuf::from(or_default(
        "KWDB_CREDENTIALS_PATH",
        "./config/credentials.yaml",
    ));

    let db_max_connections = parse_var(&or_default, "KWDB_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_var(&or_default, "KWDB_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_var(&or_default, "KWDB_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let searchad_base_url = or_default("KWDB_SEARCHAD_BASE_URL", "https://api.searchad.naver.com");
    let doccount_base_url = or_default("KWDB_DOCCOUNT_BASE_URL", "https://openapi.naver.com");
    let searchad_daily_limit = parse_var(&or_default, "KWDB_SEARCHAD_DAILY_LIMIT", "25000")?;
    let doccount_daily_limit = parse_var(&or_default, "KWDB_DOCCOUNT_DAILY_LIMIT", "25000")?;
    let related_timeout_secs = parse_var(&or_default, "KWDB_RELATED_TIMEOUT_SECS", "30")?;
    let detail_timeout_secs = parse_var(&or_default, "KWDB_DETAIL_TIMEOUT_SECS", "10")?;
    let max_retries = parse_var(&or_default, "KWDB_MAX_RETRIES", "3")?;
    let retry_backoff_base_ms = parse_var(&or_default, "KWDB_RETRY_BACKOFF_BASE_MS", "1000")?;
    let retry_backoff_max_ms = parse_var(&or_default, "KWDB_RETRY_BACKOFF_MAX_MS", "30000")?;
    let rate_limit_cooldown_secs = parse_var(&or_default, "KWDB_RATE_LIMIT_COOLDOWN_SECS", "300")?;

    let expand_max_rounds = parse_var(&or_default, "KWDB_EXPAND_MAX_ROUNDS", "2")?;
    let expand_batch_cap = parse_var(&or_default, "KWDB_EXPAND_BATCH_CAP", "10")?;
    let expand_batch_size: usize = parse_var(&or_default, "KWDB_EXPAND_BATCH_SIZE", "5")?;
    if expand_batch_size == 0 || expand_batch_size > MAX_HINT_TERMS {
        return Err(ConfigError::InvalidEnvVar {
            var: "KWDB_EXPAND_BATCH_SIZE".to_string(),
            reason: format!("must be between 1 and {MAX_HINT_TERMS}"),
        });
    }

    let enrich_chunk_size = positive(
        "KWDB_ENRICH_CHUNK_SIZE",
        parse_var(&or_default, "KWDB_ENRICH_CHUNK_SIZE", "10")?,
    )?;
    let enrich_concurrency = positive(
        "KWDB_ENRICH_CONCURRENCY",
        parse_var(&or_default, "KWDB_ENRICH_CONCURRENCY", "3")?,
    )?;
    let enrich_inter_call_delay_ms =
        parse_var(&or_default, "KWDB_ENRICH_INTER_CALL_DELAY_MS", "150")?;

    let dedup_window_days = parse_var(&or_default, "KWDB_DEDUP_WINDOW_DAYS", "30")?;
    let max_terms_per_seed = parse_var(&or_default, "KWDB_MAX_TERMS_PER_SEED", "100")?;
    let auto_collect_cron = lookup("KWDB_AUTO_COLLECT_CRON")
        .ok()
        .filter(|s| !s.trim().is_empty());
    let auto_collect_target = parse_var(&or_default, "KWDB_AUTO_COLLECT_TARGET", "500")?;

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        credentials_path,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        searchad_base_url,
        doccount_base_url,
        searchad_daily_limit,
        doccount_daily_limit,
        related_timeout_secs,
        detail_timeout_secs,
        max_retries,
        retry_backoff_base_ms,
        retry_backoff_max_ms,
        rate_limit_cooldown_secs,
        expand_max_rounds,
        expand_batch_cap,
        expand_batch_size,
        enrich_chunk_size,
        enrich_concurrency,
        enrich_inter_call_delay_ms,
        dedup_window_days,
        max_terms_per_seed,
        auto_collect_cron,
        auto_collect_target,
    })
}

fn parse_var<T, D>(or_default: &D, var: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    D: Fn(&str, &str) -> String,
{
    let raw = or_default(var, default);
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
}

fn positive(var: &str, value: usize) -> Result<usize, ConfigError> {
    if value == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(value)
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "KWDB_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}
