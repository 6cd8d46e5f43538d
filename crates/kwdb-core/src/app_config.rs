use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub credentials_path: PathBuf,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub searchad_base_url: String,
    pub doccount_base_url: String,
    pub searchad_daily_limit: u32,
    pub doccount_daily_limit: u32,
    pub related_timeout_secs: u64,
    pub detail_timeout_secs: u64,
    pub max_retries: u32,
    pub retry_backoff_base_ms: u64,
    pub retry_backoff_max_ms: u64,
    pub rate_limit_cooldown_secs: u64,
    pub expand_max_rounds: u32,
    pub expand_batch_cap: usize,
    pub expand_batch_size: usize,
    pub enrich_chunk_size: usize,
    pub enrich_concurrency: usize,
    pub enrich_inter_call_delay_ms: u64,
    pub dedup_window_days: u32,
    pub max_terms_per_seed: usize,
    pub auto_collect_cron: Option<String>,
    pub auto_collect_target: u32,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("credentials_path", &self.credentials_path)
            .field("database_url", &"[redacted]")
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("searchad_base_url", &self.searchad_base_url)
            .field("doccount_base_url", &self.doccount_base_url)
            .field("searchad_daily_limit", &self.searchad_daily_limit)
            .field("doccount_daily_limit", &self.doccount_daily_limit)
            .field("related_timeout_secs", &self.related_timeout_secs)
            .field("detail_timeout_secs", &self.detail_timeout_secs)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_base_ms", &self.retry_backoff_base_ms)
            .field("retry_backoff_max_ms", &self.retry_backoff_max_ms)
            .field("rate_limit_cooldown_secs", &self.rate_limit_cooldown_secs)
            .field("expand_max_rounds", &self.expand_max_rounds)
            .field("expand_batch_cap", &self.expand_batch_cap)
            .field("expand_batch_size", &self.expand_batch_size)
            .field("enrich_chunk_size", &self.enrich_chunk_size)
            .field("enrich_concurrency", &self.enrich_concurrency)
            .field(
                "enrich_inter_call_delay_ms",
                &self.enrich_inter_call_delay_ms,
            )
            .field("dedup_window_days", &self.dedup_window_days)
            .field("max_terms_per_seed", &self.max_terms_per_seed)
            .field("auto_collect_cron", &self.auto_collect_cron)
            .field("auto_collect_target", &self.auto_collect_target)
            .finish()
    }
}
