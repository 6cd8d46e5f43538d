pub mod app_config;
pub mod config;
pub mod credentials;
pub mod keyword;
pub mod status;

use thiserror::Error;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use credentials::{
    load_credentials, CredentialsFile, DocCountCredentialConfig, SearchAdCredentialConfig,
};
pub use keyword::{
    normalize_volume, potential_score, CompetitionLevel, DocumentCounts, EnrichedKeyword,
    KeywordCandidate, VOLUME_FLOOR,
};
pub use status::{AutoCollectStatus, RunState};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read credentials file {path}: {source}")]
    CredentialsFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse credentials file: {0}")]
    CredentialsFileParse(#[from] serde_yaml::Error),

    #[error("credentials validation failed: {0}")]
    Validation(String),
}
