use thiserror::Error;

/// Errors returned by the keyword-ads and document-search clients.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Network, TLS or timeout failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Upstream answered with a 5xx status.
    #[error("server error {status} from {endpoint}")]
    ServerError { status: u16, endpoint: String },

    /// Upstream answered 429, or the credential was already deactivated.
    #[error("quota exceeded for credential '{label}'")]
    QuotaExceeded { label: String },

    /// Upstream rejected the request with a 4xx other than 429.
    #[error("request rejected with status {status} from {endpoint}: {body}")]
    ClientError {
        status: u16,
        endpoint: String,
        body: String,
    },

    /// The body was JSON but not the shape we expect.
    #[error("malformed response from {context}: {reason}")]
    Malformed { context: String, reason: String },

    /// The body was not valid JSON.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// Every credential in the pool is inactive or at its daily limit.
    #[error("no {pool} credentials available")]
    NoCredentials { pool: &'static str },

    /// The credential's secret key could not be used as an HMAC key.
    #[error("secret key for credential '{label}' cannot be used for signing")]
    InvalidSecret { label: String },

    #[error("invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}

impl ApiError {
    #[must_use]
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, Self::QuotaExceeded { .. })
    }
}
