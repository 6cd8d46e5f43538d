//! Signed HTTP client for the keyword-ads `keywordstool` endpoint.
//!
//! Every request carries a fresh millisecond timestamp and an HMAC signature
//! over `{timestamp}.GET.{path}`. Calls run through [`retry_with_backoff`]
//! and report each network attempt to the shared [`KeyPool`].

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use kwdb_core::{KeywordCandidate, SearchAdCredentialConfig};
use reqwest::{Client, Url};

use crate::error::ApiError;
use crate::key_pool::{CredentialHandle, KeyPool};
use crate::response::send_classified;
use crate::retry::{retry_with_backoff, RetryPolicy};
use crate::signing;
use crate::types::{keyword_list, parse_candidate, related_term, term_key, Parsed};

const DEFAULT_BASE_URL: &str = "https://api.searchad.naver.com";
const KEYWORDS_TOOL_PATH: &str = "/keywordstool";

/// Upstream limit on hint terms per call.
pub const MAX_HINT_TERMS: usize = 5;

/// Secret material for one keyword-ads credential.
#[derive(Clone)]
pub struct SearchAdSecret {
    pub api_key: String,
    pub secret_key: String,
    pub customer_id: String,
}

impl std::fmt::Debug for SearchAdSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchAdSecret")
            .field("customer_id", &self.customer_id)
            .field("api_key", &"[redacted]")
            .field("secret_key", &"[redacted]")
            .finish()
    }
}

impl From<&SearchAdCredentialConfig> for SearchAdSecret {
    fn from(cfg: &SearchAdCredentialConfig) -> Self {
        Self {
            api_key: cfg.api_key.clone(),
            secret_key: cfg.secret_key.clone(),
            customer_id: cfg.customer_id.clone(),
        }
    }
}

/// Builds the keyword-ads credential pool from configuration.
#[must_use]
pub fn search_ad_pool(
    configs: &[SearchAdCredentialConfig],
    daily_limit: u32,
) -> KeyPool<SearchAdSecret> {
    KeyPool::new(
        "search_ad",
        daily_limit,
        configs
            .iter()
            .map(|c| (c.label.clone(), SearchAdSecret::from(c))),
    )
}

pub struct SearchAdClient {
    client: Client,
    base_url: Url,
    pool: Arc<KeyPool<SearchAdSecret>>,
    retry: RetryPolicy,
    related_timeout: Duration,
    detail_timeout: Duration,
}

impl SearchAdClient {
    /// Creates a client pointed at the production keyword-ads API.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Http`] if the `reqwest::Client` cannot be built.
    pub fn new(
        pool: Arc<KeyPool<SearchAdSecret>>,
        retry: RetryPolicy,
        related_timeout: Duration,
        detail_timeout: Duration,
    ) -> Result<Self, ApiError> {
        Self::with_base_url(DEFAULT_BASE_URL, pool, retry, related_timeout, detail_timeout)
    }

    /// Creates a client with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Http`] if the `reqwest::Client` cannot be built,
    /// or [`ApiError::InvalidBaseUrl`] if `base_url` does not parse.
    pub fn with_base_url(
        base_url: &str,
        pool: Arc<KeyPool<SearchAdSecret>>,
        retry: RetryPolicy,
        related_timeout: Duration,
        detail_timeout: Duration,
    ) -> Result<Self, ApiError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .user_agent("kwdb/0.1 (keyword-research)")
            .build()?;

        let base_url = Url::parse(base_url.trim_end_matches('/')).map_err(|e| {
            ApiError::InvalidBaseUrl {
                url: base_url.to_string(),
                reason: e.to_string(),
            }
        })?;

        Ok(Self {
            client,
            base_url,
            pool,
            retry,
            related_timeout,
            detail_timeout,
        })
    }

    #[must_use]
    pub fn pool(&self) -> &Arc<KeyPool<SearchAdSecret>> {
        &self.pool
    }

    /// Related terms for up to [`MAX_HINT_TERMS`] hints (detail off).
    ///
    /// Rows without a usable `relKeyword` are skipped. Order follows the
    /// upstream response.
    ///
    /// # Errors
    ///
    /// - [`ApiError::QuotaExceeded`] on 429 (credential deactivated, no retry).
    /// - [`ApiError::Http`] / [`ApiError::ServerError`] once retries are exhausted.
    /// - [`ApiError::ClientError`] on other 4xx responses.
    /// - [`ApiError::Malformed`] / [`ApiError::Deserialize`] on unexpected bodies.
    pub async fn related_terms(
        &self,
        credential: &CredentialHandle<SearchAdSecret>,
        hints: &[String],
    ) -> Result<Vec<String>, ApiError> {
        let hint_param = hint_param(hints);
        let body = self
            .get_signed(
                credential,
                &[("hintKeywords", &hint_param), ("showDetail", "0")],
                self.related_timeout,
            )
            .await?;

        let rows = keyword_list(&body, KEYWORDS_TOOL_PATH)?;
        let terms = rows
            .iter()
            .filter_map(|row| {
                let term = related_term(row);
                if term.is_none() {
                    tracing::debug!(row = %row, "skipping related row without relKeyword");
                }
                term.map(str::to_owned)
            })
            .collect();
        Ok(terms)
    }

    /// Detailed statistics for a single term (detail on).
    ///
    /// The returned candidate carries `term` exactly as requested so callers
    /// can join on it.
    ///
    /// # Errors
    ///
    /// Same as [`SearchAdClient::related_terms`]; additionally
    /// [`ApiError::Malformed`] if the term is absent from the response or
    /// its row does not parse.
    pub async fn keyword_detail(
        &self,
        credential: &CredentialHandle<SearchAdSecret>,
        term: &str,
    ) -> Result<KeywordCandidate, ApiError> {
        let hint_param = hint_param(std::slice::from_ref(&term.to_string()));
        let body = self
            .get_signed(
                credential,
                &[("hintKeywords", &hint_param), ("showDetail", "1")],
                self.detail_timeout,
            )
            .await?;

        let wanted = term_key(term);
        let rows = keyword_list(&body, KEYWORDS_TOOL_PATH)?;
        let row = rows
            .iter()
            .find(|row| related_term(row).is_some_and(|t| term_key(t) == wanted))
            .ok_or_else(|| ApiError::Malformed {
                context: KEYWORDS_TOOL_PATH.to_string(),
                reason: format!("term '{term}' missing from detail response"),
            })?;

        match parse_candidate(row, Utc::now()) {
            Parsed::Record(mut candidate) => {
                term.clone_into(&mut candidate.term);
                Ok(candidate)
            }
            Parsed::Malformed { reason } => Err(ApiError::Malformed {
                context: KEYWORDS_TOOL_PATH.to_string(),
                reason,
            }),
        }
    }

    async fn get_signed(
        &self,
        credential: &CredentialHandle<SearchAdSecret>,
        query: &[(&str, &str)],
        timeout: Duration,
    ) -> Result<serde_json::Value, ApiError> {
        let url = self.build_url(KEYWORDS_TOOL_PATH, query);

        retry_with_backoff(self.retry, || {
            let url = url.clone();
            async move {
                let timestamp = Utc::now().timestamp_millis().to_string();
                let signature = signing::signature(
                    &credential.secret.secret_key,
                    &timestamp,
                    "GET",
                    KEYWORDS_TOOL_PATH,
                )
                .map_err(|_| ApiError::InvalidSecret {
                    label: credential.label.clone(),
                })?;
                let request = self
                    .client
                    .get(url)
                    .timeout(timeout)
                    .header("X-Timestamp", &timestamp)
                    .header("X-API-KEY", &credential.secret.api_key)
                    .header("X-Customer", &credential.secret.customer_id)
                    .header("X-Signature", signature);

                send_classified(request, KEYWORDS_TOOL_PATH, &self.pool, credential).await
            }
        })
        .await
    }

    fn build_url(&self, path: &str, query: &[(&str, &str)]) -> Url {
        let mut url = self.base_url.clone();
        url.set_path(path);
        {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in query {
                pairs.append_pair(k, v);
            }
        }
        url
    }
}

/// Comma-joined hint terms with internal whitespace removed.
fn hint_param(hints: &[String]) -> String {
    if hints.len() > MAX_HINT_TERMS {
        tracing::warn!(
            given = hints.len(),
            max = MAX_HINT_TERMS,
            "too many hint terms; extra terms dropped"
        );
    }
    hints
        .iter()
        .take(MAX_HINT_TERMS)
        .map(|h| h.split_whitespace().collect::<String>())
        .filter(|h| !h.is_empty())
        .collect::<Vec<_>>()
        .join(",")
}
