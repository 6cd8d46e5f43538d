//! Client for the open search API's per-category document totals.

use std::sync::Arc;
use std::time::Duration;

use kwdb_core::{DocCountCredentialConfig, DocumentCounts};
use reqwest::{Client, Url};

use crate::error::ApiError;
use crate::key_pool::{CredentialHandle, KeyPool};
use crate::response::send_classified;
use crate::retry::{retry_with_backoff, RetryPolicy};
use crate::types::document_total;

const DEFAULT_BASE_URL: &str = "https://openapi.naver.com";

#[derive(Clone)]
pub struct DocCountSecret {
    pub client_id: String,
    pub client_secret: String,
}

impl std::fmt::Debug for DocCountSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocCountSecret")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[redacted]")
            .finish()
    }
}

impl From<&DocCountCredentialConfig> for DocCountSecret {
    fn from(cfg: &DocCountCredentialConfig) -> Self {
        Self {
            client_id: cfg.client_id.clone(),
            client_secret: cfg.client_secret.clone(),
        }
    }
}

/// Builds the document-search credential pool from configuration.
#[must_use]
pub fn doc_count_pool(
    configs: &[DocCountCredentialConfig],
    daily_limit: u32,
) -> KeyPool<DocCountSecret> {
    KeyPool::new(
        "document_search",
        daily_limit,
        configs
            .iter()
            .map(|c| (c.label.clone(), DocCountSecret::from(c))),
    )
}

/// Content categories counted for every term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    Blog,
    News,
    Web,
    Cafe,
}

impl DocumentKind {
    pub const ALL: [DocumentKind; 4] = [Self::Blog, Self::News, Self::Web, Self::Cafe];

    #[must_use]
    pub fn path(self) -> &'static str {
        match self {
            Self::Blog => "/v1/search/blog.json",
            Self::News => "/v1/search/news.json",
            Self::Web => "/v1/search/webkr.json",
            Self::Cafe => "/v1/search/cafearticle.json",
        }
    }
}

pub struct DocCountClient {
    client: Client,
    base_url: Url,
    pool: Arc<KeyPool<DocCountSecret>>,
    retry: RetryPolicy,
    timeout: Duration,
}

impl DocCountClient {
    /// # Errors
    ///
    /// Returns [`ApiError::Http`] if the `reqwest::Client` cannot be built.
    pub fn new(
        pool: Arc<KeyPool<DocCountSecret>>,
        retry: RetryPolicy,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        Self::with_base_url(DEFAULT_BASE_URL, pool, retry, timeout)
    }

    /// # Errors
    ///
    /// Returns [`ApiError::Http`] if the `reqwest::Client` cannot be built,
    /// or [`ApiError::InvalidBaseUrl`] if `base_url` does not parse.
    pub fn with_base_url(
        base_url: &str,
        pool: Arc<KeyPool<DocCountSecret>>,
        retry: RetryPolicy,
        timeout: Duration,
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
            timeout,
        })
    }

    #[must_use]
    pub fn pool(&self) -> &Arc<KeyPool<DocCountSecret>> {
        &self.pool
    }

    /// Document totals for `term` across every [`DocumentKind`].
    ///
    /// The four lookups run concurrently on the same credential. A kind that
    /// fails is logged and counted as zero.
    ///
    /// # Errors
    ///
    /// Returns the first error only when all four lookups fail.
    pub async fn document_counts(
        &self,
        credential: &CredentialHandle<DocCountSecret>,
        term: &str,
    ) -> Result<DocumentCounts, ApiError> {
        let (blog, news, web, cafe) = tokio::join!(
            self.total(credential, term, DocumentKind::Blog),
            self.total(credential, term, DocumentKind::News),
            self.total(credential, term, DocumentKind::Web),
            self.total(credential, term, DocumentKind::Cafe),
        );

        let (blog, news, web, cafe) = match (blog, news, web, cafe) {
            (Err(e), Err(_), Err(_), Err(_)) => return Err(e),
            results => results,
        };

        let or_zero = |kind: DocumentKind, result: Result<u64, ApiError>| {
            result.unwrap_or_else(|e| {
                tracing::warn!(term, ?kind, error = %e, "document count failed; using 0");
                0
            })
        };

        Ok(DocumentCounts {
            blog: or_zero(DocumentKind::Blog, blog),
            news: or_zero(DocumentKind::News, news),
            web: or_zero(DocumentKind::Web, web),
            cafe: or_zero(DocumentKind::Cafe, cafe),
        })
    }

    /// Total matching documents of one kind.
    ///
    /// # Errors
    ///
    /// Any [`ApiError`] from the request, after retries.
    pub async fn total(
        &self,
        credential: &CredentialHandle<DocCountSecret>,
        term: &str,
        kind: DocumentKind,
    ) -> Result<u64, ApiError> {
        let mut url = self.base_url.clone();
        url.set_path(kind.path());
        url.query_pairs_mut()
            .append_pair("query", term)
            .append_pair("display", "1");

        let body = retry_with_backoff(self.retry, || {
            let request = self
                .client
                .get(url.clone())
                .timeout(self.timeout)
                .header("X-Naver-Client-Id", &credential.secret.client_id)
                .header("X-Naver-Client-Secret", &credential.secret.client_secret);
            send_classified(request, kind.path(), &self.pool, credential)
        })
        .await?;

        document_total(&body, kind.path())
    }
}
