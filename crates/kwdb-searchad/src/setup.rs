//! Builds both API clients from application configuration.

use std::sync::Arc;
use std::time::Duration;

use kwdb_core::{AppConfig, CredentialsFile};

use crate::client::{search_ad_pool, SearchAdClient};
use crate::doc_count::{doc_count_pool, DocCountClient};
use crate::error::ApiError;
use crate::retry::RetryPolicy;

pub struct ApiClients {
    pub search_ad: SearchAdClient,
    pub doc_count: DocCountClient,
}

impl ApiClients {
    /// One pool per credential family, sized by the configured daily limits.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidBaseUrl`] if a configured base URL does not
    /// parse, or [`ApiError::Http`] if an HTTP client cannot be built.
    pub fn from_config(config: &AppConfig, credentials: &CredentialsFile) -> Result<Self, ApiError> {
        let retry = RetryPolicy::from_config(config);

        let search_ad = SearchAdClient::with_base_url(
            &config.searchad_base_url,
            Arc::new(search_ad_pool(
                &credentials.search_ad,
                config.searchad_daily_limit,
            )),
            retry,
            Duration::from_secs(config.related_timeout_secs),
            Duration::from_secs(config.detail_timeout_secs),
        )?;

        let doc_count = DocCountClient::with_base_url(
            &config.doccount_base_url,
            Arc::new(doc_count_pool(
                &credentials.document_search,
                config.doccount_daily_limit,
            )),
            retry,
            Duration::from_secs(config.detail_timeout_secs),
        )?;

        tracing::info!(
            search_ad_credentials = search_ad.pool().len(),
            doc_count_credentials = doc_count.pool().len(),
            "api clients ready"
        );

        Ok(Self {
            search_ad,
            doc_count,
        })
    }
}
