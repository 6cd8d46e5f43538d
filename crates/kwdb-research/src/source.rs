//! Seams between the research pipeline and the upstream APIs.
//!
//! The pipeline only needs a credential pool plus the calls below, so tests
//! can drive it with in-memory fakes instead of HTTP servers.

use async_trait::async_trait;
use kwdb_core::{DocumentCounts, KeywordCandidate};
use kwdb_searchad::{
    ApiError, CredentialHandle, DocCountClient, DocCountSecret, KeyPool, SearchAdClient,
    SearchAdSecret,
};

#[async_trait]
pub trait KeywordSource: Send + Sync {
    fn pool(&self) -> &KeyPool<SearchAdSecret>;

    /// Related terms for up to five hint terms.
    async fn related_terms(
        &self,
        credential: &CredentialHandle<SearchAdSecret>,
        hints: &[String],
    ) -> Result<Vec<String>, ApiError>;

    /// Detailed statistics for exactly one term.
    async fn keyword_detail(
        &self,
        credential: &CredentialHandle<SearchAdSecret>,
        term: &str,
    ) -> Result<KeywordCandidate, ApiError>;
}

#[async_trait]
pub trait DocumentCountSource: Send + Sync {
    fn pool(&self) -> &KeyPool<DocCountSecret>;

    async fn document_counts(
        &self,
        credential: &CredentialHandle<DocCountSecret>,
        term: &str,
    ) -> Result<DocumentCounts, ApiError>;
}

#[async_trait]
impl KeywordSource for SearchAdClient {
    fn pool(&self) -> &KeyPool<SearchAdSecret> {
        SearchAdClient::pool(self)
    }

    async fn related_terms(
        &self,
        credential: &CredentialHandle<SearchAdSecret>,
        hints: &[String],
    ) -> Result<Vec<String>, ApiError> {
        SearchAdClient::related_terms(self, credential, hints).await
    }

    async fn keyword_detail(
        &self,
        credential: &CredentialHandle<SearchAdSecret>,
        term: &str,
    ) -> Result<KeywordCandidate, ApiError> {
        SearchAdClient::keyword_detail(self, credential, term).await
    }
}

#[async_trait]
impl DocumentCountSource for DocCountClient {
    fn pool(&self) -> &KeyPool<DocCountSecret> {
        DocCountClient::pool(self)
    }

    async fn document_counts(
        &self,
        credential: &CredentialHandle<DocCountSecret>,
        term: &str,
    ) -> Result<DocumentCounts, ApiError> {
        DocCountClient::document_counts(self, credential, term).await
    }
}
