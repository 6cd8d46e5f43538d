use kwdb_searchad::ApiError;
use thiserror::Error;

/// Failure reported by a [`crate::KeywordStore`] backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("keyword store backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("keyword not found: {0}")]
    NotFound(String),
}

impl StoreError {
    pub fn backend(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Backend(Box::new(err))
    }
}

#[derive(Debug, Error)]
pub enum CollectError {
    /// A run is already flagged as running.
    #[error("an automatic collection run is already in progress")]
    ConcurrentRunConflict,

    /// The first expansion round for a seed failed.
    #[error("keyword expansion failed: {0}")]
    Expansion(#[from] ApiError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
