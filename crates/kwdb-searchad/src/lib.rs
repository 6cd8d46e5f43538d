pub mod client;
pub mod doc_count;
pub mod error;
pub mod key_pool;
mod response;
pub mod retry;
pub mod setup;
pub mod signing;
pub mod types;

pub use client::{search_ad_pool, SearchAdClient, SearchAdSecret, MAX_HINT_TERMS};
pub use doc_count::{doc_count_pool, DocCountClient, DocCountSecret, DocumentKind};
pub use error::ApiError;
pub use key_pool::{CredentialHandle, CredentialStatus, DeactivationReason, KeyPool};
pub use retry::RetryPolicy;
pub use setup::ApiClients;
pub use types::Parsed;
