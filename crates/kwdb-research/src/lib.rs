//! Keyword research pipeline: expansion, enrichment, dedup and the
//! automatic collection loop that ties them together.

pub mod collector;
pub mod dedup;
pub mod enrich;
pub mod error;
pub mod expand;
pub mod source;
pub mod status;
pub mod store;

pub use collector::{
    AutoCollector, CollectorSettings, ResearchOutcome, RunClaim, RunRequest, RunSummary,
};
pub use dedup::{DedupGate, DedupOutcome};
pub use enrich::{EnrichOptions, Enrichment, EnrichmentPipeline, Progress};
pub use error::{CollectError, StoreError};
pub use expand::{ExpandOptions, Expansion, KeywordExpander};
pub use source::{DocumentCountSource, KeywordSource};
pub use status::StatusBoard;
pub use store::{KeywordFlag, KeywordSort, KeywordStore, StoredKeyword};
