//! Persistence seam for collected keywords.

use std::collections::HashSet;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kwdb_core::{CompetitionLevel, DocumentCounts, EnrichedKeyword};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::StoreError;

/// A keyword as read back from the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredKeyword {
    #[serde(skip_serializing)]
    pub id: i64,
    pub public_id: Uuid,
    pub term: String,
    pub pc_search_volume: u64,
    pub mobile_search_volume: u64,
    pub total_search_volume: u64,
    pub competition: CompetitionLevel,
    pub documents: DocumentCounts,
    pub total_docs: u64,
    pub potential_score: f64,
    pub is_used_as_seed: bool,
    pub source_seed: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Boolean columns the pipeline is allowed to flip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeywordFlag {
    UsedAsSeed,
}

impl KeywordFlag {
    #[must_use]
    pub fn column(self) -> &'static str {
        match self {
            Self::UsedAsSeed => "is_used_as_seed",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeywordSort {
    #[default]
    Volume,
    Potential,
    Recent,
}

impl FromStr for KeywordSort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "volume" => Ok(Self::Volume),
            "potential" => Ok(Self::Potential),
            "recent" => Ok(Self::Recent),
            other => Err(format!(
                "unknown sort '{other}' (expected volume, potential or recent)"
            )),
        }
    }
}

#[async_trait]
pub trait KeywordStore: Send + Sync {
    /// Persists `records` discovered from `source_seed`; returns rows written.
    async fn insert_many(
        &self,
        source_seed: &str,
        records: &[EnrichedKeyword],
    ) -> Result<usize, StoreError>;

    /// Which of `terms` already have a record created at or after `since`.
    async fn terms_seen_since(
        &self,
        terms: &[String],
        since: DateTime<Utc>,
    ) -> Result<HashSet<String>, StoreError>;

    async fn set_flag(&self, id: i64, flag: KeywordFlag, value: bool) -> Result<(), StoreError>;

    /// Sets `flag` on every row whose term matches `term` ignoring case and
    /// whitespace; returns how many rows changed. No match is not an error.
    async fn set_flag_by_term(
        &self,
        term: &str,
        flag: KeywordFlag,
        value: bool,
    ) -> Result<u64, StoreError>;

    /// Highest-volume keywords first.
    async fn top_by_volume(
        &self,
        limit: i64,
        exclude_used_as_seed: bool,
    ) -> Result<Vec<StoredKeyword>, StoreError>;

    async fn list_keywords(
        &self,
        limit: i64,
        sort: KeywordSort,
    ) -> Result<Vec<StoredKeyword>, StoreError>;
}
