//! Filters out candidates the store has already seen recently.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use kwdb_core::EnrichedKeyword;
use kwdb_searchad::types::term_key;

use crate::store::KeywordStore;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DedupOutcome {
    pub fresh: Vec<EnrichedKeyword>,
    pub duplicates: usize,
    /// Set when the history lookup failed and nothing was filtered.
    pub failed_open: bool,
}

pub struct DedupGate {
    store: Arc<dyn KeywordStore>,
    window_days: u32,
}

impl DedupGate {
    #[must_use]
    pub fn new(store: Arc<dyn KeywordStore>, window_days: u32) -> Self {
        Self { store, window_days }
    }

    #[must_use]
    pub fn window_days(&self) -> u32 {
        self.window_days
    }

    pub async fn filter(&self, candidates: Vec<EnrichedKeyword>) -> DedupOutcome {
        self.filter_at(candidates, Utc::now()).await
    }

    /// Drops every candidate whose term already has a record created within
    /// `window_days` before `now`. Terms are compared ignoring case and
    /// whitespace.
    ///
    /// If the store lookup fails, all candidates pass through unfiltered.
    pub async fn filter_at(
        &self,
        candidates: Vec<EnrichedKeyword>,
        now: DateTime<Utc>,
    ) -> DedupOutcome {
        if candidates.is_empty() {
            return DedupOutcome::default();
        }

        let since = now - Duration::days(i64::from(self.window_days));
        let terms: Vec<String> = candidates.iter().map(|c| c.term().to_string()).collect();

        let seen = match self.store.terms_seen_since(&terms, since).await {
            Ok(seen) => seen.iter().map(|t| term_key(t)).collect::<HashSet<_>>(),
            Err(e) => {
                tracing::warn!(
                    candidates = candidates.len(),
                    error = %e,
                    "dedup history lookup failed; passing all candidates through"
                );
                return DedupOutcome {
                    fresh: candidates,
                    duplicates: 0,
                    failed_open: true,
                };
            }
        };

        let before = candidates.len();
        let fresh: Vec<EnrichedKeyword> = candidates
            .into_iter()
            .filter(|c| !seen.contains(&term_key(c.term())))
            .collect();
        let duplicates = before - fresh.len();
        if duplicates > 0 {
            tracing::debug!(duplicates, window_days = self.window_days, "filtered recent duplicates");
        }

        DedupOutcome {
            fresh,
            duplicates,
            failed_open: false,
        }
    }
}
