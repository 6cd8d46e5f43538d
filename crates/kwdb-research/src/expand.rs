//! Multi-round related-keyword expansion from a single seed.
//!
//! Round 0 asks for the seed's related terms. Every later round feeds the
//! terms discovered in the previous round back in as hints, in batches of
//! `batch_size`, at most `batch_cap` batches per round. Batches within a
//! round are spread across as many credentials as the pool can offer.

use std::collections::HashSet;
use std::sync::Arc;

use futures::future::join_all;
use kwdb_searchad::types::term_key;
use kwdb_searchad::{ApiError, MAX_HINT_TERMS};

use crate::source::KeywordSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpandOptions {
    /// Total rounds including the seed round.
    pub max_rounds: u32,
    pub batch_cap: usize,
    pub batch_size: usize,
}

impl Default for ExpandOptions {
    fn default() -> Self {
        Self {
            max_rounds: 2,
            batch_cap: 10,
            batch_size: MAX_HINT_TERMS,
        }
    }
}

/// Result of one expansion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Expansion {
    /// Discovered terms in discovery order, seed excluded.
    pub terms: Vec<String>,
    /// Size of `terms` after each completed round.
    pub round_sizes: Vec<usize>,
    /// Related-keyword calls issued.
    pub calls: usize,
    pub failed_batches: usize,
    /// Set when expansion stopped because no credential was available.
    pub exhausted: bool,
}

pub struct KeywordExpander {
    source: Arc<dyn KeywordSource>,
    options: ExpandOptions,
}

impl KeywordExpander {
    #[must_use]
    pub fn new(source: Arc<dyn KeywordSource>, options: ExpandOptions) -> Self {
        let options = ExpandOptions {
            max_rounds: options.max_rounds.max(1),
            batch_cap: options.batch_cap.max(1),
            batch_size: options.batch_size.clamp(1, MAX_HINT_TERMS),
        };
        Self { source, options }
    }

    #[must_use]
    pub fn options(&self) -> ExpandOptions {
        self.options
    }

    /// Expands `seed` into a deduplicated list of related terms.
    ///
    /// Issues at most `max_rounds * batch_cap` related-keyword calls. Failed
    /// batches in rounds after the first are logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NoCredentials`] if no credential is available for
    /// the seed round, or the seed round's own error if that call fails.
    pub async fn expand(&self, seed: &str) -> Result<Expansion, ApiError> {
        let pool = self.source.pool();
        let credential = pool.select_one().ok_or(ApiError::NoCredentials { pool: pool.name() })?;

        let mut seen: HashSet<String> = HashSet::from([term_key(seed)]);
        let mut expansion = Expansion::default();

        let first = self
            .source
            .related_terms(&credential, &[seed.to_string()])
            .await?;
        expansion.calls = 1;
        merge(&mut expansion.terms, &mut seen, first);
        expansion.round_sizes.push(expansion.terms.len());
        tracing::debug!(seed, discovered = expansion.terms.len(), "seed round complete");

        let mut frontier_start = 0;
        for round in 1..self.options.max_rounds {
            let frontier = expansion.terms[frontier_start..].to_vec();
            frontier_start = expansion.terms.len();
            if frontier.is_empty() {
                break;
            }

            let before = expansion.terms.len();
            let batches: Vec<&[String]> = frontier
                .chunks(self.options.batch_size)
                .take(self.options.batch_cap)
                .collect();
            self.run_round(&batches, &mut expansion, &mut seen).await;
            expansion.round_sizes.push(expansion.terms.len());

            tracing::debug!(
                seed,
                round,
                batches = batches.len(),
                discovered = expansion.terms.len() - before,
                total = expansion.terms.len(),
                "expansion round complete"
            );

            if expansion.exhausted {
                tracing::warn!(seed, round, "credentials exhausted; stopping expansion early");
                break;
            }
            if expansion.terms.len() == before {
                break;
            }
        }

        Ok(expansion)
    }

    /// Issues every batch of one round, one credential per concurrent call.
    async fn run_round(
        &self,
        batches: &[&[String]],
        expansion: &mut Expansion,
        seen: &mut HashSet<String>,
    ) {
        let pool = self.source.pool();
        let mut next = 0;
        while next < batches.len() {
            let credentials = pool.select_many(batches.len() - next);
            if credentials.is_empty() {
                expansion.exhausted = true;
                return;
            }

            let wave = &batches[next..next + credentials.len()];
            next += credentials.len();
            expansion.calls += wave.len();

            let results = join_all(
                wave.iter()
                    .zip(&credentials)
                    .map(|(batch, credential)| self.source.related_terms(credential, batch)),
            )
            .await;

            for (batch, result) in wave.iter().zip(results) {
                match result {
                    Ok(terms) => merge(&mut expansion.terms, seen, terms),
                    Err(e) => {
                        expansion.failed_batches += 1;
                        tracing::warn!(hints = ?batch, error = %e, "related-keyword batch failed; skipping");
                    }
                }
            }
        }
    }
}

fn merge(terms: &mut Vec<String>, seen: &mut HashSet<String>, discovered: Vec<String>) {
    for term in discovered {
        if seen.insert(term_key(&term)) {
            terms.push(term);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_skips_terms_already_seen_by_key() {
        let mut terms = vec!["digital marketing".to_string()];
        let mut seen = HashSet::from([term_key("marketing"), term_key("digital marketing")]);
        merge(
            &mut terms,
            &mut seen,
            vec![
                "DigitalMarketing".to_string(),
                "Marketing".to_string(),
                "seo".to_string(),
                "seo".to_string(),
            ],
        );
        assert_eq!(terms, vec!["digital marketing", "seo"]);
    }

    #[test]
    fn options_are_clamped_to_usable_values() {
        struct Never;
        #[async_trait::async_trait]
        impl KeywordSource for Never {
            fn pool(&self) -> &kwdb_searchad::KeyPool<kwdb_searchad::SearchAdSecret> {
                unreachable!()
            }
            async fn related_terms(
                &self,
                _: &kwdb_searchad::CredentialHandle<kwdb_searchad::SearchAdSecret>,
                _: &[String],
            ) -> Result<Vec<String>, ApiError> {
                unreachable!()
            }
            async fn keyword_detail(
                &self,
                _: &kwdb_searchad::CredentialHandle<kwdb_searchad::SearchAdSecret>,
                _: &str,
            ) -> Result<kwdb_core::KeywordCandidate, ApiError> {
                unreachable!()
            }
        }

        let expander = KeywordExpander::new(
            Arc::new(Never),
            ExpandOptions {
                max_rounds: 0,
                batch_cap: 0,
                batch_size: 50,
            },
        );
        assert_eq!(
            expander.options(),
            ExpandOptions {
                max_rounds: 1,
                batch_cap: 1,
                batch_size: MAX_HINT_TERMS,
            }
        );
    }
}
