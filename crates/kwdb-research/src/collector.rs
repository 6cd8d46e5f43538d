//! Seed-by-seed collection loop and one-off manual research.
//!
//! An automatic run repeatedly picks the next seed (explicit seeds first,
//! then the highest-volume stored keyword not yet used as a seed), expands
//! it, enriches the discovered terms, drops recent duplicates and writes the
//! survivors before moving on. Progress is persisted per seed, so stopping
//! or failing mid-run keeps everything already written.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use kwdb_core::{AppConfig, EnrichedKeyword, RunState};
use kwdb_searchad::types::term_key;
use serde::Serialize;
use tokio::task::JoinHandle;

use crate::dedup::DedupGate;
use crate::enrich::{EnrichOptions, EnrichmentPipeline, Progress};
use crate::error::CollectError;
use crate::expand::{ExpandOptions, KeywordExpander};
use crate::source::{DocumentCountSource, KeywordSource};
use crate::status::StatusBoard;
use crate::store::{KeywordFlag, KeywordStore};

/// Stored keywords fetched per seed lookup.
const SEED_LOOKAHEAD: i64 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectorSettings {
    pub expand: ExpandOptions,
    pub enrich: EnrichOptions,
    pub dedup_window_days: u32,
    pub max_terms_per_seed: usize,
    pub rate_limit_cooldown: Duration,
}

impl Default for CollectorSettings {
    fn default() -> Self {
        Self {
            expand: ExpandOptions::default(),
            enrich: EnrichOptions::default(),
            dedup_window_days: 30,
            max_terms_per_seed: 100,
            rate_limit_cooldown: Duration::from_secs(300),
        }
    }
}

impl CollectorSettings {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            expand: ExpandOptions {
                max_rounds: config.expand_max_rounds,
                batch_cap: config.expand_batch_cap,
                batch_size: config.expand_batch_size,
            },
            enrich: EnrichOptions {
                chunk_size: config.enrich_chunk_size,
                concurrency: config.enrich_concurrency,
                inter_call_delay: Duration::from_millis(config.enrich_inter_call_delay_ms),
            },
            dedup_window_days: config.dedup_window_days,
            max_terms_per_seed: config.max_terms_per_seed,
            rate_limit_cooldown: Duration::from_secs(config.rate_limit_cooldown_secs),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunRequest {
    pub target_count: u32,
    /// Consumed, in order, before any stored keyword is used as a seed.
    pub initial_seeds: Vec<String>,
}

/// Proof that the status board was flipped to running for this request.
#[derive(Debug)]
pub struct RunClaim {
    request: RunRequest,
}

impl RunClaim {
    #[must_use]
    pub fn target_count(&self) -> u32 {
        self.request.target_count
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub state: RunState,
    pub target_count: u32,
    pub collected: u32,
    pub seeds_used: u32,
    pub persistence_failures: u32,
    pub message: String,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResearchOutcome {
    pub seed: String,
    pub discovered: usize,
    /// Fresh records, highest potential score first.
    pub records: Vec<EnrichedKeyword>,
    pub dropped: usize,
    pub skipped: usize,
    pub duplicates: usize,
    pub inserted: usize,
    pub persistence_error: Option<String>,
}

struct Seed {
    id: Option<i64>,
    term: String,
}

pub struct AutoCollector {
    keywords: Arc<dyn KeywordSource>,
    documents: Arc<dyn DocumentCountSource>,
    store: Arc<dyn KeywordStore>,
    status: StatusBoard,
    settings: CollectorSettings,
}

impl AutoCollector {
    #[must_use]
    pub fn new(
        keywords: Arc<dyn KeywordSource>,
        documents: Arc<dyn DocumentCountSource>,
        store: Arc<dyn KeywordStore>,
        settings: CollectorSettings,
    ) -> Self {
        Self {
            keywords,
            documents,
            store,
            status: StatusBoard::new(),
            settings,
        }
    }

    #[must_use]
    pub fn status(&self) -> &StatusBoard {
        &self.status
    }

    #[must_use]
    pub fn settings(&self) -> &CollectorSettings {
        &self.settings
    }

    #[must_use]
    pub fn expander(&self) -> KeywordExpander {
        KeywordExpander::new(Arc::clone(&self.keywords), self.settings.expand)
    }

    #[must_use]
    pub fn enrichment(&self) -> EnrichmentPipeline {
        EnrichmentPipeline::new(
            Arc::clone(&self.keywords),
            Arc::clone(&self.documents),
            self.settings.enrich,
        )
    }

    #[must_use]
    pub fn dedup_gate(&self) -> DedupGate {
        DedupGate::new(Arc::clone(&self.store), self.settings.dedup_window_days)
    }

    /// Marks a run as started.
    ///
    /// # Errors
    ///
    /// Returns [`CollectError::ConcurrentRunConflict`] if a run is active.
    pub fn claim(&self, request: RunRequest) -> Result<RunClaim, CollectError> {
        self.status.try_begin(request.target_count, Utc::now())?;
        Ok(RunClaim { request })
    }

    /// Runs a claimed collection on the Tokio runtime.
    pub fn spawn(self: Arc<Self>, claim: RunClaim) -> JoinHandle<RunSummary> {
        tokio::spawn(async move { self.run(claim).await })
    }

    /// Claims and runs a collection to completion on the current task.
    ///
    /// # Errors
    ///
    /// Returns [`CollectError::ConcurrentRunConflict`] if a run is active.
    pub async fn collect(&self, request: RunRequest) -> Result<RunSummary, CollectError> {
        let claim = self.claim(request)?;
        Ok(self.run(claim).await)
    }

    /// Drives the loop until the target is reached, seeds run out, a stop is
    /// requested, or seed lookup fails. Always leaves the status board in a
    /// terminal state.
    #[allow(clippy::too_many_lines)]
    pub async fn run(&self, claim: RunClaim) -> RunSummary {
        let RunRequest {
            target_count,
            initial_seeds,
        } = claim.request;
        let mut queue: VecDeque<String> = initial_seeds
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        let mut tried: HashSet<String> = HashSet::new();
        let mut collected: u32 = 0;
        let mut seeds_used: u32 = 0;
        let mut persistence_failures: u32 = 0;

        tracing::info!(
            target_count,
            initial_seeds = queue.len(),
            "automatic collection started"
        );

        let (state, message, error) = loop {
            if self.status.stop_requested() {
                break (RunState::Stopped, "stopped by user".to_string(), None);
            }
            if collected >= target_count {
                break (
                    RunState::Completed,
                    format!("target reached: {collected} keywords collected"),
                    None,
                );
            }

            self.reactivate_cooled();
            if self.keywords.pool().available_count() == 0 {
                break (
                    RunState::Failed,
                    format!("stopped after {collected} keywords"),
                    Some("no keyword-ads credentials available".to_string()),
                );
            }

            let seed = match self.next_seed(&mut queue, &mut tried).await {
                Ok(Some(seed)) => seed,
                Ok(None) => {
                    break (
                        RunState::Completed,
                        format!("seed list exhausted: {collected} keywords collected"),
                        None,
                    );
                }
                Err(e) => {
                    tracing::error!(error = %e, "failed to load next seed");
                    break (
                        RunState::Failed,
                        format!("stopped after {collected} keywords"),
                        Some(e.to_string()),
                    );
                }
            };

            let term = seed.term.as_str();
            self.status
                .update(|s| s.status_message = format!("expanding seed '{term}'"));

            let remaining = usize::try_from(target_count - collected).unwrap_or(usize::MAX);
            let progress = |done: usize, total: usize| {
                self.status.update(|s| {
                    s.status_message = format!("seed '{term}': enriched {done}/{total} terms");
                });
            };

            match self.pipeline(term, remaining, &progress).await {
                Ok(outcome) => {
                    let inserted = u32::try_from(outcome.inserted).unwrap_or(u32::MAX);
                    collected = collected.saturating_add(inserted);
                    if outcome.persistence_error.is_some() {
                        persistence_failures += 1;
                    }
                    tracing::info!(
                        seed = %term,
                        discovered = outcome.discovered,
                        duplicates = outcome.duplicates,
                        inserted,
                        collected,
                        target_count,
                        "seed processed"
                    );
                }
                Err(e) => {
                    tracing::warn!(seed = %term, error = %e, "seed expansion failed; skipping seed");
                }
            }

            let flagged = match seed.id {
                Some(id) => self.store.set_flag(id, KeywordFlag::UsedAsSeed, true).await,
                // Initial seeds may match a stored row under another spelling.
                None => self
                    .store
                    .set_flag_by_term(term, KeywordFlag::UsedAsSeed, true)
                    .await
                    .map(drop),
            };
            if let Err(e) = flagged {
                tracing::warn!(seed = %term, error = %e, "failed to mark keyword as used seed");
            }
            seeds_used += 1;

            self.status.update(|s| {
                s.current_count = collected;
                s.seeds_used = seeds_used;
                s.status_message = format!("{collected}/{target_count} keywords after {seeds_used} seeds");
            });
        };

        tracing::info!(
            ?state,
            collected,
            seeds_used,
            persistence_failures,
            "automatic collection finished"
        );
        self.status
            .finish(state, message.clone(), error.clone(), Utc::now());

        RunSummary {
            state,
            target_count,
            collected,
            seeds_used,
            persistence_failures,
            message,
            error,
        }
    }

    /// Expands, enriches and deduplicates one seed, persisting the fresh
    /// records unless `persist` is false.
    ///
    /// # Errors
    ///
    /// Returns [`CollectError::Expansion`] if the seed round of expansion
    /// fails. Persistence failures are reported in the outcome instead.
    pub async fn research(&self, seed: &str, persist: bool) -> Result<ResearchOutcome, CollectError> {
        let limit = if persist { usize::MAX } else { 0 };
        let progress = |done: usize, total: usize| {
            tracing::debug!(seed, done, total, "research enrichment progress");
        };
        let mut outcome = self.pipeline(seed, limit, &progress).await?;
        outcome.records.sort_by(|a, b| {
            b.potential_score()
                .partial_cmp(&a.potential_score())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Ok(outcome)
    }

    /// Shared expand → enrich → dedup → persist path. At most `limit` fresh
    /// records are written.
    async fn pipeline(
        &self,
        seed: &str,
        limit: usize,
        progress: Progress<'_>,
    ) -> Result<ResearchOutcome, CollectError> {
        let expansion = self.expander().expand(seed).await?;
        let discovered = expansion.terms.len();
        let mut terms = expansion.terms;
        if terms.len() > self.settings.max_terms_per_seed {
            tracing::debug!(
                seed,
                discovered,
                max = self.settings.max_terms_per_seed,
                "truncating expansion before enrichment"
            );
            terms.truncate(self.settings.max_terms_per_seed);
        }

        let enrichment = self.enrichment().enrich(&terms, progress).await;
        let dedup = self.dedup_gate().filter(enrichment.records).await;

        let mut records = dedup.fresh;
        let mut inserted = 0;
        let mut persistence_error = None;
        if limit > 0 && !records.is_empty() {
            records.truncate(limit);
            match self.store.insert_many(seed, &records).await {
                Ok(n) => inserted = n,
                Err(e) => {
                    tracing::warn!(seed, records = records.len(), error = %e, "failed to persist keywords");
                    persistence_error = Some(e.to_string());
                }
            }
        }

        Ok(ResearchOutcome {
            seed: seed.to_string(),
            discovered,
            records,
            dropped: enrichment.dropped.len(),
            skipped: enrichment.skipped.len(),
            duplicates: dedup.duplicates,
            inserted,
            persistence_error,
        })
    }

    async fn next_seed(
        &self,
        queue: &mut VecDeque<String>,
        tried: &mut HashSet<String>,
    ) -> Result<Option<Seed>, CollectError> {
        while let Some(term) = queue.pop_front() {
            if tried.insert(term_key(&term)) {
                return Ok(Some(Seed { id: None, term }));
            }
        }

        let candidates = self.store.top_by_volume(SEED_LOOKAHEAD, true).await?;
        Ok(candidates
            .into_iter()
            .find(|k| tried.insert(term_key(&k.term)))
            .map(|k| Seed {
                id: Some(k.id),
                term: k.term,
            }))
    }

    fn reactivate_cooled(&self) {
        let cooldown = self.settings.rate_limit_cooldown;
        self.keywords.pool().reactivate_cooled(cooldown);
        self.documents.pool().reactivate_cooled(cooldown);
    }
}
