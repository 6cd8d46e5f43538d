//! Joins per-term keyword statistics with document counts.
//!
//! Terms are split into chunks and processed in waves: each wave takes up to
//! `concurrency` keyword-ads credentials and runs one chunk per credential
//! concurrently. Inside a chunk, terms are processed one at a time with a
//! short pause between calls. The document-count lookup for a term runs
//! alongside its detail call on a credential from the second pool. A lane
//! never calls with a credential its pool has deactivated.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use kwdb_core::{DocumentCounts, EnrichedKeyword};
use kwdb_searchad::{CredentialHandle, DocCountSecret, SearchAdSecret};

use crate::source::{DocumentCountSource, KeywordSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnrichOptions {
    pub chunk_size: usize,
    pub concurrency: usize,
    pub inter_call_delay: Duration,
}

impl Default for EnrichOptions {
    fn default() -> Self {
        Self {
            chunk_size: 10,
            concurrency: 3,
            inter_call_delay: Duration::from_millis(150),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Enrichment {
    /// Enriched records in input order.
    pub records: Vec<EnrichedKeyword>,
    /// Terms whose detail call failed.
    pub dropped: Vec<String>,
    /// Terms never attempted because no keyword-ads credential was left.
    pub skipped: Vec<String>,
}

/// Progress callback: `(completed, total)` after every finished term.
pub type Progress<'a> = &'a (dyn Fn(usize, usize) + Send + Sync);

pub struct EnrichmentPipeline {
    keywords: Arc<dyn KeywordSource>,
    documents: Arc<dyn DocumentCountSource>,
    options: EnrichOptions,
}

struct LaneOutput {
    records: Vec<EnrichedKeyword>,
    dropped: Vec<String>,
    skipped: Vec<String>,
}

impl EnrichmentPipeline {
    #[must_use]
    pub fn new(
        keywords: Arc<dyn KeywordSource>,
        documents: Arc<dyn DocumentCountSource>,
        options: EnrichOptions,
    ) -> Self {
        let options = EnrichOptions {
            chunk_size: options.chunk_size.max(1),
            concurrency: options.concurrency.max(1),
            ..options
        };
        Self {
            keywords,
            documents,
            options,
        }
    }

    /// Enriches `terms`, dropping any term whose detail call fails.
    ///
    /// A failed or unavailable document-count lookup leaves the record with
    /// zero counts instead of dropping it. Skipped terms still count toward
    /// progress, so the last report is always `(total, total)`.
    pub async fn enrich(&self, terms: &[String], progress: Progress<'_>) -> Enrichment {
        let total = terms.len();
        let completed = AtomicUsize::new(0);
        let chunks: Vec<&[String]> = terms.chunks(self.options.chunk_size).collect();
        let mut enrichment = Enrichment::default();

        let mut next = 0;
        while next < chunks.len() {
            let wanted = self.options.concurrency.min(chunks.len() - next);
            let credentials = self.keywords.pool().select_many(wanted);
            if credentials.is_empty() {
                let rest: Vec<String> = chunks[next..].iter().flat_map(|c| c.iter().cloned()).collect();
                tracing::warn!(
                    skipped = rest.len(),
                    "keyword-ads credentials exhausted; remaining terms not enriched"
                );
                report_skipped(rest.len(), &completed, total, progress);
                enrichment.skipped.extend(rest);
                break;
            }
            let doc_credentials = self.documents.pool().select_many(credentials.len());

            let wave = &chunks[next..next + credentials.len()];
            next += credentials.len();

            let lanes = wave.iter().zip(credentials).enumerate().map(|(i, (chunk, credential))| {
                let doc_credential = if doc_credentials.is_empty() {
                    None
                } else {
                    Some(doc_credentials[i % doc_credentials.len()].clone())
                };
                self.run_lane(chunk, credential, doc_credential, &completed, total, progress)
            });

            for lane in join_all(lanes).await {
                enrichment.records.extend(lane.records);
                enrichment.dropped.extend(lane.dropped);
                enrichment.skipped.extend(lane.skipped);
            }
        }

        enrichment
    }

    /// Works through one chunk. Both handles are checked against their pools
    /// before every term and swapped for the least-used available credential
    /// once deactivated; with no keyword-ads credential left the rest of the
    /// chunk is skipped.
    async fn run_lane(
        &self,
        chunk: &[String],
        mut credential: CredentialHandle<SearchAdSecret>,
        mut doc_credential: Option<CredentialHandle<DocCountSecret>>,
        completed: &AtomicUsize,
        total: usize,
        progress: Progress<'_>,
    ) -> LaneOutput {
        let mut out = LaneOutput {
            records: Vec::with_capacity(chunk.len()),
            dropped: Vec::new(),
            skipped: Vec::new(),
        };
        let keyword_pool = self.keywords.pool();
        let doc_pool = self.documents.pool();

        for (i, term) in chunk.iter().enumerate() {
            if i > 0 && !self.options.inter_call_delay.is_zero() {
                tokio::time::sleep(self.options.inter_call_delay).await;
            }

            if !keyword_pool.is_available(credential.id) {
                let Some(replacement) = keyword_pool.select_one() else {
                    tracing::warn!(
                        credential = %credential.label,
                        skipped = chunk.len() - i,
                        "keyword-ads credentials exhausted mid-chunk; skipping the rest"
                    );
                    report_skipped(chunk.len() - i, completed, total, progress);
                    out.skipped.extend(chunk[i..].iter().cloned());
                    break;
                };
                tracing::debug!(
                    from = %credential.label,
                    to = %replacement.label,
                    "switching keyword-ads credential"
                );
                credential = replacement;
            }

            doc_credential = match doc_credential {
                Some(current) if doc_pool.is_available(current.id) => Some(current),
                _ => doc_pool.select_one(),
            };

            let (detail, documents) = tokio::join!(
                self.keywords.keyword_detail(&credential, term),
                self.document_counts(doc_credential.as_ref(), term),
            );

            match detail {
                Ok(candidate) => out.records.push(EnrichedKeyword::new(candidate, documents)),
                Err(e) => {
                    tracing::warn!(term = %term, error = %e, "keyword detail failed; dropping term");
                    out.dropped.push(term.clone());
                }
            }

            let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
            progress(done, total);
        }

        out
    }

    async fn document_counts(
        &self,
        credential: Option<&CredentialHandle<DocCountSecret>>,
        term: &str,
    ) -> DocumentCounts {
        let Some(credential) = credential else {
            tracing::debug!(term, "no document-search credential available; counts default to 0");
            return DocumentCounts::default();
        };
        match self.documents.document_counts(credential, term).await {
            Ok(counts) => counts,
            Err(e) => {
                tracing::warn!(term, error = %e, "document counts unavailable; defaulting to 0");
                DocumentCounts::default()
            }
        }
    }
}

fn report_skipped(count: usize, completed: &AtomicUsize, total: usize, progress: Progress<'_>) {
    for _ in 0..count {
        let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
        progress(done, total);
    }
}
