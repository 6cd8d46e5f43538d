//! In-memory fakes of the research seams shared by the integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kwdb_core::{CompetitionLevel, DocumentCounts, EnrichedKeyword, KeywordCandidate};
use kwdb_research::{
    DocumentCountSource, KeywordFlag, KeywordSort, KeywordSource, KeywordStore, StoreError,
    StoredKeyword,
};
use kwdb_searchad::types::term_key;
use kwdb_searchad::{ApiError, CredentialHandle, DocCountSecret, KeyPool, SearchAdSecret};

pub fn search_ad_pool(credentials: usize, daily_limit: u32) -> KeyPool<SearchAdSecret> {
    KeyPool::new(
        "search_ad",
        daily_limit,
        (0..credentials).map(|i| {
            (
                format!("ads-{i}"),
                SearchAdSecret {
                    api_key: format!("key-{i}"),
                    secret_key: format!("secret-{i}"),
                    customer_id: format!("{i}"),
                },
            )
        }),
    )
}

pub fn doc_pool(credentials: usize) -> KeyPool<DocCountSecret> {
    KeyPool::new(
        "document_search",
        10_000,
        (0..credentials).map(|i| {
            (
                format!("docs-{i}"),
                DocCountSecret {
                    client_id: format!("id-{i}"),
                    client_secret: format!("secret-{i}"),
                },
            )
        }),
    )
}

pub fn candidate(term: &str, pc: u64, mobile: u64) -> KeywordCandidate {
    KeywordCandidate {
        term: term.to_string(),
        pc_search_volume: pc,
        mobile_search_volume: mobile,
        pc_click_count: 1.0,
        mobile_click_count: 2.0,
        pc_ctr: 0.1,
        mobile_ctr: 0.2,
        ad_depth: 3.0,
        competition: CompetitionLevel::Medium,
        raw_response: serde_json::json!({ "relKeyword": term }),
        fetched_at: Utc::now(),
    }
}

pub fn enriched(term: &str, volume: u64) -> EnrichedKeyword {
    EnrichedKeyword::new(candidate(term, volume, 0), DocumentCounts::default())
}

pub fn strings(terms: &[&str]) -> Vec<String> {
    terms.iter().map(ToString::to_string).collect()
}

fn server_error(endpoint: &str, status: u16) -> ApiError {
    ApiError::ServerError {
        status,
        endpoint: endpoint.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Keyword ads
// ---------------------------------------------------------------------------

pub struct FakeKeywords {
    pool: KeyPool<SearchAdSecret>,
    related: HashMap<String, Vec<String>>,
    /// When set, every hint `h` without a fixed answer yields `h-1..=h-n`.
    generate: Option<usize>,
    volumes: HashMap<String, (u64, u64)>,
    fail_related: HashSet<String>,
    fail_detail: HashSet<String>,
    pub related_calls: AtomicUsize,
    pub detail_calls: AtomicUsize,
}

impl FakeKeywords {
    pub fn new(pool: KeyPool<SearchAdSecret>) -> Self {
        Self {
            pool,
            related: HashMap::new(),
            generate: None,
            volumes: HashMap::new(),
            fail_related: HashSet::new(),
            fail_detail: HashSet::new(),
            related_calls: AtomicUsize::new(0),
            detail_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_related(mut self, hint: &str, terms: &[&str]) -> Self {
        self.related.insert(term_key(hint), strings(terms));
        self
    }

    pub fn generating(mut self, per_hint: usize) -> Self {
        self.generate = Some(per_hint);
        self
    }

    pub fn with_volume(mut self, term: &str, pc: u64, mobile: u64) -> Self {
        self.volumes.insert(term_key(term), (pc, mobile));
        self
    }

    pub fn failing_related(mut self, hint: &str) -> Self {
        self.fail_related.insert(term_key(hint));
        self
    }

    pub fn failing_detail(mut self, term: &str) -> Self {
        self.fail_detail.insert(term_key(term));
        self
    }
}

#[async_trait]
impl KeywordSource for FakeKeywords {
    fn pool(&self) -> &KeyPool<SearchAdSecret> {
        &self.pool
    }

    async fn related_terms(
        &self,
        credential: &CredentialHandle<SearchAdSecret>,
        hints: &[String],
    ) -> Result<Vec<String>, ApiError> {
        self.related_calls.fetch_add(1, Ordering::SeqCst);
        self.pool.report_usage(credential.id);
        if hints.iter().any(|h| self.fail_related.contains(&term_key(h))) {
            return Err(server_error("/keywordstool", 503));
        }

        let mut out = Vec::new();
        for hint in hints {
            if let Some(terms) = self.related.get(&term_key(hint)) {
                out.extend(terms.iter().cloned());
            } else if let Some(n) = self.generate {
                out.extend((1..=n).map(|i| format!("{hint}-{i}")));
            }
        }
        Ok(out)
    }

    async fn keyword_detail(
        &self,
        credential: &CredentialHandle<SearchAdSecret>,
        term: &str,
    ) -> Result<KeywordCandidate, ApiError> {
        self.detail_calls.fetch_add(1, Ordering::SeqCst);
        self.pool.report_usage(credential.id);
        if self.fail_detail.contains(&term_key(term)) {
            return Err(ApiError::ClientError {
                status: 400,
                endpoint: "/keywordstool".to_string(),
                body: "invalid hint".to_string(),
            });
        }
        let (pc, mobile) = self
            .volumes
            .get(&term_key(term))
            .copied()
            .unwrap_or((100, 200));
        Ok(candidate(term, pc, mobile))
    }
}

// ---------------------------------------------------------------------------
// Document counts
// ---------------------------------------------------------------------------

pub struct FakeDocuments {
    pool: KeyPool<DocCountSecret>,
    counts: HashMap<String, DocumentCounts>,
    timeouts: HashSet<String>,
    rate_limited: bool,
    pub calls: AtomicUsize,
    /// `(credential id, was it available)` for every call, in call order.
    pub credential_log: Mutex<Vec<(usize, bool)>>,
}

impl FakeDocuments {
    pub fn new(pool: KeyPool<DocCountSecret>) -> Self {
        Self {
            pool,
            counts: HashMap::new(),
            timeouts: HashSet::new(),
            rate_limited: false,
            calls: AtomicUsize::new(0),
            credential_log: Mutex::new(Vec::new()),
        }
    }

    /// Every call answers 429 and deactivates its credential.
    pub fn rate_limiting(mut self) -> Self {
        self.rate_limited = true;
        self
    }

    pub fn credential_log(&self) -> Vec<(usize, bool)> {
        self.credential_log.lock().expect("log lock").clone()
    }

    pub fn with_counts(mut self, term: &str, counts: DocumentCounts) -> Self {
        self.counts.insert(term_key(term), counts);
        self
    }

    pub fn timing_out(mut self, term: &str) -> Self {
        self.timeouts.insert(term_key(term));
        self
    }
}

#[async_trait]
impl DocumentCountSource for FakeDocuments {
    fn pool(&self) -> &KeyPool<DocCountSecret> {
        &self.pool
    }

    async fn document_counts(
        &self,
        credential: &CredentialHandle<DocCountSecret>,
        term: &str,
    ) -> Result<DocumentCounts, ApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.credential_log
            .lock()
            .expect("log lock")
            .push((credential.id, self.pool.is_available(credential.id)));
        self.pool.report_usage(credential.id);
        if self.rate_limited {
            self.pool.report_rate_limited(credential.id);
            return Err(ApiError::QuotaExceeded {
                label: credential.label.clone(),
            });
        }
        if self.timeouts.contains(&term_key(term)) {
            // Gateway timeout after retries were exhausted.
            return Err(server_error("/v1/search/blog.json", 504));
        }
        Ok(self
            .counts
            .get(&term_key(term))
            .copied()
            .unwrap_or(DocumentCounts {
                blog: 10,
                news: 5,
                web: 3,
                cafe: 2,
            }))
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryStore {
    rows: Mutex<Vec<StoredKeyword>>,
    pub fail_reads: AtomicBool,
    pub fail_writes: AtomicBool,
    pub history_queries: AtomicUsize,
}

#[derive(Debug)]
struct Unavailable;

impl std::fmt::Display for Unavailable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("database unavailable")
    }
}

impl std::error::Error for Unavailable {}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a historical row as if it had been stored at `created_at`.
    pub fn seed_history(&self, term: &str, volume: u64, created_at: DateTime<Utc>) -> i64 {
        let mut rows = self.rows.lock().expect("store lock");
        let id = i64::try_from(rows.len()).expect("small test store") + 1;
        rows.push(stored(id, &enriched(term, volume), None, created_at));
        id
    }

    pub fn rows(&self) -> Vec<StoredKeyword> {
        self.rows.lock().expect("store lock").clone()
    }

    pub fn terms(&self) -> Vec<String> {
        self.rows().into_iter().map(|r| r.term).collect()
    }

    pub fn is_used_as_seed(&self, id: i64) -> bool {
        self.rows()
            .into_iter()
            .find(|r| r.id == id)
            .is_some_and(|r| r.is_used_as_seed)
    }
}

fn stored(
    id: i64,
    record: &EnrichedKeyword,
    source_seed: Option<&str>,
    created_at: DateTime<Utc>,
) -> StoredKeyword {
    StoredKeyword {
        id,
        public_id: uuid::Uuid::new_v4(),
        term: record.term().to_string(),
        pc_search_volume: record.candidate.pc_search_volume,
        mobile_search_volume: record.candidate.mobile_search_volume,
        total_search_volume: record.candidate.total_search_volume(),
        competition: record.candidate.competition,
        documents: record.documents,
        total_docs: record.total_docs(),
        potential_score: record.potential_score(),
        is_used_as_seed: false,
        source_seed: source_seed.map(str::to_string),
        created_at,
    }
}

#[async_trait]
impl KeywordStore for MemoryStore {
    async fn insert_many(
        &self,
        source_seed: &str,
        records: &[EnrichedKeyword],
    ) -> Result<usize, StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::backend(Unavailable));
        }
        let mut rows = self.rows.lock().expect("store lock");
        let now = Utc::now();
        for record in records {
            let id = i64::try_from(rows.len()).expect("small test store") + 1;
            rows.push(stored(id, record, Some(source_seed), now));
        }
        Ok(records.len())
    }

    async fn terms_seen_since(
        &self,
        terms: &[String],
        since: DateTime<Utc>,
    ) -> Result<HashSet<String>, StoreError> {
        self.history_queries.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::backend(Unavailable));
        }
        let wanted: HashSet<String> = terms.iter().map(|t| term_key(t)).collect();
        Ok(self
            .rows
            .lock()
            .expect("store lock")
            .iter()
            .filter(|r| r.created_at >= since && wanted.contains(&term_key(&r.term)))
            .map(|r| r.term.clone())
            .collect())
    }

    async fn set_flag(&self, id: i64, flag: KeywordFlag, value: bool) -> Result<(), StoreError> {
        let mut rows = self.rows.lock().expect("store lock");
        let row = rows
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        match flag {
            KeywordFlag::UsedAsSeed => row.is_used_as_seed = value,
        }
        Ok(())
    }

    async fn set_flag_by_term(
        &self,
        term: &str,
        flag: KeywordFlag,
        value: bool,
    ) -> Result<u64, StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::backend(Unavailable));
        }
        let key = term_key(term);
        let mut changed = 0;
        for row in self.rows.lock().expect("store lock").iter_mut() {
            if term_key(&row.term) == key {
                match flag {
                    KeywordFlag::UsedAsSeed => row.is_used_as_seed = value,
                }
                changed += 1;
            }
        }
        Ok(changed)
    }

    async fn top_by_volume(
        &self,
        limit: i64,
        exclude_used_as_seed: bool,
    ) -> Result<Vec<StoredKeyword>, StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::backend(Unavailable));
        }
        let mut rows: Vec<StoredKeyword> = self
            .rows()
            .into_iter()
            .filter(|r| !(exclude_used_as_seed && r.is_used_as_seed))
            .collect();
        rows.sort_by(|a, b| b.total_search_volume.cmp(&a.total_search_volume));
        rows.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(rows)
    }

    async fn list_keywords(
        &self,
        limit: i64,
        sort: KeywordSort,
    ) -> Result<Vec<StoredKeyword>, StoreError> {
        let mut rows = self.rows();
        match sort {
            KeywordSort::Volume => {
                rows.sort_by(|a, b| b.total_search_volume.cmp(&a.total_search_volume));
            }
            KeywordSort::Potential => {
                rows.sort_by(|a, b| b.potential_score.total_cmp(&a.potential_score));
            }
            KeywordSort::Recent => rows.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        }
        rows.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(rows)
    }
}
