//! `DedupGate` history window and fail-open behaviour.

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use chrono::{Duration, Utc};
use common::{enriched, MemoryStore};
use kwdb_research::DedupGate;

#[tokio::test]
async fn term_seen_within_window_is_filtered() {
    let store = Arc::new(MemoryStore::new());
    let now = Utc::now();
    store.seed_history("x", 100, now - Duration::days(5));

    let gate = DedupGate::new(store.clone(), 30);
    let outcome = gate.filter_at(vec![enriched("x", 100)], now).await;
    assert!(outcome.fresh.is_empty());
    assert_eq!(outcome.duplicates, 1);

    let gate = DedupGate::new(store, 3);
    let outcome = gate.filter_at(vec![enriched("x", 100)], now).await;
    assert_eq!(outcome.fresh.len(), 1);
    assert_eq!(outcome.fresh[0].term(), "x");
    assert_eq!(outcome.duplicates, 0);
}

#[tokio::test]
async fn comparison_ignores_case_and_spacing() {
    let store = Arc::new(MemoryStore::new());
    let now = Utc::now();
    store.seed_history("Digital Marketing", 100, now - Duration::days(1));

    let gate = DedupGate::new(store, 30);
    let outcome = gate
        .filter_at(
            vec![enriched("digitalmarketing", 10), enriched("seo", 10)],
            now,
        )
        .await;

    let terms: Vec<&str> = outcome.fresh.iter().map(|r| r.term()).collect();
    assert_eq!(terms, vec!["seo"]);
}

#[tokio::test]
async fn filtering_is_idempotent_against_unchanged_history() {
    let store = Arc::new(MemoryStore::new());
    let now = Utc::now();
    store.seed_history("b", 1, now - Duration::days(2));
    store.seed_history("d", 1, now - Duration::days(40));

    let gate = DedupGate::new(store, 30);
    let candidates = vec![
        enriched("a", 1),
        enriched("b", 1),
        enriched("c", 1),
        enriched("d", 1),
    ];

    let first = gate.filter_at(candidates.clone(), now).await;
    let second = gate.filter_at(candidates, now).await;

    assert_eq!(first, second);
    let terms: Vec<&str> = first.fresh.iter().map(|r| r.term()).collect();
    assert_eq!(terms, vec!["a", "c", "d"]);
}

#[tokio::test]
async fn history_failure_passes_everything_through() {
    let store = Arc::new(MemoryStore::new());
    store.seed_history("x", 1, Utc::now());
    store.fail_reads.store(true, Ordering::SeqCst);

    let gate = DedupGate::new(store, 30);
    let outcome = gate.filter(vec![enriched("x", 1), enriched("y", 1)]).await;

    assert!(outcome.failed_open);
    assert_eq!(outcome.fresh.len(), 2);
    assert_eq!(outcome.duplicates, 0);
}

#[tokio::test]
async fn empty_input_skips_the_history_lookup() {
    let store = Arc::new(MemoryStore::new());
    let gate = DedupGate::new(store.clone(), 30);

    let outcome = gate.filter(Vec::new()).await;

    assert!(outcome.fresh.is_empty());
    assert_eq!(store.history_queries.load(Ordering::SeqCst), 0);
}
