//! `KeywordExpander` behaviour against an in-memory keyword source.

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use common::{search_ad_pool, FakeKeywords};
use kwdb_research::{ExpandOptions, KeywordExpander, KeywordSource};
use kwdb_searchad::ApiError;

fn options(max_rounds: u32, batch_cap: usize, batch_size: usize) -> ExpandOptions {
    ExpandOptions {
        max_rounds,
        batch_cap,
        batch_size,
    }
}

#[tokio::test]
async fn single_round_returns_seed_relations_without_the_seed() {
    let source = Arc::new(
        FakeKeywords::new(search_ad_pool(2, 100)).with_related(
            "marketing",
            &["marketing", "digital marketing", "content marketing", "seo"],
        ),
    );
    let expander = KeywordExpander::new(source.clone(), options(1, 10, 5));

    let expansion = expander.expand("marketing").await.expect("expansion");

    assert_eq!(
        expansion.terms,
        vec!["digital marketing", "content marketing", "seo"]
    );
    assert_eq!(expansion.calls, 1);
    assert_eq!(source.related_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn calls_are_bounded_by_rounds_times_batch_cap() {
    for (rounds, cap) in [(1, 1), (2, 1), (2, 3), (3, 2), (4, 4)] {
        let source = Arc::new(FakeKeywords::new(search_ad_pool(3, 10_000)).generating(5));
        let expander = KeywordExpander::new(source.clone(), options(rounds, cap, 5));

        let expansion = expander.expand("seed").await.expect("expansion");
        let bound = usize::try_from(rounds).expect("small") * cap;

        assert!(
            expansion.calls <= bound,
            "R={rounds} B={cap}: {} calls exceeds bound {bound}",
            expansion.calls
        );
        assert_eq!(source.related_calls.load(Ordering::SeqCst), expansion.calls);
        assert!(
            expansion.round_sizes.windows(2).all(|w| w[0] <= w[1]),
            "round sizes must never shrink: {:?}",
            expansion.round_sizes
        );
        assert_eq!(expansion.round_sizes.last(), Some(&expansion.terms.len()));
    }
}

#[tokio::test]
async fn later_rounds_use_previous_discoveries_as_hints() {
    let source = Arc::new(
        FakeKeywords::new(search_ad_pool(1, 100))
            .with_related("a", &["b", "c"])
            .with_related("b", &["a", "d"])
            .with_related("c", &["e"]),
    );
    let expander = KeywordExpander::new(source, options(3, 10, 5));

    let expansion = expander.expand("a").await.expect("expansion");

    assert_eq!(expansion.terms, vec!["b", "c", "d", "e"]);
    assert_eq!(expansion.round_sizes, vec![2, 4, 4]);
}

#[tokio::test]
async fn stops_when_a_round_discovers_nothing_new() {
    let source = Arc::new(
        FakeKeywords::new(search_ad_pool(1, 100))
            .with_related("a", &["b"])
            .with_related("b", &["a"]),
    );
    let expander = KeywordExpander::new(source.clone(), options(5, 10, 5));

    let expansion = expander.expand("a").await.expect("expansion");

    assert_eq!(expansion.terms, vec!["b"]);
    assert_eq!(source.related_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn failed_batch_is_skipped() {
    let source = Arc::new(
        FakeKeywords::new(search_ad_pool(2, 100))
            .with_related("a", &["b", "c"])
            .with_related("c", &["d"])
            .failing_related("b"),
    );
    let expander = KeywordExpander::new(source, options(2, 10, 1));

    let expansion = expander.expand("a").await.expect("expansion");

    assert_eq!(expansion.terms, vec!["b", "c", "d"]);
    assert_eq!(expansion.failed_batches, 1);
}

#[tokio::test]
async fn seed_round_failure_is_returned() {
    let source = Arc::new(FakeKeywords::new(search_ad_pool(1, 100)).failing_related("a"));
    let expander = KeywordExpander::new(source, options(2, 10, 5));

    let result = expander.expand("a").await;

    assert!(matches!(result, Err(ApiError::ServerError { .. })), "got: {result:?}");
}

#[tokio::test]
async fn empty_pool_reports_no_credentials() {
    let source = Arc::new(FakeKeywords::new(search_ad_pool(0, 100)));
    let expander = KeywordExpander::new(source, options(2, 10, 5));

    let result = expander.expand("a").await;

    assert!(matches!(result, Err(ApiError::NoCredentials { .. })), "got: {result:?}");
}

#[tokio::test]
async fn exhausted_pool_returns_what_was_collected() {
    let source = Arc::new(FakeKeywords::new(search_ad_pool(1, 2)).generating(5));
    let expander = KeywordExpander::new(source.clone(), options(5, 10, 5));

    let expansion = expander.expand("seed").await.expect("partial expansion");

    assert!(expansion.exhausted);
    assert_eq!(expansion.calls, 2);
    // 5 from the seed round plus 5 for each of those 5 hints.
    assert_eq!(expansion.terms.len(), 30);
    assert!(source.pool().select_one().is_none());
}

#[tokio::test]
async fn batches_fan_out_across_credentials() {
    let source = Arc::new(FakeKeywords::new(search_ad_pool(3, 100)).generating(3));
    let expander = KeywordExpander::new(source.clone(), options(2, 10, 1));

    let expansion = expander.expand("seed").await.expect("expansion");

    assert_eq!(expansion.calls, 4);
    let usage: Vec<u32> = source.pool().status().iter().map(|s| s.usage).collect();
    assert_eq!(usage.iter().sum::<u32>(), 4);
    assert!(usage.iter().all(|u| *u >= 1), "every credential used: {usage:?}");
}
