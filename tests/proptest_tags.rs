//! Property-based tests for tag substitution and run statistics.
//!
//! Uses proptest to verify that:
//! - Worker ids render zero-padded and parse back
//! - Resolved templates never keep the worker tag
//! - Templates without tags are left alone
//! - Mean and median stay within the range of the sample

use proptest::prelude::*;
use tracing::info;

use starbench::model::RunStats;
use starbench::util::{TagValues, WORKER_ID_TAG, format_worker_id};

/// Initialize test logging for proptest
fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("info")
        .with_test_writer()
        .try_init();
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 200,
        ..Default::default()
    })]

    /// Property: worker ids have at least three digits and keep their value
    #[test]
    fn worker_id_is_padded_and_parses_back(worker_id in 0usize..100_000) {
        init_test_logging();
        let rendered = format_worker_id(worker_id);
        info!("worker_id_is_padded: {worker_id} -> {rendered}");

        prop_assert!(rendered.len() >= 3);
        prop_assert!(rendered.chars().all(|c| c.is_ascii_digit()));
        prop_assert_eq!(rendered.parse::<usize>().unwrap(), worker_id);
    }

    /// Property: the worker tag is fully replaced wherever it appears
    #[test]
    fn worker_tag_never_survives(
        prefix in "[a-z/_.]{0,12}",
        suffix in "[a-z/_.]{0,12}",
        repeat in 1usize..4,
        worker_id in 0usize..1000,
    ) {
        let template = format!("{prefix}{}{suffix}", WORKER_ID_TAG.repeat(repeat));
        let resolved = TagValues::for_worker(worker_id).apply(&template);

        prop_assert!(!resolved.contains(WORKER_ID_TAG));
        prop_assert_eq!(
            resolved,
            format!("{prefix}{}{suffix}", format_worker_id(worker_id).repeat(repeat))
        );
    }

    /// Property: text without tags resolves to itself
    #[test]
    fn untagged_text_is_unchanged(text in "[^<>]{0,40}", worker_id in 0usize..1000) {
        let resolved = TagValues::for_worker(worker_id).apply(&text);
        prop_assert_eq!(resolved, text);
    }

    /// Property: mean and median lie between min and max
    #[test]
    fn central_values_lie_in_range(durations in prop::collection::vec(0.0f64..1000.0, 1..50)) {
        let stats = RunStats::from_durations(
            durations.iter().enumerate().map(|(id, d)| (id as u64, *d)),
        )
        .unwrap();
        let (min, max) = stats.range();
        let tolerance = 1e-9;

        prop_assert_eq!(stats.num_runs(), durations.len());
        prop_assert!(stats.mean() >= min - tolerance && stats.mean() <= max + tolerance);
        prop_assert!(stats.median() >= min - tolerance && stats.median() <= max + tolerance);
        prop_assert_eq!(stats.stddev().is_some(), durations.len() >= 2);
    }
}
