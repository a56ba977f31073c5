//! Unit tests for perf module.

use crate::helpers::*;
use apz_dnd::perf::{LatencyStats, ScopedTimer};
use std::time::Duration;

#[test]
fn test_scoped_timer_creation() {
    // High threshold: dropping must not warn or panic.
    let _timer = ScopedTimer::new("test_op", 1000.0);
}

#[test]
fn test_p95_picks_slow_tail() {
    let mut stats = LatencyStats::new();
    for _ in 0..95 {
        stats.record(Duration::from_millis(1));
    }
    for _ in 0..5 {
        stats.record(Duration::from_millis(40));
    }
    assert!((stats.p95() - 40.0).abs() < 0.001);
    assert!(stats.average() < 3.0);
}

#[test]
fn test_router_records_acknowledgements() {
    let (mut router, sink) = router();
    for event in external_drop_sequence() {
        router.handle(event);
    }
    let stats = router.latency_stats();
    assert_eq!(stats.count(), sink.len() as u64);
    assert!(stats.max() >= stats.average());
}
