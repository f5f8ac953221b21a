//! Unit tests for debug.rs

use super::*;
use serial_test::serial;

#[test]
fn test_validation_stats_total() {
    let stats = ValidationStats { errors: 1, warnings: 2, info: 3, verbose: 4 };
    assert_eq!(stats.total(), 10);
    assert_eq!(ValidationStats::default().total(), 0);
}

#[test]
#[serial]
fn test_track_message_counts_duplicates() {
    reset_validation_stats();
    assert_eq!(track_message("same"), 1);
    assert_eq!(track_message("same"), 2);
    assert_eq!(track_message("other"), 1);
    reset_validation_stats();
    assert_eq!(track_message("same"), 1);
    reset_validation_stats();
}

#[test]
#[serial]
fn test_reset_clears_counters() {
    VALIDATION_STATS.errors.fetch_add(2, Ordering::Relaxed);
    VALIDATION_STATS.warnings.fetch_add(1, Ordering::Relaxed);
    assert!(get_validation_stats().total() >= 3);

    reset_validation_stats();
    assert_eq!(get_validation_stats(), ValidationStats::default());
}

#[test]
#[serial]
fn test_report_does_not_panic() {
    reset_validation_stats();
    print_validation_stats_report();
    VALIDATION_STATS.warnings.fetch_add(1, Ordering::Relaxed);
    track_message("dup");
    track_message("dup");
    print_validation_stats_report();
    reset_validation_stats();
}
