//! Integration tests for the logging system
//!
//! These tests replace the global logger, so they run serially.
//! No GPU required.
//!
//! Run with: cargo test --test logging_integration_tests

use umbra_engine::umbra::log::{self, LogEntry, LogSeverity, Logger};
use umbra_engine::umbra::asset::assemble_mesh;
use umbra_engine::umbra::Error;
use std::sync::{Arc, Mutex};
use serial_test::serial;

// ============================================================================
// TEST LOGGER IMPLEMENTATION
// ============================================================================

/// Test logger that captures log entries for verification
struct TestLogger {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl TestLogger {
    fn new() -> (Self, Arc<Mutex<Vec<LogEntry>>>) {
        let entries = Arc::new(Mutex::new(Vec::new()));
        (Self { entries: entries.clone() }, entries)
    }
}

impl Logger for TestLogger {
    fn log(&self, entry: &LogEntry) {
        self.entries.lock().unwrap().push(entry.clone());
    }
}

// ============================================================================
// LOGGING TESTS
// ============================================================================

#[test]
#[serial]
fn test_integration_custom_logger() {
    let (test_logger, entries) = TestLogger::new();
    log::set_logger(test_logger);

    log::log(LogSeverity::Info, "test::module", "Test info message".to_string());
    log::log(LogSeverity::Warn, "test::module", "Test warning message".to_string());

    {
        let captured = entries.lock().unwrap();
        assert_eq!(captured.len(), 2);
        assert_eq!(captured[0].severity, LogSeverity::Info);
        assert_eq!(captured[0].message, "Test info message");
        assert_eq!(captured[1].severity, LogSeverity::Warn);
        assert!(captured[1].file.is_none());
    }

    log::reset_logger();
}

#[test]
#[serial]
fn test_integration_error_logging_with_location() {
    let (test_logger, entries) = TestLogger::new();
    log::set_logger(test_logger);

    log::log_detailed(
        LogSeverity::Error,
        "test::error",
        "Critical error occurred".to_string(),
        "test_file.rs",
        42,
    );

    {
        let captured = entries.lock().unwrap();
        assert_eq!(captured.len(), 1);
        assert_eq!(captured[0].file, Some("test_file.rs"));
        assert_eq!(captured[0].line, Some(42));
    }

    log::reset_logger();
}

#[test]
#[serial]
fn test_integration_macros_route_to_logger() {
    let (test_logger, entries) = TestLogger::new();
    log::set_logger(test_logger);

    umbra_engine::engine_trace!("test::macro", "trace {}", 1);
    umbra_engine::engine_debug!("test::macro", "debug {}", 2);
    umbra_engine::engine_info!("test::macro", "info {}", 3);
    umbra_engine::engine_warn!("test::macro", "warn {}", 4);
    umbra_engine::engine_error!("test::macro", "error {}", 5);
    let err = umbra_engine::engine_err!("test::macro", "err {}", 6);

    {
        let captured = entries.lock().unwrap();
        let severities: Vec<LogSeverity> = captured.iter().map(|e| e.severity).collect();
        assert_eq!(
            severities,
            vec![
                LogSeverity::Trace,
                LogSeverity::Debug,
                LogSeverity::Info,
                LogSeverity::Warn,
                LogSeverity::Error,
                LogSeverity::Error,
            ]
        );
        assert_eq!(captured[2].message, "info 3");
        assert!(captured[4].file.is_some());
        assert!(captured[5].line.is_some());
    }
    assert!(matches!(err, Error::BackendError(ref msg) if msg == "err 6"));

    log::reset_logger();
}

#[test]
#[serial]
fn test_integration_rejected_mesh_is_logged() {
    let (test_logger, entries) = TestLogger::new();
    log::set_logger(test_logger);

    assert!(assemble_mesh(Vec::new()).is_err());

    {
        let captured = entries.lock().unwrap();
        assert!(captured
            .iter()
            .any(|e| e.severity == LogSeverity::Error && e.source == "umbra::asset"));
    }

    log::reset_logger();
}

#[test]
#[serial]
fn test_integration_logger_reset() {
    let (test_logger, entries) = TestLogger::new();
    log::set_logger(test_logger);
    log::log(LogSeverity::Info, "test", "Message 1".to_string());
    log::reset_logger();

    // Goes to the default logger, not captured
    log::log(LogSeverity::Info, "test", "Message 2".to_string());

    assert_eq!(entries.lock().unwrap().len(), 1);
}
