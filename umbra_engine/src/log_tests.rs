//! Unit tests for log.rs
//!
//! Tests LogSeverity, LogEntry, DefaultLogger formatting and the error-building macros.

use crate::log::{DefaultLogger, LogEntry, LogSeverity, Logger};
use crate::umbra::Error;
use std::time::SystemTime;

// ============================================================================
// LOG SEVERITY TESTS
// ============================================================================

#[test]
fn test_log_severity_ordering() {
    assert!(LogSeverity::Trace < LogSeverity::Debug);
    assert!(LogSeverity::Debug < LogSeverity::Info);
    assert!(LogSeverity::Info < LogSeverity::Warn);
    assert!(LogSeverity::Warn < LogSeverity::Error);
}

#[test]
fn test_log_severity_debug() {
    assert_eq!(format!("{:?}", LogSeverity::Trace), "Trace");
    assert_eq!(format!("{:?}", LogSeverity::Error), "Error");
}

// ============================================================================
// LOG ENTRY TESTS
// ============================================================================

#[test]
fn test_log_entry_creation_with_file_line() {
    let entry = LogEntry {
        severity: LogSeverity::Error,
        timestamp: SystemTime::now(),
        source: "umbra::vulkan".to_string(),
        message: "Vulkan error".to_string(),
        file: Some("vulkan_device.rs"),
        line: Some(42),
    };

    assert_eq!(entry.severity, LogSeverity::Error);
    assert_eq!(entry.file, Some("vulkan_device.rs"));
    assert_eq!(entry.line, Some(42));
}

// ============================================================================
// DEFAULT LOGGER TESTS
// ============================================================================

#[test]
fn test_format_plain_without_location() {
    let entry = LogEntry {
        severity: LogSeverity::Info,
        timestamp: SystemTime::now(),
        source: "umbra::vulkan".to_string(),
        message: "Selected GPU: test".to_string(),
        file: None,
        line: None,
    };

    let text = DefaultLogger::format_plain(&entry);
    assert!(text.contains("[INFO ]"));
    assert!(text.contains("[umbra::vulkan]"));
    assert!(text.ends_with("Selected GPU: test"));
}

#[test]
fn test_format_plain_with_location() {
    let entry = LogEntry {
        severity: LogSeverity::Error,
        timestamp: SystemTime::now(),
        source: "umbra::asset".to_string(),
        message: "bad mesh".to_string(),
        file: Some("mesh.rs"),
        line: Some(7),
    };

    let text = DefaultLogger::format_plain(&entry);
    assert!(text.contains("[ERROR]"));
    assert!(text.ends_with("bad mesh (mesh.rs:7)"));
}

#[test]
fn test_default_logger_does_not_panic() {
    let logger = DefaultLogger;
    for severity in [
        LogSeverity::Trace,
        LogSeverity::Debug,
        LogSeverity::Info,
        LogSeverity::Warn,
        LogSeverity::Error,
    ] {
        logger.log(&LogEntry {
            severity,
            timestamp: SystemTime::now(),
            source: "umbra::test".to_string(),
            message: "message".to_string(),
            file: None,
            line: None,
        });
    }
}

// ============================================================================
// MACRO TESTS
// ============================================================================

fn bail_when(flag: bool) -> crate::umbra::Result<u32> {
    if flag {
        crate::engine_bail!("umbra::test", "bailed with {}", 3);
    }
    Ok(1)
}

#[test]
fn test_engine_err_builds_backend_error() {
    let err = crate::engine_err!("umbra::test", "failed: {}", "reason");
    match err {
        Error::BackendError(msg) => assert_eq!(msg, "failed: reason"),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn test_engine_bail_returns_early() {
    assert_eq!(bail_when(false).unwrap(), 1);
    match bail_when(true) {
        Err(Error::BackendError(msg)) => assert_eq!(msg, "bailed with 3"),
        other => panic!("unexpected result: {:?}", other),
    }
}
