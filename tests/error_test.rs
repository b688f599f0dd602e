//! Tests for error types

use runlog::Error;

#[test]
fn test_run_id_collision_error() {
    let error = Error::RunIdCollision("quiet-amber-falcon-3f9c0a".to_string());
    let error_str = format!("{error}");
    assert!(error_str.contains("Run identifier collision"));
    assert!(error_str.contains("quiet-amber-falcon-3f9c0a"));
    assert!(error_str.contains("Start a new run"));
}

#[test]
fn test_run_not_found_error() {
    let error = Error::RunNotFound("missing-run".to_string());
    assert_eq!(format!("{error}"), "Run not found: missing-run");
    assert!(error.is_not_found());
}

#[test]
fn test_no_runs_error() {
    let error = Error::NoRuns;
    assert_eq!(format!("{error}"), "No runs recorded yet");
    assert!(error.is_not_found());
}

#[test]
fn test_missing_metadata_error() {
    let error = Error::MissingMetadata {
        run: "calm-oak-1".to_string(),
        key: "git_commit".to_string(),
    };
    let error_str = format!("{error}");
    assert!(error_str.contains("calm-oak-1"));
    assert!(error_str.contains("git_commit"));
    assert!(!error.is_not_found());
}

#[test]
fn test_schema_mismatch_error() {
    let error = Error::SchemaMismatch {
        expected: "loss, step".to_string(),
        found: "accuracy, step".to_string(),
    };
    let error_str = format!("{error}");
    assert!(error_str.contains("Schema mismatch"));
    assert!(error_str.contains("[loss, step]"));
    assert!(error_str.contains("[accuracy, step]"));
}

#[test]
fn test_already_started_error() {
    let error = Error::AlreadyStarted;
    assert!(format!("{error}").contains("already started"));
}

#[test]
fn test_io_error_conversion() {
    let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
    let error: Error = io_error.into();
    let error_str = format!("{error}");
    assert!(error_str.contains("IO error"));
    assert!(error_str.contains("file not found"));
    assert!(!error.is_not_found());
}

#[test]
fn test_sqlite_error_conversion() {
    let error: Error = rusqlite::Error::QueryReturnedNoRows.into();
    assert!(format!("{error}").starts_with("Registry error"));
}

#[test]
fn test_json_error_conversion() {
    let json_error = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
    let error: Error = json_error.into();
    assert!(format!("{error}").starts_with("JSON error"));
}

#[test]
fn test_error_debug_format() {
    let error = Error::RunNotFound("debug-test".to_string());
    let debug_str = format!("{error:?}");
    assert!(debug_str.contains("RunNotFound"));
}

#[test]
fn test_step_out_of_range_error() {
    let error = Error::StepOutOfRange(u64::MAX);
    let error_str = format!("{error}");
    assert!(error_str.contains(&u64::MAX.to_string()));
    assert!(error_str.contains(&i64::MAX.to_string()));
}
