//! Tests for error types

use std::path::PathBuf;

use runlog::Error;

#[test]
fn test_configuration_error() {
    let error = Error::Configuration("tracking_uri is required".to_string());
    let error_str = format!("{error}");
    assert!(error_str.contains("Configuration error"));
    assert!(error_str.contains("tracking_uri"));
}

#[test]
fn test_not_found_error_names_path() {
    let error = Error::NotFound {
        path: PathBuf::from("/tmp/missing-artifacts"),
    };
    assert_eq!(format!("{error}"), "Not found: /tmp/missing-artifacts");
}

#[test]
fn test_git_metadata_error() {
    let error = Error::GitMetadata {
        path: PathBuf::from("/srv/checkout"),
        message: "not a git repository root".to_string(),
    };
    let error_str = format!("{error}");
    assert!(error_str.contains("/srv/checkout"));
    assert!(error_str.contains("not a git repository root"));
}

#[test]
fn test_no_active_run_error() {
    let error = Error::NoActiveRun;
    assert!(format!("{error}").contains("start_run"));
}

#[test]
fn test_tracking_error() {
    let error = Error::Tracking {
        status: 400,
        error_code: "INVALID_PARAMETER_VALUE".to_string(),
        message: "Param 'lr' already logged".to_string(),
    };
    let error_str = format!("{error}");
    assert!(error_str.contains("400"));
    assert!(error_str.contains("INVALID_PARAMETER_VALUE"));
    assert!(error_str.contains("already logged"));
    assert!(!error.is_resource_missing());
}

#[test]
fn test_resource_missing_detection() {
    let by_status = Error::Tracking {
        status: 404,
        error_code: "UNKNOWN".to_string(),
        message: String::new(),
    };
    let by_code = Error::Tracking {
        status: 400,
        error_code: "RESOURCE_DOES_NOT_EXIST".to_string(),
        message: String::new(),
    };
    assert!(by_status.is_resource_missing());
    assert!(by_code.is_resource_missing());
    assert!(!Error::NoActiveRun.is_resource_missing());
}

#[test]
fn test_io_error_conversion() {
    let io_error = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
    let error: Error = io_error.into();
    assert!(format!("{error}").contains("IO error"));
}

#[test]
fn test_error_debug() {
    let error = Error::NoActiveRun;
    let debug_str = format!("{error:?}");
    assert!(debug_str.contains("NoActiveRun"));
}

#[test]
fn test_result_type_alias_error() {
    fn returns_error() -> runlog::Result<i32> {
        Err(Error::InvalidInput("metric name must not be empty".to_string()))
    }

    let result = returns_error();
    assert!(result.is_err());
}
