use devops_console::core::adapters::rest::RestError;
use devops_console::core::adapters::AdapterKind;
use devops_console::core::error::{AppError, CANCELLED_MESSAGE};
use devops_console::core::types::{ErrorCategory, ErrorSeverity};

#[test]
fn test_error_creation_all_categories() {
    let categories = vec![
        ErrorCategory::AdapterNotInitialized,
        ErrorCategory::MissingArgument,
        ErrorCategory::InvalidArgumentFormat,
        ErrorCategory::ToolNotFound,
        ErrorCategory::ExternalCallFailure,
        ErrorCategory::ParseFailure,
        ErrorCategory::TimeoutError,
        ErrorCategory::Cancelled,
        ErrorCategory::ValidationError,
        ErrorCategory::IoError,
        ErrorCategory::InternalError,
    ];

    for category in categories {
        let error = AppError::new(category, "test message");
        assert_eq!(error.category, category);
        assert_eq!(error.message, "test message");
        assert!(error.context.is_empty());
        assert!(error.occurred_at <= chrono::Utc::now());
        assert!(error.source.is_none());
    }
}

#[test]
fn test_severity_by_category() {
    assert_eq!(
        AppError::new(ErrorCategory::ExternalCallFailure, "x").severity(),
        ErrorSeverity::Error
    );
    assert_eq!(
        AppError::new(ErrorCategory::ToolNotFound, "x").severity(),
        ErrorSeverity::Warning
    );
    assert_eq!(
        AppError::new(ErrorCategory::Cancelled, "x").severity(),
        ErrorSeverity::Info
    );
}

#[test]
fn test_cancelled_error_message() {
    let error = AppError::cancelled();
    assert!(error.is_cancelled());
    assert_eq!(error.message, CANCELLED_MESSAGE);
    assert_eq!(error.message, "Command cancelled");
    assert_eq!(error.code, "CANCELLED");
}

#[test]
fn test_display_includes_code_category_and_context() {
    let mut error = AppError::new(ErrorCategory::IoError, "disk full").with_code("HISTORY-002");
    error.add_context("dir", "/tmp/devops-history");
    let rendered = error.to_string();
    assert!(rendered.starts_with("[HISTORY-002] IoError: disk full"));
    assert!(rendered.contains("/tmp/devops-history"));
}

#[test]
fn test_with_source_keeps_cause() {
    let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
    let error = AppError::with_source(ErrorCategory::IoError, "cannot write", Box::new(io));
    assert!(error.source.is_some());
    assert!(error.to_string().contains("Caused by: denied"));
}

#[test]
fn test_io_error_conversion() {
    let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
    let error: AppError = io.into();
    assert_eq!(error.category, ErrorCategory::IoError);
    assert_eq!(error.code, "IO_ERROR");
}

#[test]
fn test_anyhow_conversion_is_internal() {
    let error: AppError = anyhow::anyhow!("boom").into();
    assert_eq!(error.category, ErrorCategory::InternalError);
    assert_eq!(error.message, "boom");
}

#[test]
fn test_rest_errors_map_to_http_codes() {
    let cases = [
        (
            RestError::Network {
                context: "GitHub API request".to_string(),
                message: "connection refused".to_string(),
            },
            ErrorCategory::ExternalCallFailure,
            "HTTP-001",
        ),
        (
            RestError::Status {
                context: "Build status request".to_string(),
                status: 404,
            },
            ErrorCategory::ExternalCallFailure,
            "HTTP-002",
        ),
        (
            RestError::Deserialization {
                context: "Queue request".to_string(),
                message: "expected value".to_string(),
            },
            ErrorCategory::ParseFailure,
            "HTTP-003",
        ),
        (
            RestError::Timeout {
                context: "Build log request".to_string(),
            },
            ErrorCategory::TimeoutError,
            "HTTP-004",
        ),
    ];

    for (rest, category, code) in cases {
        let error: AppError = rest.into();
        assert_eq!(error.category, category);
        assert_eq!(error.code, code);
    }
}

#[test]
fn test_status_error_text() {
    let error: AppError = RestError::Status {
        context: "Build status request".to_string(),
        status: 404,
    }
    .into();
    assert_eq!(error.message, "Build status request failed with status: 404");
}

#[test]
fn test_adapter_not_initialized_messages() {
    let expected = [
        (AdapterKind::SonarQube, "SonarQube service not initialized"),
        (AdapterKind::Trivy, "Trivy service not initialized"),
        (AdapterKind::Jenkins, "Jenkins service not initialized"),
        (AdapterKind::GitHub, "GitHub service not initialized"),
    ];
    for (kind, message) in expected {
        let error = kind.not_initialized();
        assert_eq!(error.category, ErrorCategory::AdapterNotInitialized);
        assert_eq!(error.message, message);
    }
}
