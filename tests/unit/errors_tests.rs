/*!
 * Tests for error types
 */

use std::time::Duration;

use narrasync::errors::{AppError, AudioError, DocumentError, ProviderError};

/// Test provider error messages
#[test]
fn test_provider_error_display_shouldIncludeDetails() {
    let error = ProviderError::ApiError {
        status_code: 429,
        message: "quota exceeded".to_string(),
    };
    assert_eq!(error.to_string(), "API responded with error: 429 - quota exceeded");

    let error = ProviderError::Timeout(Duration::from_secs(300));
    assert_eq!(error.to_string(), "Request timed out after 300s");
}

/// Test conversion of nested errors into the application error
#[test]
fn test_app_error_from_withNestedErrors_shouldWrapThem() {
    let error: AppError = DocumentError::DuplicateStepId("s1".to_string()).into();
    assert!(matches!(error, AppError::Document(DocumentError::DuplicateStepId(_))));
    assert!(error.to_string().contains("s1"));

    let error: AppError = AudioError::NoClips.into();
    assert!(matches!(error, AppError::Audio(AudioError::NoClips)));

    let error: AppError = anyhow::anyhow!("boom").into();
    assert!(matches!(error, AppError::Unknown(ref message) if message == "boom"));
}

/// Test that JSON syntax errors become malformed documents
#[test]
fn test_document_error_from_withJsonError_shouldBeMalformed() {
    let json_error = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
    let error: DocumentError = json_error.into();
    assert!(matches!(error, DocumentError::Malformed(_)));
}
