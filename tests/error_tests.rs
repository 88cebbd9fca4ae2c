// Error handling tests
// Author: kelexine (https://github.com/kelexine)

use axum::http::StatusCode;
use axum::response::IntoResponse;
use glyphcache::error::CacheError;

#[test]
fn test_error_display_messages() {
    let errors = vec![
        CacheError::Config("capacity must be greater than 0".to_string()),
        CacheError::InvalidKey("expected 32 bytes, got 3".to_string()),
        CacheError::InvalidRequest("bad ttl".to_string()),
        CacheError::Internal("poisoned".to_string()),
    ];

    for error in errors {
        let display = format!("{}", error);
        assert!(!display.is_empty(), "Error should have display message");
    }
}

#[test]
fn test_invalid_key_error() {
    let error = CacheError::InvalidKey("expected 32 bytes, got 5".to_string());
    assert!(format!("{}", error).contains("expected 32 bytes"));
}

#[test]
fn test_key_computation_wraps_serde_error() {
    let serde_error = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
    let error: CacheError = serde_error.into();
    assert!(format!("{}", error).starts_with("Key computation failed"));
}

#[test]
fn test_status_codes() {
    assert_eq!(
        CacheError::InvalidKey("x".to_string()).into_response().status(),
        StatusCode::BAD_REQUEST
    );
    assert_eq!(
        CacheError::InvalidRequest("x".to_string()).into_response().status(),
        StatusCode::BAD_REQUEST
    );
    assert_eq!(
        CacheError::Config("x".to_string()).into_response().status(),
        StatusCode::INTERNAL_SERVER_ERROR
    );
}
