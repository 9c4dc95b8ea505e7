use super::*;

#[test]
fn timeouts_are_retryable() {
    let err = FetchError::Timeout { secs: 15, path: "/api/chat/messages/4?page=2".to_owned() };
    assert!(err.retryable());
    assert_eq!(err.to_string(), "timed out after 15s waiting for /api/chat/messages/4?page=2");
}

#[test]
fn server_errors_are_retryable_client_errors_are_not() {
    let server = FetchError::Status { status: 503, path: "/api/chat/users".to_owned() };
    let throttled = FetchError::Status { status: 429, path: "/api/chat/users".to_owned() };
    let missing = FetchError::Status { status: 404, path: "/api/chat/users".to_owned() };
    assert!(server.retryable());
    assert!(throttled.retryable());
    assert!(!missing.retryable());
}
