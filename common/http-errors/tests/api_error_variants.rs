use common_http_errors::ApiError;
use axum::response::IntoResponse;
use axum::http::StatusCode;
use axum::body::to_bytes;
use uuid::Uuid;

#[test]
fn bad_request_variant() {
    let err = ApiError::BadRequest { code: "malformed_callback", trace_id: None, message: None };
    let resp = err.into_response();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(resp.headers().get("X-Error-Code").unwrap(), "malformed_callback");
}

#[test]
fn unauthorized_variant() {
    let err = ApiError::Unauthorized { code: "invalid_signature", trace_id: None };
    let resp = err.into_response();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(resp.headers().get("X-Error-Code").unwrap(), "invalid_signature");
}

#[test]
fn payment_declined_variant() {
    let err = ApiError::PaymentDeclined { code: "gateway_error", trace_id: None, message: Some("declined".into()) };
    let resp = err.into_response();
    assert_eq!(resp.status(), StatusCode::PAYMENT_REQUIRED);
    assert_eq!(resp.headers().get("X-Error-Code").unwrap(), "gateway_error");
}

#[test]
fn not_found_variant() {
    let err = ApiError::NotFound { code: "missing_resource", trace_id: None };
    let resp = err.into_response();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(resp.headers().get("X-Error-Code").unwrap(), "missing_resource");
}

#[test]
fn conflict_variant() {
    let err = ApiError::Conflict { code: "stale_callback", trace_id: None, message: None };
    let resp = err.into_response();
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    assert_eq!(resp.headers().get("X-Error-Code").unwrap(), "stale_callback");
}

#[test]
fn bad_gateway_variant() {
    let err = ApiError::BadGateway { code: "communication_failure", trace_id: None, message: None };
    let resp = err.into_response();
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
}

#[test]
fn internal_variant() {
    let trace = Some(Uuid::new_v4());
    let err = ApiError::Internal { trace_id: trace, message: Some("boom".into()) };
    let resp = err.into_response();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(resp.headers().get("X-Error-Code").unwrap(), "internal_error");
}

#[tokio::test]
async fn body_carries_code_and_message() {
    let err = ApiError::PaymentDeclined { code: "gateway_error", trace_id: None, message: Some("card expired or blocked".into()) };
    let resp = err.into_response();
    let bytes = to_bytes(resp.into_body(), 1024 * 8).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("\"code\":\"gateway_error\""), "unexpected body: {}", text);
    assert!(text.contains("card expired or blocked"), "unexpected body: {}", text);
    assert!(!text.contains("trace_id"), "unexpected body: {}", text);
}
