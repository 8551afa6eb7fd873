use axum::{extract::Request, http::{StatusCode, HeaderValue}, middleware::Next, response::{IntoResponse, Response}, Json};
use once_cell::sync::Lazy;
use prometheus::{IntCounter, IntCounterVec, IntGauge, Opts};
use serde::Serialize;
use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;
use uuid::Uuid;

pub const ERROR_CODE_HEADER: &str = "X-Error-Code";

#[derive(Serialize, Debug)]
pub struct ErrorBody {
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")] pub trace_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")] pub message: Option<String>,
}

#[derive(Debug)]
pub enum ApiError {
    BadRequest { code: &'static str, trace_id: Option<Uuid>, message: Option<String> },
    Unauthorized { code: &'static str, trace_id: Option<Uuid> },
    PaymentDeclined { code: &'static str, trace_id: Option<Uuid>, message: Option<String> },
    NotFound { code: &'static str, trace_id: Option<Uuid> },
    Conflict { code: &'static str, trace_id: Option<Uuid>, message: Option<String> },
    BadGateway { code: &'static str, trace_id: Option<Uuid>, message: Option<String> },
    Internal { trace_id: Option<Uuid>, message: Option<String> },
}

impl ApiError {
    pub fn internal<E: std::fmt::Display>(e: E, trace_id: Option<Uuid>) -> Self { Self::Internal { trace_id, message: Some(e.to_string()) } }
    pub fn bad_request(code: &'static str, trace_id: Option<Uuid>) -> Self { Self::BadRequest { code, trace_id, message: None } }
    pub fn not_found(code: &'static str, trace_id: Option<Uuid>) -> Self { Self::NotFound { code, trace_id } }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, trace_id, message) = match self {
            ApiError::BadRequest { code, trace_id, message } => (StatusCode::BAD_REQUEST, code, trace_id, message),
            ApiError::Unauthorized { code, trace_id } => (StatusCode::UNAUTHORIZED, code, trace_id, None),
            ApiError::PaymentDeclined { code, trace_id, message } => (StatusCode::PAYMENT_REQUIRED, code, trace_id, message),
            ApiError::NotFound { code, trace_id } => (StatusCode::NOT_FOUND, code, trace_id, None),
            ApiError::Conflict { code, trace_id, message } => (StatusCode::CONFLICT, code, trace_id, message),
            ApiError::BadGateway { code, trace_id, message } => (StatusCode::BAD_GATEWAY, code, trace_id, message),
            ApiError::Internal { trace_id, message } => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", trace_id, message),
        };
        let body = ErrorBody { code: code.into(), trace_id, message };
        let mut resp = (status, Json(body)).into_response();
        if let Ok(val) = HeaderValue::from_str(code) {
            resp.headers_mut().insert(ERROR_CODE_HEADER, val);
        }
        resp
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

// Guard against unbounded label cardinality from dynamic error codes.
const MAX_ERROR_CODES: usize = 40;
const OVERFLOW_LABEL: &str = "other";

static HTTP_ERRORS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let counter = IntCounterVec::new(
        Opts::new("http_errors_total", "Count of HTTP error responses emitted (status >= 400)"),
        &["service", "code", "status"],
    ).expect("http_errors_total definition");
    let _ = prometheus::default_registry().register(Box::new(counter.clone()));
    counter
});

static ERROR_CODES_DISTINCT: Lazy<IntGauge> = Lazy::new(|| {
    let gauge = IntGauge::new("http_error_codes_distinct", "Distinct error codes used as metric labels").expect("gauge definition");
    let _ = prometheus::default_registry().register(Box::new(gauge.clone()));
    gauge
});

static ERROR_CODE_OVERFLOW: Lazy<IntCounter> = Lazy::new(|| {
    let counter = IntCounter::new("http_error_code_overflow_total", "Error codes folded into the overflow label").expect("counter definition");
    let _ = prometheus::default_registry().register(Box::new(counter.clone()));
    counter
});

static SEEN_CODES: Lazy<Mutex<HashSet<String>>> = Lazy::new(|| Mutex::new(HashSet::new()));

fn label_for_code(code: &str) -> String {
    let mut seen = SEEN_CODES.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    if seen.contains(code) {
        return code.to_string();
    }
    if seen.len() < MAX_ERROR_CODES {
        seen.insert(code.to_string());
        ERROR_CODES_DISTINCT.set(seen.len() as i64);
        return code.to_string();
    }
    ERROR_CODE_OVERFLOW.inc();
    OVERFLOW_LABEL.to_string()
}

pub fn record_http_error(service: &str, code: &str, status: u16) {
    let label = label_for_code(code);
    HTTP_ERRORS_TOTAL.with_label_values(&[service, &label, &status.to_string()]).inc();
}

type MiddlewareFuture = Pin<Box<dyn Future<Output = Response> + Send + 'static>>;

/// Middleware counting error responses by their `X-Error-Code` header.
pub fn http_error_metrics_layer(
    service: &'static str,
) -> impl Fn(Request, Next) -> MiddlewareFuture + Clone + Send + Sync + 'static {
    move |req: Request, next: Next| -> MiddlewareFuture {
        Box::pin(async move {
            let resp = next.run(req).await;
            let status = resp.status();
            if status.as_u16() >= 400 {
                let code = resp
                    .headers()
                    .get(ERROR_CODE_HEADER)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("unknown")
                    .to_string();
                record_http_error(service, &code, status.as_u16());
            }
            resp
        })
    }
}

#[doc(hidden)]
pub mod test_helpers {
    pub fn simulate_error_code(code: &str) { super::record_http_error("test", code, 400); }
    pub fn distinct_gauge() -> i64 { super::ERROR_CODES_DISTINCT.get() }
    pub fn overflow_count() -> u64 { super::ERROR_CODE_OVERFLOW.get() }
}
