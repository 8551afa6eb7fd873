use anyhow::Result;
use axum::body::Body;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::Response;
use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};

#[derive(Clone)]
pub struct PaymentMetrics {
    registry: Registry,
    callbacks: IntCounterVec,
    requests_signed: IntCounterVec,
}

impl PaymentMetrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();
        let callbacks = IntCounterVec::new(
            Opts::new(
                "datatrans_callbacks_total",
                "Gateway callbacks grouped by endpoint and outcome",
            ),
            &["endpoint", "outcome"],
        )?;
        let requests_signed = IntCounterVec::new(
            Opts::new(
                "datatrans_requests_signed_total",
                "Signed gateway requests grouped by security level",
            ),
            &["level"],
        )?;
        registry.register(Box::new(callbacks.clone()))?;
        registry.register(Box::new(requests_signed.clone()))?;
        Ok(Self {
            registry,
            callbacks,
            requests_signed,
        })
    }

    pub fn record_callback(&self, endpoint: &str, outcome: &str) {
        self.callbacks.with_label_values(&[endpoint, outcome]).inc();
    }

    pub fn record_signed_request(&self, level: u8) {
        self.requests_signed
            .with_label_values(&[&level.to_string()])
            .inc();
    }

    pub fn callback_count(&self, endpoint: &str, outcome: &str) -> u64 {
        self.callbacks.with_label_values(&[endpoint, outcome]).get()
    }

    /// Service counters plus the process-wide default registry (HTTP error counters).
    pub fn render(&self) -> Result<Response> {
        let encoder = TextEncoder::new();
        let mut metric_families = self.registry.gather();
        metric_families.extend(prometheus::gather());
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        let response = Response::builder()
            .status(StatusCode::OK)
            .header(
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/plain; version=0.0.4"),
            )
            .body(Body::from(buffer))?;
        Ok(response)
    }
}
