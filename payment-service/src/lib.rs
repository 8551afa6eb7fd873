use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use common_audit::AuditProducer;
use common_crypto::ServerSecret;
use common_http_errors::http_error_metrics_layer;
use datatrans_core::{CallbackVerifier, MerchantProfile, RequestSigner, ReturnUrls, TokenMinter};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use url::Url;

pub mod config;
pub mod handlers;
pub mod metrics;
pub mod store;

use metrics::PaymentMetrics;
use store::IntentStore;

pub const SERVICE_NAME: &str = "payment-service";

#[derive(Clone)]
pub struct AppState {
    pub profile: Arc<MerchantProfile>,
    pub signer: Arc<RequestSigner>,
    pub verifier: Arc<CallbackVerifier>,
    pub store: IntentStore,
    pub metrics: Arc<PaymentMetrics>,
    pub public_base_url: Arc<Url>,
}

impl AppState {
    pub fn new(
        profile: MerchantProfile,
        secret: ServerSecret,
        audit: AuditProducer,
        public_base_url: Url,
        metrics: PaymentMetrics,
    ) -> Self {
        let minter = TokenMinter::new(secret);
        Self {
            profile: Arc::new(profile),
            signer: Arc::new(RequestSigner::new(minter.clone())),
            verifier: Arc::new(CallbackVerifier::new(minter, audit)),
            store: IntentStore::new(),
            metrics: Arc::new(metrics),
            public_base_url: Arc::new(public_base_url),
        }
    }

    pub fn return_urls(&self, id: &str) -> Result<ReturnUrls, url::ParseError> {
        let url_for = |outcome: &str| {
            self.public_base_url
                .join(&format!("datatrans/{id}/{outcome}"))
                .map(String::from)
        };
        Ok(ReturnUrls {
            success: url_for("success")?,
            error: url_for("error")?,
            cancel: url_for("cancel")?,
        })
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(|| async { "ok" }))
        .route("/metrics", get(handlers::metrics))
        .route("/payments", post(handlers::create_payment))
        .route("/payments/:id", get(handlers::get_payment))
        .route("/payments/:id/initiate", post(handlers::initiate_payment))
        .route(
            "/datatrans/:id/success",
            get(handlers::success_query).post(handlers::success_form),
        )
        .route(
            "/datatrans/:id/error",
            get(handlers::error_query).post(handlers::error_form),
        )
        .route(
            "/datatrans/:id/cancel",
            get(handlers::cancel_query).post(handlers::cancel_form),
        )
        .with_state(state)
        .layer(middleware::from_fn(http_error_metrics_layer(SERVICE_NAME)))
        .layer(TraceLayer::new_for_http())
}
