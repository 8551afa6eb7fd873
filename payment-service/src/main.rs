use anyhow::Context;
use common_audit::{AuditProducer, TracingAuditSink};
use payment_service::{config::ServiceConfig, metrics::PaymentMetrics, router, AppState, SERVICE_NAME};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ServiceConfig::from_env()?;
    let profile = config.merchant_profile()?;
    info!(
        merchant_id = %profile.merchant_id(),
        security_level = %profile.security_level(),
        start_url = %profile.start_url(),
        "datatrans merchant profile loaded"
    );

    let metrics = PaymentMetrics::new().context("failed to register metrics")?;
    let audit = AuditProducer::new(TracingAuditSink, SERVICE_NAME);
    let state = AppState::new(
        profile,
        config.server_secret.clone(),
        audit,
        config.public_base_url.clone(),
        metrics,
    );
    let app = router(state);

    let addr = SocketAddr::new(
        config.host.parse().context("HOST must be an IP address")?,
        config.port,
    );
    info!(%addr, "starting payment-service");
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
