#![allow(dead_code)]

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use common_audit::{AuditProducer, BufferedAuditSink};
use common_crypto::{hmac_md5_hex, ServerSecret, SigningKey};
use datatrans_core::{MerchantProfile, MerchantProfileConfig, SecuritySettings};
use payment_service::{metrics::PaymentMetrics, router, AppState};
use serde_json::{json, Value};
use tower::ServiceExt;
use url::{form_urlencoded, Url};

pub const MERCHANT_ID: &str = "123456789";
pub const HMAC_KEY: &str = "6543123456789";

pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    pub audit: BufferedAuditSink,
}

pub fn test_app() -> TestApp {
    let settings = SecuritySettings {
        hmac_key: HMAC_KEY.into(),
        ..SecuritySettings::default()
    };
    let profile = MerchantProfile::try_from(MerchantProfileConfig::new(MERCHANT_ID, settings))
        .expect("profile");
    let audit = BufferedAuditSink::new();
    let state = AppState::new(
        profile,
        ServerSecret::generate(),
        AuditProducer::new(audit.clone(), "payment-service-test"),
        Url::parse("https://shop.example/").unwrap(),
        PaymentMetrics::new().expect("metrics"),
    );
    TestApp {
        app: router(state.clone()),
        state,
        audit,
    }
}

pub async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Option<String>, Value) {
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let code = resp
        .headers()
        .get("X-Error-Code")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let bytes = to_bytes(resp.into_body(), 64 * 1024).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, code, body)
}

pub fn json_post(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn form_post(uri: &str, fields: &[(String, String)]) -> Request<Body> {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (name, value) in fields {
        serializer.append_pair(name, value);
    }
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/x-www-form-urlencoded")
        .body(Body::from(serializer.finish()))
        .unwrap()
}

/// Creates a payment and initiates it; returns the id and the signed fields.
pub async fn initiated_payment(app: &Router, amount_minor: u64, currency: &str) -> (String, Value) {
    let (status, _, created) = send(
        app,
        json_post("/payments", json!({ "amountMinor": amount_minor, "currency": currency })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["id"].as_str().unwrap().to_string();
    let (status, _, initiated) =
        send(app, json_post(&format!("/payments/{id}/initiate"), json!({}))).await;
    assert_eq!(status, StatusCode::OK, "{initiated}");
    (id, initiated)
}

/// The success callback the gateway would post for an initiated payment.
pub fn gateway_success_fields(initiated: &Value, transaction_id: &str) -> Vec<(String, String)> {
    let fields = &initiated["fields"];
    let text = |name: &str| match &fields[name] {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    let amount = text("amount");
    let currency = text("currency");
    let key = SigningKey::from_hex(HMAC_KEY).unwrap();
    let sign2 = hmac_md5_hex(
        &key,
        format!("{MERCHANT_ID}{amount}{currency}{transaction_id}").as_bytes(),
    )
    .unwrap();
    vec![
        ("merchantId".into(), text("merchantId")),
        ("amount".into(), amount),
        ("currency".into(), currency),
        ("refno".into(), text("refno")),
        ("security_level".into(), text("security_level")),
        ("datatrans_key".into(), text("datatrans_key")),
        ("status".into(), "success".into()),
        ("uppTransactionId".into(), transaction_id.into()),
        ("sign2".into(), sign2),
    ]
}

pub fn with_field(mut fields: Vec<(String, String)>, name: &str, value: &str) -> Vec<(String, String)> {
    fields.retain(|(n, _)| n != name);
    fields.push((name.to_string(), value.to_string()));
    fields
}
