mod support;

use axum::http::StatusCode;
use common_audit::AuditSeverity;
use support::*;

#[tokio::test]
async fn initiate_returns_signed_redirect() {
    let t = test_app();
    let (id, initiated) = initiated_payment(&t.app, 24600, "CHF").await;
    let fields = &initiated["fields"];
    assert_eq!(fields["merchantId"], MERCHANT_ID);
    assert_eq!(fields["refno"], id.as_str());
    assert_eq!(fields["reqtype"], "CAA");
    assert_eq!(fields["security_level"], 2);
    assert_eq!(fields["successUrl"], format!("https://shop.example/datatrans/{id}/success"));
    assert_eq!(fields["sign"].as_str().unwrap().len(), 32);
    let redirect = initiated["redirectUrl"].as_str().unwrap();
    assert!(redirect.starts_with("https://payment.datatrans.biz/upp/jsp/upStart.jsp?merchantId=123456789"));
}

#[tokio::test]
async fn success_callback_completes_payment_once() {
    let t = test_app();
    let (id, initiated) = initiated_payment(&t.app, 24600, "CHF").await;
    let mut fields = gateway_success_fields(&initiated, "160823101329060450");
    fields.push(("uppCustomerDetails".into(), "yes".into()));
    fields.push(("uppCustomerEmail".into(), "ada@example.org".into()));

    let uri = format!("/datatrans/{id}/success");
    let (status, _, body) = send(&t.app, form_post(&uri, &fields)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["status"], "payment_success");
    assert_eq!(body["transactionId"], "160823101329060450");

    // the same payload again is a replay
    let (status, code, _) = send(&t.app, form_post(&uri, &fields)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(code.as_deref(), Some("stale_callback"));

    let (_, _, payment) = send(&t.app, get(&format!("/payments/{id}"))).await;
    assert_eq!(payment["status"], "payment_success");
    assert_eq!(payment["customer"]["uppCustomerEmail"], "ada@example.org");
    assert_eq!(payment["history"].as_array().unwrap().len(), 2);

    let events = t.audit.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].severity, AuditSeverity::Info);
    assert_eq!(events[1].severity, AuditSeverity::Security);
    assert_eq!(t.state.metrics.callback_count("success", "accepted"), 1);
    assert_eq!(t.state.metrics.callback_count("success", "stale_callback"), 1);
}

#[tokio::test]
async fn success_callback_via_query_string() {
    let t = test_app();
    let (id, initiated) = initiated_payment(&t.app, 500, "EUR").await;
    let fields = gateway_success_fields(&initiated, "4242");
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (name, value) in &fields {
        serializer.append_pair(name, value);
    }
    let uri = format!("/datatrans/{id}/success?{}", serializer.finish());
    let (status, _, body) = send(&t.app, get(&uri)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["status"], "payment_success");
}

#[tokio::test]
async fn tampered_amount_fails_payment() {
    let t = test_app();
    let (id, initiated) = initiated_payment(&t.app, 24600, "CHF").await;
    let fields = with_field(gateway_success_fields(&initiated, "1"), "amount", "100");
    let (status, code, _) = send(&t.app, form_post(&format!("/datatrans/{id}/success"), &fields)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(code.as_deref(), Some("invalid_signature"));

    let (_, _, payment) = send(&t.app, get(&format!("/payments/{id}"))).await;
    assert_eq!(payment["status"], "payment_failed");
    assert_eq!(payment["history"][1]["reason"], "invalid_signature");
}

#[tokio::test]
async fn forged_token_leaves_pending_payment_alone() {
    let t = test_app();
    let (id, initiated) = initiated_payment(&t.app, 24600, "CHF").await;
    let fields = with_field(gateway_success_fields(&initiated, "1"), "datatrans_key", "forged");
    let (status, code, _) = send(&t.app, form_post(&format!("/datatrans/{id}/success"), &fields)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(code.as_deref(), Some("stale_callback"));
    let (_, _, payment) = send(&t.app, get(&format!("/payments/{id}"))).await;
    assert_eq!(payment["status"], "payment_pending");
}

#[tokio::test]
async fn gateway_error_on_success_endpoint() {
    let t = test_app();
    let (id, initiated) = initiated_payment(&t.app, 24600, "CHF").await;
    let mut fields = with_field(gateway_success_fields(&initiated, "1"), "status", "error");
    fields.push(("errorCode".into(), "1403".into()));
    let (status, code, body) = send(&t.app, form_post(&format!("/datatrans/{id}/success"), &fields)).await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    assert_eq!(code.as_deref(), Some("gateway_error"));
    assert_eq!(body["message"], "Datatrans transaction failed: declined by card issuer");

    let (_, _, payment) = send(&t.app, get(&format!("/payments/{id}"))).await;
    assert_eq!(payment["status"], "payment_failed");
    assert_eq!(payment["gatewayError"]["code"], "1403");
}

#[tokio::test]
async fn cancel_and_error_endpoints() {
    let t = test_app();
    let (cancelled, _) = initiated_payment(&t.app, 100, "CHF").await;
    let uri = format!("/datatrans/{cancelled}/cancel");
    let (status, _, body) = send(&t.app, get(&uri)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "payment_cancelled");
    let (status, code, _) = send(&t.app, get(&uri)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(code.as_deref(), Some("stale_callback"));

    let (failed, initiated) = initiated_payment(&t.app, 100, "CHF").await;
    let token = initiated["fields"]["datatrans_key"].as_str().unwrap().to_string();
    let fields = vec![
        ("datatrans_key".to_string(), token),
        ("errorCode".to_string(), "3003".to_string()),
    ];
    let (status, _, body) = send(&t.app, form_post(&format!("/datatrans/{failed}/error"), &fields)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["status"], "payment_failed");
    assert_eq!(body["gatewayError"]["category"], "fraud_management");
    assert_eq!(
        body["gatewayError"]["message"],
        "Datatrans transaction failed: denied by fraud management"
    );
}

#[tokio::test]
async fn unknown_payment_is_not_found() {
    let t = test_app();
    let (status, code, _) = send(&t.app, get("/datatrans/nope/success?status=success")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(code.as_deref(), Some("payment_not_found"));
    let events = t.audit.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].action, "datatrans.callback.success");
    assert_eq!(events[0].entity_id, "nope");
    assert_eq!(events[0].severity, AuditSeverity::Security);
    assert_eq!(events[0].payload["outcome"], "payment_not_found");

    let (status, _, _) = send(&t.app, get("/datatrans/nope/cancel")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let events = t.audit.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[1].action, "datatrans.callback.cancel");
    assert_eq!(events[1].severity, AuditSeverity::Security);
}

#[tokio::test]
async fn replayed_cancel_after_success_changes_nothing() {
    let t = test_app();
    let (id, initiated) = initiated_payment(&t.app, 24600, "CHF").await;
    let fields = gateway_success_fields(&initiated, "99");
    let (status, _, _) = send(&t.app, form_post(&format!("/datatrans/{id}/success"), &fields)).await;
    assert_eq!(status, StatusCode::OK);

    for endpoint in ["cancel", "error"] {
        let (status, code, _) = send(&t.app, get(&format!("/datatrans/{id}/{endpoint}"))).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(code.as_deref(), Some("stale_callback"));
    }
    let events = t.audit.events();
    assert_eq!(events.len(), 3);
    assert_eq!(events[0].severity, AuditSeverity::Info);
    assert_eq!(events[1].action, "datatrans.callback.cancel");
    assert!(events[1..].iter().all(|e| e.severity == AuditSeverity::Security));
    assert!(events[1..].iter().all(|e| e.payload["outcome"] == "stale_callback"));

    let (_, _, payment) = send(&t.app, get(&format!("/payments/{id}"))).await;
    assert_eq!(payment["status"], "payment_success");
    assert_eq!(payment["history"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn initiate_after_completion_conflicts() {
    let t = test_app();
    let (id, _) = initiated_payment(&t.app, 100, "CHF").await;
    send(&t.app, get(&format!("/datatrans/{id}/cancel"))).await;
    let (status, code, _) = send(
        &t.app,
        json_post(&format!("/payments/{id}/initiate"), serde_json::json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(code.as_deref(), Some("payment_not_pending"));
}
