#![allow(dead_code)]

use common_audit::{AuditProducer, BufferedAuditSink};
use common_crypto::{hmac_md5_hex, ServerSecret, SigningKey};
use datatrans_core::{
    CallbackFields, CallbackVerifier, CurrencyCode, MerchantProfile, MerchantProfileConfig,
    PaymentIntent, RequestSigner, ReturnUrls, SecuritySettings, SignedRequest, TokenMinter,
};

pub const MERCHANT_ID: &str = "123456789";
pub const FIXTURE_KEY: &str = "6543123456789";

pub struct Harness {
    pub signer: RequestSigner,
    pub verifier: CallbackVerifier,
    pub audit: BufferedAuditSink,
}

pub fn harness() -> Harness {
    let minter = TokenMinter::new(ServerSecret::from_bytes([42u8; 32]).expect("secret"));
    let audit = BufferedAuditSink::new();
    Harness {
        signer: RequestSigner::new(minter.clone()),
        verifier: CallbackVerifier::new(minter, AuditProducer::new(audit.clone(), "test")),
        audit,
    }
}

pub fn hmac_profile(key: &str) -> MerchantProfile {
    let settings = SecuritySettings {
        hmac_key: key.into(),
        ..SecuritySettings::default()
    };
    MerchantProfile::try_from(MerchantProfileConfig::new(MERCHANT_ID, settings)).expect("profile")
}

pub fn profile_at_level(level: u8) -> MerchantProfile {
    let settings = SecuritySettings {
        security_level: level,
        merchant_control_constant: "control-constant".into(),
        hmac_key: FIXTURE_KEY.into(),
        ..SecuritySettings::default()
    };
    MerchantProfile::try_from(MerchantProfileConfig::new(MERCHANT_ID, settings)).expect("profile")
}

pub fn intent(id: &str, amount: u64, currency: &str) -> PaymentIntent {
    PaymentIntent::pending(id, amount, CurrencyCode::parse(currency).expect("currency"))
        .expect("intent")
}

pub fn urls(id: &str) -> ReturnUrls {
    ReturnUrls {
        success: format!("https://shop.example/datatrans/{id}/success"),
        error: format!("https://shop.example/datatrans/{id}/error"),
        cancel: format!("https://shop.example/datatrans/{id}/cancel"),
    }
}

/// What the gateway posts to the success URL: the request echoed back plus the
/// transaction id and, when it holds a key, `sign2`.
pub fn gateway_success(
    request: &SignedRequest,
    transaction_id: &str,
    gateway_key: Option<&str>,
) -> CallbackFields {
    let mut fields: CallbackFields = request
        .query_pairs()
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect();
    fields.insert("status".into(), "success".into());
    fields.insert("uppTransactionId".into(), transaction_id.into());
    if let Some(key) = gateway_key {
        fields.insert(
            "sign2".into(),
            sign2(key, MERCHANT_ID, &request.amount.to_string(), &request.currency, transaction_id),
        );
    }
    fields
}

pub fn sign2(key: &str, merchant_id: &str, amount: &str, currency: &str, transaction_id: &str) -> String {
    let key = SigningKey::from_hex(key).expect("key");
    hmac_md5_hex(&key, format!("{merchant_id}{amount}{currency}{transaction_id}").as_bytes())
        .expect("sign2")
}
