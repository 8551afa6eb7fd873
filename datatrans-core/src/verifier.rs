use common_audit::AuditProducer;
use common_crypto::verify_hmac_md5_hex;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::audit::CallbackAudit;
use crate::callback::{
    non_empty, CallbackFields, CallbackPayload, CallbackStatus, CustomerDetails,
    FIELD_ERROR_CODE, FIELD_TOKEN, FIELD_TRANSACTION_ID,
};
use crate::error::RejectionReason;
use crate::error_codes::GatewayErrorCategory;
use crate::intent::{IntentStatus, PaymentIntent};
use crate::keys::KeyMaterial;
use crate::profile::MerchantProfile;
use crate::signer::signature_message;
use crate::token::TokenMinter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalStatus {
    Success,
    Failed,
    Cancelled,
}

impl TerminalStatus {
    pub fn intent_status(&self) -> IntentStatus {
        match self {
            TerminalStatus::Success => IntentStatus::Success,
            TerminalStatus::Failed => IntentStatus::Failed,
            TerminalStatus::Cancelled => IntentStatus::Cancelled,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedOutcome {
    pub intent_id: String,
    pub terminal_status: TerminalStatus,
    pub transaction_id: Option<String>,
    pub customer: CustomerDetails,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnEndpoint {
    Cancel,
    Error,
}

impl ReturnEndpoint {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReturnEndpoint::Cancel => "cancel",
            ReturnEndpoint::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayError {
    pub code: String,
    pub category: GatewayErrorCategory,
    pub message: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnOutcome {
    pub intent_id: String,
    pub terminal_status: TerminalStatus,
    pub gateway_error: Option<GatewayError>,
}

/// Authenticates gateway callbacks against the intent's current state.
///
/// Callers must serialize verification per intent and only transition from
/// pending; the token check then rejects every replay after the first.
#[derive(Debug, Clone)]
pub struct CallbackVerifier {
    minter: TokenMinter,
    audit: AuditProducer,
}

impl CallbackVerifier {
    pub fn new(minter: TokenMinter, audit: AuditProducer) -> Self {
        Self { minter, audit }
    }

    /// Success endpoint.
    pub fn verify(
        &self,
        profile: &MerchantProfile,
        intent: &PaymentIntent,
        fields: &CallbackFields,
    ) -> Result<VerifiedOutcome, RejectionReason> {
        if profile.debug() {
            let mut names: Vec<&str> = fields.keys().map(String::as_str).collect();
            names.sort_unstable();
            debug!(intent_id = %intent.id, fields = ?names, "datatrans success callback received");
        }

        let result = CallbackPayload::parse(fields)
            .and_then(|payload| self.run_pipeline(profile, intent, &payload, fields));

        match &result {
            Ok(outcome) => info!(
                intent_id = %intent.id,
                transaction_id = ?outcome.transaction_id,
                "datatrans callback verified"
            ),
            Err(reason) => warn!(
                intent_id = %intent.id,
                code = reason.code(),
                reason = %reason,
                "datatrans callback rejected"
            ),
        }

        CallbackAudit {
            intent_id: &intent.id,
            endpoint: "success",
            security_level: Some(profile.security_level()),
            transaction_id: non_empty(fields, FIELD_TRANSACTION_ID),
        }
        .emit(
            &self.audit,
            result.as_ref().map(|outcome| outcome.terminal_status),
        );
        result
    }

    fn run_pipeline(
        &self,
        profile: &MerchantProfile,
        intent: &PaymentIntent,
        payload: &CallbackPayload,
        fields: &CallbackFields,
    ) -> Result<VerifiedOutcome, RejectionReason> {
        if !self.minter.matches(intent, &payload.correlation_token) {
            return Err(RejectionReason::StaleOrForgedCallback);
        }

        if payload.status == CallbackStatus::Error {
            let code = payload.error_code.clone().unwrap_or_default();
            return Err(RejectionReason::GatewayReportedError {
                category: GatewayErrorCategory::from_code(&code),
                code,
            });
        }

        let expected = profile.security_level();
        let received = payload.asserted_level()?;
        if received != expected.as_u8() {
            return Err(RejectionReason::SecurityLevelMismatch { expected, received });
        }

        if let KeyMaterial::Hmac { key, .. } = profile.key_material() {
            if let Some(echoed) = payload.merchant_id.as_deref() {
                if echoed != profile.merchant_id() {
                    return Err(RejectionReason::InvalidSignature);
                }
            }
            let amount = payload
                .amount
                .as_deref()
                .ok_or_else(|| RejectionReason::malformed("missing amount"))?;
            let amount_minor: u64 = amount
                .parse()
                .map_err(|_| RejectionReason::malformed("amount is not an integer"))?;
            let currency = payload
                .currency
                .as_deref()
                .ok_or_else(|| RejectionReason::malformed("missing currency"))?;
            let transaction_id = payload
                .transaction_id
                .as_deref()
                .ok_or_else(|| RejectionReason::malformed("missing uppTransactionId"))?;
            let sign2 = payload
                .sign2
                .as_deref()
                .ok_or(RejectionReason::InvalidSignature)?;

            let message = signature_message(profile.merchant_id(), amount, currency, transaction_id);
            let valid = verify_hmac_md5_hex(key, message.as_bytes(), sign2).unwrap_or(false);
            if !valid {
                return Err(RejectionReason::InvalidSignature);
            }
            // A valid signature over another payment's amount is still a forgery here.
            if amount_minor != intent.amount_minor || currency != intent.currency.as_str() {
                return Err(RejectionReason::InvalidSignature);
            }
        }

        if payload.status != CallbackStatus::Success {
            return Err(RejectionReason::CommunicationFailure {
                status: payload.status.as_str().to_string(),
            });
        }

        Ok(VerifiedOutcome {
            intent_id: intent.id.clone(),
            terminal_status: TerminalStatus::Success,
            transaction_id: payload.transaction_id.clone(),
            customer: CustomerDetails::extract(fields),
        })
    }

    /// Records a callback for an intent id the host does not know. `endpoint`
    /// is the route name used in the audit action (`success`, `cancel`, `error`).
    pub fn record_unknown_intent(&self, intent_id: &str, endpoint: &str, fields: &CallbackFields) {
        warn!(intent_id, endpoint, "datatrans callback for unknown payment");
        CallbackAudit {
            intent_id,
            endpoint,
            security_level: None,
            transaction_id: non_empty(fields, FIELD_TRANSACTION_ID),
        }
        .emit_unknown_payment(&self.audit);
    }

    /// Cancel and error endpoints. The payment must still be pending and a
    /// presented token must match; without one the endpoint outcome stands.
    pub fn verify_return(
        &self,
        intent: &PaymentIntent,
        endpoint: ReturnEndpoint,
        fields: &CallbackFields,
    ) -> Result<ReturnOutcome, RejectionReason> {
        // A settled payment has no pending return to accept, token or not.
        let token_ok = !intent.status.is_terminal()
            && match non_empty(fields, FIELD_TOKEN) {
                Some(token) => self.minter.matches(intent, token),
                None => true,
            };

        let result = if !token_ok {
            Err(RejectionReason::StaleOrForgedCallback)
        } else {
            let (terminal_status, gateway_error) = match endpoint {
                ReturnEndpoint::Cancel => (TerminalStatus::Cancelled, None),
                ReturnEndpoint::Error => {
                    let gateway_error = non_empty(fields, FIELD_ERROR_CODE).map(|code| {
                        let category = GatewayErrorCategory::from_code(code);
                        GatewayError {
                            code: code.to_string(),
                            category,
                            message: category.message(),
                        }
                    });
                    (TerminalStatus::Failed, gateway_error)
                }
            };
            Ok(ReturnOutcome {
                intent_id: intent.id.clone(),
                terminal_status,
                gateway_error,
            })
        };

        match &result {
            Ok(outcome) => info!(
                intent_id = %intent.id,
                endpoint = endpoint.as_str(),
                error_code = ?outcome.gateway_error.as_ref().map(|e| e.code.as_str()),
                "datatrans return endpoint accepted"
            ),
            Err(reason) => warn!(
                intent_id = %intent.id,
                endpoint = endpoint.as_str(),
                code = reason.code(),
                "datatrans return endpoint rejected"
            ),
        }

        CallbackAudit {
            intent_id: &intent.id,
            endpoint: endpoint.as_str(),
            security_level: None,
            transaction_id: non_empty(fields, FIELD_TRANSACTION_ID),
        }
        .emit(
            &self.audit,
            result.as_ref().map(|outcome| outcome.terminal_status),
        );
        result
    }
}
