use thiserror::Error;

use crate::error_codes::GatewayErrorCategory;
use crate::intent::IntentStatus;
use crate::keys::KeySlot;
use crate::profile::SecurityLevel;

/// Merchant configuration that cannot produce usable key material.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("merchant id is empty")]
    MissingMerchantId,
    #[error("gateway start url '{url}' is invalid: {reason}")]
    InvalidStartUrl { url: String, reason: String },
    #[error("unknown request type '{0}', expected NOA, CAA or an empty value")]
    UnknownRequestType(String),
    #[error("unsupported security level {0}")]
    UnsupportedSecurityLevel(u8),
    #[error("security level 1 requires a merchant control constant")]
    MissingControlConstant,
    #[error("security level 2 selects {slot} but it is empty")]
    EmptySigningKey { slot: KeySlot },
    #[error("{slot} is not a usable hex key: {reason}")]
    InvalidSigningKey { slot: KeySlot, reason: String },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SignError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error("payment {intent_id} is {status}; only pending payments can be sent to the gateway")]
    IntentNotPending {
        intent_id: String,
        status: IntentStatus,
    },
    #[error("failed to compute request signature: {0}")]
    Crypto(String),
}

pub type SignResult<T> = Result<T, SignError>;

/// Why an inbound callback was refused. None of these allow a success transition.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RejectionReason {
    #[error("malformed callback: {0}")]
    MalformedCallback(String),
    #[error("callback token does not match the payment's current state")]
    StaleOrForgedCallback,
    #[error("gateway reported error {code}: {category}")]
    GatewayReportedError {
        code: String,
        category: GatewayErrorCategory,
    },
    #[error("callback asserts security level {received}, merchant is configured for {expected}")]
    SecurityLevelMismatch {
        expected: SecurityLevel,
        received: u8,
    },
    #[error("callback signature is invalid")]
    InvalidSignature,
    #[error("unexpected callback status '{status}'")]
    CommunicationFailure { status: String },
}

impl RejectionReason {
    /// Stable machine code, used for the `X-Error-Code` header and metric labels.
    pub fn code(&self) -> &'static str {
        match self {
            RejectionReason::MalformedCallback(_) => "malformed_callback",
            RejectionReason::StaleOrForgedCallback => "stale_callback",
            RejectionReason::GatewayReportedError { .. } => "gateway_error",
            RejectionReason::SecurityLevelMismatch { .. } => "security_level_mismatch",
            RejectionReason::InvalidSignature => "invalid_signature",
            RejectionReason::CommunicationFailure { .. } => "communication_failure",
        }
    }

    /// Rejections that point at tampering or replay rather than a gateway-side failure.
    pub fn is_security_relevant(&self) -> bool {
        matches!(
            self,
            RejectionReason::StaleOrForgedCallback
                | RejectionReason::InvalidSignature
                | RejectionReason::SecurityLevelMismatch { .. }
        )
    }

    pub(crate) fn malformed(detail: impl Into<String>) -> Self {
        RejectionReason::MalformedCallback(detail.into())
    }
}
