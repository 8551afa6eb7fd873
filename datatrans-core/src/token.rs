use common_crypto::{constant_time_eq, keyed_digest_base64, CryptoError, ServerSecret};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::intent::PaymentIntent;

/// Per-payment value echoed back by the gateway as `datatrans_key`.
///
/// Bound to the intent's id and status at minting time, so a token issued while
/// the payment was pending stops matching once it has transitioned.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationToken(String);

impl CorrelationToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for CorrelationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CorrelationToken").field(&"***").finish()
    }
}

impl fmt::Display for CorrelationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone)]
pub struct TokenMinter {
    secret: ServerSecret,
}

impl TokenMinter {
    pub fn new(secret: ServerSecret) -> Self {
        Self { secret }
    }

    pub fn mint(&self, intent: &PaymentIntent) -> Result<CorrelationToken, CryptoError> {
        keyed_digest_base64(
            &self.secret,
            &[intent.id.as_bytes(), intent.status.as_str().as_bytes()],
        )
        .map(CorrelationToken)
    }

    /// Constant-time comparison against the token for the intent's current status.
    pub fn matches(&self, intent: &PaymentIntent, presented: &str) -> bool {
        match self.mint(intent) {
            Ok(expected) => constant_time_eq(expected.as_str().as_bytes(), presented.as_bytes()),
            Err(_) => false,
        }
    }
}
