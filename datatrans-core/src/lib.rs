//! Request signing and callback authentication for the Datatrans redirect gateway.
//!
//! [`RequestSigner`] builds the signed parameter set for the gateway entry point,
//! [`CallbackVerifier`] authenticates what comes back. Both run synchronously and
//! never write payment state.

mod audit;
pub mod callback;
pub mod error;
pub mod error_codes;
pub mod intent;
pub mod keys;
pub mod profile;
pub mod signer;
pub mod token;
pub mod verifier;

pub use callback::{CallbackFields, CallbackPayload, CallbackStatus, CustomerDetails, CustomerField};
pub use error::{ConfigurationError, RejectionReason, SignError, SignResult};
pub use error_codes::GatewayErrorCategory;
pub use intent::{CurrencyCode, IntentError, IntentStatus, PaymentIntent};
pub use keys::{resolve, KeyMaterial, KeySlot};
pub use profile::{
    MerchantProfile, MerchantProfileConfig, RequestType, SecurityLevel, SecuritySettings,
    DEFAULT_START_URL,
};
pub use signer::{RequestSigner, ReturnUrls, SignedRequest};
pub use token::{CorrelationToken, TokenMinter};
pub use verifier::{
    CallbackVerifier, GatewayError, ReturnEndpoint, ReturnOutcome, TerminalStatus,
    VerifiedOutcome,
};

pub use common_crypto::ServerSecret;
