use common_crypto::hmac_md5_hex;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::error::{SignError, SignResult};
use crate::intent::{IntentStatus, PaymentIntent};
use crate::keys::KeyMaterial;
use crate::profile::MerchantProfile;
use crate::token::{CorrelationToken, TokenMinter};

/// Absolute URLs the gateway redirects the payer back to. Opaque to the signer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnUrls {
    pub success: String,
    pub error: String,
    pub cancel: String,
}

/// The parameter set handed to the gateway entry point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignedRequest {
    #[serde(rename = "merchantId")]
    pub merchant_id: String,
    pub amount: u64,
    pub currency: String,
    pub refno: String,
    #[serde(rename = "reqtype", skip_serializing_if = "Option::is_none")]
    pub request_type: Option<&'static str>,
    #[serde(rename = "successUrl")]
    pub success_url: String,
    #[serde(rename = "errorUrl")]
    pub error_url: String,
    #[serde(rename = "cancelUrl")]
    pub cancel_url: String,
    pub security_level: u8,
    #[serde(rename = "datatrans_key")]
    pub correlation_token: CorrelationToken,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sign: Option<String>,
}

impl SignedRequest {
    /// Wire name/value pairs in the order the gateway documents them.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("merchantId", self.merchant_id.clone()),
            ("amount", self.amount.to_string()),
            ("currency", self.currency.clone()),
            ("refno", self.refno.clone()),
        ];
        if let Some(request_type) = self.request_type {
            pairs.push(("reqtype", request_type.to_string()));
        }
        pairs.push(("successUrl", self.success_url.clone()));
        pairs.push(("errorUrl", self.error_url.clone()));
        pairs.push(("cancelUrl", self.cancel_url.clone()));
        pairs.push(("security_level", self.security_level.to_string()));
        pairs.push(("datatrans_key", self.correlation_token.as_str().to_string()));
        if let Some(sign) = &self.sign {
            pairs.push(("sign", sign.clone()));
        }
        pairs
    }

    pub fn redirect_url(&self, start_url: &Url) -> Url {
        let mut url = start_url.clone();
        {
            let mut query = url.query_pairs_mut();
            for (name, value) in self.query_pairs() {
                query.append_pair(name, &value);
            }
        }
        url
    }
}

/// Message covered by `sign` (with `refno`) and `sign2` (with `uppTransactionId`).
pub(crate) fn signature_message(
    merchant_id: &str,
    amount: &str,
    currency: &str,
    reference: &str,
) -> String {
    format!("{merchant_id}{amount}{currency}{reference}")
}

#[derive(Debug, Clone)]
pub struct RequestSigner {
    minter: TokenMinter,
}

impl RequestSigner {
    pub fn new(minter: TokenMinter) -> Self {
        Self { minter }
    }

    pub fn build(
        &self,
        profile: &MerchantProfile,
        intent: &PaymentIntent,
        urls: &ReturnUrls,
    ) -> SignResult<SignedRequest> {
        if intent.status != IntentStatus::Pending {
            return Err(SignError::IntentNotPending {
                intent_id: intent.id.clone(),
                status: intent.status,
            });
        }
        let correlation_token = self
            .minter
            .mint(intent)
            .map_err(|err| SignError::Crypto(err.to_string()))?;

        let sign = match profile.key_material() {
            KeyMaterial::Unsigned => None,
            KeyMaterial::ControlConstant(constant) => Some(constant.clone()),
            KeyMaterial::Hmac { key, .. } => {
                let message = signature_message(
                    profile.merchant_id(),
                    &intent.amount_minor.to_string(),
                    intent.currency.as_str(),
                    &intent.id,
                );
                let sign = hmac_md5_hex(key, message.as_bytes())
                    .map_err(|err| SignError::Crypto(err.to_string()))?;
                Some(sign)
            }
        };

        let level = profile.security_level();
        debug!(intent_id = %intent.id, security_level = %level, "built signed gateway request");

        Ok(SignedRequest {
            merchant_id: profile.merchant_id().to_string(),
            amount: intent.amount_minor,
            currency: intent.currency.as_str().to_string(),
            refno: intent.id.clone(),
            request_type: profile.request_type().wire_value(),
            success_url: urls.success.clone(),
            error_url: urls.error.clone(),
            cancel_url: urls.cancel.clone(),
            security_level: level.as_u8(),
            correlation_token,
            sign,
        })
    }
}
