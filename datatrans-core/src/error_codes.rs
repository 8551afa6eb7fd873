//! Gateway error codes reported on the `errorCode` callback field.

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayErrorCategory {
    MissingParameter,
    InvalidParameterFormat,
    ParameterValueNotFound,
    InvalidCardNumber,
    SignControlDenied,
    MerchantDisabled,
    InvalidExpirationDate,
    CardExpiredOrBlocked,
    DeclinedByIssuer,
    AmountExceeded,
    FraudManagement,
    DeclinedResponseCode02,
    PostUrlCheckFailed,
    PaypalDuplicate,
    AliasUpdateFailed,
    AliasCardMismatch,
    AliasNotFound,
    AliasServiceDisabled,
    Undefined,
}

impl GatewayErrorCategory {
    /// Unknown or missing codes map to [`GatewayErrorCategory::Undefined`].
    pub fn from_code(code: &str) -> Self {
        match code.trim() {
            "1001" => Self::MissingParameter,
            "1002" => Self::InvalidParameterFormat,
            "1003" => Self::ParameterValueNotFound,
            "1004" | "1400" => Self::InvalidCardNumber,
            "1007" => Self::SignControlDenied,
            "1008" => Self::MerchantDisabled,
            "1401" => Self::InvalidExpirationDate,
            "1402" | "1404" => Self::CardExpiredOrBlocked,
            "1403" => Self::DeclinedByIssuer,
            "1405" => Self::AmountExceeded,
            "3000" | "3001" | "3002" | "3003" | "3004" | "3005" | "3006" | "3011" | "3012"
            | "3013" | "3014" | "3015" | "3016" => Self::FraudManagement,
            "3031" => Self::DeclinedResponseCode02,
            "3041" => Self::PostUrlCheckFailed,
            "10412" => Self::PaypalDuplicate,
            "-885" | "-886" => Self::AliasUpdateFailed,
            "-887" => Self::AliasCardMismatch,
            "-888" => Self::AliasNotFound,
            "-900" => Self::AliasServiceDisabled,
            _ => Self::Undefined,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Self::MissingParameter => "Datatrans transaction failed: missing required parameter",
            Self::InvalidParameterFormat => "Datatrans transaction failed: invalid parameter format",
            Self::ParameterValueNotFound => {
                "Datatrans transaction failed: value of parameter not found"
            }
            Self::InvalidCardNumber => "Datatrans transaction failed: invalid card number",
            Self::SignControlDenied => {
                "Datatrans transaction failed: access denied by sign control/parameter sign invalid"
            }
            Self::MerchantDisabled => "Datatrans transaction failed: merchant disabled by Datatrans",
            Self::InvalidExpirationDate => "Datatrans transaction failed: invalid expiration date",
            Self::CardExpiredOrBlocked => "Datatrans transaction failed: card expired or blocked",
            Self::DeclinedByIssuer => "Datatrans transaction failed: declined by card issuer",
            Self::AmountExceeded => "Datatrans transaction failed: amount exceeded",
            Self::FraudManagement => "Datatrans transaction failed: denied by fraud management",
            Self::DeclinedResponseCode02 => {
                "Datatrans transaction failed: declined due to response code 02"
            }
            Self::PostUrlCheckFailed => {
                "Datatrans transaction failed: declined due to post error/post URL check failed"
            }
            Self::PaypalDuplicate => "Datatrans transaction failed: PayPal duplicate error",
            Self::AliasUpdateFailed => "Datatrans transaction failed: CC-alias update/insert error",
            Self::AliasCardMismatch => {
                "Datatrans transaction failed: CC-alias does not match card number"
            }
            Self::AliasNotFound => "Datatrans transaction failed: CC-alias not found",
            Self::AliasServiceDisabled => "Datatrans transaction failed: CC-alias service not enabled",
            Self::Undefined => "Datatrans transaction failed: undefined error",
        }
    }
}

impl fmt::Display for GatewayErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grouped_codes_share_a_category() {
        assert_eq!(GatewayErrorCategory::from_code("1004"), GatewayErrorCategory::InvalidCardNumber);
        assert_eq!(GatewayErrorCategory::from_code("1400"), GatewayErrorCategory::InvalidCardNumber);
        assert_eq!(GatewayErrorCategory::from_code("1402"), GatewayErrorCategory::CardExpiredOrBlocked);
        assert_eq!(GatewayErrorCategory::from_code("1404"), GatewayErrorCategory::CardExpiredOrBlocked);
        assert_eq!(GatewayErrorCategory::from_code("-886"), GatewayErrorCategory::AliasUpdateFailed);
        for code in ["3000", "3006", "3011", "3016"] {
            assert_eq!(GatewayErrorCategory::from_code(code), GatewayErrorCategory::FraudManagement);
        }
    }

    #[test]
    fn fraud_range_has_gaps() {
        for code in ["3007", "3010", "3017"] {
            assert_eq!(GatewayErrorCategory::from_code(code), GatewayErrorCategory::Undefined);
        }
    }

    #[test]
    fn unknown_and_empty_codes_are_undefined() {
        assert_eq!(GatewayErrorCategory::from_code(""), GatewayErrorCategory::Undefined);
        assert_eq!(GatewayErrorCategory::from_code("9999"), GatewayErrorCategory::Undefined);
        assert_eq!(
            GatewayErrorCategory::Undefined.to_string(),
            "Datatrans transaction failed: undefined error"
        );
    }

    #[test]
    fn codes_are_trimmed() {
        assert_eq!(GatewayErrorCategory::from_code(" 1403 "), GatewayErrorCategory::DeclinedByIssuer);
    }
}
