use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// Active ISO 4217 alphabetic codes, sorted for binary search.
const ISO_4217_CODES: &[&str] = &[
    "AED", "AFN", "ALL", "AMD", "ANG", "AOA", "ARS", "AUD", "AWG", "AZN", "BAM", "BBD", "BDT",
    "BGN", "BHD", "BIF", "BMD", "BND", "BOB", "BOV", "BRL", "BSD", "BTN", "BWP", "BYN", "BZD",
    "CAD", "CDF", "CHE", "CHF", "CHW", "CLF", "CLP", "CNY", "COP", "COU", "CRC", "CUC", "CUP",
    "CVE", "CZK", "DJF", "DKK", "DOP", "DZD", "EGP", "ERN", "ETB", "EUR", "FJD", "FKP", "GBP",
    "GEL", "GHS", "GIP", "GMD", "GNF", "GTQ", "GYD", "HKD", "HNL", "HTG", "HUF", "IDR", "ILS",
    "INR", "IQD", "IRR", "ISK", "JMD", "JOD", "JPY", "KES", "KGS", "KHR", "KMF", "KPW", "KRW",
    "KWD", "KYD", "KZT", "LAK", "LBP", "LKR", "LRD", "LSL", "LYD", "MAD", "MDL", "MGA", "MKD",
    "MMK", "MNT", "MOP", "MRU", "MUR", "MVR", "MWK", "MXN", "MXV", "MYR", "MZN", "NAD", "NGN",
    "NIO", "NOK", "NPR", "NZD", "OMR", "PAB", "PEN", "PGK", "PHP", "PKR", "PLN", "PYG", "QAR",
    "RON", "RSD", "RUB", "RWF", "SAR", "SBD", "SCR", "SDG", "SEK", "SGD", "SHP", "SLE", "SLL",
    "SOS", "SRD", "SSP", "STN", "SVC", "SYP", "SZL", "THB", "TJS", "TMT", "TND", "TOP", "TRY",
    "TTD", "TWD", "TZS", "UAH", "UGX", "USD", "USN", "UYI", "UYU", "UYW", "UZS", "VED", "VES",
    "VND", "VUV", "WST", "XAF", "XAG", "XAU", "XBA", "XBB", "XBC", "XBD", "XCD", "XDR", "XOF",
    "XPD", "XPF", "XPT", "XSU", "XTS", "XUA", "XXX", "YER", "ZAR", "ZMW", "ZWL",
];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IntentError {
    #[error("payment intent id is empty")]
    EmptyId,
    #[error("'{0}' is not an active ISO 4217 currency code")]
    UnknownCurrency(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyCode(String);

impl CurrencyCode {
    /// Accepts lower-case input; stores the upper-case code.
    pub fn parse(value: &str) -> Result<Self, IntentError> {
        let upper = value.trim().to_ascii_uppercase();
        if ISO_4217_CODES.binary_search(&upper.as_str()).is_ok() {
            Ok(Self(upper))
        } else {
            Err(IntentError::UnknownCurrency(value.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = IntentError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CurrencyCode> for String {
    fn from(value: CurrencyCode) -> Self {
        value.0
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IntentStatus {
    #[serde(rename = "payment_pending")]
    Pending,
    #[serde(rename = "payment_success")]
    Success,
    #[serde(rename = "payment_failed")]
    Failed,
    #[serde(rename = "payment_cancelled")]
    Cancelled,
}

impl IntentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntentStatus::Pending => "payment_pending",
            IntentStatus::Success => "payment_success",
            IntentStatus::Failed => "payment_failed",
            IntentStatus::Cancelled => "payment_cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<IntentStatus> {
        match s {
            "payment_pending" => Some(IntentStatus::Pending),
            "payment_success" => Some(IntentStatus::Success),
            "payment_failed" => Some(IntentStatus::Failed),
            "payment_cancelled" => Some(IntentStatus::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, IntentStatus::Pending)
    }
}

impl fmt::Display for IntentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One attempt to collect payment. The id doubles as the gateway `refno`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntent {
    pub id: String,
    pub amount_minor: u64,
    pub currency: CurrencyCode,
    pub status: IntentStatus,
}

impl PaymentIntent {
    pub fn new(
        id: impl Into<String>,
        amount_minor: u64,
        currency: CurrencyCode,
        status: IntentStatus,
    ) -> Result<Self, IntentError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(IntentError::EmptyId);
        }
        Ok(Self {
            id,
            amount_minor,
            currency,
            status,
        })
    }

    pub fn pending(
        id: impl Into<String>,
        amount_minor: u64,
        currency: CurrencyCode,
    ) -> Result<Self, IntentError> {
        Self::new(id, amount_minor, currency, IntentStatus::Pending)
    }

    pub fn with_status(mut self, status: IntentStatus) -> Self {
        self.status = status;
        self
    }
}
