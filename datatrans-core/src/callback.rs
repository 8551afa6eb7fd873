//! Parsing of the untrusted field map the gateway posts back.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use crate::error::RejectionReason;

/// Raw callback fields as received (form body or query string).
pub type CallbackFields = HashMap<String, String>;

pub(crate) const FIELD_TOKEN: &str = "datatrans_key";
pub(crate) const FIELD_ERROR_CODE: &str = "errorCode";
pub(crate) const FIELD_TRANSACTION_ID: &str = "uppTransactionId";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackStatus {
    Success,
    Error,
    /// Either cancel spelling; the word received is kept for reporting.
    Cancelled(String),
    Other(String),
}

impl CallbackStatus {
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "success" => CallbackStatus::Success,
            "error" => CallbackStatus::Error,
            word @ ("cancel" | "cancelled") => CallbackStatus::Cancelled(word.to_string()),
            other => CallbackStatus::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            CallbackStatus::Success => "success",
            CallbackStatus::Error => "error",
            CallbackStatus::Cancelled(word) | CallbackStatus::Other(word) => word,
        }
    }
}

/// Customer fields returned when the merchant asked for `uppCustomerDetails`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum CustomerField {
    #[serde(rename = "uppCustomerTitle")]
    Title,
    #[serde(rename = "uppCustomerName")]
    Name,
    #[serde(rename = "uppCustomerFirstName")]
    FirstName,
    #[serde(rename = "uppCustomerLastName")]
    LastName,
    #[serde(rename = "uppCustomerStreet")]
    Street,
    #[serde(rename = "uppCustomerStreet2")]
    Street2,
    #[serde(rename = "uppCustomerCity")]
    City,
    #[serde(rename = "uppCustomerCountry")]
    Country,
    #[serde(rename = "uppCustomerZipCode")]
    ZipCode,
    #[serde(rename = "uppCustomerPhone")]
    Phone,
    #[serde(rename = "uppCustomerFax")]
    Fax,
    #[serde(rename = "uppCustomerEmail")]
    Email,
    #[serde(rename = "uppCustomerGender")]
    Gender,
    #[serde(rename = "uppCustomerBirthDate")]
    BirthDate,
    #[serde(rename = "uppCustomerLanguage")]
    Language,
}

impl CustomerField {
    pub const ALL: [CustomerField; 15] = [
        CustomerField::Title,
        CustomerField::Name,
        CustomerField::FirstName,
        CustomerField::LastName,
        CustomerField::Street,
        CustomerField::Street2,
        CustomerField::City,
        CustomerField::Country,
        CustomerField::ZipCode,
        CustomerField::Phone,
        CustomerField::Fax,
        CustomerField::Email,
        CustomerField::Gender,
        CustomerField::BirthDate,
        CustomerField::Language,
    ];

    pub fn wire_name(&self) -> &'static str {
        match self {
            CustomerField::Title => "uppCustomerTitle",
            CustomerField::Name => "uppCustomerName",
            CustomerField::FirstName => "uppCustomerFirstName",
            CustomerField::LastName => "uppCustomerLastName",
            CustomerField::Street => "uppCustomerStreet",
            CustomerField::Street2 => "uppCustomerStreet2",
            CustomerField::City => "uppCustomerCity",
            CustomerField::Country => "uppCustomerCountry",
            CustomerField::ZipCode => "uppCustomerZipCode",
            CustomerField::Phone => "uppCustomerPhone",
            CustomerField::Fax => "uppCustomerFax",
            CustomerField::Email => "uppCustomerEmail",
            CustomerField::Gender => "uppCustomerGender",
            CustomerField::BirthDate => "uppCustomerBirthDate",
            CustomerField::Language => "uppCustomerLanguage",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CustomerDetails(BTreeMap<CustomerField, String>);

impl CustomerDetails {
    /// Non-empty customer fields, only when the gateway flagged them as present.
    pub fn extract(fields: &CallbackFields) -> Self {
        if fields.get("uppCustomerDetails").map(|v| v.trim()) != Some("yes") {
            return Self::default();
        }
        let details = CustomerField::ALL
            .iter()
            .filter_map(|field| {
                non_empty(fields, field.wire_name()).map(|value| (*field, value.to_string()))
            })
            .collect();
        Self(details)
    }

    pub fn get(&self, field: CustomerField) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

pub(crate) fn non_empty<'a>(fields: &'a CallbackFields, name: &str) -> Option<&'a str> {
    fields
        .get(name)
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
}

/// Typed view over the success callback. Nothing in here is trusted yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackPayload {
    pub correlation_token: String,
    pub status: CallbackStatus,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
    pub security_level: Option<String>,
    pub merchant_id: Option<String>,
    pub amount: Option<String>,
    pub currency: Option<String>,
    pub refno: Option<String>,
    pub transaction_id: Option<String>,
    pub sign2: Option<String>,
}

impl CallbackPayload {
    pub fn parse(fields: &CallbackFields) -> Result<Self, RejectionReason> {
        if fields.is_empty() {
            return Err(RejectionReason::malformed("empty callback payload"));
        }
        let correlation_token = non_empty(fields, FIELD_TOKEN)
            .ok_or_else(|| RejectionReason::malformed("missing datatrans_key"))?
            .to_string();
        let status = non_empty(fields, "status")
            .map(CallbackStatus::parse)
            .ok_or_else(|| RejectionReason::malformed("missing status"))?;
        let owned = |name: &str| non_empty(fields, name).map(str::to_string);
        Ok(Self {
            correlation_token,
            status,
            error_code: owned(FIELD_ERROR_CODE),
            error_message: owned("errorMessage"),
            security_level: owned("security_level"),
            merchant_id: owned("merchantId"),
            amount: owned("amount"),
            currency: owned("currency"),
            refno: owned("refno"),
            transaction_id: owned(FIELD_TRANSACTION_ID),
            sign2: owned("sign2"),
        })
    }

    /// The asserted level; absent or non-numeric values are malformed.
    pub fn asserted_level(&self) -> Result<u8, RejectionReason> {
        let raw = self
            .security_level
            .as_deref()
            .ok_or_else(|| RejectionReason::malformed("missing security_level"))?;
        raw.parse()
            .map_err(|_| RejectionReason::malformed("security_level is not a number"))
    }
}
