use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

use crate::error::ConfigurationError;
use crate::keys::{self, KeyMaterial};

pub const DEFAULT_START_URL: &str = "https://payment.datatrans.biz/upp/jsp/upStart.jsp";
const DEFAULT_REQUEST_TYPE: &str = "CAA";
const DEFAULT_SECURITY_LEVEL: u8 = 2;

/// Signing scheme variant agreed with the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum SecurityLevel {
    Unsigned,
    ControlConstant,
    Hmac,
}

impl SecurityLevel {
    pub fn as_u8(&self) -> u8 {
        match self {
            SecurityLevel::Unsigned => 0,
            SecurityLevel::ControlConstant => 1,
            SecurityLevel::Hmac => 2,
        }
    }

    pub fn from_u8(level: u8) -> Option<Self> {
        match level {
            0 => Some(SecurityLevel::Unsigned),
            1 => Some(SecurityLevel::ControlConstant),
            2 => Some(SecurityLevel::Hmac),
            _ => None,
        }
    }
}

impl From<SecurityLevel> for u8 {
    fn from(value: SecurityLevel) -> Self {
        value.as_u8()
    }
}

impl TryFrom<u8> for SecurityLevel {
    type Error = ConfigurationError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_u8(value).ok_or(ConfigurationError::UnsupportedSecurityLevel(value))
    }
}

impl fmt::Display for SecurityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestType {
    /// `NOA`: authorize only, settle later.
    AuthorizeOnly,
    /// `CAA`: authorize and settle immediately.
    AuthorizeAndCapture,
    /// Omit `reqtype` and let the gateway account settings decide.
    GatewayDefault,
}

impl RequestType {
    pub fn parse(value: &str) -> Result<Self, ConfigurationError> {
        match value.trim() {
            "NOA" => Ok(RequestType::AuthorizeOnly),
            "CAA" => Ok(RequestType::AuthorizeAndCapture),
            "" | "ignore" => Ok(RequestType::GatewayDefault),
            other => Err(ConfigurationError::UnknownRequestType(other.to_string())),
        }
    }

    pub fn wire_value(&self) -> Option<&'static str> {
        match self {
            RequestType::AuthorizeOnly => Some("NOA"),
            RequestType::AuthorizeAndCapture => Some("CAA"),
            RequestType::GatewayDefault => None,
        }
    }
}

/// Security section of a merchant configuration, as stored.
#[derive(Clone, Serialize, Deserialize)]
pub struct SecuritySettings {
    #[serde(default = "default_security_level", deserialize_with = "loose_u8")]
    pub security_level: u8,
    #[serde(default)]
    pub merchant_control_constant: String,
    #[serde(default)]
    pub hmac_key: String,
    #[serde(default)]
    pub hmac_key_2: String,
    #[serde(default, deserialize_with = "loose_bool")]
    pub use_hmac_2: bool,
}

impl Default for SecuritySettings {
    fn default() -> Self {
        Self {
            security_level: DEFAULT_SECURITY_LEVEL,
            merchant_control_constant: String::new(),
            hmac_key: String::new(),
            hmac_key_2: String::new(),
            use_hmac_2: false,
        }
    }
}

impl fmt::Debug for SecuritySettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecuritySettings")
            .field("security_level", &self.security_level)
            .field("merchant_control_constant", &redacted(&self.merchant_control_constant))
            .field("hmac_key", &redacted(&self.hmac_key))
            .field("hmac_key_2", &redacted(&self.hmac_key_2))
            .field("use_hmac_2", &self.use_hmac_2)
            .finish()
    }
}

fn redacted(value: &str) -> &'static str {
    if value.is_empty() {
        "<empty>"
    } else {
        "***redacted***"
    }
}

/// Loosely typed merchant configuration; validate with `MerchantProfile::try_from`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MerchantProfileConfig {
    #[serde(default)]
    pub merchant_id: String,
    #[serde(default = "default_start_url")]
    pub up_start_url: String,
    #[serde(default = "default_request_type")]
    pub req_type: String,
    #[serde(default)]
    pub security: SecuritySettings,
    #[serde(default, deserialize_with = "loose_bool")]
    pub debug: bool,
}

impl MerchantProfileConfig {
    pub fn new(merchant_id: impl Into<String>, security: SecuritySettings) -> Self {
        Self {
            merchant_id: merchant_id.into(),
            up_start_url: default_start_url(),
            req_type: default_request_type(),
            security,
            debug: false,
        }
    }
}

fn default_start_url() -> String {
    DEFAULT_START_URL.to_string()
}

fn default_request_type() -> String {
    DEFAULT_REQUEST_TYPE.to_string()
}

fn default_security_level() -> u8 {
    DEFAULT_SECURITY_LEVEL
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Loose<T> {
    Typed(T),
    Text(String),
}

fn loose_u8<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    match Loose::<u8>::deserialize(deserializer)? {
        Loose::Typed(value) => Ok(value),
        Loose::Text(text) => text.trim().parse().map_err(de::Error::custom),
    }
}

fn loose_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    match Loose::<bool>::deserialize(deserializer)? {
        Loose::Typed(value) => Ok(value),
        Loose::Text(text) => match text.trim() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "" | "0" | "false" | "no" | "off" => Ok(false),
            other => Err(de::Error::custom(format!("'{other}' is not a boolean"))),
        },
    }
}

/// Validated merchant gateway configuration. Read-only once built.
#[derive(Debug, Clone)]
pub struct MerchantProfile {
    merchant_id: String,
    start_url: Url,
    request_type: RequestType,
    key_material: KeyMaterial,
    debug: bool,
}

impl MerchantProfile {
    pub fn merchant_id(&self) -> &str {
        &self.merchant_id
    }

    pub fn start_url(&self) -> &Url {
        &self.start_url
    }

    pub fn request_type(&self) -> RequestType {
        self.request_type
    }

    pub fn security_level(&self) -> SecurityLevel {
        self.key_material.level()
    }

    pub fn key_material(&self) -> &KeyMaterial {
        &self.key_material
    }

    pub fn debug(&self) -> bool {
        self.debug
    }
}

impl TryFrom<MerchantProfileConfig> for MerchantProfile {
    type Error = ConfigurationError;

    fn try_from(config: MerchantProfileConfig) -> Result<Self, Self::Error> {
        let merchant_id = config.merchant_id.trim().to_string();
        if merchant_id.is_empty() {
            return Err(ConfigurationError::MissingMerchantId);
        }
        let start_url = Url::parse(config.up_start_url.trim()).map_err(|err| {
            ConfigurationError::InvalidStartUrl {
                url: config.up_start_url.clone(),
                reason: err.to_string(),
            }
        })?;
        if !matches!(start_url.scheme(), "http" | "https") {
            return Err(ConfigurationError::InvalidStartUrl {
                url: config.up_start_url.clone(),
                reason: format!("unsupported scheme '{}'", start_url.scheme()),
            });
        }
        let request_type = RequestType::parse(&config.req_type)?;
        let key_material = keys::resolve(&config.security)?;
        Ok(Self {
            merchant_id,
            start_url,
            request_type,
            key_material,
            debug: config.debug,
        })
    }
}
