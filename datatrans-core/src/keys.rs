//! Resolution of the signing scheme and key for a merchant.

use common_crypto::SigningKey;
use serde::Serialize;
use std::fmt;

use crate::error::ConfigurationError;
use crate::profile::{SecurityLevel, SecuritySettings};

/// Which configured HMAC key is in use. The gateway supports two for rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KeySlot {
    Primary,
    Secondary,
}

impl fmt::Display for KeySlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeySlot::Primary => f.write_str("hmac_key"),
            KeySlot::Secondary => f.write_str("hmac_key_2"),
        }
    }
}

#[derive(Clone)]
pub enum KeyMaterial {
    Unsigned,
    ControlConstant(String),
    Hmac { slot: KeySlot, key: SigningKey },
}

impl KeyMaterial {
    pub fn level(&self) -> SecurityLevel {
        match self {
            KeyMaterial::Unsigned => SecurityLevel::Unsigned,
            KeyMaterial::ControlConstant(_) => SecurityLevel::ControlConstant,
            KeyMaterial::Hmac { .. } => SecurityLevel::Hmac,
        }
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyMaterial::Unsigned => f.write_str("Unsigned"),
            KeyMaterial::ControlConstant(_) => f
                .debug_tuple("ControlConstant")
                .field(&"***redacted***")
                .finish(),
            KeyMaterial::Hmac { slot, key } => f
                .debug_struct("Hmac")
                .field("slot", slot)
                .field("key", key)
                .finish(),
        }
    }
}

/// Pick the signing variant and key for `settings`.
///
/// The secondary-key flag wins even when the primary key is also configured.
pub fn resolve(settings: &SecuritySettings) -> Result<KeyMaterial, ConfigurationError> {
    let level = SecurityLevel::try_from(settings.security_level)?;
    match level {
        SecurityLevel::Unsigned => Ok(KeyMaterial::Unsigned),
        SecurityLevel::ControlConstant => {
            if settings.merchant_control_constant.trim().is_empty() {
                return Err(ConfigurationError::MissingControlConstant);
            }
            Ok(KeyMaterial::ControlConstant(
                settings.merchant_control_constant.clone(),
            ))
        }
        SecurityLevel::Hmac => {
            let (slot, raw) = if settings.use_hmac_2 {
                (KeySlot::Secondary, settings.hmac_key_2.as_str())
            } else {
                (KeySlot::Primary, settings.hmac_key.as_str())
            };
            if raw.trim().is_empty() {
                return Err(ConfigurationError::EmptySigningKey { slot });
            }
            let key = SigningKey::from_hex(raw).map_err(|err| {
                ConfigurationError::InvalidSigningKey {
                    slot,
                    reason: err.to_string(),
                }
            })?;
            Ok(KeyMaterial::Hmac { slot, key })
        }
    }
}
