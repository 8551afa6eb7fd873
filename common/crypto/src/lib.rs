use base64::engine::general_purpose::{STANDARD as BASE64_STANDARD, URL_SAFE_NO_PAD};
use base64::Engine as _;
use hmac::{Hmac, Mac};
use md5::Md5;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;
use zeroize::Zeroizing;

type HmacMd5 = Hmac<Md5>;
type HmacSha256 = Hmac<Sha256>;

const SECRET_MIN_LENGTH: usize = 16;
const GENERATED_SECRET_LENGTH: usize = 32;
const PART_SEPARATOR: &[u8] = &[0x1f];

/// Errors produced by the common-crypto helpers.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CryptoError {
    #[error("signing key is empty")]
    EmptyKey,
    #[error("signing key is not valid hex: {0}")]
    InvalidHex(String),
    #[error("server secret too short: expected at least {minimum} bytes, got {actual}")]
    SecretTooShort { minimum: usize, actual: usize },
    #[error("base64 decode error: {0}")]
    Base64Decode(String),
    #[error("invalid HMAC key length")]
    InvalidMacKey,
}

impl From<base64::DecodeError> for CryptoError {
    fn from(value: base64::DecodeError) -> Self {
        Self::Base64Decode(value.to_string())
    }
}

/// Raw HMAC key bytes decoded from the hex string the gateway hands out.
#[derive(Clone)]
pub struct SigningKey(Zeroizing<Vec<u8>>);

impl SigningKey {
    /// Decode a gateway key using packed-hex rules: an odd trailing nibble is
    /// padded with zero, any non-hex character is rejected.
    pub fn from_hex(value: &str) -> Result<Self, CryptoError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(CryptoError::EmptyKey);
        }
        let padded = if trimmed.len() % 2 == 1 {
            Zeroizing::new(format!("{trimmed}0"))
        } else {
            Zeroizing::new(trimmed.to_string())
        };
        let bytes = hex::decode(padded.as_bytes())
            .map_err(|err| CryptoError::InvalidHex(err.to_string()))?;
        Ok(Self(Zeroizing::new(bytes)))
    }

    pub fn from_bytes<B>(bytes: B) -> Result<Self, CryptoError>
    where
        B: AsRef<[u8]>,
    {
        let slice = bytes.as_ref();
        if slice.is_empty() {
            return Err(CryptoError::EmptyKey);
        }
        Ok(Self(Zeroizing::new(slice.to_vec())))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKey")
            .field("len", &self.0.len())
            .field("bytes", &"***redacted***")
            .finish()
    }
}

/// Server-side secret used to key correlation digests. Never shared with the gateway.
#[derive(Clone)]
pub struct ServerSecret(Zeroizing<Vec<u8>>);

impl ServerSecret {
    /// Construct a secret from a base64-encoded string.
    pub fn from_base64(value: &str) -> Result<Self, CryptoError> {
        let decoded = Zeroizing::new(BASE64_STANDARD.decode(value.trim())?);
        Self::from_bytes(decoded.as_slice())
    }

    pub fn from_bytes<B>(bytes: B) -> Result<Self, CryptoError>
    where
        B: AsRef<[u8]>,
    {
        let slice = bytes.as_ref();
        if slice.len() < SECRET_MIN_LENGTH {
            return Err(CryptoError::SecretTooShort {
                minimum: SECRET_MIN_LENGTH,
                actual: slice.len(),
            });
        }
        Ok(Self(Zeroizing::new(slice.to_vec())))
    }

    /// Generate a fresh random secret (32 bytes).
    pub fn generate() -> Self {
        let mut bytes = Zeroizing::new(vec![0u8; GENERATED_SECRET_LENGTH]);
        OsRng.fill_bytes(bytes.as_mut_slice());
        Self(bytes)
    }
}

impl std::fmt::Debug for ServerSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerSecret")
            .field("bytes", &"***redacted***")
            .finish()
    }
}

/// Lowercase hex HMAC-MD5 over `message`, the gateway's `sign`/`sign2` format.
pub fn hmac_md5_hex(key: &SigningKey, message: &[u8]) -> Result<String, CryptoError> {
    let mut mac =
        <HmacMd5 as Mac>::new_from_slice(key.as_bytes()).map_err(|_| CryptoError::InvalidMacKey)?;
    mac.update(message);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Check a hex signature supplied by the gateway. Comparison runs in constant time;
/// a value that is not hex never matches.
pub fn verify_hmac_md5_hex(
    key: &SigningKey,
    message: &[u8],
    provided: &str,
) -> Result<bool, CryptoError> {
    let Ok(provided_bytes) = hex::decode(provided.trim()) else {
        return Ok(false);
    };
    let mut mac =
        <HmacMd5 as Mac>::new_from_slice(key.as_bytes()).map_err(|_| CryptoError::InvalidMacKey)?;
    mac.update(message);
    Ok(mac.verify_slice(&provided_bytes).is_ok())
}

/// Keyed HMAC-SHA256 digest over separator-joined parts, base64url without padding.
pub fn keyed_digest_base64(secret: &ServerSecret, parts: &[&[u8]]) -> Result<String, CryptoError> {
    let mut mac =
        <HmacSha256 as Mac>::new_from_slice(&secret.0).map_err(|_| CryptoError::InvalidMacKey)?;
    for (idx, part) in parts.iter().enumerate() {
        if idx > 0 {
            mac.update(PART_SEPARATOR);
        }
        mac.update(part);
    }
    Ok(URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes()))
}

pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}
