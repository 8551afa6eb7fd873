use anyhow::{Context, Result};
use common_crypto::ServerSecret;
use datatrans_core::{MerchantProfile, MerchantProfileConfig, SecuritySettings, DEFAULT_START_URL};
use std::env;
use url::Url;

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,
    pub public_base_url: Url,
    pub server_secret: ServerSecret,
    pub merchant: MerchantProfileConfig,
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self> {
        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("PORT")
            .ok()
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(8086);
        let public_base_url =
            env::var("PUBLIC_BASE_URL").context("PUBLIC_BASE_URL must be set")?;
        let public_base_url = parse_base_url(&public_base_url)?;
        let server_secret = env::var("DATATRANS_SERVER_SECRET")
            .context("DATATRANS_SERVER_SECRET must be set")?;
        let server_secret = ServerSecret::from_base64(&server_secret)
            .context("DATATRANS_SERVER_SECRET must be base64 of at least 16 bytes")?;
        let merchant_id =
            env::var("DATATRANS_MERCHANT_ID").context("DATATRANS_MERCHANT_ID must be set")?;

        let security = SecuritySettings {
            security_level: env::var("DATATRANS_SECURITY_LEVEL")
                .ok()
                .and_then(|value| value.trim().parse::<u8>().ok())
                .unwrap_or(2),
            merchant_control_constant: env::var("DATATRANS_MERCHANT_CONTROL_CONSTANT")
                .unwrap_or_default(),
            hmac_key: env::var("DATATRANS_HMAC_KEY").unwrap_or_default(),
            hmac_key_2: env::var("DATATRANS_HMAC_KEY_2").unwrap_or_default(),
            use_hmac_2: env_flag("DATATRANS_USE_HMAC_2"),
        };
        let merchant = MerchantProfileConfig {
            merchant_id,
            up_start_url: env::var("DATATRANS_START_URL")
                .unwrap_or_else(|_| DEFAULT_START_URL.to_string()),
            req_type: env::var("DATATRANS_REQ_TYPE").unwrap_or_else(|_| "CAA".to_string()),
            security,
            debug: env_flag("DATATRANS_DEBUG"),
        };

        Ok(Self {
            host,
            port,
            public_base_url,
            server_secret,
            merchant,
        })
    }

    /// Validates the merchant configuration; fails startup when it cannot sign.
    pub fn merchant_profile(&self) -> Result<MerchantProfile> {
        MerchantProfile::try_from(self.merchant.clone())
            .context("invalid Datatrans merchant configuration")
    }
}

/// Return URLs are joined onto this, so it always ends with a slash.
pub fn parse_base_url(value: &str) -> Result<Url> {
    let trimmed = value.trim().trim_end_matches('/');
    Url::parse(&format!("{trimmed}/")).with_context(|| format!("'{value}' is not an absolute URL"))
}

fn env_flag(name: &str) -> bool {
    env::var(name)
        .map(|value| matches!(value.trim(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}
