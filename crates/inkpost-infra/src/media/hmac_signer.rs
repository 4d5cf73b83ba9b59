//! Signed upload credentials for a direct-to-media-host upload.
//!
//! The client receives a random token, an expiry timestamp and
//! `hex(HMAC-SHA256(private_key, token + expire))`; the media host recomputes
//! the signature with the same private key.

use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use uuid::Uuid;

use inkpost_core::ports::{MediaError, MediaSigner, UploadCredentials};

type HmacSha256 = Hmac<Sha256>;

/// Media host credentials.
#[derive(Debug, Clone)]
pub struct MediaConfig {
    pub public_key: String,
    pub private_key: String,
    pub url_endpoint: String,
    /// Seconds an upload signature stays valid.
    pub token_ttl_secs: i64,
}

impl MediaConfig {
    /// Load from `MEDIA_*` variables. Returns `None` when the private key is
    /// not set.
    pub fn from_env() -> Option<Self> {
        let private_key = std::env::var("MEDIA_PRIVATE_KEY").ok()?;
        Some(Self {
            public_key: std::env::var("MEDIA_PUBLIC_KEY").unwrap_or_default(),
            private_key,
            url_endpoint: std::env::var("MEDIA_URL_ENDPOINT").unwrap_or_default(),
            token_ttl_secs: std::env::var("MEDIA_TOKEN_TTL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1800),
        })
    }
}

/// HMAC-SHA256 upload signer. Without configuration every request fails
/// with [`MediaError::NotConfigured`].
pub struct HmacMediaSigner {
    config: Option<MediaConfig>,
}

impl HmacMediaSigner {
    pub fn new(config: MediaConfig) -> Self {
        Self {
            config: Some(config),
        }
    }

    pub fn unconfigured() -> Self {
        Self { config: None }
    }

    pub fn from_env() -> Self {
        match MediaConfig::from_env() {
            Some(config) => Self::new(config),
            None => {
                tracing::warn!("MEDIA_PRIVATE_KEY not set. Upload credentials are disabled.");
                Self::unconfigured()
            }
        }
    }

    fn sign(private_key: &str, token: &str, expire: i64) -> Result<String, MediaError> {
        let mut mac = HmacSha256::new_from_slice(private_key.as_bytes())
            .map_err(|e| MediaError::Signing(e.to_string()))?;
        mac.update(token.as_bytes());
        mac.update(expire.to_string().as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }
}

impl MediaSigner for HmacMediaSigner {
    fn upload_credentials(&self) -> Result<UploadCredentials, MediaError> {
        let config = self.config.as_ref().ok_or(MediaError::NotConfigured)?;

        let token = Uuid::new_v4().to_string();
        let expire = Utc::now().timestamp() + config.token_ttl_secs;
        let signature = Self::sign(&config.private_key, &token, expire)?;

        Ok(UploadCredentials {
            token,
            expire,
            signature,
            public_key: config.public_key.clone(),
            url_endpoint: config.url_endpoint.clone(),
        })
    }
}
