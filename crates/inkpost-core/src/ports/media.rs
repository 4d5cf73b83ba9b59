//! Media host port.

use serde::{Deserialize, Serialize};

/// Short-lived parameters a client uses to upload directly to the media host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadCredentials {
    pub token: String,
    /// Unix timestamp after which the signature is rejected.
    pub expire: i64,
    pub signature: String,
    pub public_key: String,
    pub url_endpoint: String,
}

/// Issues signed upload credentials.
pub trait MediaSigner: Send + Sync {
    fn upload_credentials(&self) -> Result<UploadCredentials, MediaError>;
}

/// Media host errors.
#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("Media host is not configured")]
    NotConfigured,

    #[error("Signing failed: {0}")]
    Signing(String),
}
