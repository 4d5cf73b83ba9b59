//! Identity provider port.

use serde::{Deserialize, Serialize};

use crate::context::Role;

/// Claims the identity provider attaches to a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Opaque subject identifier issued by the provider.
    pub external_id: String,
    pub role: Role,
    pub username: Option<String>,
    pub img: Option<String>,
    pub email: Option<String>,
    pub exp: i64,
}

impl SessionClaims {
    pub fn new(external_id: impl Into<String>) -> Self {
        Self {
            external_id: external_id.into(),
            role: Role::User,
            username: None,
            img: None,
            email: None,
            exp: 0,
        }
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }
}

/// Verifies session tokens issued by the identity provider.
pub trait SessionVerifier: Send + Sync {
    /// Validate and decode a session token.
    fn verify(&self, token: &str) -> Result<SessionClaims, AuthError>;
}

/// Authentication errors.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Session expired")]
    SessionExpired,

    #[error("Invalid session token: {0}")]
    InvalidToken(String),

    #[error("Signing error: {0}")]
    Signing(String),
}
