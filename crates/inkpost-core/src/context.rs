//! Request-scoped identity capability.
//!
//! Every service operation that needs to know who is calling receives a
//! [`RequestContext`] explicitly. The HTTP layer builds one per request from
//! the identity provider's session claims; tests build them directly.

use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::ports::SessionClaims;

/// Authorization level claimed by the identity provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    /// Interpret a raw role claim. Anything other than `admin` is a plain user.
    pub fn from_claim(claim: Option<&str>) -> Self {
        match claim {
            Some(role) if role.eq_ignore_ascii_case("admin") => Role::Admin,
            _ => Role::User,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

/// Who is making the current request, if anyone.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    session: Option<SessionClaims>,
}

impl RequestContext {
    pub fn anonymous() -> Self {
        Self { session: None }
    }

    pub fn authenticated(claims: SessionClaims) -> Self {
        Self {
            session: Some(claims),
        }
    }

    /// The caller's session, or `Unauthenticated` for anonymous requests.
    pub fn session(&self) -> Result<&SessionClaims, DomainError> {
        self.session.as_ref().ok_or(DomainError::Unauthenticated)
    }

    pub fn role(&self) -> Role {
        self.session
            .as_ref()
            .map(|s| s.role)
            .unwrap_or_default()
    }

    pub fn is_admin(&self) -> bool {
        self.role() == Role::Admin
    }
}
