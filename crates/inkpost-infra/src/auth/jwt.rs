//! JWT session verification for identity-provider session tokens.

use chrono::{TimeDelta, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use inkpost_core::Role;
use inkpost_core::ports::{AuthError, SessionClaims, SessionVerifier};

const DEFAULT_SECRET: &str = "change-me-in-production";

/// Session token configuration.
#[derive(Debug, Clone)]
pub struct JwtSessionConfig {
    /// Shared secret the identity provider signs sessions with.
    pub secret: String,
    pub issuer: String,
    /// Lifetime of tokens minted by [`JwtSessionVerifier::issue`].
    pub expiration_hours: i64,
}

impl Default for JwtSessionConfig {
    fn default() -> Self {
        Self {
            secret: DEFAULT_SECRET.to_string(),
            issuer: "inkpost-identity".to_string(),
            expiration_hours: 24,
        }
    }
}

impl JwtSessionConfig {
    pub fn from_env() -> Self {
        let secret = std::env::var("SESSION_SECRET").unwrap_or_else(|_| DEFAULT_SECRET.to_string());

        // Warn if using default secret in production
        if secret == DEFAULT_SECRET {
            let is_production = std::env::var("RUST_ENV")
                .map(|v| v == "production" || v == "prod")
                .unwrap_or(false);

            if is_production {
                tracing::error!(
                    "SECURITY: Using default session secret in production! Set SESSION_SECRET environment variable."
                );
            } else {
                tracing::warn!("Using default session secret. Set SESSION_SECRET for production use.");
            }
        }

        Self {
            secret,
            issuer: std::env::var("SESSION_ISSUER")
                .unwrap_or_else(|_| "inkpost-identity".to_string()),
            expiration_hours: std::env::var("SESSION_EXPIRATION_HOURS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(24),
        }
    }
}

/// Role claim nested under `metadata`, as the identity provider sends it.
#[derive(Debug, Default, Serialize, Deserialize)]
struct Metadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
}

/// Wire layout of the session token.
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String, // external user id
    exp: i64,
    iat: i64,
    iss: String,
    #[serde(default)]
    metadata: Metadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    img: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    email: Option<String>,
}

/// HS256 session verifier.
pub struct JwtSessionVerifier {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    config: JwtSessionConfig,
}

impl JwtSessionVerifier {
    pub fn new(config: JwtSessionConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());

        Self {
            encoding_key,
            decoding_key,
            config,
        }
    }

    pub fn from_env() -> Self {
        Self::new(JwtSessionConfig::from_env())
    }

    /// Mint a session token the way the identity provider does. Used by
    /// local tooling and tests.
    pub fn issue(&self, session: &SessionClaims) -> Result<String, AuthError> {
        let now = Utc::now();
        let exp = now + TimeDelta::hours(self.config.expiration_hours);

        let claims = Claims {
            sub: session.external_id.clone(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
            iss: self.config.issuer.clone(),
            metadata: Metadata {
                role: Some(session.role.as_str().to_string()),
            },
            username: session.username.clone(),
            img: session.img.clone(),
            email: session.email.clone(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Signing(e.to_string()))
    }
}

impl SessionVerifier for JwtSessionVerifier {
    fn verify(&self, token: &str) -> Result<SessionClaims, AuthError> {
        let mut validation = Validation::default();
        validation.set_issuer(&[&self.config.issuer]);

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::SessionExpired,
                _ => AuthError::InvalidToken(e.to_string()),
            }
        })?;

        let claims = token_data.claims;
        if claims.sub.is_empty() {
            return Err(AuthError::InvalidToken("empty subject".to_string()));
        }

        Ok(SessionClaims {
            external_id: claims.sub,
            role: Role::from_claim(claims.metadata.role.as_deref()),
            username: claims.username,
            img: claims.img,
            email: claims.email,
            exp: claims.exp,
        })
    }
}
