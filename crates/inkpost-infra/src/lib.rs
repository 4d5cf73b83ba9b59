//! # Inkpost Infrastructure
//!
//! Concrete implementations of the ports defined in `inkpost-core`.
//! This crate contains the database repositories, session verification and
//! media upload signing.
//!
//! ## Feature Flags
//!
//! - `full` (default) - All features enabled
//! - `minimal` - No external dependencies, in-memory only
//! - `postgres` - PostgreSQL repositories via SeaORM
//! - `auth` - JWT session verification
//! - `media` - HMAC-SHA256 signed upload credentials

pub mod database;

#[cfg(feature = "auth")]
pub mod auth;

#[cfg(feature = "media")]
pub mod media;

// Re-exports - In-Memory
pub use database::{DatabaseConfig, InMemoryDatabase};

#[cfg(feature = "postgres")]
pub use database::{PostgresCommentRepository, PostgresPostRepository, PostgresUserRepository};

#[cfg(feature = "auth")]
pub use auth::{JwtSessionConfig, JwtSessionVerifier};

#[cfg(feature = "media")]
pub use media::{HmacMediaSigner, MediaConfig};
