//! Session verification implementations.

mod jwt;

pub use jwt::{JwtSessionConfig, JwtSessionVerifier};
