//! # Inkpost Core
//!
//! The domain layer of the Inkpost blogging backend.
//! This crate contains entities, the post listing model, the slug allocator
//! and the post, comment and user services. It has zero infrastructure
//! dependencies: storage, identity and media hosting are reached through the
//! traits in [`ports`].

pub mod context;
pub mod domain;
pub mod error;
pub mod ports;
pub mod services;

pub use context::{RequestContext, Role};
pub use error::{DomainError, RepoError};
