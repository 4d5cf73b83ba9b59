//! Ports - trait definitions for external collaborators.
//! These are the "interfaces" that infrastructure must implement.

mod auth;
mod media;
mod repository;

pub use auth::{AuthError, SessionClaims, SessionVerifier};
pub use media::{MediaError, MediaSigner, UploadCredentials};
pub use repository::{BaseRepository, CommentRepository, PostRepository, UserRepository};
