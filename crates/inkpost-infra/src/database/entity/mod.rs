//! SeaORM entities.

pub mod comment;
pub mod post;
pub mod saved_post;
pub mod user;
