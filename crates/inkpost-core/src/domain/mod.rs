//! Domain entities - the core business objects.

mod comment;
mod listing;
mod post;
mod user;

pub use comment::{Comment, CommentWithAuthor};
pub use listing::{ListingParams, PageRequest, PostFilter, PostPage, SortMode};
pub use post::{AuthorSummary, Category, Post, PostDraft, PostPatch, PostWithAuthor};
pub use user::User;
