//! Application services - the operations the HTTP layer exposes.

mod comments;
mod listing;
mod posts;
mod slug;
mod users;

pub use comments::CommentService;
pub use listing::PostListing;
pub use posts::PostService;
pub use slug::{MAX_INSERT_ATTEMPTS, RESERVED_SLUGS, SlugAllocator, normalize_title, slug_candidate};
pub use users::{SaveToggle, UserService};
