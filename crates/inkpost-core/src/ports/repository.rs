use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{
    Comment, CommentWithAuthor, PageRequest, Post, PostFilter, PostPatch, PostWithAuthor, SortMode,
    User,
};
use crate::error::RepoError;

/// Generic repository trait defining standard CRUD operations.
#[async_trait]
pub trait BaseRepository<T, ID>: Send + Sync {
    /// Find an entity by its unique ID.
    async fn find_by_id(&self, id: ID) -> Result<Option<T>, RepoError>;

    /// Insert a new entity. Unique-key collisions are `RepoError::Constraint`.
    async fn insert(&self, entity: T) -> Result<T, RepoError>;

    /// Delete an entity by its ID.
    async fn delete(&self, id: ID) -> Result<(), RepoError>;
}

/// User repository with domain-specific methods.
#[async_trait]
pub trait UserRepository: BaseRepository<User, Uuid> {
    async fn find_by_external_id(&self, external_id: &str) -> Result<Option<User>, RepoError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError>;

    /// Saved post ids in the order they were saved.
    async fn saved_post_ids(&self, user_id: Uuid) -> Result<Vec<Uuid>, RepoError>;

    /// Add to the saved set. Adding a member twice keeps a single entry.
    async fn add_saved_post(&self, user_id: Uuid, post_id: Uuid) -> Result<(), RepoError>;

    async fn remove_saved_post(&self, user_id: Uuid, post_id: Uuid) -> Result<(), RepoError>;
}

/// Post repository.
#[async_trait]
pub trait PostRepository: BaseRepository<Post, Uuid> {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<PostWithAuthor>, RepoError>;

    async fn slug_exists(&self, slug: &str) -> Result<bool, RepoError>;

    /// Number of posts matching `filter`, ignoring pagination.
    async fn count(&self, filter: &PostFilter) -> Result<u64, RepoError>;

    /// One sorted page of posts matching `filter`, owners attached.
    async fn find_page(
        &self,
        filter: &PostFilter,
        sort: SortMode,
        page: PageRequest,
    ) -> Result<Vec<PostWithAuthor>, RepoError>;

    /// Posts with the given ids, newest first. Unknown ids are skipped.
    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<PostWithAuthor>, RepoError>;

    /// Overwrite the visit counter.
    async fn set_visit(&self, id: Uuid, visit: i64) -> Result<(), RepoError>;

    /// Write only the fields present in `patch` and bump `updated_at`.
    /// Columns the patch leaves out keep whatever the store holds now.
    async fn update_content(&self, id: Uuid, patch: &PostPatch) -> Result<Post, RepoError>;

    /// Write only the featured flag.
    async fn set_featured(&self, id: Uuid, featured: bool) -> Result<Post, RepoError>;
}

/// Comment repository.
#[async_trait]
pub trait CommentRepository: BaseRepository<Comment, Uuid> {
    /// Comments on a post, newest first, writers attached.
    async fn find_by_post(&self, post_id: Uuid) -> Result<Vec<CommentWithAuthor>, RepoError>;
}
