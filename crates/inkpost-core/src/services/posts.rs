//! Post lifecycle operations.

use std::sync::Arc;

use uuid::Uuid;

use super::listing::PostListing;
use super::slug::SlugAllocator;
use super::users::resolve_user;
use crate::context::RequestContext;
use crate::domain::{ListingParams, Post, PostDraft, PostPage, PostPatch, PostWithAuthor};
use crate::error::{DomainError, RepoError};
use crate::ports::{PostRepository, UserRepository};

/// Create, read, edit, delete and feature posts.
#[derive(Clone)]
pub struct PostService {
    posts: Arc<dyn PostRepository>,
    users: Arc<dyn UserRepository>,
    listing: PostListing,
    slugs: SlugAllocator,
}

impl PostService {
    pub fn new(posts: Arc<dyn PostRepository>, users: Arc<dyn UserRepository>) -> Self {
        Self {
            listing: PostListing::new(posts.clone(), users.clone()),
            slugs: SlugAllocator::new(posts.clone()),
            posts,
            users,
        }
    }

    pub async fn list(&self, params: &ListingParams) -> Result<PostPage, DomainError> {
        self.listing.list(params).await
    }

    /// Fetch a post for its detail view and count the visit.
    ///
    /// The counter is a read-modify-write over two store calls: concurrent
    /// views of the same post can overwrite each other's increment.
    pub async fn view(&self, slug: &str) -> Result<PostWithAuthor, DomainError> {
        let mut found = self
            .posts
            .find_by_slug(slug)
            .await?
            .ok_or_else(|| DomainError::not_found("post", slug))?;

        let visit = found.post.visit + 1;
        match self.posts.set_visit(found.post.id, visit).await {
            Ok(()) => found.post.visit = visit,
            Err(e) => tracing::warn!(%slug, error = %e, "Failed to record post visit"),
        }

        Ok(found)
    }

    /// Write a new post owned by the caller, with a freshly allocated slug.
    pub async fn create(&self, ctx: &RequestContext, draft: PostDraft) -> Result<Post, DomainError> {
        let user = resolve_user(self.users.as_ref(), ctx).await?;
        draft.validate()?;

        let title = draft.title.clone();
        let post = self
            .slugs
            .insert_with_unique_slug(&title, |slug| Post::new(user.id, slug, draft.clone()))
            .await?;

        tracing::info!(post_id = %post.id, slug = %post.slug, user_id = %user.id, "Post created");
        Ok(post)
    }

    /// Edit the content fields of a post. Owner or admin only.
    pub async fn update(
        &self,
        ctx: &RequestContext,
        id: Uuid,
        patch: PostPatch,
    ) -> Result<Post, DomainError> {
        ctx.session()?;
        patch.validate()?;

        let post = self.find(id).await?;
        self.authorize_owner_or_admin(ctx, &post, "You can only edit your own posts")
            .await?;

        let post = self
            .posts
            .update_content(id, &patch)
            .await
            .map_err(missing_post(id))?;

        tracing::info!(post_id = %post.id, "Post updated");
        Ok(post)
    }

    /// Delete a post. Admins may delete any post, owners only their own.
    pub async fn delete(&self, ctx: &RequestContext, id: Uuid) -> Result<(), DomainError> {
        ctx.session()?;

        let post = self.find(id).await?;
        self.authorize_owner_or_admin(ctx, &post, "You can delete only your posts")
            .await?;

        self.posts.delete(post.id).await?;

        tracing::info!(post_id = %id, admin = ctx.is_admin(), "Post deleted");
        Ok(())
    }

    /// Flip the featured flag. Admin only.
    pub async fn toggle_feature(&self, ctx: &RequestContext, id: Uuid) -> Result<Post, DomainError> {
        ctx.session()?;
        if !ctx.is_admin() {
            return Err(DomainError::Forbidden("You cannot feature posts".to_string()));
        }

        let post = self.find(id).await?;
        let post = self
            .posts
            .set_featured(id, !post.is_featured)
            .await
            .map_err(missing_post(id))?;

        tracing::info!(post_id = %post.id, featured = post.is_featured, "Post feature flag toggled");
        Ok(post)
    }

    async fn find(&self, id: Uuid) -> Result<Post, DomainError> {
        self.posts
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("post", id))
    }

    async fn authorize_owner_or_admin(
        &self,
        ctx: &RequestContext,
        post: &Post,
        denial: &str,
    ) -> Result<(), DomainError> {
        if ctx.is_admin() {
            return Ok(());
        }

        let user = resolve_user(self.users.as_ref(), ctx).await?;
        if user.id != post.user_id {
            tracing::debug!(post_id = %post.id, user_id = %user.id, "Ownership check failed");
            return Err(DomainError::Forbidden(denial.to_string()));
        }
        Ok(())
    }
}

/// A post deleted between the read and the write is reported by id.
fn missing_post(id: Uuid) -> impl FnOnce(RepoError) -> DomainError {
    move |err| match err {
        RepoError::NotFound => DomainError::not_found("post", id),
        other => other.into(),
    }
}
