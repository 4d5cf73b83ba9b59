//! Comments on posts.

use std::sync::Arc;

use uuid::Uuid;

use super::users::resolve_user;
use crate::context::RequestContext;
use crate::domain::{AuthorSummary, Comment, CommentWithAuthor};
use crate::error::DomainError;
use crate::ports::{CommentRepository, PostRepository, UserRepository};

/// List, add and delete comments.
#[derive(Clone)]
pub struct CommentService {
    comments: Arc<dyn CommentRepository>,
    posts: Arc<dyn PostRepository>,
    users: Arc<dyn UserRepository>,
}

impl CommentService {
    pub fn new(
        comments: Arc<dyn CommentRepository>,
        posts: Arc<dyn PostRepository>,
        users: Arc<dyn UserRepository>,
    ) -> Self {
        Self {
            comments,
            posts,
            users,
        }
    }

    /// Comments on a post, newest first. Unknown posts have no comments.
    pub async fn list(&self, post_id: Uuid) -> Result<Vec<CommentWithAuthor>, DomainError> {
        Ok(self.comments.find_by_post(post_id).await?)
    }

    /// Comment on an existing post as the caller.
    pub async fn add(
        &self,
        ctx: &RequestContext,
        post_id: Uuid,
        desc: String,
    ) -> Result<CommentWithAuthor, DomainError> {
        let user = resolve_user(self.users.as_ref(), ctx).await?;
        Comment::validate_desc(&desc)?;

        if self.posts.find_by_id(post_id).await?.is_none() {
            return Err(DomainError::not_found("post", post_id));
        }

        let comment = self.comments.insert(Comment::new(post_id, user.id, desc)).await?;
        tracing::info!(comment_id = %comment.id, %post_id, user_id = %user.id, "Comment added");

        Ok(CommentWithAuthor {
            comment,
            author: Some(AuthorSummary {
                id: user.id,
                username: user.username,
                img: user.img,
            }),
        })
    }

    /// Delete a comment. Admins may delete any comment, writers only their own.
    pub async fn delete(&self, ctx: &RequestContext, id: Uuid) -> Result<(), DomainError> {
        ctx.session()?;

        let comment = self
            .comments
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("comment", id))?;

        if !ctx.is_admin() {
            let user = resolve_user(self.users.as_ref(), ctx).await?;
            if user.id != comment.user_id {
                return Err(DomainError::Forbidden(
                    "You can delete only your comment!".to_string(),
                ));
            }
        }

        self.comments.delete(id).await?;

        tracing::info!(comment_id = %id, admin = ctx.is_admin(), "Comment deleted");
        Ok(())
    }
}
