//! User provisioning and saved posts.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::context::RequestContext;
use crate::domain::{PostWithAuthor, User};
use crate::error::{DomainError, RepoError};
use crate::ports::{PostRepository, UserRepository};

/// Resolve the caller to their local user record.
pub(crate) async fn resolve_user(
    users: &dyn UserRepository,
    ctx: &RequestContext,
) -> Result<User, DomainError> {
    let session = ctx.session()?;
    users
        .find_by_external_id(&session.external_id)
        .await?
        .ok_or_else(|| DomainError::not_found("user", &session.external_id))
}

/// Outcome of a save/unsave toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveToggle {
    pub post_id: Uuid,
    /// Whether the post is saved after the toggle.
    pub saved: bool,
}

/// User-scoped operations.
#[derive(Clone)]
pub struct UserService {
    users: Arc<dyn UserRepository>,
    posts: Arc<dyn PostRepository>,
}

impl UserService {
    pub fn new(users: Arc<dyn UserRepository>, posts: Arc<dyn PostRepository>) -> Self {
        Self { users, posts }
    }

    /// Return the caller's user record, creating it on first contact.
    pub async fn provision(&self, ctx: &RequestContext) -> Result<User, DomainError> {
        let session = ctx.session()?;
        if let Some(user) = self.users.find_by_external_id(&session.external_id).await? {
            return Ok(user);
        }

        let username = session
            .username
            .clone()
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| fallback_username(&session.external_id));

        if self.users.find_by_username(&username).await?.is_some() {
            return Err(DomainError::Conflict(format!(
                "username '{username}' is already taken"
            )));
        }

        let user = User::new(
            session.external_id.clone(),
            username,
            session.email.clone(),
            session.img.clone(),
        );

        match self.users.insert(user).await {
            Ok(user) => {
                tracing::info!(user_id = %user.id, username = %user.username, "User provisioned");
                Ok(user)
            }
            // Lost a race with a concurrent first request for the same subject.
            Err(RepoError::Constraint(reason)) => self
                .users
                .find_by_external_id(&session.external_id)
                .await?
                .ok_or(DomainError::Conflict(reason)),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn saved_post_ids(&self, ctx: &RequestContext) -> Result<Vec<Uuid>, DomainError> {
        let user = resolve_user(self.users.as_ref(), ctx).await?;
        Ok(self.users.saved_post_ids(user.id).await?)
    }

    /// Saved posts resolved to full records, newest first.
    pub async fn saved_posts(&self, ctx: &RequestContext) -> Result<Vec<PostWithAuthor>, DomainError> {
        let user = resolve_user(self.users.as_ref(), ctx).await?;
        let ids = self.users.saved_post_ids(user.id).await?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.posts.find_by_ids(&ids).await?)
    }

    /// Save the post if it is not saved, unsave it otherwise.
    ///
    /// Reads the saved set, then writes: two concurrent toggles by the same
    /// user may both observe the same state.
    pub async fn toggle_saved(
        &self,
        ctx: &RequestContext,
        post_id: Uuid,
    ) -> Result<SaveToggle, DomainError> {
        let user = resolve_user(self.users.as_ref(), ctx).await?;
        let is_saved = self.users.saved_post_ids(user.id).await?.contains(&post_id);

        if is_saved {
            self.users.remove_saved_post(user.id, post_id).await?;
        } else {
            if self.posts.find_by_id(post_id).await?.is_none() {
                return Err(DomainError::not_found("post", post_id));
            }
            self.users.add_saved_post(user.id, post_id).await?;
        }

        tracing::debug!(user_id = %user.id, %post_id, saved = !is_saved, "Saved posts toggled");
        Ok(SaveToggle {
            post_id,
            saved: !is_saved,
        })
    }
}

fn fallback_username(external_id: &str) -> String {
    let short: String = external_id
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(8)
        .collect();
    format!("user-{}", short.to_lowercase())
}
