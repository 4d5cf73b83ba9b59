use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::AuthorSummary;
use crate::error::DomainError;

/// A reader's comment on a post. Comments are never edited.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub post_id: Uuid,
    pub user_id: Uuid,
    pub desc: String,
    pub created_at: DateTime<Utc>,
}

impl Comment {
    pub fn new(post_id: Uuid, user_id: Uuid, desc: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            post_id,
            user_id,
            desc,
            created_at: Utc::now(),
        }
    }

    /// Reject blank comment text.
    pub fn validate_desc(desc: &str) -> Result<(), DomainError> {
        if desc.trim().is_empty() {
            return Err(DomainError::Validation("comment cannot be empty".to_string()));
        }
        Ok(())
    }
}

/// A comment with its writer's display fields attached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentWithAuthor {
    pub comment: Comment,
    pub author: Option<AuthorSummary>,
}
