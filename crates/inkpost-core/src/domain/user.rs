use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// User entity - a local account linked to an identity-provider subject.
///
/// Saved posts are a set relation kept by the repository, see
/// [`UserRepository::saved_post_ids`](crate::ports::UserRepository::saved_post_ids).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub external_id: String,
    pub username: String,
    pub email: Option<String>,
    pub img: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new user with generated ID and timestamps.
    pub fn new(
        external_id: String,
        username: String,
        email: Option<String>,
        img: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            external_id,
            username,
            email,
            img,
            created_at: now,
            updated_at: now,
        }
    }
}
