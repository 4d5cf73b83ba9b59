//! Data Transfer Objects - request/response types for the API.
//!
//! Field names follow the camelCase JSON the blog frontend speaks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Body of `POST /api/posts`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreatePostRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub desc: String,
    /// Defaults to `general` when absent.
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub img: Option<String>,
}

/// Body of `PUT /api/posts/{id}`. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdatePostRequest {
    pub title: Option<String>,
    pub desc: Option<String>,
    pub category: Option<String>,
    pub content: Option<String>,
    pub img: Option<String>,
}

/// Body of the toggle endpoints (`PATCH /api/posts/feature`, `PATCH /api/users/save`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostIdRequest {
    pub post_id: Uuid,
}

/// Owner fields embedded in a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorResponse {
    pub id: Uuid,
    pub username: String,
    pub img: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostResponse {
    pub id: Uuid,
    /// Owner id, or the owner's public fields when the post was read
    /// together with its owner.
    pub user: PostOwner,
    pub title: String,
    pub slug: String,
    pub desc: String,
    pub category: String,
    pub content: String,
    pub img: Option<String>,
    pub visit: i64,
    pub is_featured: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PostOwner {
    Author(AuthorResponse),
    Id(Uuid),
}

/// Response of `GET /api/posts`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostListResponse {
    pub posts: Vec<PostResponse>,
    pub has_more: bool,
    pub total_posts: u64,
}

/// Response of `PATCH /api/users/save`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveToggleResponse {
    pub saved: bool,
    pub message: String,
}

impl SaveToggleResponse {
    pub fn new(saved: bool) -> Self {
        let message = if saved { "Post saved" } else { "Post unsaved" };
        Self {
            saved,
            message: message.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub email: Option<String>,
    pub img: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Body of `POST /api/comments/{postId}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateCommentRequest {
    #[serde(default)]
    pub desc: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentResponse {
    pub id: Uuid,
    /// Writer's public fields; `null` once the writer's account is gone.
    pub user: Option<AuthorResponse>,
    pub post: Uuid,
    pub desc: String,
    pub created_at: DateTime<Utc>,
}

/// Signed parameters for a direct browser upload to the media host.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadAuthResponse {
    pub token: String,
    pub expire: i64,
    pub signature: String,
    pub public_key: String,
    pub url_endpoint: String,
}
