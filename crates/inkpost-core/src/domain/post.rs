use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// Fixed set of post categories.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    #[default]
    General,
    WebDesign,
    Development,
    Databases,
    Seo,
    Marketing,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::General,
        Category::WebDesign,
        Category::Development,
        Category::Databases,
        Category::Seo,
        Category::Marketing,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::General => "general",
            Category::WebDesign => "web-design",
            Category::Development => "development",
            Category::Databases => "databases",
            Category::Seo => "seo",
            Category::Marketing => "marketing",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| DomainError::Validation(format!("unknown category '{s}'")))
    }
}

/// Post entity - a blog post owned by exactly one user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    /// Unique across all posts, never changes after creation.
    pub slug: String,
    pub description: String,
    pub category: Category,
    pub content: String,
    /// Cover image reference issued by the media host.
    pub img: Option<String>,
    pub visit: i64,
    pub is_featured: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Post {
    /// Create a new post from a submitted draft.
    pub fn new(user_id: Uuid, slug: String, draft: PostDraft) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            title: draft.title,
            slug,
            description: draft.description,
            category: draft.category,
            content: draft.content,
            img: draft.img,
            visit: 0,
            is_featured: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply an edit. Owner, slug and creation time are left untouched.
    pub fn apply(&mut self, patch: PostPatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(category) = patch.category {
            self.category = category;
        }
        if let Some(content) = patch.content {
            self.content = content;
        }
        if let Some(img) = patch.img {
            self.img = Some(img);
        }
        self.updated_at = Utc::now();
    }
}

/// Fields submitted when writing a new post.
#[derive(Debug, Clone, Default)]
pub struct PostDraft {
    pub title: String,
    pub description: String,
    pub category: Category,
    pub content: String,
    pub img: Option<String>,
}

impl PostDraft {
    pub fn validate(&self) -> Result<(), DomainError> {
        let mut missing = Vec::new();
        if self.title.trim().is_empty() {
            missing.push("title");
        }
        if self.description.trim().is_empty() {
            missing.push("description");
        }
        if self.content.trim().is_empty() {
            missing.push("content");
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(DomainError::Validation(format!(
                "missing required fields: {}",
                missing.join(", ")
            )))
        }
    }
}

/// Content fields an owner or admin may change.
#[derive(Debug, Clone, Default)]
pub struct PostPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<Category>,
    pub content: Option<String>,
    pub img: Option<String>,
}

impl PostPatch {
    pub fn validate(&self) -> Result<(), DomainError> {
        let blank = |field: &Option<String>| field.as_deref().is_some_and(|v| v.trim().is_empty());
        if blank(&self.title) || blank(&self.description) || blank(&self.content) {
            return Err(DomainError::Validation(
                "title, description and content cannot be blank".to_string(),
            ));
        }
        Ok(())
    }
}

/// Display fields of a post's owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorSummary {
    pub id: Uuid,
    pub username: String,
    pub img: Option<String>,
}

/// A post with its owner's display fields attached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostWithAuthor {
    pub post: Post,
    pub author: Option<AuthorSummary>,
}
