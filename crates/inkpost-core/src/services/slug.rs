//! Slug derivation and allocation.

use std::sync::Arc;

use crate::domain::Post;
use crate::error::{DomainError, RepoError};
use crate::ports::PostRepository;

/// How many times an insert is retried after losing a slug to a concurrent
/// writer.
pub const MAX_INSERT_ATTEMPTS: u32 = 5;

/// Fixed path segments under `/api/posts` that a slug must never shadow.
pub const RESERVED_SLUGS: &[&str] = &["upload-auth", "feature"];

/// Turn a title into a base slug: every whitespace character and `/` becomes
/// `-` and the result is lower-cased. Other punctuation and non-ASCII text
/// are kept.
pub fn normalize_title(title: &str) -> Result<String, DomainError> {
    if title.trim().is_empty() {
        return Err(DomainError::Validation(
            "title must contain at least one non-whitespace character".to_string(),
        ));
    }

    Ok(title
        .chars()
        .map(|c| if c.is_whitespace() || c == '/' { '-' } else { c })
        .collect::<String>()
        .to_lowercase())
}

/// The `counter`-th candidate for `base`: `base`, `base-2`, `base-3`, ...
pub fn slug_candidate(base: &str, counter: u32) -> String {
    if counter < 2 {
        base.to_string()
    } else {
        format!("{base}-{counter}")
    }
}

/// Allocates unique slugs by checking candidates against the post store.
#[derive(Clone)]
pub struct SlugAllocator {
    posts: Arc<dyn PostRepository>,
}

impl SlugAllocator {
    pub fn new(posts: Arc<dyn PostRepository>) -> Self {
        Self { posts }
    }

    /// First free candidate at or after `counter`, with the counter it used.
    /// Reserved route segments count as taken.
    pub async fn next_free(&self, base: &str, mut counter: u32) -> Result<(String, u32), DomainError> {
        loop {
            let candidate = slug_candidate(base, counter);
            if !RESERVED_SLUGS.contains(&candidate.as_str())
                && !self.posts.slug_exists(&candidate).await?
            {
                return Ok((candidate, counter));
            }
            counter = counter.max(1) + 1;
        }
    }

    /// Find a free slug and insert the post built for it.
    ///
    /// Checking and inserting are separate store calls, so a concurrent writer
    /// can take the slug in between. The store's unique index rejects the
    /// second insert; the search then resumes from the next counter.
    pub async fn insert_with_unique_slug<F>(&self, title: &str, build: F) -> Result<Post, DomainError>
    where
        F: Fn(String) -> Post + Send + Sync,
    {
        let base = normalize_title(title)?;
        let mut counter = 1;

        for attempt in 1..=MAX_INSERT_ATTEMPTS {
            let (slug, used) = self.next_free(&base, counter).await?;
            match self.posts.insert(build(slug.clone())).await {
                Ok(post) => {
                    tracing::debug!(slug = %post.slug, attempt, "Slug allocated");
                    return Ok(post);
                }
                Err(RepoError::Constraint(reason)) => {
                    tracing::warn!(%slug, attempt, %reason, "Slug taken by a concurrent insert, retrying");
                    counter = used.max(1) + 1;
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(DomainError::Conflict(format!(
            "could not allocate a unique slug for '{base}'"
        )))
    }
}
