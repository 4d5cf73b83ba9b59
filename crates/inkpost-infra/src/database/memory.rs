//! In-memory repositories - used when no database is configured, and by tests.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use inkpost_core::domain::{
    AuthorSummary, Comment, CommentWithAuthor, PageRequest, Post, PostFilter, PostPatch,
    PostWithAuthor, SortMode, User,
};
use inkpost_core::error::RepoError;
use inkpost_core::ports::{BaseRepository, CommentRepository, PostRepository, UserRepository};

/// In-memory post, user and comment store with the same uniqueness rules as
/// the Postgres schema (unique slug, username and external id). Deletes
/// cascade the way the schema's foreign keys do.
///
/// Posts keep insertion order, which serves as the natural tie-break order
/// for equal sort keys.
/// Note: Data is lost on process restart.
#[derive(Default)]
pub struct InMemoryDatabase {
    posts: RwLock<Vec<Post>>,
    users: RwLock<HashMap<Uuid, User>>,
    saved: RwLock<HashMap<Uuid, Vec<Uuid>>>,
    comments: RwLock<Vec<Comment>>,
}

impl InMemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    async fn attach_authors(&self, posts: Vec<Post>) -> Vec<PostWithAuthor> {
        let users = self.users.read().await;
        posts
            .into_iter()
            .map(|post| {
                let author = users.get(&post.user_id).map(summary);
                PostWithAuthor { post, author }
            })
            .collect()
    }
}

fn summary(user: &User) -> AuthorSummary {
    AuthorSummary {
        id: user.id,
        username: user.username.clone(),
        img: user.img.clone(),
    }
}

#[async_trait]
impl BaseRepository<Post, Uuid> for InMemoryDatabase {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Post>, RepoError> {
        let posts = self.posts.read().await;
        Ok(posts.iter().find(|p| p.id == id).cloned())
    }

    async fn insert(&self, post: Post) -> Result<Post, RepoError> {
        let mut posts = self.posts.write().await;
        if posts.iter().any(|p| p.slug == post.slug) {
            return Err(RepoError::Constraint(format!("slug '{}' already exists", post.slug)));
        }
        if posts.iter().any(|p| p.id == post.id) {
            return Err(RepoError::Constraint("Entity already exists".to_string()));
        }
        posts.push(post.clone());
        Ok(post)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        let mut posts = self.posts.write().await;
        let before = posts.len();
        posts.retain(|p| p.id != id);
        if posts.len() == before {
            return Err(RepoError::NotFound);
        }
        drop(posts);

        let mut saved = self.saved.write().await;
        for ids in saved.values_mut() {
            ids.retain(|saved_id| *saved_id != id);
        }
        drop(saved);

        self.comments.write().await.retain(|c| c.post_id != id);
        Ok(())
    }
}

#[async_trait]
impl PostRepository for InMemoryDatabase {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<PostWithAuthor>, RepoError> {
        let found = {
            let posts = self.posts.read().await;
            posts.iter().find(|p| p.slug == slug).cloned()
        };
        match found {
            Some(post) => Ok(self.attach_authors(vec![post]).await.pop()),
            None => Ok(None),
        }
    }

    async fn slug_exists(&self, slug: &str) -> Result<bool, RepoError> {
        let posts = self.posts.read().await;
        Ok(posts.iter().any(|p| p.slug == slug))
    }

    async fn count(&self, filter: &PostFilter) -> Result<u64, RepoError> {
        let posts = self.posts.read().await;
        Ok(posts.iter().filter(|p| filter.matches(p)).count() as u64)
    }

    async fn find_page(
        &self,
        filter: &PostFilter,
        sort: SortMode,
        page: PageRequest,
    ) -> Result<Vec<PostWithAuthor>, RepoError> {
        let mut matching: Vec<Post> = {
            let posts = self.posts.read().await;
            posts.iter().filter(|p| filter.matches(p)).cloned().collect()
        };
        // Stable sort: equal keys keep insertion order.
        matching.sort_by(|a, b| sort.compare(a, b));

        let page_posts = matching
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit as usize)
            .collect();
        Ok(self.attach_authors(page_posts).await)
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<PostWithAuthor>, RepoError> {
        let mut found: Vec<Post> = {
            let posts = self.posts.read().await;
            posts.iter().filter(|p| ids.contains(&p.id)).cloned().collect()
        };
        found.sort_by(|a, b| SortMode::Newest.compare(a, b));
        Ok(self.attach_authors(found).await)
    }

    async fn set_visit(&self, id: Uuid, visit: i64) -> Result<(), RepoError> {
        let mut posts = self.posts.write().await;
        let post = posts
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(RepoError::NotFound)?;
        post.visit = visit;
        Ok(())
    }

    async fn update_content(&self, id: Uuid, patch: &PostPatch) -> Result<Post, RepoError> {
        let mut posts = self.posts.write().await;
        let post = posts
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(RepoError::NotFound)?;
        post.apply(patch.clone());
        Ok(post.clone())
    }

    async fn set_featured(&self, id: Uuid, featured: bool) -> Result<Post, RepoError> {
        let mut posts = self.posts.write().await;
        let post = posts
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(RepoError::NotFound)?;
        post.is_featured = featured;
        Ok(post.clone())
    }
}

#[async_trait]
impl BaseRepository<User, Uuid> for InMemoryDatabase {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepoError> {
        let users = self.users.read().await;
        Ok(users.get(&id).cloned())
    }

    async fn insert(&self, user: User) -> Result<User, RepoError> {
        let mut users = self.users.write().await;
        if users
            .values()
            .any(|u| u.username == user.username || u.external_id == user.external_id)
        {
            return Err(RepoError::Constraint(format!(
                "user '{}' already exists",
                user.username
            )));
        }
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        let mut users = self.users.write().await;
        users.remove(&id).ok_or(RepoError::NotFound)?;
        drop(users);

        self.saved.write().await.remove(&id);
        self.comments.write().await.retain(|c| c.user_id != id);
        Ok(())
    }
}

#[async_trait]
impl UserRepository for InMemoryDatabase {
    async fn find_by_external_id(&self, external_id: &str) -> Result<Option<User>, RepoError> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.external_id == external_id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.username == username).cloned())
    }

    async fn saved_post_ids(&self, user_id: Uuid) -> Result<Vec<Uuid>, RepoError> {
        let saved = self.saved.read().await;
        Ok(saved.get(&user_id).cloned().unwrap_or_default())
    }

    async fn add_saved_post(&self, user_id: Uuid, post_id: Uuid) -> Result<(), RepoError> {
        let mut saved = self.saved.write().await;
        let ids = saved.entry(user_id).or_default();
        if !ids.contains(&post_id) {
            ids.push(post_id);
        }
        Ok(())
    }

    async fn remove_saved_post(&self, user_id: Uuid, post_id: Uuid) -> Result<(), RepoError> {
        let mut saved = self.saved.write().await;
        if let Some(ids) = saved.get_mut(&user_id) {
            ids.retain(|id| *id != post_id);
        }
        Ok(())
    }
}

#[async_trait]
impl BaseRepository<Comment, Uuid> for InMemoryDatabase {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Comment>, RepoError> {
        let comments = self.comments.read().await;
        Ok(comments.iter().find(|c| c.id == id).cloned())
    }

    async fn insert(&self, comment: Comment) -> Result<Comment, RepoError> {
        let mut comments = self.comments.write().await;
        if comments.iter().any(|c| c.id == comment.id) {
            return Err(RepoError::Constraint("Entity already exists".to_string()));
        }
        comments.push(comment.clone());
        Ok(comment)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        let mut comments = self.comments.write().await;
        let before = comments.len();
        comments.retain(|c| c.id != id);
        if comments.len() == before {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl CommentRepository for InMemoryDatabase {
    async fn find_by_post(&self, post_id: Uuid) -> Result<Vec<CommentWithAuthor>, RepoError> {
        // Newest first; equal timestamps put the later insert first.
        let mut found: Vec<Comment> = {
            let comments = self.comments.read().await;
            comments.iter().rev().filter(|c| c.post_id == post_id).cloned().collect()
        };
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let users = self.users.read().await;
        Ok(found
            .into_iter()
            .map(|comment| {
                let author = users.get(&comment.user_id).map(summary);
                CommentWithAuthor { comment, author }
            })
            .collect())
    }
}
