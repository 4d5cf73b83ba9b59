//! Application state - shared across all handlers.

use std::sync::Arc;

use inkpost_core::ports::{
    CommentRepository, MediaSigner, PostRepository, SessionVerifier, UserRepository,
};
use inkpost_core::services::{CommentService, PostService, UserService};
use inkpost_infra::{HmacMediaSigner, InMemoryDatabase, JwtSessionVerifier};

use crate::config::AppConfig;

#[cfg(feature = "postgres")]
use inkpost_infra::{
    PostgresCommentRepository, PostgresPostRepository, PostgresUserRepository, database::connect,
};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub posts: PostService,
    pub users: UserService,
    pub comments: CommentService,
    pub sessions: Arc<dyn SessionVerifier>,
    pub media: Arc<dyn MediaSigner>,
}

type Repositories = (
    Arc<dyn PostRepository>,
    Arc<dyn UserRepository>,
    Arc<dyn CommentRepository>,
);

impl AppState {
    /// Build the application state with appropriate implementations.
    pub async fn new(config: &AppConfig) -> Self {
        let (posts, users, comments) = Self::repositories(config).await;

        let state = Self::from_parts(
            posts,
            users,
            comments,
            Arc::new(JwtSessionVerifier::from_env()),
            Arc::new(HmacMediaSigner::from_env()),
        );

        tracing::info!("Application state initialized");
        state
    }

    /// Wire services over the given collaborators.
    pub fn from_parts(
        posts: Arc<dyn PostRepository>,
        users: Arc<dyn UserRepository>,
        comments: Arc<dyn CommentRepository>,
        sessions: Arc<dyn SessionVerifier>,
        media: Arc<dyn MediaSigner>,
    ) -> Self {
        Self {
            posts: PostService::new(posts.clone(), users.clone()),
            comments: CommentService::new(comments, posts.clone(), users.clone()),
            users: UserService::new(users, posts),
            sessions,
            media,
        }
    }

    #[cfg(feature = "postgres")]
    async fn repositories(config: &AppConfig) -> Repositories {
        let Some(db_config) = &config.database else {
            tracing::warn!("DATABASE_URL not set. Running without database (in-memory mode).");
            return in_memory();
        };

        match connect(db_config).await {
            Ok(conn) => (
                Arc::new(PostgresPostRepository::new(conn.clone())),
                Arc::new(PostgresUserRepository::new(conn.clone())),
                Arc::new(PostgresCommentRepository::new(conn)),
            ),
            Err(e) => {
                tracing::error!(
                    "Failed to connect to database: {}. Using in-memory fallback.",
                    e
                );
                in_memory()
            }
        }
    }

    #[cfg(not(feature = "postgres"))]
    async fn repositories(_config: &AppConfig) -> Repositories {
        tracing::info!("Running without postgres feature - using in-memory repositories");
        in_memory()
    }
}

fn in_memory() -> Repositories {
    let db = Arc::new(InMemoryDatabase::new());
    (db.clone(), db.clone(), db)
}
