//! HTTP handlers and route configuration.

mod comments;
mod health;
mod posts;
mod users;


use actix_web::web;

use inkpost_core::domain::{AuthorSummary, CommentWithAuthor, Post, PostWithAuthor, User};
use inkpost_shared::dto::{
    AuthorResponse, CommentResponse, PostOwner, PostResponse, UserResponse,
};

use crate::middleware::error::AppError;

/// Configure all application routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/health", web::get().to(health::health_check))
            .service(
                web::scope("/posts")
                    .route("", web::get().to(posts::list_posts))
                    .route("", web::post().to(posts::create_post))
                    // Fixed segments first, they would otherwise match as a slug
                    .route("/upload-auth", web::get().to(posts::upload_auth))
                    .route("/feature", web::patch().to(posts::feature_post))
                    .route("/{slug}", web::get().to(posts::get_post))
                    .route("/{id}", web::put().to(posts::update_post))
                    .route("/{id}", web::delete().to(posts::delete_post)),
            )
            .service(
                web::scope("/comments")
                    .route("/{post_id}", web::get().to(comments::list_comments))
                    .route("/{post_id}", web::post().to(comments::add_comment))
                    .route("/{id}", web::delete().to(comments::delete_comment)),
            )
            .service(
                web::scope("/users")
                    .route("/me", web::put().to(users::provision))
                    .route("/saved", web::get().to(users::saved_post_ids))
                    .route("/saved/details", web::get().to(users::saved_posts))
                    .route("/save", web::patch().to(users::toggle_saved)),
            ),
    );
}

/// Malformed JSON bodies become RFC 7807 bad requests.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into())
}

/// Undecodable query strings become RFC 7807 bad requests.
pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default()
        .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into())
}

/// Path segments that fail to parse (a malformed id) become RFC 7807 bad
/// requests.
pub fn path_config() -> web::PathConfig {
    web::PathConfig::default()
        .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into())
}

fn post_response(post: Post, owner: PostOwner) -> PostResponse {
    PostResponse {
        id: post.id,
        user: owner,
        title: post.title,
        slug: post.slug,
        desc: post.description,
        category: post.category.to_string(),
        content: post.content,
        img: post.img,
        visit: post.visit,
        is_featured: post.is_featured,
        created_at: post.created_at,
        updated_at: post.updated_at,
    }
}

/// A post as written, owner given by id.
fn bare_post(post: Post) -> PostResponse {
    let owner = PostOwner::Id(post.user_id);
    post_response(post, owner)
}

fn author_response(author: AuthorSummary) -> AuthorResponse {
    AuthorResponse {
        id: author.id,
        username: author.username,
        img: author.img,
    }
}

/// A post as read, owner expanded when the owner record still exists.
fn post_with_author(found: PostWithAuthor) -> PostResponse {
    let owner = match found.author {
        Some(author) => PostOwner::Author(author_response(author)),
        None => PostOwner::Id(found.post.user_id),
    };
    post_response(found.post, owner)
}

fn comment_response(found: CommentWithAuthor) -> CommentResponse {
    CommentResponse {
        id: found.comment.id,
        user: found.author.map(author_response),
        post: found.comment.post_id,
        desc: found.comment.desc,
        created_at: found.comment.created_at,
    }
}

fn user_response(user: User) -> UserResponse {
    UserResponse {
        id: user.id,
        username: user.username,
        email: user.email,
        img: user.img,
        created_at: user.created_at,
    }
}
