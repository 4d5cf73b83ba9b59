//! Comment handlers.

use actix_web::{HttpResponse, web};
use uuid::Uuid;

use inkpost_shared::MessageResponse;
use inkpost_shared::dto::{CommentResponse, CreateCommentRequest};

use super::comment_response;
use crate::middleware::auth::Session;
use crate::middleware::error::AppResult;
use crate::state::AppState;

/// GET /api/comments/{postId}
pub async fn list_comments(
    state: web::Data<AppState>,
    post_id: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let comments: Vec<CommentResponse> = state
        .comments
        .list(post_id.into_inner())
        .await?
        .into_iter()
        .map(comment_response)
        .collect();

    Ok(HttpResponse::Ok().json(comments))
}

/// POST /api/comments/{postId}
pub async fn add_comment(
    state: web::Data<AppState>,
    Session(ctx): Session,
    post_id: web::Path<Uuid>,
    body: web::Json<CreateCommentRequest>,
) -> AppResult<HttpResponse> {
    let comment = state
        .comments
        .add(&ctx, post_id.into_inner(), body.into_inner().desc)
        .await?;

    Ok(HttpResponse::Created().json(comment_response(comment)))
}

/// DELETE /api/comments/{id}
pub async fn delete_comment(
    state: web::Data<AppState>,
    Session(ctx): Session,
    id: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    state.comments.delete(&ctx, id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(MessageResponse::new("Comment deleted")))
}
