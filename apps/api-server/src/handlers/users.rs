//! User handlers.

use actix_web::{HttpResponse, web};

use inkpost_shared::dto::{PostIdRequest, PostResponse, SaveToggleResponse};

use super::{post_with_author, user_response};
use crate::middleware::auth::Session;
use crate::middleware::error::AppResult;
use crate::state::AppState;

/// PUT /api/users/me - create the caller's user on first contact
pub async fn provision(state: web::Data<AppState>, Session(ctx): Session) -> AppResult<HttpResponse> {
    let user = state.users.provision(&ctx).await?;
    Ok(HttpResponse::Ok().json(user_response(user)))
}

/// GET /api/users/saved
pub async fn saved_post_ids(
    state: web::Data<AppState>,
    Session(ctx): Session,
) -> AppResult<HttpResponse> {
    let ids = state.users.saved_post_ids(&ctx).await?;
    Ok(HttpResponse::Ok().json(ids))
}

/// GET /api/users/saved/details
pub async fn saved_posts(
    state: web::Data<AppState>,
    Session(ctx): Session,
) -> AppResult<HttpResponse> {
    let posts: Vec<PostResponse> = state
        .users
        .saved_posts(&ctx)
        .await?
        .into_iter()
        .map(post_with_author)
        .collect();

    Ok(HttpResponse::Ok().json(posts))
}

/// PATCH /api/users/save
pub async fn toggle_saved(
    state: web::Data<AppState>,
    Session(ctx): Session,
    body: web::Json<PostIdRequest>,
) -> AppResult<HttpResponse> {
    let toggle = state.users.toggle_saved(&ctx, body.post_id).await?;
    Ok(HttpResponse::Ok().json(SaveToggleResponse::new(toggle.saved)))
}
