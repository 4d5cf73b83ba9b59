//! Post handlers.

use actix_web::{HttpResponse, web};
use uuid::Uuid;

use inkpost_core::domain::{Category, ListingParams, PostDraft, PostPatch};
use inkpost_shared::MessageResponse;
use inkpost_shared::dto::{
    CreatePostRequest, PostIdRequest, PostListResponse, UpdatePostRequest, UploadAuthResponse,
};

use super::{bare_post, post_with_author};
use crate::middleware::auth::Session;
use crate::middleware::error::AppResult;
use crate::state::AppState;

/// GET /api/posts
pub async fn list_posts(
    state: web::Data<AppState>,
    query: web::Query<ListingParams>,
) -> AppResult<HttpResponse> {
    let page = state.posts.list(&query).await?;

    Ok(HttpResponse::Ok().json(PostListResponse {
        posts: page.posts.into_iter().map(post_with_author).collect(),
        has_more: page.has_more,
        total_posts: page.total_posts,
    }))
}

/// GET /api/posts/{slug} - counts a visit
pub async fn get_post(state: web::Data<AppState>, slug: web::Path<String>) -> AppResult<HttpResponse> {
    let found = state.posts.view(&slug).await?;
    Ok(HttpResponse::Ok().json(post_with_author(found)))
}

/// POST /api/posts
pub async fn create_post(
    state: web::Data<AppState>,
    Session(ctx): Session,
    body: web::Json<CreatePostRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();
    let category = match req.category.as_deref().filter(|c| !c.is_empty()) {
        Some(c) => c.parse()?,
        None => Category::default(),
    };

    let draft = PostDraft {
        title: req.title,
        description: req.desc,
        category,
        content: req.content,
        img: req.img,
    };

    let post = state.posts.create(&ctx, draft).await?;
    Ok(HttpResponse::Created().json(bare_post(post)))
}

/// PUT /api/posts/{id}
pub async fn update_post(
    state: web::Data<AppState>,
    Session(ctx): Session,
    id: web::Path<Uuid>,
    body: web::Json<UpdatePostRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();
    let patch = PostPatch {
        title: req.title,
        description: req.desc,
        category: req.category.as_deref().map(str::parse::<Category>).transpose()?,
        content: req.content,
        img: req.img,
    };

    let post = state.posts.update(&ctx, id.into_inner(), patch).await?;
    Ok(HttpResponse::Ok().json(bare_post(post)))
}

/// DELETE /api/posts/{id}
pub async fn delete_post(
    state: web::Data<AppState>,
    Session(ctx): Session,
    id: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    state.posts.delete(&ctx, id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(MessageResponse::new("Post has been deleted")))
}

/// PATCH /api/posts/feature - admin only
pub async fn feature_post(
    state: web::Data<AppState>,
    Session(ctx): Session,
    body: web::Json<PostIdRequest>,
) -> AppResult<HttpResponse> {
    let post = state.posts.toggle_feature(&ctx, body.post_id).await?;
    Ok(HttpResponse::Ok().json(bare_post(post)))
}

/// GET /api/posts/upload-auth
pub async fn upload_auth(state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let creds = state.media.upload_credentials()?;

    Ok(HttpResponse::Ok().json(UploadAuthResponse {
        token: creds.token,
        expire: creds.expire,
        signature: creds.signature,
        public_key: creds.public_key,
        url_endpoint: creds.url_endpoint,
    }))
}
