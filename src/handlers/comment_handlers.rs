// src/handlers/comment_handlers.rs - comments nested under /posts/{post_id}/

use actix_web::{HttpResponse, delete, get, patch, post, put, web};
use log::{debug, info};

use crate::AppState;
use crate::dtos::comment_dtos::{CommentOut, CommentPayload};
use crate::error::{ApiError, ApiResult};
use crate::middleware::auth_extractor::AuthenticatedUser;
use crate::models::{Comment, NewComment, Post};
use crate::permissions::ensure_author;

/// Parent post from the URL, 404 if it does not exist.
async fn load_post(app_state: &AppState, post_id: i64) -> ApiResult<Post> {
    app_state
        .store
        .get_post(post_id)
        .await?
        .ok_or(ApiError::NotFound)
}

async fn load_comment(app_state: &AppState, post_id: i64, comment_id: i64) -> ApiResult<Comment> {
    load_post(app_state, post_id).await?;
    app_state
        .store
        .get_comment(post_id, comment_id)
        .await?
        .ok_or(ApiError::NotFound)
}

/// GET /posts/{post_id}/comments/
#[get("/posts/{post_id}/comments/")]
pub async fn list_comments(
    app_state: web::Data<AppState>,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    let post = load_post(&app_state, path.into_inner()).await?;
    let comments: Vec<CommentOut> = app_state
        .store
        .list_comments(post.id)
        .await?
        .into_iter()
        .map(CommentOut::from)
        .collect();
    debug!("post {} has {} comments", post.id, comments.len());
    Ok(HttpResponse::Ok().json(comments))
}

/// POST /posts/{post_id}/comments/
/// Author and post are stamped server-side.
#[post("/posts/{post_id}/comments/")]
pub async fn create_comment(
    user: AuthenticatedUser,
    app_state: web::Data<AppState>,
    path: web::Path<i64>,
    body: web::Json<CommentPayload>,
) -> ApiResult<HttpResponse> {
    let post = load_post(&app_state, path.into_inner()).await?;
    let text = body.into_inner().validate(false)?.unwrap_or_default();

    let comment = app_state
        .store
        .create_comment(NewComment {
            text,
            author_id: user.user.id,
            post_id: post.id,
        })
        .await?;
    info!("comment {} on post {} created by {}", comment.id, post.id, user.user.username);

    Ok(HttpResponse::Created().json(CommentOut::from(comment)))
}

/// GET /posts/{post_id}/comments/{id}/
#[get("/posts/{post_id}/comments/{id}/")]
pub async fn get_comment(
    app_state: web::Data<AppState>,
    path: web::Path<(i64, i64)>,
) -> ApiResult<HttpResponse> {
    let (post_id, comment_id) = path.into_inner();
    let comment = load_comment(&app_state, post_id, comment_id).await?;
    Ok(HttpResponse::Ok().json(CommentOut::from(comment)))
}

/// PUT /posts/{post_id}/comments/{id}/
#[put("/posts/{post_id}/comments/{id}/")]
pub async fn replace_comment(
    user: AuthenticatedUser,
    app_state: web::Data<AppState>,
    path: web::Path<(i64, i64)>,
    body: web::Json<CommentPayload>,
) -> ApiResult<HttpResponse> {
    let (post_id, comment_id) = path.into_inner();
    update(user, app_state, post_id, comment_id, body.into_inner(), false).await
}

/// PATCH /posts/{post_id}/comments/{id}/
#[patch("/posts/{post_id}/comments/{id}/")]
pub async fn patch_comment(
    user: AuthenticatedUser,
    app_state: web::Data<AppState>,
    path: web::Path<(i64, i64)>,
    body: web::Json<CommentPayload>,
) -> ApiResult<HttpResponse> {
    let (post_id, comment_id) = path.into_inner();
    update(user, app_state, post_id, comment_id, body.into_inner(), true).await
}

async fn update(
    user: AuthenticatedUser,
    app_state: web::Data<AppState>,
    post_id: i64,
    comment_id: i64,
    payload: CommentPayload,
    partial: bool,
) -> ApiResult<HttpResponse> {
    let comment = load_comment(&app_state, post_id, comment_id).await?;
    ensure_author(&user, comment.author_id)?;

    let comment = match payload.validate(partial)? {
        Some(text) => app_state
            .store
            .update_comment(post_id, comment_id, text)
            .await?
            .ok_or(ApiError::NotFound)?,
        None => comment,
    };
    info!("comment {} updated by {}", comment.id, user.user.username);

    Ok(HttpResponse::Ok().json(CommentOut::from(comment)))
}

/// DELETE /posts/{post_id}/comments/{id}/
#[delete("/posts/{post_id}/comments/{id}/")]
pub async fn delete_comment(
    user: AuthenticatedUser,
    app_state: web::Data<AppState>,
    path: web::Path<(i64, i64)>,
) -> ApiResult<HttpResponse> {
    let (post_id, comment_id) = path.into_inner();
    let comment = load_comment(&app_state, post_id, comment_id).await?;
    ensure_author(&user, comment.author_id)?;

    if !app_state.store.delete_comment(post_id, comment_id).await? {
        return Err(ApiError::NotFound);
    }
    info!("comment {} deleted by {}", comment_id, user.user.username);
    Ok(HttpResponse::NoContent().finish())
}
