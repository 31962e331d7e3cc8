// src/handlers/post_handlers.rs

use actix_web::{HttpRequest, HttpResponse, delete, get, patch, post, put, web};
use log::info;

use super::base_url;
use crate::AppState;
use crate::dtos::pagination_dtos::{LimitOffsetQuery, Page, PageUrl};
use crate::dtos::post_dtos::{PostOut, PostPayload, group_does_not_exist};
use crate::error::{ApiError, ApiResult, FieldErrors};
use crate::middleware::auth_extractor::AuthenticatedUser;
use crate::models::post::GROUP_REFERENCE;
use crate::models::{NewPost, Post, PostChanges};
use crate::permissions::ensure_author;
use crate::repositories::StoreError;
use crate::services::media_service::MediaStorage;

async fn load_post(app_state: &AppState, post_id: i64) -> ApiResult<Post> {
    app_state
        .store
        .get_post(post_id)
        .await?
        .ok_or(ApiError::NotFound)
}

/// Cleans up after a failed post write: the freshly saved image is removed
/// and a group deleted since validation is reported on `group`.
async fn write_failed(
    media: &MediaStorage,
    saved_image: Option<&str>,
    group_id: Option<i64>,
    err: StoreError,
) -> ApiError {
    if let Some(name) = saved_image {
        media.remove(name).await;
    }
    match group_id {
        Some(id) if err.is_missing(GROUP_REFERENCE) => {
            ApiError::Validation(FieldErrors::single("group", group_does_not_exist(id)))
        }
        _ => err.into(),
    }
}

/// GET /posts/
/// Newest first; paginated when `limit` is given.
#[get("/posts/")]
pub async fn list_posts(
    req: HttpRequest,
    app_state: web::Data<AppState>,
    query: web::Query<LimitOffsetQuery>,
) -> ApiResult<HttpResponse> {
    let base = base_url(&req);
    let store = &app_state.store;

    let Some(limit) = query.limit() else {
        let posts: Vec<PostOut> = store
            .list_posts(None, 0)
            .await?
            .into_iter()
            .map(|post| PostOut::new(post, &app_state.media, &base))
            .collect();
        return Ok(HttpResponse::Ok().json(posts));
    };

    let offset = query.offset();
    let count = store.count_posts().await?;
    let results: Vec<PostOut> = store
        .list_posts(Some(limit), offset)
        .await?
        .into_iter()
        .map(|post| PostOut::new(post, &app_state.media, &base))
        .collect();
    let page = Page::new(&PageUrl::from_request(&req), limit, offset, count, results);
    Ok(HttpResponse::Ok().json(page))
}

/// POST /posts/
/// The author is always the requester.
#[post("/posts/")]
pub async fn create_post(
    req: HttpRequest,
    user: AuthenticatedUser,
    app_state: web::Data<AppState>,
    body: web::Json<PostPayload>,
) -> ApiResult<HttpResponse> {
    let validated = body
        .into_inner()
        .validate(app_state.store.as_ref(), false)
        .await?;

    let image = match validated.image {
        Some(Some(image)) => Some(app_state.media.save(&image).await?),
        _ => None,
    };

    let group_id = validated.group.flatten();
    let created = app_state
        .store
        .create_post(NewPost {
            text: validated.text.unwrap_or_default(),
            image: image.clone(),
            author_id: user.user.id,
            group_id,
        })
        .await;
    let post = match created {
        Ok(post) => post,
        Err(e) => return Err(write_failed(&app_state.media, image.as_deref(), group_id, e).await),
    };
    info!("post {} created by {}", post.id, user.user.username);

    Ok(HttpResponse::Created().json(PostOut::new(post, &app_state.media, &base_url(&req))))
}

/// GET /posts/{id}/
#[get("/posts/{id}/")]
pub async fn get_post(
    req: HttpRequest,
    app_state: web::Data<AppState>,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    let post = load_post(&app_state, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(PostOut::new(post, &app_state.media, &base_url(&req))))
}

/// PUT /posts/{id}/
#[put("/posts/{id}/")]
pub async fn replace_post(
    req: HttpRequest,
    user: AuthenticatedUser,
    app_state: web::Data<AppState>,
    path: web::Path<i64>,
    body: web::Json<PostPayload>,
) -> ApiResult<HttpResponse> {
    update(req, user, app_state, path.into_inner(), body.into_inner(), false).await
}

/// PATCH /posts/{id}/
#[patch("/posts/{id}/")]
pub async fn patch_post(
    req: HttpRequest,
    user: AuthenticatedUser,
    app_state: web::Data<AppState>,
    path: web::Path<i64>,
    body: web::Json<PostPayload>,
) -> ApiResult<HttpResponse> {
    update(req, user, app_state, path.into_inner(), body.into_inner(), true).await
}

async fn update(
    req: HttpRequest,
    user: AuthenticatedUser,
    app_state: web::Data<AppState>,
    post_id: i64,
    payload: PostPayload,
    partial: bool,
) -> ApiResult<HttpResponse> {
    let post = load_post(&app_state, post_id).await?;
    ensure_author(&user, post.author_id)?;

    let validated = payload.validate(app_state.store.as_ref(), partial).await?;
    let image = match validated.image {
        Some(Some(image)) => Some(Some(app_state.media.save(&image).await?)),
        Some(None) => Some(None),
        None => None,
    };
    let saved_image = image.clone().flatten();
    let group_id = validated.group.flatten();
    let changes = PostChanges {
        text: validated.text,
        image,
        group_id: validated.group,
    };

    let post = if changes.is_empty() {
        post
    } else {
        match app_state.store.update_post(post_id, changes).await {
            Ok(Some(post)) => post,
            Ok(None) => {
                if let Some(name) = &saved_image {
                    app_state.media.remove(name).await;
                }
                return Err(ApiError::NotFound);
            }
            Err(e) => {
                return Err(write_failed(&app_state.media, saved_image.as_deref(), group_id, e).await);
            }
        }
    };
    info!("post {} updated by {}", post.id, user.user.username);

    Ok(HttpResponse::Ok().json(PostOut::new(post, &app_state.media, &base_url(&req))))
}

/// DELETE /posts/{id}/
/// Comments of the post go with it.
#[delete("/posts/{id}/")]
pub async fn delete_post(
    user: AuthenticatedUser,
    app_state: web::Data<AppState>,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    let post = load_post(&app_state, path.into_inner()).await?;
    ensure_author(&user, post.author_id)?;

    if !app_state.store.delete_post(post.id).await? {
        return Err(ApiError::NotFound);
    }
    info!("post {} deleted by {}", post.id, user.user.username);
    Ok(HttpResponse::NoContent().finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::media_service::decode_image;

    const PNG_PIXEL: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

    #[tokio::test]
    async fn vanished_group_becomes_field_error_and_image_is_removed() {
        let dir = tempfile::tempdir().unwrap();
        let media = MediaStorage::new(dir.path(), "/media/");
        let image = decode_image(&format!("data:image/png;base64,{}", PNG_PIXEL)).unwrap();
        let name = media.save(&image).await.unwrap();

        let err = StoreError::MissingReference(GROUP_REFERENCE.to_string());
        let err = write_failed(&media, Some(&name), Some(5), err).await;

        match err {
            ApiError::Validation(errors) => {
                assert_eq!(errors.get("group"), Some(&[group_does_not_exist(5)][..]));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        let filename = name.trim_start_matches("posts/");
        assert!(media.read_post_image(filename).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn other_write_failures_stay_server_errors() {
        let dir = tempfile::tempdir().unwrap();
        let media = MediaStorage::new(dir.path(), "/media/");
        let err = StoreError::MissingReference("user".to_string());
        let err = write_failed(&media, None, Some(5), err).await;
        assert!(matches!(err, ApiError::Store(StoreError::MissingReference(_))));
    }
}
