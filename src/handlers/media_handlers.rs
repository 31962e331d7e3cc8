// src/handlers/media_handlers.rs

use actix_web::{HttpResponse, web};

use crate::AppState;
use crate::error::{ApiError, ApiResult};
use crate::services::media_service::content_type;

/// GET {MEDIA_URL}posts/{filename}
/// Registered in `routes` because the prefix comes from configuration.
pub async fn serve_post_image(
    app_state: web::Data<AppState>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let filename = path.into_inner();
    let data = app_state
        .media
        .read_post_image(&filename)
        .await?
        .ok_or(ApiError::NotFound)?;

    Ok(HttpResponse::Ok()
        .content_type(content_type(&filename))
        .body(data))
}
