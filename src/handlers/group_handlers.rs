// src/handlers/group_handlers.rs - read-only, open to anonymous readers

use actix_web::{HttpResponse, get, web};

use crate::AppState;
use crate::dtos::group_dtos::GroupOut;
use crate::error::{ApiError, ApiResult};

/// GET /groups/
#[get("/groups/")]
pub async fn list_groups(app_state: web::Data<AppState>) -> ApiResult<HttpResponse> {
    let groups: Vec<GroupOut> = app_state
        .store
        .list_groups()
        .await?
        .into_iter()
        .map(GroupOut::from)
        .collect();
    Ok(HttpResponse::Ok().json(groups))
}

/// GET /groups/{id}/
#[get("/groups/{id}/")]
pub async fn get_group(
    app_state: web::Data<AppState>,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    let group = app_state
        .store
        .get_group(path.into_inner())
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(HttpResponse::Ok().json(GroupOut::from(group)))
}
