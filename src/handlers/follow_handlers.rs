// src/handlers/follow_handlers.rs - subscriptions of the requesting user

use actix_web::{HttpResponse, get, post, web};
use log::info;

use crate::AppState;
use crate::dtos::follow_dtos::{FollowOut, FollowPayload, FollowQuery};
use crate::error::ApiResult;
use crate::middleware::auth_extractor::AuthenticatedUser;
use crate::models::NewFollow;

/// GET /follows/?search=
/// Only the requester's own subscriptions are listed.
#[get("/follows/")]
pub async fn list_follows(
    user: AuthenticatedUser,
    app_state: web::Data<AppState>,
    query: web::Query<FollowQuery>,
) -> ApiResult<HttpResponse> {
    let follows: Vec<FollowOut> = app_state
        .store
        .list_follows(user.user.id, &query.terms())
        .await?
        .into_iter()
        .map(FollowOut::from)
        .collect();
    Ok(HttpResponse::Ok().json(follows))
}

/// POST /follows/
/// The follower is always the requester. A pair that slips past validation
/// concurrently is still rejected by the storage constraint.
#[post("/follows/")]
pub async fn create_follow(
    user: AuthenticatedUser,
    app_state: web::Data<AppState>,
    body: web::Json<FollowPayload>,
) -> ApiResult<HttpResponse> {
    let following = body
        .into_inner()
        .validate(app_state.store.as_ref(), &user.user)
        .await?;

    let follow = app_state
        .store
        .create_follow(NewFollow {
            user_id: user.user.id,
            following_id: following.id,
        })
        .await?;
    info!("{} now follows {}", follow.user_username, follow.following_username);

    Ok(HttpResponse::Created().json(FollowOut::from(follow)))
}
