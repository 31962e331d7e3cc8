pub mod config;
pub mod dtos;
pub mod error;
pub mod fixtures;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod permissions;
pub mod repositories;
pub mod services;

use std::sync::Arc;

use actix_web::web;

use crate::error::ApiError;
use crate::handlers::{comment_handlers, follow_handlers, group_handlers, media_handlers, post_handlers};
use crate::repositories::Store;
use crate::services::media_service::MediaStorage;

pub const API_PREFIX: &str = "/api/v1";

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub media: MediaStorage,
    pub jwt_secret: String,
}

/// Malformed bodies become `{"detail": "JSON parse error - ..."}`.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        ApiError::BadRequest(format!("JSON parse error - {}", err)).into()
    })
}

/// Registers every endpoint. `media_url` is the public prefix images are
/// served under (e.g. `/media/`).
pub fn routes(cfg: &mut web::ServiceConfig, media_url: &str) {
    cfg.app_data(json_config())
        .service(
            web::scope(API_PREFIX)
                .service(post_handlers::list_posts)
                .service(post_handlers::create_post)
                .service(post_handlers::get_post)
                .service(post_handlers::replace_post)
                .service(post_handlers::patch_post)
                .service(post_handlers::delete_post)
                .service(comment_handlers::list_comments)
                .service(comment_handlers::create_comment)
                .service(comment_handlers::get_comment)
                .service(comment_handlers::replace_comment)
                .service(comment_handlers::patch_comment)
                .service(comment_handlers::delete_comment)
                .service(group_handlers::list_groups)
                .service(group_handlers::get_group)
                .service(follow_handlers::list_follows)
                .service(follow_handlers::create_follow),
        )
        .route(
            &format!("{}posts/{{filename}}", media_url),
            web::get().to(media_handlers::serve_post_image),
        );
}
