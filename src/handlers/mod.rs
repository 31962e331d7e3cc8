pub mod comment_handlers;
pub mod follow_handlers;
pub mod group_handlers;
pub mod media_handlers;
pub mod post_handlers;

use actix_web::HttpRequest;

/// `scheme://host` of the current request, used for absolute media URLs.
pub fn base_url(req: &HttpRequest) -> String {
    let info = req.connection_info();
    format!("{}://{}", info.scheme(), info.host())
}
