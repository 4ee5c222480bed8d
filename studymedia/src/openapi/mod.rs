//! OpenAPI documentation for the HTTP API.
//!
//! Served as JSON at `/api-docs/openapi.json` and rendered with Scalar at `/docs`.

use utoipa::OpenApi;

use crate::api;
use crate::media;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "studymedia",
        description = "Posts, announcements and the media pipeline that turns data URL attachments into durable URLs."
    ),
    paths(
        api::handlers::posts::create_post,
        api::handlers::posts::list_posts,
        api::handlers::posts::get_post,
        api::handlers::notifications::list_notifications,
        api::handlers::notifications::create_announcement,
        api::handlers::media::prepare_media,
        api::handlers::media::optimize_media,
        api::handlers::media::serve_upload,
    ),
    components(
        schemas(
            media::MediaKind,
            media::MediaDescriptor,
            media::CapturedMedia,
            api::models::posts::PostCreate,
            api::models::posts::PostResponse,
            api::models::notifications::NotificationResponse,
            api::models::media::PreparedMediaResponse,
            api::models::media::OptimizeRequest,
            api::models::media::OptimizeResponse,
        )
    ),
    tags(
        (name = "posts", description = "Posts with attachments"),
        (name = "notifications", description = "Notification feed"),
        (name = "announcements", description = "Admin broadcast announcements"),
        (name = "media", description = "Attachment capture, storage and maintenance"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_every_route() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&str> = doc.paths.paths.keys().map(String::as_str).collect();
        for expected in [
            "/api/v1/posts",
            "/api/v1/posts/{id}",
            "/api/v1/notifications",
            "/api/v1/media/prepare",
            "/admin/api/v1/announcements",
            "/admin/api/v1/media/optimize",
            "/uploads/{filename}",
        ] {
            assert!(paths.contains(&expected), "missing {expected}");
        }
    }
}
