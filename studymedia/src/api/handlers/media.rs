use crate::AppState;
use crate::api::models::media::{OptimizeRequest, OptimizeResponse, PreparedMediaResponse};
use crate::db::handlers::{Notifications, Posts};
use crate::errors::{Error, Result};
use crate::media::{SelectedFile, mime::content_type_for, normalize::contains_data_urls};
use axum::{
    Json,
    body::Body,
    extract::{Multipart, Path, State, multipart::MultipartError},
    http::{StatusCode, header},
    response::Response,
};

/// Multipart field names accepted as file parts
const FILE_FIELDS: [&str; 2] = ["file", "files"];

pub(crate) fn multipart_error(e: MultipartError) -> Error {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        Error::PayloadTooLarge {
            message: "Upload exceeds the maximum request size".to_string(),
        }
    } else {
        Error::BadRequest {
            message: format!("Failed to parse multipart data: {e}"),
        }
    }
}

/// Whether a multipart field carries a file to capture.
pub(crate) fn is_file_field(name: &str) -> bool {
    FILE_FIELDS.contains(&name)
}

/// Read a file part into a [`SelectedFile`]. The declared content type wins over the extension.
pub(crate) async fn read_file_field(field: axum::extract::multipart::Field<'_>) -> Result<SelectedFile> {
    let name = field.file_name().unwrap_or("upload").to_string();
    let mime_type = match field.content_type() {
        Some(ct) if ct != "application/octet-stream" => ct.to_string(),
        _ => content_type_for(&name),
    };
    let bytes = field.bytes().await.map_err(multipart_error)?;

    Ok(SelectedFile {
        name,
        mime_type,
        bytes: bytes.to_vec(),
    })
}

#[utoipa::path(
    post,
    path = "/api/v1/media/prepare",
    tag = "media",
    summary = "Prepare attachments",
    description = "Capture uploaded files as data URL attachments. Large images are downscaled and re-encoded as JPEG; files that are not images or videos are skipped.",
    request_body(
        content_type = "multipart/form-data",
        description = "One `file` part per attachment"
    ),
    responses(
        (status = 200, description = "Captured attachments", body = PreparedMediaResponse),
        (status = 400, description = "Too many files or malformed upload"),
        (status = 413, description = "Payload too large"),
        (status = 500, description = "Internal server error")
    )
)]
#[tracing::instrument(skip_all)]
pub async fn prepare_media(State(state): State<AppState>, mut multipart: Multipart) -> Result<Json<PreparedMediaResponse>> {
    let mut files = Vec::new();
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name().is_some_and(is_file_field) {
            files.push(read_file_field(field).await?);
        }
    }

    let selected = files.len();
    let media = state.capture.capture(files).await?;

    Ok(Json(PreparedMediaResponse {
        skipped: selected - media.len(),
        media,
    }))
}

#[utoipa::path(
    post,
    path = "/admin/api/v1/media/optimize",
    tag = "media",
    summary = "Optimize stored attachments",
    description = "Walk every post and announcement whose attachments still embed data URLs, oldest first in batches of `limit`, normalize them and save the rows that changed. Rows that fail stay as they are and do not block later rows.",
    request_body(content = OptimizeRequest, description = "Optional. Without a body the default batch size applies"),
    responses(
        (status = 200, description = "Sweep summary", body = OptimizeResponse),
        (status = 500, description = "Internal server error")
    )
)]
#[tracing::instrument(skip_all)]
pub async fn optimize_media(State(state): State<AppState>, request: Option<Json<OptimizeRequest>>) -> Result<Json<OptimizeResponse>> {
    let limit = request.map(|Json(r)| r).unwrap_or_default().limit();
    let mut summary = OptimizeResponse::default();

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

    let mut after = None;
    loop {
        let page = Posts::new(&mut conn).list_with_data_urls(after, limit).await?;
        let Some(last) = page.last() else { break };
        after = Some((last.created_at, last.id));
        let last_page = (page.len() as i64) < limit;

        summary.posts_scanned += page.len();
        for post in page {
            if !contains_data_urls(&post.media) {
                continue;
            }
            let outcome = state.normalizer.normalize(post.media).await;
            summary.items_failed += outcome.failed;
            if outcome.changed() && Posts::new(&mut conn).update_media(post.id, &outcome.media).await? {
                summary.posts_updated += 1;
            }
        }
        if last_page {
            break;
        }
    }

    let mut after = None;
    loop {
        let page = Notifications::new(&mut conn).list_with_data_urls(after, limit).await?;
        let Some(last) = page.last() else { break };
        after = Some((last.created_at, last.id));
        let last_page = (page.len() as i64) < limit;

        summary.notifications_scanned += page.len();
        for notification in page {
            if !contains_data_urls(&notification.media) {
                continue;
            }
            let outcome = state.normalizer.normalize(notification.media).await;
            summary.items_failed += outcome.failed;
            if outcome.changed() && Notifications::new(&mut conn).update_media(notification.id, &outcome.media).await? {
                summary.notifications_updated += 1;
            }
        }
        if last_page {
            break;
        }
    }

    tracing::info!(
        posts_updated = summary.posts_updated,
        notifications_updated = summary.notifications_updated,
        items_failed = summary.items_failed,
        "Media optimize sweep finished"
    );

    Ok(Json(summary))
}

#[utoipa::path(
    get,
    path = "/uploads/{filename}",
    tag = "media",
    summary = "Serve stored attachment",
    description = "Serve a locally stored attachment. Only the ID part of the filename is used to locate the file.",
    params(("filename" = String, Path, description = "Stored file name, e.g. `0a1b2c3d4e5f6a7b.jpg`")),
    responses(
        (status = 200, description = "File content"),
        (status = 404, description = "No stored file with that ID")
    )
)]
#[tracing::instrument(skip_all, fields(filename = %filename))]
pub async fn serve_upload(State(state): State<AppState>, Path(filename): Path<String>) -> Result<Response> {
    let id = filename.split_once('.').map_or(filename.as_str(), |(id, _)| id);
    let not_found = || Error::NotFound {
        resource: "File".to_string(),
        id: filename.clone(),
    };

    let (path, extension) = state.storage.locate(id).await?.ok_or_else(not_found)?;
    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(not_found()),
        Err(e) => return Err(Error::Media(e.into())),
    };

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type_for(&format!("{id}.{extension}")))
        .header(header::CACHE_CONTROL, "public, max-age=31536000")
        .body(Body::from(bytes))
        .map_err(|e| Error::Other(e.into()))
}
