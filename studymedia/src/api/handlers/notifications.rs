use crate::AppState;
use crate::api::handlers::media::{is_file_field, multipart_error, read_file_field};
use crate::api::models::notifications::{ListNotificationsQuery, NotificationResponse};
use crate::db::handlers::{NotificationFilter, Notifications, Repository};
use crate::db::models::notifications::NotificationCreateDBRequest;
use crate::errors::{Error, Result};
use crate::media::MediaDescriptor;
use crate::types::UserId;
use axum::{
    Json,
    extract::{Multipart, Query, State},
    http::StatusCode,
};

#[utoipa::path(
    get,
    path = "/api/v1/notifications",
    tag = "notifications",
    summary = "List notifications",
    description = "Broadcast announcements, plus direct notifications for `user_id` when given. Newest first.",
    params(ListNotificationsQuery),
    responses(
        (status = 200, description = "Notifications", body = Vec<NotificationResponse>),
        (status = 500, description = "Internal server error")
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_notifications(
    State(state): State<AppState>,
    Query(query): Query<ListNotificationsQuery>,
) -> Result<Json<Vec<NotificationResponse>>> {
    let (skip, limit) = query.pagination.params();
    let mut filter = NotificationFilter::new(skip, limit);
    if let Some(user_id) = query.user_id {
        filter = filter.for_user(user_id);
    }

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let notifications = Notifications::new(&mut conn).list(&filter).await?;

    Ok(Json(notifications.into_iter().map(NotificationResponse::from).collect()))
}

fn text_field(name: &str, value: Option<String>) -> Result<String> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(Error::BadRequest {
            message: format!("Field '{name}' is required"),
        }),
    }
}

#[utoipa::path(
    post,
    path = "/admin/api/v1/announcements",
    tag = "announcements",
    summary = "Create announcement",
    description = "Broadcast an announcement to every user. Uploaded files are captured, and all attachments are normalized before the announcement is stored.",
    request_body(
        content_type = "multipart/form-data",
        description = "Fields `title`, `message`, optional `created_by`, optional `media` (JSON array of attachments) and any number of `file` parts"
    ),
    responses(
        (status = 201, description = "Announcement created", body = NotificationResponse),
        (status = 400, description = "Missing fields, too many files or malformed upload"),
        (status = 413, description = "Payload too large"),
        (status = 500, description = "Internal server error")
    )
)]
#[tracing::instrument(skip_all)]
pub async fn create_announcement(State(state): State<AppState>, mut multipart: Multipart) -> Result<(StatusCode, Json<NotificationResponse>)> {
    let mut title = None;
    let mut message = None;
    let mut created_by: Option<UserId> = None;
    let mut media: Vec<MediaDescriptor> = Vec::new();
    let mut files = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or("").to_string();
        if is_file_field(&name) {
            files.push(read_file_field(field).await?);
            continue;
        }

        let value = field.text().await.map_err(multipart_error)?;
        match name.as_str() {
            "title" => title = Some(value),
            "message" => message = Some(value),
            "created_by" if !value.trim().is_empty() => {
                created_by = Some(value.trim().parse().map_err(|_| Error::BadRequest {
                    message: "Field 'created_by' must be a UUID".to_string(),
                })?);
            }
            "media" if !value.trim().is_empty() => {
                let listed: Vec<MediaDescriptor> = serde_json::from_str(&value).map_err(|e| Error::BadRequest {
                    message: format!("Field 'media' must be a JSON array of attachments: {e}"),
                })?;
                media.extend(listed);
            }
            _ => tracing::debug!(field = %name, "Ignoring unknown multipart field"),
        }
    }

    let title = text_field("title", title)?;
    let message = text_field("message", message)?;

    let captured = state.capture.capture(files).await?;
    media.extend(captured.iter().map(|c| c.descriptor()));

    let outcome = state.normalizer.normalize(media).await;
    if outcome.failed > 0 {
        tracing::warn!(failed = outcome.failed, "Announcement saved with attachments that could not be normalized");
    }

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let notification = Notifications::new(&mut conn)
        .create(&NotificationCreateDBRequest::announcement(title, message, outcome.media, created_by))
        .await?;

    tracing::info!(notification_id = %notification.id, media = notification.media.len(), "Announcement broadcast");

    Ok((StatusCode::CREATED, Json(NotificationResponse::from(notification))))
}
