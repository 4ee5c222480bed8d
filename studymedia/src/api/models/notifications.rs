//! API request/response models for notifications and announcements.

use crate::api::models::pagination::Pagination;
use crate::db::models::notifications::NotificationDBResponse;
use crate::media::MediaDescriptor;
use crate::types::{NotificationId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NotificationResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: NotificationId,
    /// Absent for broadcasts
    #[schema(value_type = Option<String>, format = "uuid")]
    pub user_id: Option<UserId>,
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub message: String,
    pub media: Vec<MediaDescriptor>,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub created_by: Option<UserId>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl From<NotificationDBResponse> for NotificationResponse {
    fn from(db: NotificationDBResponse) -> Self {
        Self {
            id: db.id,
            user_id: db.user_id,
            kind: db.kind,
            title: db.title,
            message: db.message,
            media: db.media,
            created_by: db.created_by,
            is_read: db.is_read,
            created_at: db.created_at,
        }
    }
}

/// Query parameters for listing notifications
#[derive(Debug, Deserialize, IntoParams)]
pub struct ListNotificationsQuery {
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,

    /// Include direct notifications for this user alongside broadcasts
    #[param(value_type = Option<String>, format = "uuid")]
    pub user_id: Option<UserId>,
}
