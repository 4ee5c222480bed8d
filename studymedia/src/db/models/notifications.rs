//! Database models for notifications and admin announcements.

use crate::media::MediaDescriptor;
use crate::types::{NotificationId, UserId};
use chrono::{DateTime, Utc};

/// Notification kind written by the admin announcement endpoint
pub const ANNOUNCEMENT_KIND: &str = "announcement";

/// Database request for creating a notification
#[derive(Debug, Clone)]
pub struct NotificationCreateDBRequest {
    /// `None` broadcasts to every user
    pub user_id: Option<UserId>,
    pub kind: String,
    pub title: String,
    pub message: String,
    pub media: Vec<MediaDescriptor>,
    pub created_by: Option<UserId>,
}

impl NotificationCreateDBRequest {
    pub fn announcement(title: String, message: String, media: Vec<MediaDescriptor>, created_by: Option<UserId>) -> Self {
        Self {
            user_id: None,
            kind: ANNOUNCEMENT_KIND.to_string(),
            title,
            message,
            media,
            created_by,
        }
    }
}

/// Database response for a notification
#[derive(Debug, Clone)]
pub struct NotificationDBResponse {
    pub id: NotificationId,
    pub user_id: Option<UserId>,
    pub kind: String,
    pub title: String,
    pub message: String,
    pub media: Vec<MediaDescriptor>,
    pub created_by: Option<UserId>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}
