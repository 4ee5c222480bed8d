//! Database repository for notifications.

use crate::db::{
    errors::Result,
    handlers::repository::Repository,
    models::notifications::{NotificationCreateDBRequest, NotificationDBResponse},
};
use crate::media::MediaDescriptor;
use crate::types::{NotificationId, UserId, abbrev_uuid};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection, types::Json};
use tracing::instrument;
use uuid::Uuid;

/// Filter for listing notifications.
///
/// Broadcasts are always visible. Setting `user_id` also includes that user's direct
/// notifications.
#[derive(Debug, Clone)]
pub struct NotificationFilter {
    pub skip: i64,
    pub limit: i64,
    pub user_id: Option<UserId>,
}

impl NotificationFilter {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self { skip, limit, user_id: None }
    }

    pub fn for_user(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }
}

#[derive(Debug, Clone, FromRow)]
struct Notification {
    pub id: NotificationId,
    pub user_id: Option<UserId>,
    pub kind: String,
    pub title: String,
    pub message: String,
    pub media: Json<Vec<MediaDescriptor>>,
    pub created_by: Option<UserId>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Notification> for NotificationDBResponse {
    fn from(n: Notification) -> Self {
        Self {
            id: n.id,
            user_id: n.user_id,
            kind: n.kind,
            title: n.title,
            message: n.message,
            media: n.media.0,
            created_by: n.created_by,
            is_read: n.is_read,
            created_at: n.created_at,
        }
    }
}

const COLUMNS: &str = "id, user_id, kind, title, message, media, created_by, is_read, created_at";

pub struct Notifications<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Notifications<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Oldest-first page of notifications whose media still embeds a data URL, after the
    /// `(created_at, id)` cursor when given
    #[instrument(skip(self), err)]
    pub async fn list_with_data_urls(
        &mut self,
        after: Option<(DateTime<Utc>, NotificationId)>,
        limit: i64,
    ) -> Result<Vec<NotificationDBResponse>> {
        let query = format!(
            r#"
            SELECT {COLUMNS}
            FROM notifications
            WHERE EXISTS (
                SELECT 1 FROM jsonb_array_elements(media) AS item
                WHERE item->>'url' LIKE 'data:%'
            )
            AND ($1::timestamptz IS NULL OR (created_at, id) > ($1::timestamptz, $2::uuid))
            ORDER BY created_at ASC, id ASC
            LIMIT $3
            "#
        );
        let rows = sqlx::query_as::<_, Notification>(&query)
            .bind(after.map(|(created_at, _)| created_at))
            .bind(after.map(|(_, id)| id))
            .bind(limit)
            .fetch_all(&mut *self.db)
            .await?;

        Ok(rows.into_iter().map(NotificationDBResponse::from).collect())
    }

    /// Replace the stored attachment list. Returns false if the notification does not exist.
    #[instrument(skip(self, media), fields(notification_id = %abbrev_uuid(&id), count = media.len()), err)]
    pub async fn update_media(&mut self, id: NotificationId, media: &[MediaDescriptor]) -> Result<bool> {
        let result = sqlx::query("UPDATE notifications SET media = $2 WHERE id = $1")
            .bind(id)
            .bind(Json(media))
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait::async_trait]
impl<'c> Repository for Notifications<'c> {
    type CreateRequest = NotificationCreateDBRequest;
    type Response = NotificationDBResponse;
    type Id = NotificationId;
    type Filter = NotificationFilter;

    #[instrument(skip(self, request), fields(kind = %request.kind, media = request.media.len()), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let query = format!(
            r#"
            INSERT INTO notifications (id, user_id, kind, title, message, media, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, Notification>(&query)
            .bind(Uuid::new_v4())
            .bind(request.user_id)
            .bind(&request.kind)
            .bind(&request.title)
            .bind(&request.message)
            .bind(Json(&request.media))
            .bind(request.created_by)
            .fetch_one(&mut *self.db)
            .await?;

        Ok(NotificationDBResponse::from(row))
    }

    #[instrument(skip(self), fields(notification_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let query = format!("SELECT {COLUMNS} FROM notifications WHERE id = $1");
        let row = sqlx::query_as::<_, Notification>(&query)
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(row.map(NotificationDBResponse::from))
    }

    #[instrument(skip(self, filter), fields(skip = filter.skip, limit = filter.limit), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let query = format!(
            r#"
            SELECT {COLUMNS}
            FROM notifications
            WHERE user_id IS NULL OR user_id = $1
            ORDER BY created_at DESC, id DESC
            OFFSET $2
            LIMIT $3
            "#
        );
        let rows = sqlx::query_as::<_, Notification>(&query)
            .bind(filter.user_id)
            .bind(filter.skip)
            .bind(filter.limit)
            .fetch_all(&mut *self.db)
            .await?;

        Ok(rows.into_iter().map(NotificationDBResponse::from).collect())
    }
}
