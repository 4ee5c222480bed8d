//! API request/response models for posts.

use crate::api::models::pagination::Pagination;
use crate::db::models::posts::PostDBResponse;
use crate::media::MediaDescriptor;
use crate::types::{PostId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Body of `POST /api/v1/posts`.
///
/// `media` entries may carry data URLs straight from capture; they are normalized before the
/// post is stored.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct PostCreate {
    #[schema(value_type = String, format = "uuid")]
    pub author_id: UserId,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub media: Vec<MediaDescriptor>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PostResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: PostId,
    #[schema(value_type = String, format = "uuid")]
    pub author_id: UserId,
    pub content: String,
    pub media: Vec<MediaDescriptor>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<PostDBResponse> for PostResponse {
    fn from(db: PostDBResponse) -> Self {
        Self {
            id: db.id,
            author_id: db.author_id,
            content: db.content,
            media: db.media,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

/// Query parameters for listing posts
#[derive(Debug, Deserialize, IntoParams)]
pub struct ListPostsQuery {
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,

    /// Only posts by this author
    #[param(value_type = Option<String>, format = "uuid")]
    pub author_id: Option<UserId>,
}
