//! Database models for posts.

use crate::media::MediaDescriptor;
use crate::types::{PostId, UserId};
use chrono::{DateTime, Utc};

/// Database request for creating a new post
#[derive(Debug, Clone)]
pub struct PostCreateDBRequest {
    pub author_id: UserId,
    pub content: String,
    /// Already normalized
    pub media: Vec<MediaDescriptor>,
}

/// Database response for a post
#[derive(Debug, Clone)]
pub struct PostDBResponse {
    pub id: PostId,
    pub author_id: UserId,
    pub content: String,
    pub media: Vec<MediaDescriptor>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
