//! Attachment records shared by the pipeline, the database and the API.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Kind of attachment. Serialized lowercase, as stored in existing rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Classify a MIME type; anything other than `image/*` or `video/*` is not an attachment.
    pub fn from_mime(mime_type: &str) -> Option<Self> {
        let mime_type = mime_type.trim().to_ascii_lowercase();
        if mime_type.starts_with("image/") {
            Some(Self::Image)
        } else if mime_type.starts_with("video/") {
            Some(Self::Video)
        } else {
            None
        }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaKind::Image => write!(f, "image"),
            MediaKind::Video => write!(f, "video"),
        }
    }
}

/// One attachment as embedded in a post or notification.
///
/// The JSON form (`{"type", "url", "thumbnailUrl"?}`) is the persisted contract for the `media`
/// columns; field names and order must not change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct MediaDescriptor {
    #[serde(rename = "type")]
    pub kind: MediaKind,
    pub url: String,
    #[serde(rename = "thumbnailUrl", default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
}

impl MediaDescriptor {
    pub fn new(kind: MediaKind, url: impl Into<String>) -> Self {
        Self {
            kind,
            url: url.into(),
            thumbnail_url: None,
        }
    }

    pub fn with_thumbnail(mut self, thumbnail_url: impl Into<String>) -> Self {
        self.thumbnail_url = Some(thumbnail_url.into());
        self
    }

    pub fn is_data_url(&self) -> bool {
        super::is_data_url(&self.url)
    }
}

/// A data URL written to the local uploads directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StoredMediaFile {
    /// 16 lowercase hex characters
    pub id: String,
    pub original_name: String,
    pub mime_type: String,
    /// Decoded size in bytes
    pub size: u64,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
}

impl StoredMediaFile {
    pub fn descriptor(&self, kind: MediaKind) -> MediaDescriptor {
        MediaDescriptor {
            kind,
            url: self.url.clone(),
            thumbnail_url: self.thumbnail_url.clone(),
        }
    }
}

/// An image accepted by the external image host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostedImage {
    pub url: String,
    pub thumbnail_url: Option<String>,
    // Accepted from the provider but not used downstream.
    pub delete_url: Option<String>,
    pub provider_id: Option<String>,
}

impl HostedImage {
    pub fn descriptor(&self) -> MediaDescriptor {
        MediaDescriptor {
            kind: MediaKind::Image,
            url: self.url.clone(),
            thumbnail_url: self.thumbnail_url.clone(),
        }
    }
}
