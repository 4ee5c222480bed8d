//! Media ingestion and normalization pipeline.
//!
//! Attachments on posts and announcements arrive as data URLs (`data:<mime>;base64,<payload>`).
//! Before the owning row is written, every attachment is normalized to a durable URL: either a
//! path served by this service (`/uploads/<id>.<ext>`) or a link returned by the external image
//! host.
//!
//! ```text
//! capture (multipart files) ──► data URLs
//!                                   │
//!                                   ▼
//!                       MediaNormalizer::normalize
//!                         ├─ image + cloud configured ─► CloudMediaService ─► ImageHost
//!                         └─ video, or no cloud ───────► LocalMediaStorage ─► uploads dir
//!                                   │
//!                                   ▼
//!                      Vec<MediaDescriptor> persisted as JSON
//! ```
//!
//! Every step degrades per item: if an attachment cannot be normalized, its original descriptor
//! is kept and the write proceeds.

pub mod capture;
pub mod cloud;
pub mod data_url;
pub mod descriptor;
pub mod mime;
pub mod normalize;
pub mod storage;

pub use capture::{CapturedMedia, MediaCapture, SelectedFile};
pub use cloud::{CloudMediaService, ImageHost, ImageHostClient};
pub use data_url::{DataUrl, is_data_url};
pub use descriptor::{HostedImage, MediaDescriptor, MediaKind, StoredMediaFile};
pub use normalize::{MediaNormalizer, NormalizeOutcome};
pub use storage::LocalMediaStorage;

use thiserror::Error;

/// Errors raised by the media pipeline.
///
/// Most of these never reach a client: the normalizer catches them per item and keeps the
/// original attachment. They surface directly only from capture (bad uploads) and from startup.
#[derive(Error, Debug)]
pub enum MediaError {
    #[error("invalid data URL: {0}")]
    InvalidDataUrl(String),

    #[error("invalid base64 payload: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Image(#[from] image::ImageError),

    /// The image host needs an API key and none is configured
    #[error("image host API key is not configured")]
    MissingApiKey,

    /// The image host has no video endpoint
    #[error("video upload is not supported by the image host")]
    UnsupportedVideoUpload,

    #[error("image host returned {status}: {body}")]
    UpstreamStatus { status: u16, body: String },

    #[error("image host rejected the upload: {0}")]
    ProviderRejected(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("too many files: {got} selected, at most {max} allowed")]
    TooManyFiles { max: usize, got: usize },

    #[error("unsupported media type: {0}")]
    UnsupportedType(String),
}

impl MediaError {
    /// Whether the error was caused by the caller's input rather than by the service
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            MediaError::InvalidDataUrl(_) | MediaError::Decode(_) | MediaError::TooManyFiles { .. } | MediaError::UnsupportedType(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, MediaError>;
