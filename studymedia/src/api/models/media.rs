//! API request/response models for media capture and the optimize sweep.

use crate::media::CapturedMedia;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Default number of records per table the optimize sweep loads per batch.
pub const DEFAULT_OPTIMIZE_LIMIT: i64 = 100;

/// Upper bound on the optimize batch size.
pub const MAX_OPTIMIZE_LIMIT: i64 = 1000;

/// Response of `POST /api/v1/media/prepare`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PreparedMediaResponse {
    pub media: Vec<CapturedMedia>,
    /// Number of selected files that were dropped (unsupported or unreadable)
    pub skipped: usize,
}

/// Body of `POST /admin/api/v1/media/optimize`.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct OptimizeRequest {
    /// Records per table loaded per batch (default: 100, max: 1000). The sweep visits every
    /// matching record regardless.
    #[serde(default)]
    pub limit: Option<i64>,
}

impl OptimizeRequest {
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_OPTIMIZE_LIMIT).clamp(1, MAX_OPTIMIZE_LIMIT)
    }
}

/// Summary of one optimize sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct OptimizeResponse {
    pub posts_scanned: usize,
    pub posts_updated: usize,
    pub notifications_scanned: usize,
    pub notifications_updated: usize,
    /// Attachments that stayed as data URLs because normalization failed
    pub items_failed: usize,
}
