//! Normalization of attachment lists before they are written to the database.

use std::sync::Arc;

use tracing::{debug, instrument, warn};

use super::{CloudMediaService, LocalMediaStorage, MediaDescriptor, MediaError, Result, data_url::declared_mime};

/// Result of normalizing one attachment list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizeOutcome {
    /// Same length and order as the input
    pub media: Vec<MediaDescriptor>,
    /// Entries whose data URL was replaced by a durable URL
    pub normalized: usize,
    /// Entries that still hold a data URL because storing them failed
    pub failed: usize,
}

impl NormalizeOutcome {
    pub fn changed(&self) -> bool {
        self.normalized > 0
    }
}

/// True if any entry still embeds its content as a data URL.
pub fn contains_data_urls(media: &[MediaDescriptor]) -> bool {
    media.iter().any(MediaDescriptor::is_data_url)
}

/// Routes each data URL attachment to the image host or to local storage.
///
/// Attachments go to the image host when one is configured. Videos the host does not accept, and
/// everything when no image host is configured, are written to local storage.
#[derive(Clone)]
pub struct MediaNormalizer {
    storage: Arc<LocalMediaStorage>,
    cloud: Option<CloudMediaService>,
}

impl MediaNormalizer {
    pub fn new(storage: Arc<LocalMediaStorage>, cloud: Option<CloudMediaService>) -> Self {
        Self { storage, cloud }
    }

    pub fn has_cloud(&self) -> bool {
        self.cloud.is_some()
    }

    /// Replace every data URL in `media` with a durable URL, one entry at a time.
    ///
    /// Entries without a data URL are returned untouched. An entry that cannot be stored is kept
    /// as it was and counted in `failed`; this never fails the whole list.
    #[instrument(skip_all, fields(count = media.len(), cloud = self.cloud.is_some()))]
    pub async fn normalize(&self, media: Vec<MediaDescriptor>) -> NormalizeOutcome {
        let mut outcome = NormalizeOutcome {
            media: Vec::with_capacity(media.len()),
            normalized: 0,
            failed: 0,
        };

        for (index, item) in media.into_iter().enumerate() {
            if !item.is_data_url() {
                metrics::counter!("studymedia_media_items_total", "outcome" => "passthrough").increment(1);
                outcome.media.push(item);
                continue;
            }

            let (result, target) = match &self.cloud {
                Some(cloud) => match cloud.upload(&item).await {
                    Err(MediaError::UnsupportedVideoUpload) => (self.store_locally(index, &item).await, "local"),
                    result => (result, "cloud"),
                },
                None => (self.store_locally(index, &item).await, "local"),
            };

            match result {
                Ok(stored) => {
                    debug!(index, target, url = %stored.url, "Normalized attachment");
                    metrics::counter!("studymedia_media_items_total", "outcome" => target).increment(1);
                    outcome.normalized += 1;
                    outcome.media.push(stored);
                }
                Err(e) => {
                    warn!(index, target, kind = %item.kind, error = %e, "Failed to normalize attachment, keeping original");
                    metrics::counter!("studymedia_media_items_total", "outcome" => "failed").increment(1);
                    outcome.failed += 1;
                    outcome.media.push(item);
                }
            }
        }

        outcome
    }

    async fn store_locally(&self, index: usize, item: &MediaDescriptor) -> Result<MediaDescriptor> {
        let mime_type = declared_mime(&item.url).unwrap_or("application/octet-stream").to_ascii_lowercase();
        let original_name = format!("{}-{}", item.kind, index + 1);
        let stored = self.storage.store_media(&item.url, &original_name, &mime_type).await?;
        Ok(stored.descriptor(item.kind))
    }
}
