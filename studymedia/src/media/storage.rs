//! Local disk storage for attachments that are not sent to the image host.

use std::path::{Path, PathBuf};

use rand::prelude::RngExt;
use rand::rng;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument, warn};

use super::{
    DataUrl, MediaKind, Result, StoredMediaFile,
    mime::{CANDIDATE_EXTENSIONS, extension_for_mime},
};
use crate::config::MediaStorageConfig;

/// Writes decoded data URLs into a flat uploads directory under random hex IDs.
///
/// Files are append-only: nothing here overwrites or deletes a completely written file.
#[derive(Debug, Clone)]
pub struct LocalMediaStorage {
    uploads_dir: PathBuf,
    thumbnails_dir: PathBuf,
    url_prefix: String,
    thumbnail_prefix: String,
}

impl LocalMediaStorage {
    /// Create the uploads and thumbnails directories if needed.
    ///
    /// Returns an error if either directory cannot be created; the service should not start
    /// without somewhere to write attachments.
    pub async fn new(config: &MediaStorageConfig) -> Result<Self> {
        fs::create_dir_all(&config.uploads_dir).await?;
        fs::create_dir_all(&config.thumbnails_dir).await?;

        debug!(
            uploads_dir = %config.uploads_dir.display(),
            thumbnails_dir = %config.thumbnails_dir.display(),
            "Local media storage ready"
        );

        Ok(Self {
            uploads_dir: config.uploads_dir.clone(),
            thumbnails_dir: config.thumbnails_dir.clone(),
            url_prefix: config.url_prefix.trim_end_matches('/').to_string(),
            thumbnail_prefix: config.thumbnail_prefix.trim_end_matches('/').to_string(),
        })
    }

    pub fn uploads_dir(&self) -> &Path {
        &self.uploads_dir
    }

    pub fn thumbnails_dir(&self) -> &Path {
        &self.thumbnails_dir
    }

    /// Decode a data URL and write it to `<uploads_dir>/<id>.<ext>`.
    ///
    /// The extension comes from `mime_type`, not from the data URL header. Videos get a
    /// placeholder thumbnail URL; no frame is extracted, so that URL does not resolve.
    #[instrument(skip(self, data_url), fields(mime_type = %mime_type), err)]
    pub async fn store_media(&self, data_url: &str, original_name: &str, mime_type: &str) -> Result<StoredMediaFile> {
        let decoded = DataUrl::parse(data_url)?;

        let id = generate_media_id();
        let ext = extension_for_mime(mime_type);
        let filename = format!("{id}.{ext}");
        let path = self.uploads_dir.join(&filename);

        let written = async {
            let mut file = fs::File::create(&path).await?;
            file.write_all(&decoded.data).await?;
            file.sync_all().await
        }
        .await;
        remove_on_error(&path, written).await?;

        let thumbnail_url = match MediaKind::from_mime(mime_type) {
            Some(MediaKind::Video) => Some(format!("{}/{id}.jpg", self.thumbnail_prefix)),
            _ => None,
        };

        debug!(id = %id, size = decoded.data.len(), "Stored media file");

        Ok(StoredMediaFile {
            url: format!("{}/{filename}", self.url_prefix),
            id,
            original_name: original_name.to_string(),
            mime_type: mime_type.to_string(),
            size: decoded.data.len() as u64,
            thumbnail_url,
        })
    }

    /// Find the stored file for an ID, probing each known extension in order.
    pub async fn locate(&self, id: &str) -> Result<Option<(PathBuf, &'static str)>> {
        if !is_valid_media_id(id) {
            return Ok(None);
        }

        for ext in CANDIDATE_EXTENSIONS {
            let path = self.uploads_dir.join(format!("{id}.{ext}"));
            if fs::try_exists(&path).await? {
                return Ok(Some((path, ext)));
            }
        }
        Ok(None)
    }

    /// Read the bytes stored under an ID, or `None` if no file matches.
    #[instrument(skip(self), err)]
    pub async fn get_media(&self, id: &str) -> Result<Option<Vec<u8>>> {
        match self.locate(id).await? {
            Some((path, _)) => match fs::read(&path).await {
                Ok(bytes) => Ok(Some(bytes)),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
                Err(e) => Err(e.into()),
            },
            None => Ok(None),
        }
    }
}

/// Delete a partially written file so its ID never resolves to truncated bytes.
async fn remove_on_error<T>(path: &Path, result: std::io::Result<T>) -> Result<T> {
    match result {
        Ok(value) => Ok(value),
        Err(e) => {
            match fs::remove_file(path).await {
                Ok(()) => {}
                Err(cleanup) if cleanup.kind() == std::io::ErrorKind::NotFound => {}
                Err(cleanup) => warn!(path = %path.display(), error = %cleanup, "Failed to remove partial media file"),
            }
            Err(e.into())
        }
    }
}

/// 8 random bytes, hex encoded.
fn generate_media_id() -> String {
    let bytes: [u8; 8] = rng().random();
    hex::encode(bytes)
}

/// Media IDs are lowercase hex; anything else cannot name a stored file.
fn is_valid_media_id(id: &str) -> bool {
    !id.is_empty() && id.len() <= 64 && id.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}
