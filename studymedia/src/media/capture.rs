//! Turning uploaded files into data URL attachments.
//!
//! Large images are downscaled and re-encoded as JPEG before they are inlined, so a phone photo
//! does not travel through the rest of the pipeline at full resolution.

use std::io::Cursor;

use image::{ImageReader, codecs::jpeg::JpegEncoder, imageops::FilterType};
use serde::Serialize;
use tracing::{debug, instrument, warn};
use utoipa::ToSchema;

use super::{DataUrl, MediaDescriptor, MediaError, MediaKind, Result};
use crate::config::CaptureConfig;

/// A file as received from the client.
#[derive(Debug, Clone)]
pub struct SelectedFile {
    pub name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// An accepted file, inlined as a data URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct CapturedMedia {
    #[serde(rename = "type")]
    pub kind: MediaKind,
    pub data_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    pub original_name: String,
    /// MIME type of `data_url`, which is `image/jpeg` for compressed images
    pub mime_type: String,
    pub original_size: u64,
    pub size: u64,
}

impl CapturedMedia {
    pub fn descriptor(&self) -> MediaDescriptor {
        MediaDescriptor {
            kind: self.kind,
            url: self.data_url.clone(),
            thumbnail_url: self.thumbnail_url.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompressedImage {
    pub data_url: String,
    pub width: u32,
    pub height: u32,
    pub original_size: u64,
    pub compressed_size: u64,
}

/// Decode an image, shrink it to fit within `max_dimension` and re-encode it as JPEG.
///
/// Images already within bounds keep their size but are still re-encoded.
pub fn compress_image(bytes: &[u8], config: &CaptureConfig) -> Result<CompressedImage> {
    let decoded = ImageReader::new(Cursor::new(bytes)).with_guessed_format()?.decode()?;

    let (width, height) = fit_within(decoded.width(), decoded.height(), config.max_dimension);
    let resized = if (width, height) == (decoded.width(), decoded.height()) {
        decoded
    } else {
        decoded.resize_exact(width, height, FilterType::Triangle)
    };

    // JPEG has no alpha channel
    let rgb = resized.to_rgb8();
    let mut encoded = Vec::new();
    JpegEncoder::new_with_quality(&mut encoded, config.jpeg_quality.clamp(1, 100)).encode_image(&rgb)?;

    Ok(CompressedImage {
        data_url: DataUrl::encode("image/jpeg", &encoded),
        width,
        height,
        original_size: bytes.len() as u64,
        compressed_size: encoded.len() as u64,
    })
}

/// Scale `(width, height)` proportionally so neither side exceeds `max`. Never upscales.
fn fit_within(width: u32, height: u32, max: u32) -> (u32, u32) {
    let longest = width.max(height);
    if longest <= max || max == 0 {
        return (width, height);
    }
    let scale = max as f64 / longest as f64;
    let scaled = |side: u32| ((side as f64 * scale).round() as u32).clamp(1, max);
    (scaled(width), scaled(height))
}

/// Applies the attachment rules to a batch of uploaded files.
#[derive(Debug, Clone)]
pub struct MediaCapture {
    config: CaptureConfig,
}

impl MediaCapture {
    pub fn new(config: CaptureConfig) -> Self {
        Self { config }
    }

    /// Capture a batch of files.
    ///
    /// Exceeding `max_files` rejects the whole batch. Individual files that are not images or
    /// videos, are empty, or cannot be decoded are skipped with a warning.
    #[instrument(skip_all, fields(count = files.len()))]
    pub async fn capture(&self, files: Vec<SelectedFile>) -> Result<Vec<CapturedMedia>> {
        if files.len() > self.config.max_files {
            return Err(MediaError::TooManyFiles {
                max: self.config.max_files,
                got: files.len(),
            });
        }

        let mut captured = Vec::with_capacity(files.len());
        for file in files {
            let name = file.name.clone();
            match self.capture_one(file).await {
                Ok(media) => captured.push(media),
                Err(e) => warn!(file = %name, error = %e, "Skipping attachment"),
            }
        }
        Ok(captured)
    }

    async fn capture_one(&self, file: SelectedFile) -> Result<CapturedMedia> {
        let mime_type = file.mime_type.trim().to_ascii_lowercase();
        let kind = MediaKind::from_mime(&mime_type).ok_or_else(|| MediaError::UnsupportedType(mime_type.clone()))?;
        if file.bytes.is_empty() {
            return Err(MediaError::InvalidDataUrl("file is empty".to_string()));
        }

        let original_size = file.bytes.len() as u64;

        if kind == MediaKind::Image && original_size >= self.config.compress_threshold_bytes {
            let config = self.config.clone();
            let bytes = file.bytes;
            let compressed = tokio::task::spawn_blocking(move || compress_image(&bytes, &config))
                .await
                .map_err(|e| MediaError::Io(std::io::Error::other(e)))??;

            debug!(
                file = %file.name,
                original_size,
                compressed_size = compressed.compressed_size,
                width = compressed.width,
                height = compressed.height,
                "Compressed image"
            );

            return Ok(CapturedMedia {
                kind,
                data_url: compressed.data_url,
                thumbnail_url: None,
                original_name: file.name,
                mime_type: "image/jpeg".to_string(),
                original_size,
                size: compressed.compressed_size,
            });
        }

        Ok(CapturedMedia {
            kind,
            data_url: DataUrl::encode(&mime_type, &file.bytes),
            thumbnail_url: None,
            original_name: file.name,
            mime_type,
            original_size,
            size: original_size,
        })
    }
}
