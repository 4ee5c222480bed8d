//! Shared fixtures for unit and handler tests.

use crate::config::{Config, MediaStorageConfig, PoolSettings};
use crate::media::{HostedImage, ImageHost, MediaError};
use crate::{AppState, build_app_state, build_router};
use axum_test::TestServer;
use sqlx::PgPool;
use std::path::Path;
use std::sync::Arc;

/// A 1x1 transparent PNG.
pub const SAMPLE_PNG_DATA_URL: &str =
    "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNk+M9QDwADhgGAWjR9awAAAABJRU5ErkJggg==";

/// The first bytes of an MP4 `ftyp` box; enough to be stored, not enough to play.
pub const SAMPLE_VIDEO_DATA_URL: &str = "data:video/mp4;base64,AAAAIGZ0eXA=";

/// Config whose storage lives under `root` and which never touches the network.
pub fn create_test_config(root: &Path) -> Config {
    let mut config = Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        enable_metrics: false,
        ..Default::default()
    };
    config.database.pool = PoolSettings {
        max_connections: 2,
        min_connections: 0,
        ..Default::default()
    };
    config.media.storage = MediaStorageConfig {
        uploads_dir: root.join("uploads"),
        thumbnails_dir: root.join("uploads").join("thumbnails"),
        ..Default::default()
    };
    config
}

/// A test server over `pool`, with media stored under `root`.
///
/// `image_host` switches image normalization to that host, as `media.backend: cloud` would.
pub async fn create_test_app(pool: PgPool, root: &Path, image_host: Option<Arc<dyn ImageHost>>) -> (TestServer, AppState) {
    let state = build_app_state(create_test_config(root), pool, image_host)
        .await
        .expect("Failed to build app state");
    let router = build_router(&state).expect("Failed to build router");
    let server = TestServer::new(router.into_make_service()).expect("Failed to create test server");
    (server, state)
}

/// Image host that accepts every upload and returns the same hosted image.
#[derive(Debug, Clone)]
pub struct StaticImageHost {
    pub hosted: HostedImage,
}

impl Default for StaticImageHost {
    fn default() -> Self {
        Self {
            hosted: HostedImage {
                url: "https://cdn.example/x.png".to_string(),
                thumbnail_url: Some("https://cdn.example/x_thumb.png".to_string()),
                delete_url: Some("https://cdn.example/delete/x".to_string()),
                provider_id: Some("x".to_string()),
            },
        }
    }
}

#[async_trait::async_trait]
impl ImageHost for StaticImageHost {
    async fn upload_image(&self, _data_url: &str, _name: Option<&str>) -> crate::media::Result<HostedImage> {
        Ok(self.hosted.clone())
    }
}

/// Image host that rejects every upload.
#[derive(Debug, Clone, Copy)]
pub struct FailingImageHost;

#[async_trait::async_trait]
impl ImageHost for FailingImageHost {
    async fn upload_image(&self, _data_url: &str, _name: Option<&str>) -> crate::media::Result<HostedImage> {
        Err(MediaError::UpstreamStatus {
            status: 503,
            body: "unavailable".to_string(),
        })
    }
}
