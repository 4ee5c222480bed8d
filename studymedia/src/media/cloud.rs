//! Upload of image attachments to the external image host.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, multipart::Form};
use serde::Deserialize;
use tracing::{debug, instrument, warn};
use url::Url;

use super::{HostedImage, MediaDescriptor, MediaError, MediaKind, Result, data_url::payload_base64};
use crate::config::ImageHostConfig;

/// An external service that stores images and returns public URLs for them.
#[async_trait]
pub trait ImageHost: Send + Sync {
    /// Upload an image given as a data URL.
    async fn upload_image(&self, data_url: &str, name: Option<&str>) -> Result<HostedImage>;

    /// Upload a video given as a data URL. Hosts without a video endpoint keep the default.
    async fn upload_video(&self, _data_url: &str, _name: Option<&str>) -> Result<HostedImage> {
        Err(MediaError::UnsupportedVideoUpload)
    }
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    data: Option<UploadData>,
    #[serde(default)]
    error: Option<ProviderError>,
}

#[derive(Debug, Deserialize)]
struct UploadData {
    #[serde(default)]
    id: Option<String>,
    url: String,
    #[serde(default)]
    delete_url: Option<String>,
    #[serde(default)]
    thumb: Option<ImageVariant>,
    #[serde(default)]
    medium: Option<ImageVariant>,
}

#[derive(Debug, Deserialize)]
struct ImageVariant {
    url: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ProviderError {
    Detailed { message: String },
    Plain(String),
}

impl ProviderError {
    fn message(self) -> String {
        match self {
            ProviderError::Detailed { message } | ProviderError::Plain(message) => message,
        }
    }
}

impl UploadResponse {
    fn into_hosted(self) -> Result<HostedImage> {
        let rejected = self.success == Some(false);
        match self.data {
            Some(data) if !rejected => Ok(HostedImage {
                thumbnail_url: data.thumb.or(data.medium).map(|v| v.url),
                url: data.url,
                delete_url: data.delete_url,
                provider_id: data.id,
            }),
            _ => Err(MediaError::ProviderRejected(
                self.error.map(ProviderError::message).unwrap_or_else(|| "upload failed".to_string()),
            )),
        }
    }
}

/// [`ImageHost`] backed by an ImgBB-style multipart upload API.
pub struct ImageHostClient {
    client: Client,
    api_url: Url,
    api_key: Option<String>,
}

impl ImageHostClient {
    pub fn new(config: &ImageHostConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone().filter(|k| !k.trim().is_empty()),
        })
    }
}

#[async_trait]
impl ImageHost for ImageHostClient {
    #[instrument(skip(self, data_url), err)]
    async fn upload_image(&self, data_url: &str, name: Option<&str>) -> Result<HostedImage> {
        let api_key = self.api_key.as_deref().ok_or(MediaError::MissingApiKey)?;
        let payload = payload_base64(data_url)?;

        let mut form = Form::new().text("key", api_key.to_string()).text("image", payload.to_string());
        if let Some(name) = name {
            form = form.text("name", name.to_string());
        }

        debug!(url = %self.api_url, bytes = payload.len(), "Uploading image to image host");

        let response = self
            .client
            .post(self.api_url.clone())
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(MediaError::UpstreamStatus { status, body });
        }

        let body_text = response.text().await?;
        let parsed: UploadResponse = serde_json::from_str(&body_text).map_err(|e| {
            debug!("Image host response body was: {}", body_text);
            MediaError::ProviderRejected(format!("unreadable response: {e}"))
        })?;

        parsed.into_hosted()
    }
}

/// Replaces image data URLs in a media list with image-host URLs.
#[derive(Clone)]
pub struct CloudMediaService {
    host: Arc<dyn ImageHost>,
}

impl CloudMediaService {
    pub fn new(host: Arc<dyn ImageHost>) -> Self {
        Self { host }
    }

    /// Upload one data URL entry and return its hosted replacement.
    ///
    /// Videos go through [`ImageHost::upload_video`], which fails with
    /// [`MediaError::UnsupportedVideoUpload`] on hosts without a video endpoint.
    pub async fn upload(&self, item: &MediaDescriptor) -> Result<MediaDescriptor> {
        let hosted = match item.kind {
            MediaKind::Image => self.host.upload_image(&item.url, None).await?,
            MediaKind::Video => self.host.upload_video(&item.url, None).await?,
        };
        Ok(MediaDescriptor {
            kind: item.kind,
            ..hosted.descriptor()
        })
    }

    /// Upload every image entry that still holds a data URL, one at a time.
    ///
    /// Videos and entries that already have a durable URL are returned unchanged. When an upload
    /// fails the original entry is kept and the failure is only logged.
    #[instrument(skip_all, fields(count = media.len()))]
    pub async fn process_media_urls(&self, media: Vec<MediaDescriptor>) -> Vec<MediaDescriptor> {
        let mut processed = Vec::with_capacity(media.len());
        for (index, item) in media.into_iter().enumerate() {
            if item.kind != MediaKind::Image || !item.is_data_url() {
                processed.push(item);
                continue;
            }
            match self.upload(&item).await {
                Ok(hosted) => processed.push(hosted),
                Err(e) => {
                    warn!(index, error = %e, "Image upload failed, keeping original attachment");
                    processed.push(item);
                }
            }
        }
        processed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use crate::test_utils::{FailingImageHost, SAMPLE_PNG_DATA_URL, SAMPLE_VIDEO_DATA_URL, StaticImageHost};
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer, api_key: Option<&str>) -> ImageHostClient {
        let config = ImageHostConfig {
            api_url: Url::parse(&format!("{}/1/upload", server.uri())).unwrap(),
            api_key: api_key.map(str::to_string),
            timeout: Duration::from_secs(5),
        };
        ImageHostClient::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_upload_image_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/1/upload"))
            .and(body_string_contains("name=\"key\""))
            .and(body_string_contains("test-key"))
            .and(body_string_contains("name=\"image\""))
            .and(body_string_contains("iVBORw0KGgo"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": true,
                "status": 200,
                "data": {
                    "id": "abc123",
                    "url": "https://cdn.example/x.png",
                    "delete_url": "https://host.example/delete/abc123",
                    "thumb": { "url": "https://cdn.example/x_thumb.png" },
                    "medium": { "url": "https://cdn.example/x_medium.png" }
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let hosted = client_for(&server, Some("test-key"))
            .upload_image(SAMPLE_PNG_DATA_URL, Some("pixel"))
            .await
            .unwrap();

        assert_eq!(hosted.url, "https://cdn.example/x.png");
        assert_eq!(hosted.thumbnail_url.as_deref(), Some("https://cdn.example/x_thumb.png"));
        assert_eq!(hosted.delete_url.as_deref(), Some("https://host.example/delete/abc123"));
        assert_eq!(hosted.provider_id.as_deref(), Some("abc123"));
    }

    #[tokio::test]
    async fn test_upload_image_falls_back_to_medium_variant() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/1/upload"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": true,
                "data": {
                    "url": "https://cdn.example/y.png",
                    "medium": { "url": "https://cdn.example/y_medium.png" }
                }
            })))
            .mount(&server)
            .await;

        let hosted = client_for(&server, Some("k")).upload_image(SAMPLE_PNG_DATA_URL, None).await.unwrap();
        assert_eq!(hosted.thumbnail_url.as_deref(), Some("https://cdn.example/y_medium.png"));
        assert!(hosted.provider_id.is_none());
    }

    #[tokio::test]
    async fn test_upload_image_provider_rejection() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": false,
                "error": { "message": "Invalid API key" }
            })))
            .mount(&server)
            .await;

        let err = client_for(&server, Some("bad")).upload_image(SAMPLE_PNG_DATA_URL, None).await.unwrap_err();
        match err {
            MediaError::ProviderRejected(message) => assert_eq!(message, "Invalid API key"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_upload_image_non_success_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let err = client_for(&server, Some("k")).upload_image(SAMPLE_PNG_DATA_URL, None).await.unwrap_err();
        assert!(matches!(err, MediaError::UpstreamStatus { status: 500, ref body } if body == "boom"));
    }

    #[tokio::test]
    async fn test_upload_image_without_api_key_makes_no_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST")).respond_with(ResponseTemplate::new(200)).expect(0).mount(&server).await;

        let err = client_for(&server, None).upload_image(SAMPLE_PNG_DATA_URL, None).await.unwrap_err();
        assert!(matches!(err, MediaError::MissingApiKey));

        let err = client_for(&server, Some("   ")).upload_image(SAMPLE_PNG_DATA_URL, None).await.unwrap_err();
        assert!(matches!(err, MediaError::MissingApiKey));
    }

    #[tokio::test]
    async fn test_upload_video_is_unsupported() {
        let server = MockServer::start().await;
        let err = client_for(&server, Some("k")).upload_video(SAMPLE_VIDEO_DATA_URL, None).await.unwrap_err();
        assert!(matches!(err, MediaError::UnsupportedVideoUpload));
    }

    #[tokio::test]
    async fn test_process_media_urls_replaces_image_data_urls() {
        let service = CloudMediaService::new(Arc::new(StaticImageHost::default()));
        let input = vec![
            MediaDescriptor::new(MediaKind::Image, SAMPLE_PNG_DATA_URL),
            MediaDescriptor::new(MediaKind::Video, SAMPLE_VIDEO_DATA_URL).with_thumbnail(SAMPLE_VIDEO_DATA_URL),
            MediaDescriptor::new(MediaKind::Image, "/uploads/0011223344556677.png"),
        ];

        let output = service.process_media_urls(input.clone()).await;

        assert_eq!(output.len(), 3);
        assert_eq!(output[0].kind, MediaKind::Image);
        assert_eq!(output[0].url, "https://cdn.example/x.png");
        assert_eq!(output[0].thumbnail_url.as_deref(), Some("https://cdn.example/x_thumb.png"));
        assert_eq!(output[1], input[1]);
        assert_eq!(output[2], input[2]);
    }

    #[tokio::test]
    async fn test_process_media_urls_keeps_original_on_failure() {
        let service = CloudMediaService::new(Arc::new(FailingImageHost));
        let input = vec![
            MediaDescriptor::new(MediaKind::Image, SAMPLE_PNG_DATA_URL),
            MediaDescriptor::new(MediaKind::Image, "https://cdn.example/kept.png"),
        ];

        let output = service.process_media_urls(input.clone()).await;
        assert_eq!(output, input);
    }

    #[tokio::test]
    async fn test_process_media_urls_against_http_host() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/1/upload"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": true,
                "data": { "url": "https://cdn.example/z.png", "thumb": { "url": "https://cdn.example/z_thumb.png" } }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let service = CloudMediaService::new(Arc::new(client_for(&server, Some("k"))));
        let output = service
            .process_media_urls(vec![
                MediaDescriptor::new(MediaKind::Image, SAMPLE_PNG_DATA_URL),
                MediaDescriptor::new(MediaKind::Video, SAMPLE_VIDEO_DATA_URL),
            ])
            .await;

        assert!(!output[0].is_data_url());
        assert_eq!(output[1].url, SAMPLE_VIDEO_DATA_URL);
    }

    #[tokio::test]
    async fn test_upload_routes_by_kind() {
        let service = CloudMediaService::new(Arc::new(StaticImageHost::default()));

        let image = service.upload(&MediaDescriptor::new(MediaKind::Image, SAMPLE_PNG_DATA_URL)).await.unwrap();
        assert_eq!(image.kind, MediaKind::Image);
        assert_eq!(image.url, "https://cdn.example/x.png");

        let err = service.upload(&MediaDescriptor::new(MediaKind::Video, SAMPLE_VIDEO_DATA_URL)).await.unwrap_err();
        assert!(matches!(err, MediaError::UnsupportedVideoUpload));
    }

    #[tokio::test]
    async fn test_slow_host_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/1/upload"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;

        let config = ImageHostConfig {
            api_url: Url::parse(&format!("{}/1/upload", server.uri())).unwrap(),
            api_key: Some("k".to_string()),
            timeout: Duration::from_millis(200),
        };
        let err = ImageHostClient::new(&config).unwrap().upload_image(SAMPLE_PNG_DATA_URL, None).await.unwrap_err();
        assert!(matches!(err, MediaError::Http(ref e) if e.is_timeout()));
    }
}
