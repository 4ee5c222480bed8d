//! # studymedia: media ingestion for the study/social app
//!
//! Posts and admin announcements carry attachments: images and videos the client captured and
//! inlined as `data:` URLs. Storing those data URLs in the database bloats every row and every
//! feed response, so this service turns each one into a durable URL before the row is written.
//!
//! ## Pipeline
//!
//! ```text
//! uploaded files ──► media::capture ──► data URL attachments
//!                                              │
//!            post / announcement write path ◄──┘
//!                          │
//!                 media::normalize
//!                 ├── images ──► image host (when media.backend = cloud)
//!                 └── videos, or everything in local mode ──► uploads directory
//!                          │
//!                 {type, url, thumbnailUrl?} persisted as JSONB
//! ```
//!
//! Stored files are served back from `GET /uploads/{filename}`. Rows written before
//! normalization existed are fixed up by the admin optimize sweep.
//!
//! ## Components
//!
//! - [`media`]: capture, data URL codec, local storage, image host client and normalizer
//! - [`db`]: PostgreSQL repositories for posts and notifications
//! - [`api`]: axum handlers and request/response models
//! - [`config`]: YAML + environment configuration
//! - [`telemetry`]: tracing subscriber and optional OTLP export
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use studymedia::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = studymedia::config::Args::parse();
//!     let config = Config::load(&args)?;
//!     studymedia::telemetry::init_telemetry(config.enable_otel_export)?;
//!
//!     Application::new(config).await?.serve(async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     }).await
//! }
//! ```

pub mod api;
pub mod config;
pub mod db;
pub mod errors;
pub mod media;
mod openapi;
pub mod telemetry;
mod types;

#[cfg(test)]
pub mod test_utils;

use crate::config::{CorsOrigin, MediaBackend};
use crate::media::{CloudMediaService, ImageHost, ImageHostClient, LocalMediaStorage, MediaCapture, MediaNormalizer};
use crate::openapi::ApiDoc;
use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::{
    Router, http,
    routing::{get, post},
};
use axum_prometheus::PrometheusMetricLayer;
use bon::Builder;
pub use config::Config;
use sqlx::PgPool;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, debug, info, instrument};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

pub use types::{NotificationId, PostId, UserId};

/// Application state shared across all request handlers.
///
/// ```ignore
/// let state = AppState::builder()
///     .db(pool)
///     .config(config)
///     .storage(storage)
///     .normalizer(normalizer)
///     .capture(capture)
///     .build();
/// ```
#[derive(Clone, Builder)]
pub struct AppState {
    pub db: PgPool,
    pub config: Config,
    /// Serves `GET /uploads/{filename}`
    pub storage: Arc<LocalMediaStorage>,
    pub normalizer: MediaNormalizer,
    pub capture: MediaCapture,
}

/// Get the studymedia database migrator
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

#[instrument(skip_all)]
async fn setup_database(config: &Config) -> anyhow::Result<PgPool> {
    let pool = config.database.pool.pool_options().connect(&config.database.url).await?;
    migrator().run(&pool).await?;
    Ok(pool)
}

/// Build the media pipeline and the shared state around it.
///
/// `image_host` overrides the client built from `config.image_host`; when it is `None` an image
/// host is only used if `media.backend` is `cloud`. Fails if the upload directories cannot be
/// created.
#[instrument(skip_all, fields(backend = ?config.media.backend))]
pub async fn build_app_state(config: Config, db: PgPool, image_host: Option<Arc<dyn ImageHost>>) -> anyhow::Result<AppState> {
    let storage = Arc::new(LocalMediaStorage::new(&config.media.storage).await?);

    let image_host = match image_host {
        Some(host) => Some(host),
        None if config.media.backend == MediaBackend::Cloud => Some(Arc::new(ImageHostClient::new(&config.image_host)?) as Arc<dyn ImageHost>),
        None => None,
    };
    let cloud = image_host.map(CloudMediaService::new);

    info!(
        uploads_dir = %storage.uploads_dir().display(),
        cloud = cloud.is_some(),
        "Media pipeline ready"
    );

    Ok(AppState::builder()
        .db(db)
        .storage(storage.clone())
        .normalizer(MediaNormalizer::new(storage, cloud))
        .capture(MediaCapture::new(config.media.capture.clone()))
        .config(config)
        .build())
}

/// Create CORS layer from configuration
fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let mut origins = Vec::new();
    for origin in &config.cors.allowed_origins {
        let header_value = match origin {
            CorsOrigin::Wildcard => "*".parse::<HeaderValue>()?,
            CorsOrigin::Url(url) => url.as_str().trim_end_matches('/').parse::<HeaderValue>()?,
        };
        origins.push(header_value);
    }

    let mut cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([http::Method::GET, http::Method::POST])
        .allow_headers([http::header::CONTENT_TYPE])
        .allow_credentials(config.cors.allow_credentials)
        .expose_headers(vec![http::header::LOCATION]);

    if let Some(max_age) = config.cors.max_age {
        cors = cors.max_age(std::time::Duration::from_secs(max_age));
    }

    Ok(cors)
}

/// Build the application router with all endpoints and middleware.
///
/// - `/healthz`
/// - `{media.storage.url_prefix}/{filename}` for stored attachments
/// - `/api/v1/*` and `/admin/api/v1/*`
/// - `/docs` and `/api-docs/openapi.json`
/// - `/internal/metrics` when `enable_metrics` is set
#[instrument(skip_all)]
pub fn build_router(state: &AppState) -> anyhow::Result<Router> {
    let body_limit = DefaultBodyLimit::max(state.config.limits.max_body_size);

    let api_routes = Router::new()
        .route("/posts", get(api::handlers::posts::list_posts).post(api::handlers::posts::create_post))
        .route("/posts/{id}", get(api::handlers::posts::get_post))
        .route("/notifications", get(api::handlers::notifications::list_notifications))
        .route("/media/prepare", post(api::handlers::media::prepare_media))
        .layer(body_limit.clone())
        .with_state(state.clone());

    let admin_routes = Router::new()
        .route("/announcements", post(api::handlers::notifications::create_announcement))
        .route("/media/optimize", post(api::handlers::media::optimize_media))
        .layer(body_limit)
        .with_state(state.clone());

    let uploads_route = format!("{}/{{filename}}", state.config.media.storage.url_prefix.trim_end_matches('/'));

    let router = Router::new()
        .route("/healthz", get(|| async { "OK" }))
        .route(&uploads_route, get(api::handlers::media::serve_upload))
        .with_state(state.clone())
        .nest("/api/v1", api_routes)
        .nest("/admin/api/v1", admin_routes)
        .route("/api-docs/openapi.json", get(|| async { axum::Json(ApiDoc::openapi()) }))
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()));

    let mut router = router.layer(create_cors_layer(&state.config)?);

    if state.config.enable_metrics {
        let (prometheus_layer, metric_handle) = PrometheusMetricLayer::pair();
        router = router
            .route("/internal/metrics", get(|| async move { metric_handle.render() }))
            .layer(prometheus_layer);
    }

    let router = router.layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    Ok(router)
}

/// The HTTP server and the resources it owns.
///
/// 1. [`Application::new`] connects to PostgreSQL, runs migrations and prepares media storage
/// 2. [`Application::serve`] binds and serves until the shutdown future resolves
pub struct Application {
    router: Router,
    config: Config,
    pool: PgPool,
}

impl Application {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        debug!("Starting studymedia with configuration: {:#?}", config);

        let pool = setup_database(&config).await?;
        let state = build_app_state(config.clone(), pool.clone(), None).await?;
        let router = build_router(&state)?;

        Ok(Self { router, config, pool })
    }

    #[cfg(test)]
    pub fn into_test_server(self) -> axum_test::TestServer {
        axum_test::TestServer::new(self.router.into_make_service()).expect("Failed to create test server")
    }

    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!("studymedia listening on http://{}", bind_addr);

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Closing database connections...");
        self.pool.close().await;

        info!("Shutting down telemetry...");
        telemetry::shutdown_telemetry();

        Ok(())
    }
}
