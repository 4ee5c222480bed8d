//! HTTP request handlers for all API endpoints.
//!
//! Each module corresponds to a resource. Handlers extract request data with axum extractors,
//! call the media pipeline and repositories, and return JSON or an [`crate::errors::Error`].
//!
//! - [`posts`]: create, list and fetch posts
//! - [`notifications`]: announcements and the notification feed
//! - [`media`]: attachment capture, the optimize sweep and stored file serving

pub mod media;
pub mod notifications;
pub mod posts;
