//! API layer for HTTP request handling and data models.
//!
//! - **[`handlers`]**: axum route handlers
//! - **[`models`]**: request/response data structures
//!
//! # API Structure
//!
//! - **Posts** (`/api/v1/posts`): create, list and fetch posts
//! - **Notifications** (`/api/v1/notifications`): announcement feed
//! - **Media** (`/api/v1/media/prepare`, `/uploads/{filename}`): attachment capture and serving
//! - **Admin** (`/admin/api/v1/announcements`, `/admin/api/v1/media/optimize`)
//!
//! OpenAPI documentation is served at `/docs` when the server is running.

pub mod handlers;
pub mod models;
