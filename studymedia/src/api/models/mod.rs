//! API request and response data models.
//!
//! API models are distinct from database models so the wire contract and storage can evolve
//! independently. All models carry `utoipa` annotations for the generated docs.

pub mod media;
pub mod notifications;
pub mod pagination;
pub mod posts;
