//! Database record models.
//!
//! Database models are distinct from API models so storage and API representations can evolve
//! independently. Attachment lists are stored as JSONB and surface here as
//! `Vec<MediaDescriptor>`; repositories handle the conversion.

pub mod notifications;
pub mod posts;
