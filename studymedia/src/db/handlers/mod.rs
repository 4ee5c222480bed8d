//! Repository implementations for database access.

pub mod notifications;
pub mod posts;
pub mod repository;

pub use notifications::{NotificationFilter, Notifications};
pub use posts::{PostFilter, Posts};
pub use repository::Repository;
