//! Database layer for data persistence and access.
//!
//! SQLx over PostgreSQL, organised as repositories:
//!
//! ```text
//! API handlers -> db::handlers (repositories) -> db::models -> PostgreSQL
//! ```
//!
//! - [`handlers`]: one repository per table, built over a connection or transaction
//! - [`models`]: record structures returned by repositories
//! - [`errors`]: database-specific error types
//!
//! Attachment lists are JSONB arrays of `{type, url, thumbnailUrl?}` objects.
//!
//! ```ignore
//! use studymedia::db::handlers::{Posts, Repository};
//!
//! let mut tx = pool.begin().await?;
//! let post = Posts::new(&mut tx).create(&request).await?;
//! tx.commit().await?;
//! ```
//!
//! Migrations live in `migrations/` and run through [`crate::migrator`].

pub mod errors;
pub mod handlers;
pub mod models;
