//! Base repository trait for database operations.

use crate::db::errors::Result;

/// A data access layer for one postgres table.
///
/// Each repository wraps a connection or transaction and provides creation, lookup and filtered
/// listing. Table-specific operations live on the repository itself.
#[async_trait::async_trait]
pub trait Repository {
    /// The request type for creating entities
    type CreateRequest;

    /// The response/DTO type returned by operations
    type Response;

    /// The identifier type for lookups
    type Id: Send + Sync;

    /// The filter type for list operations
    type Filter: Send + Sync;

    /// Create a new entity
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response>;

    /// Get an entity by ID
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>>;

    /// List entities with filtering and pagination
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>>;
}
