//! Base repository trait for database operations.

/// Contains the Repository trait.
///
/// A repository is a data access layer for one SQLite table. It provides methods for creating,
/// reading, updating and deleting entities, as well as listing them with simple filters.
///
/// Reads and lists only ever see active rows; `delete` is a soft delete that moves the row to
/// [`crate::types::LifecycleState::Deleted`].
use crate::db::errors::Result;

/// Base repository trait providing common database operations
///
/// This trait has separate associated types for create requests, update requests, and responses.
#[async_trait::async_trait]
pub trait Repository {
    /// The request type for creating entities
    type CreateRequest;

    /// The request type for updating entities
    type UpdateRequest;

    /// The response/DTO type returned by operations
    type Response;

    /// The identifier type for lookups
    type Id: Send + Sync;

    /// The filter type for list operations
    type Filter: Send + Sync;

    /// Create a new entity
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response>;

    /// Get an active entity by ID
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>>;

    /// List active entities with filtering and pagination
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>>;

    /// Soft delete an entity by ID. Returns false when there was no active entity to delete.
    async fn delete(&mut self, id: Self::Id) -> Result<bool>;

    /// Update an active entity by ID
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response>;
}
