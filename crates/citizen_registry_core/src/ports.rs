//! crates/citizen_registry_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the registration desk.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of the concrete database and file storage.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{
    Citizen, CitizenPatch, CitizenQuery, NewCitizen, Photo, StoredFile, UpdatedCitizen, Visit,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, filesystem).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    /// A record failed the field rules on insert or update.
    #[error("{0}")]
    Validation(String),
    /// A lookup argument was malformed; no storage access happened.
    #[error("{0}")]
    InvalidInput(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Persistence for citizen records.
///
/// Implementations must run `Citizen::register` / `Citizen::apply_patch` before
/// writing, so the field rules hold for every stored record. Every listing is
/// ordered newest `created_at` first.
#[async_trait]
pub trait CitizenStore: Send + Sync {
    async fn insert(&self, citizen: NewCitizen) -> PortResult<Citizen>;

    async fn find_all(&self) -> PortResult<Vec<Citizen>>;

    async fn find_by_id(&self, id: Uuid) -> PortResult<Citizen>;

    async fn find_by_query(&self, query: CitizenQuery) -> PortResult<Vec<Citizen>>;

    /// All registrations sharing one national ID. Rejects a malformed ID with
    /// `PortError::InvalidInput`.
    async fn find_by_national_id(&self, national_id: &str) -> PortResult<Vec<Citizen>>;

    /// Same selection as `find_by_national_id`, projected to `Visit`.
    async fn find_visit_history(&self, national_id: &str) -> PortResult<Vec<Visit>>;

    /// Merges `patch` over the stored record and persists it in one atomic write.
    async fn update_by_id(&self, id: Uuid, patch: CitizenPatch) -> PortResult<UpdatedCitizen>;

    /// Removes the record and returns its last state.
    async fn delete_by_id(&self, id: Uuid) -> PortResult<Citizen>;
}

/// Storage for uploaded photographs.
#[async_trait]
pub trait PhotoStorage: Send + Sync {
    /// Writes the bytes under a freshly generated, never reused file name.
    async fn stage(&self, original_file_name: &str, data: &[u8]) -> PortResult<Photo>;

    /// Deletes a stored file. Removing a file that is already gone succeeds.
    async fn remove(&self, stored_file_name: &str) -> PortResult<()>;

    async fn exists(&self, stored_file_name: &str) -> PortResult<bool>;

    async fn list(&self) -> PortResult<Vec<StoredFile>>;
}
