//! Persistence capability consumed by the CRUD services.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::Resource;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found")]
    NotFound,
    #[error("duplicate record: {message}")]
    Duplicate { message: String },
    #[error("invalid document: {message}")]
    InvalidDocument { message: String },
    #[error("persistence error: {0}")]
    Persistence(String),
}

impl StoreError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }

    pub fn invalid_document(err: impl std::fmt::Display) -> Self {
        Self::InvalidDocument {
            message: err.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}

/// Collection-scoped CRUD over a backing document store.
///
/// Implementations key every lookup on `R::ID_FIELD` inside `R::COLLECTION`.
#[async_trait]
pub trait DatabasePersistor<R: Resource>: Send + Sync {
    /// Insert a new document.
    async fn create(&self, document: &R) -> Result<(), StoreError>;

    /// Point lookup; `StoreError::NotFound` when nothing matches.
    async fn fetch(&self, id: &str) -> Result<R, StoreError>;

    /// Full-document replace; `StoreError::NotFound` when nothing matches.
    async fn update(&self, document: &R, id: &str) -> Result<(), StoreError>;

    /// Delete by id. Removing an absent id succeeds.
    async fn remove(&self, id: &str) -> Result<(), StoreError>;

    /// Up to `limit` documents in the collection's natural order.
    async fn list(&self, limit: u32) -> Result<Vec<R>, StoreError>;
}
