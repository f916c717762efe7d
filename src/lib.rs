//! # skue
//!
//! A small REST-over-HTTP CRUD toolkit. Resource types implement
//! [`domain::Resource`]; a [`application::crud::CrudService`] composes a
//! [`application::repos::DatabasePersistor`] with an optional
//! [`application::cache::MemoryCacher`] in a cache-aside arrangement, and
//! [`infra::http::ApiRouter`] mounts the generic handlers for each resource.
//!
//! ```rust,ignore
//! let store = Arc::new(DocumentStore::memory());
//! let players = Arc::new(CrudService::<Player>::new(store, CacheAside::disabled()));
//! let router = ApiRouter::new(View::Json)
//!     .resource("/players", players)
//!     .build();
//! ```

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;

pub use application::cache::{CacheAside, CacheKey, MemoryCacher};
pub use application::crud::{CrudError, CrudService, ListLimits};
pub use application::repos::{DatabasePersistor, StoreError};
pub use domain::Resource;
pub use infra::http::{ApiRouter, View};
