//! CRUD orchestration over a persistor and a cache-aside accessor.

use std::{marker::PhantomData, sync::Arc};

use axum::http::StatusCode;
use thiserror::Error;
use tracing::info;

use super::cache::{CacheAside, CacheKey};
use super::repos::{DatabasePersistor, StoreError};
use crate::domain::Resource;

pub const DEFAULT_LIST_LIMIT: u32 = 25;
pub const MAX_LIST_LIMIT: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListLimits {
    pub default: u32,
    pub max: u32,
}

impl Default for ListLimits {
    fn default() -> Self {
        Self {
            default: DEFAULT_LIST_LIMIT,
            max: MAX_LIST_LIMIT,
        }
    }
}

impl ListLimits {
    /// Effective limit for a request: the requested value clamped to `[1, max]`.
    pub fn effective(&self, requested: Option<u32>) -> u32 {
        let max = self.max.max(1);
        requested.unwrap_or(self.default).clamp(1, max)
    }
}

#[derive(Debug, Error)]
pub enum CrudError {
    #[error("Item not found")]
    NotFound,
    #[error("{0}")]
    BadRequest(String),
    #[error("{action}: {source}")]
    Store {
        action: &'static str,
        #[source]
        source: StoreError,
    },
}

impl CrudError {
    fn store(action: &'static str, source: StoreError) -> Self {
        Self::Store { action, source }
    }

    /// Map a store failure, keeping not-found distinct.
    fn lookup(action: &'static str, source: StoreError) -> Self {
        if source.is_not_found() {
            Self::NotFound
        } else {
            Self::store(action, source)
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Store { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub const ACTION_CREATE: &str = "Failed saving the item";
pub const ACTION_READ: &str = "Failed reading the item";
pub const ACTION_UPDATE: &str = "Failed updating the item";
pub const ACTION_DELETE_LOOKUP: &str = "Failed retrieving the item";
pub const ACTION_DELETE: &str = "Failed deleting the item";
pub const ACTION_LIST: &str = "Error requesting the list";

/// Create/read/update/delete/list for one resource type.
pub struct CrudService<R: Resource> {
    store: Arc<dyn DatabasePersistor<R>>,
    cache: CacheAside,
    limits: ListLimits,
    _resource: PhantomData<fn() -> R>,
}

impl<R: Resource> CrudService<R> {
    pub fn new(store: Arc<dyn DatabasePersistor<R>>, cache: CacheAside) -> Self {
        Self {
            store,
            cache,
            limits: ListLimits::default(),
            _resource: PhantomData,
        }
    }

    pub fn with_limits(mut self, limits: ListLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn limits(&self) -> ListLimits {
        self.limits
    }

    /// Persist a new resource, assigning a generated id when it has none.
    ///
    /// Creates bypass the cache; the entry is populated on first read.
    pub async fn create(&self, mut resource: R) -> Result<R, CrudError> {
        if !resource.has_id() {
            let id = R::generate_id().ok_or_else(|| {
                CrudError::BadRequest(format!("missing {} for {}", R::ID_FIELD, R::COLLECTION))
            })?;
            resource.set_id(id);
        }

        self.store
            .create(&resource)
            .await
            .map_err(|err| CrudError::store(ACTION_CREATE, err))?;

        info!(
            target = "skue::crud",
            collection = R::COLLECTION,
            id = resource.id(),
            "resource created"
        );
        Ok(resource)
    }

    pub async fn read(&self, id: &str) -> Result<R, CrudError> {
        let key = CacheKey::new(R::COLLECTION, id);
        self.cache
            .read(&key, || self.store.fetch(id))
            .await
            .map_err(|err| CrudError::lookup(ACTION_READ, err))
    }

    /// Replace the stored resource; the route id overrides any id in the body.
    pub async fn update(&self, id: &str, mut resource: R) -> Result<(), CrudError> {
        resource.set_id(id.to_string());
        let key = CacheKey::new(R::COLLECTION, id);
        self.cache
            .write(&key, &resource, || self.store.update(&resource, id))
            .await
            .map_err(|err| CrudError::lookup(ACTION_UPDATE, err))?;

        info!(
            target = "skue::crud",
            collection = R::COLLECTION,
            id,
            "resource updated"
        );
        Ok(())
    }

    /// Remove a resource that must exist; absent ids surface as not found.
    pub async fn delete(&self, id: &str) -> Result<(), CrudError> {
        let key = CacheKey::new(R::COLLECTION, id);
        self.cache
            .read(&key, || self.store.fetch(id))
            .await
            .map_err(|err| CrudError::lookup(ACTION_DELETE_LOOKUP, err))?;

        self.cache
            .invalidate(&key, || self.store.remove(id))
            .await
            .map_err(|err| CrudError::store(ACTION_DELETE, err))?;

        info!(
            target = "skue::crud",
            collection = R::COLLECTION,
            id,
            "resource deleted"
        );
        Ok(())
    }

    pub async fn list(&self, requested: Option<u32>) -> Result<Vec<R>, CrudError> {
        let limit = self.limits.effective(requested);
        self.store
            .list(limit)
            .await
            .map_err(|err| CrudError::store(ACTION_LIST, err))
    }
}
