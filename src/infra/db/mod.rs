//! Document store backends behind a single handle.

mod memory;
mod mongo;
mod postgres;
mod util;

pub use self::memory::MemoryStore;
pub use self::mongo::MongoStore;
pub use self::postgres::PostgresStore;
pub use util::map_sqlx_error;

use async_trait::async_trait;
use tracing::info;

use crate::application::repos::{DatabasePersistor, StoreError};
use crate::config::StoreSettings;
use crate::domain::Resource;
use crate::infra::error::InfraError;

/// Long-lived, cloneable connection to the configured backing store.
#[derive(Clone)]
pub enum DocumentStore {
    Memory(MemoryStore),
    MongoDb(MongoStore),
    Postgres(PostgresStore),
}

impl DocumentStore {
    pub fn memory() -> Self {
        Self::Memory(MemoryStore::new())
    }

    /// Establish the first connection; failures are fatal at startup.
    pub async fn connect(settings: &StoreSettings) -> Result<Self, InfraError> {
        let store = match settings {
            StoreSettings::Memory => Self::memory(),
            StoreSettings::MongoDb(mongo) => MongoStore::connect(mongo)
                .await
                .map(Self::MongoDb)
                .map_err(|err| {
                    InfraError::database(format!(
                        "failed to connect to mongodb at {}: {err}",
                        mongo.address
                    ))
                })?,
            StoreSettings::Postgres(pg) => PostgresStore::connect(pg)
                .await
                .map(Self::Postgres)
                .map_err(|err| {
                    InfraError::database(format!("failed to connect to postgres: {err}"))
                })?,
        };

        info!(
            target = "skue::infra::db",
            backend = store.backend_name(),
            "document store ready"
        );
        Ok(store)
    }

    pub fn backend_name(&self) -> &'static str {
        match self {
            Self::Memory(_) => "memory",
            Self::MongoDb(_) => "mongodb",
            Self::Postgres(_) => "postgres",
        }
    }

    /// Make the id field of `R` unique where the backend does not already enforce it.
    pub async fn ensure_id_index<R: Resource>(&self) -> Result<(), StoreError> {
        match self {
            Self::MongoDb(store) => store.ensure_id_index::<R>().await,
            Self::Memory(_) | Self::Postgres(_) => Ok(()),
        }
    }

    pub async fn count(&self, collection: &str) -> Result<u64, StoreError> {
        match self {
            Self::Memory(store) => Ok(store.count(collection).await),
            Self::MongoDb(store) => store.count(collection).await,
            Self::Postgres(store) => store.count(collection).await,
        }
    }

    /// Drop the secondary indexes of `collection`. Only MongoDB keeps any; the
    /// Postgres key is part of the table.
    pub async fn drop_indexes(&self, collection: &str) -> Result<(), StoreError> {
        match self {
            Self::MongoDb(store) => store.drop_indexes(collection).await,
            Self::Memory(_) | Self::Postgres(_) => Ok(()),
        }
    }

    /// Remove every document in `collection`, returning how many were removed.
    pub async fn drop_collection(&self, collection: &str) -> Result<u64, StoreError> {
        match self {
            Self::Memory(store) => Ok(store.drop_collection(collection).await),
            Self::MongoDb(store) => store.drop_collection(collection).await,
            Self::Postgres(store) => store.drop_collection(collection).await,
        }
    }
}

#[async_trait]
impl<R: Resource> DatabasePersistor<R> for DocumentStore {
    async fn create(&self, document: &R) -> Result<(), StoreError> {
        match self {
            Self::Memory(store) => store.create(document).await,
            Self::MongoDb(store) => store.create(document).await,
            Self::Postgres(store) => store.create(document).await,
        }
    }

    async fn fetch(&self, id: &str) -> Result<R, StoreError> {
        match self {
            Self::Memory(store) => store.fetch(id).await,
            Self::MongoDb(store) => store.fetch(id).await,
            Self::Postgres(store) => store.fetch(id).await,
        }
    }

    async fn update(&self, document: &R, id: &str) -> Result<(), StoreError> {
        match self {
            Self::Memory(store) => store.update(document, id).await,
            Self::MongoDb(store) => store.update(document, id).await,
            Self::Postgres(store) => store.update(document, id).await,
        }
    }

    async fn remove(&self, id: &str) -> Result<(), StoreError> {
        match self {
            Self::Memory(store) => DatabasePersistor::<R>::remove(store, id).await,
            Self::MongoDb(store) => DatabasePersistor::<R>::remove(store, id).await,
            Self::Postgres(store) => DatabasePersistor::<R>::remove(store, id).await,
        }
    }

    async fn list(&self, limit: u32) -> Result<Vec<R>, StoreError> {
        match self {
            Self::Memory(store) => store.list(limit).await,
            Self::MongoDb(store) => store.list(limit).await,
            Self::Postgres(store) => store.list(limit).await,
        }
    }
}
