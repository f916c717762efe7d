//! MongoDB document store.

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    Client, Collection, Database, IndexModel,
    bson::{Bson, Document, doc},
    error::{Error as MongoError, ErrorKind, WriteFailure},
    options::{ClientOptions, Credential, IndexOptions},
};
use tracing::info;

use crate::application::repos::{DatabasePersistor, StoreError};
use crate::config::MongoSettings;
use crate::domain::Resource;

const DUPLICATE_KEY_CODE: i32 = 11000;
const APP_NAME: &str = "skue";

/// Handle to one MongoDB database; cheap to clone.
#[derive(Clone, Debug)]
pub struct MongoStore {
    database: Database,
}

impl MongoStore {
    /// Connect and ping the server so unreachable deployments fail at startup.
    pub async fn connect(settings: &MongoSettings) -> Result<Self, MongoError> {
        let mut options = ClientOptions::parse(format!("mongodb://{}", settings.address)).await?;
        options.app_name = Some(APP_NAME.to_string());

        if let Some(username) = settings.username.as_ref() {
            let mut credential = Credential::default();
            credential.username = Some(username.clone());
            credential.password = settings.password.clone();
            credential.source = Some(settings.database.clone());
            options.credential = Some(credential);
        }

        let client = Client::with_options(options)?;
        let database = client.database(&settings.database);
        database.run_command(doc! { "ping": 1 }).await?;

        info!(
            target = "skue::infra::db::mongo",
            address = %settings.address,
            database = %settings.database,
            "connected to mongodb"
        );
        Ok(Self { database })
    }

    fn collection<R: Resource>(&self) -> Collection<R> {
        self.database.collection::<R>(R::COLLECTION)
    }

    /// Unique index on the resource's id field, making duplicate creates detectable.
    pub async fn ensure_id_index<R: Resource>(&self) -> Result<(), StoreError> {
        let mut keys = Document::new();
        keys.insert(R::ID_FIELD, 1);
        let index = IndexModel::builder()
            .keys(keys)
            .options(IndexOptions::builder().unique(true).build())
            .build();

        self.collection::<R>()
            .create_index(index)
            .await
            .map(|_| ())
            .map_err(map_mongo_error)
    }

    pub async fn count(&self, collection: &str) -> Result<u64, StoreError> {
        self.database
            .collection::<Document>(collection)
            .count_documents(doc! {})
            .await
            .map_err(map_mongo_error)
    }

    pub async fn drop_collection(&self, collection: &str) -> Result<u64, StoreError> {
        self.database
            .collection::<Document>(collection)
            .delete_many(doc! {})
            .await
            .map(|result| result.deleted_count)
            .map_err(map_mongo_error)
    }

    /// Drop every index on `collection` except the server's own `_id` index.
    pub async fn drop_indexes(&self, collection: &str) -> Result<(), StoreError> {
        self.database
            .collection::<Document>(collection)
            .drop_indexes()
            .await
            .map_err(map_mongo_error)
    }
}

fn id_filter<R: Resource>(id: &str) -> Document {
    let mut filter = Document::new();
    filter.insert(R::ID_FIELD, Bson::String(id.to_string()));
    filter
}

fn map_mongo_error(err: MongoError) -> StoreError {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write)) if write.code == DUPLICATE_KEY_CODE => {
            StoreError::Duplicate {
                message: write.message.clone(),
            }
        }
        ErrorKind::BsonDeserialization(inner) => StoreError::invalid_document(inner),
        ErrorKind::BsonSerialization(inner) => StoreError::invalid_document(inner),
        _ => StoreError::from_persistence(err),
    }
}

#[async_trait]
impl<R: Resource> DatabasePersistor<R> for MongoStore {
    async fn create(&self, document: &R) -> Result<(), StoreError> {
        self.collection::<R>()
            .insert_one(document)
            .await
            .map(|_| ())
            .map_err(map_mongo_error)
    }

    async fn fetch(&self, id: &str) -> Result<R, StoreError> {
        self.collection::<R>()
            .find_one(id_filter::<R>(id))
            .await
            .map_err(map_mongo_error)?
            .ok_or(StoreError::NotFound)
    }

    async fn update(&self, document: &R, id: &str) -> Result<(), StoreError> {
        let result = self
            .collection::<R>()
            .replace_one(id_filter::<R>(id), document)
            .await
            .map_err(map_mongo_error)?;

        if result.matched_count == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn remove(&self, id: &str) -> Result<(), StoreError> {
        self.collection::<R>()
            .delete_one(id_filter::<R>(id))
            .await
            .map(|_| ())
            .map_err(map_mongo_error)
    }

    async fn list(&self, limit: u32) -> Result<Vec<R>, StoreError> {
        let cursor = self
            .collection::<R>()
            .find(doc! {})
            .limit(i64::from(limit))
            .await
            .map_err(map_mongo_error)?;

        cursor.try_collect().await.map_err(map_mongo_error)
    }
}
