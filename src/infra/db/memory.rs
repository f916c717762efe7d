//! Process-local document store for development and tests.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::application::repos::{DatabasePersistor, StoreError};
use crate::domain::Resource;

type Collection = Vec<(String, Value)>;

/// Collections of JSON documents kept in insertion order.
#[derive(Clone, Default)]
pub struct MemoryStore {
    collections: Arc<RwLock<HashMap<String, Collection>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn count(&self, collection: &str) -> u64 {
        let collections = self.collections.read().await;
        collections
            .get(collection)
            .map_or(0, |documents| documents.len() as u64)
    }

    pub async fn drop_collection(&self, collection: &str) -> u64 {
        let mut collections = self.collections.write().await;
        collections
            .remove(collection)
            .map_or(0, |documents| documents.len() as u64)
    }
}

fn encode<R: Resource>(document: &R) -> Result<Value, StoreError> {
    serde_json::to_value(document).map_err(StoreError::invalid_document)
}

fn decode<R: Resource>(value: &Value) -> Result<R, StoreError> {
    R::deserialize(value).map_err(StoreError::invalid_document)
}

#[async_trait]
impl<R: Resource> DatabasePersistor<R> for MemoryStore {
    async fn create(&self, document: &R) -> Result<(), StoreError> {
        let value = encode(document)?;
        let mut collections = self.collections.write().await;
        let documents = collections.entry(R::COLLECTION.to_string()).or_default();

        if documents.iter().any(|(id, _)| id == document.id()) {
            return Err(StoreError::Duplicate {
                message: format!("{} `{}` already exists", R::ID_FIELD, document.id()),
            });
        }

        documents.push((document.id().to_string(), value));
        Ok(())
    }

    async fn fetch(&self, id: &str) -> Result<R, StoreError> {
        let collections = self.collections.read().await;
        let value = collections
            .get(R::COLLECTION)
            .and_then(|documents| documents.iter().find(|(key, _)| key == id))
            .map(|(_, value)| value)
            .ok_or(StoreError::NotFound)?;
        decode(value)
    }

    async fn update(&self, document: &R, id: &str) -> Result<(), StoreError> {
        let value = encode(document)?;
        let mut collections = self.collections.write().await;
        let slot = collections
            .get_mut(R::COLLECTION)
            .and_then(|documents| documents.iter_mut().find(|(key, _)| key == id))
            .ok_or(StoreError::NotFound)?;
        slot.1 = value;
        Ok(())
    }

    async fn remove(&self, id: &str) -> Result<(), StoreError> {
        let mut collections = self.collections.write().await;
        if let Some(documents) = collections.get_mut(R::COLLECTION) {
            documents.retain(|(key, _)| key != id);
        }
        Ok(())
    }

    async fn list(&self, limit: u32) -> Result<Vec<R>, StoreError> {
        let collections = self.collections.read().await;
        let Some(documents) = collections.get(R::COLLECTION) else {
            return Ok(Vec::new());
        };

        documents
            .iter()
            .take(limit as usize)
            .map(|(_, value)| decode(value))
            .collect()
    }
}
