//! Cache-aside access to a key-value cache.
//!
//! The backing store stays authoritative: every store operation runs before any
//! cache mutation, and cache failures are logged and counted but never returned.

use std::{fmt, future::Future, sync::Arc, time::Duration};

use async_trait::async_trait;
use metrics::counter;
use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;
use tracing::{debug, warn};

use super::codec::to_pretty_json;
use super::repos::StoreError;

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(120);

pub const METRIC_CACHE_HIT: &str = "skue_cache_hit_total";
pub const METRIC_CACHE_MISS: &str = "skue_cache_miss_total";
pub const METRIC_CACHE_DECODE_FAILED: &str = "skue_cache_decode_failed_total";
pub const METRIC_CACHE_POPULATE_FAILED: &str = "skue_cache_populate_failed_total";
pub const METRIC_CACHE_INVALIDATE_FAILED: &str = "skue_cache_invalidate_failed_total";

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache unavailable: {0}")]
    Unavailable(String),
    #[error("cache command failed: {0}")]
    Command(String),
}

impl CacheError {
    pub fn unavailable(err: impl fmt::Display) -> Self {
        Self::Unavailable(err.to_string())
    }

    pub fn command(err: impl fmt::Display) -> Self {
        Self::Command(err.to_string())
    }
}

/// Key-value cache holding serialized values with a time-to-live.
#[async_trait]
pub trait MemoryCacher: Send + Sync {
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError>;

    /// `Ok(None)` is a miss.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    async fn delete(&self, key: &str) -> Result<(), CacheError>;
}

/// Cache key for one resource: `"<collection>-<id>"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    collection: &'static str,
    key: String,
}

impl CacheKey {
    pub fn new(collection: &'static str, id: &str) -> Self {
        Self {
            collection,
            key: format!("{collection}-{id}"),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.key
    }

    pub fn collection(&self) -> &'static str {
        self.collection
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}

/// Wraps backing-store calls with best-effort cache reads and writes.
///
/// Without a cache every operation is the bare backing-store call.
#[derive(Clone)]
pub struct CacheAside {
    cache: Option<Arc<dyn MemoryCacher>>,
    ttl: Duration,
}

impl Default for CacheAside {
    fn default() -> Self {
        Self::disabled()
    }
}

impl fmt::Debug for CacheAside {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheAside")
            .field("enabled", &self.cache.is_some())
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl CacheAside {
    pub fn new(cache: Option<Arc<dyn MemoryCacher>>, ttl: Duration) -> Self {
        Self { cache, ttl }
    }

    pub fn disabled() -> Self {
        Self::new(None, DEFAULT_CACHE_TTL)
    }

    pub fn is_enabled(&self) -> bool {
        self.cache.is_some()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Serve from cache when possible, otherwise fetch and populate.
    pub async fn read<T, F, Fut>(&self, key: &CacheKey, fetch: F) -> Result<T, StoreError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        let Some(cache) = self.cache.as_deref() else {
            return fetch().await;
        };

        match cache.get(key.as_str()).await {
            Ok(Some(bytes)) => match serde_json::from_slice::<T>(&bytes) {
                Ok(value) => {
                    counter!(METRIC_CACHE_HIT, "collection" => key.collection()).increment(1);
                    debug!(target = "skue::cache", key = %key, "cache hit");
                    return Ok(value);
                }
                Err(err) => {
                    counter!(METRIC_CACHE_DECODE_FAILED, "collection" => key.collection())
                        .increment(1);
                    warn!(
                        target = "skue::cache",
                        key = %key,
                        error = %err,
                        "discarding undecodable cache entry"
                    );
                }
            },
            Ok(None) => {}
            Err(err) => {
                warn!(
                    target = "skue::cache",
                    key = %key,
                    error = %err,
                    "cache read failed; falling back to store"
                );
            }
        }

        counter!(METRIC_CACHE_MISS, "collection" => key.collection()).increment(1);
        let value = fetch().await?;
        self.populate(cache, key, &value).await;
        Ok(value)
    }

    /// Run the store write, then refresh the cached copy.
    pub async fn write<T, F, Fut>(&self, key: &CacheKey, value: &T, write: F) -> Result<(), StoreError>
    where
        T: Serialize,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(), StoreError>>,
    {
        write().await?;
        if let Some(cache) = self.cache.as_deref() {
            self.populate(cache, key, value).await;
        }
        Ok(())
    }

    /// Run the store delete, then drop the cached copy.
    pub async fn invalidate<F, Fut>(&self, key: &CacheKey, delete: F) -> Result<(), StoreError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(), StoreError>>,
    {
        delete().await?;
        if let Some(cache) = self.cache.as_deref()
            && let Err(err) = cache.delete(key.as_str()).await
        {
            counter!(METRIC_CACHE_INVALIDATE_FAILED, "collection" => key.collection())
                .increment(1);
            warn!(
                target = "skue::cache",
                key = %key,
                error = %err,
                "cache invalidation failed; entry expires with its ttl"
            );
        }
        Ok(())
    }

    async fn populate<T: Serialize>(&self, cache: &dyn MemoryCacher, key: &CacheKey, value: &T) {
        let encoded = match to_pretty_json(value) {
            Ok(encoded) => encoded,
            Err(err) => {
                counter!(METRIC_CACHE_POPULATE_FAILED, "collection" => key.collection())
                    .increment(1);
                warn!(target = "skue::cache", key = %key, error = %err, "cache encode failed");
                return;
            }
        };

        if let Err(err) = cache.set(key.as_str(), encoded, self.ttl).await {
            counter!(METRIC_CACHE_POPULATE_FAILED, "collection" => key.collection()).increment(1);
            warn!(
                target = "skue::cache",
                key = %key,
                error = %err,
                "cache populate failed"
            );
        }
    }
}
