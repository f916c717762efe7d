//! Bounded in-process cache with per-entry expiry.

use std::{
    num::NonZeroUsize,
    sync::{Mutex, MutexGuard},
    time::{Duration, Instant},
};

use async_trait::async_trait;
use lru::LruCache;
use tracing::warn;

use crate::application::cache::{CacheError, MemoryCacher};

struct Entry {
    value: Vec<u8>,
    /// `None` when the ttl reaches past what `Instant` can represent.
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|expires_at| expires_at > now)
    }
}

/// LRU-evicting cache; expired entries are dropped lazily on read.
pub struct MemoryCache {
    entries: Mutex<LruCache<String, Entry>>,
}

impl MemoryCache {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn len(&self) -> usize {
        self.lock("len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self, op: &'static str) -> MutexGuard<'_, LruCache<String, Entry>> {
        match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!(
                    op,
                    target = "skue::infra::cache::memory",
                    lock_kind = "mutex.lock",
                    result = "poisoned_recovered",
                    "Recovered from poisoned cache lock"
                );
                poisoned.into_inner()
            }
        }
    }
}

#[async_trait]
impl MemoryCacher for MemoryCache {
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        let expires_at = Instant::now().checked_add(ttl);
        self.lock("set")
            .put(key.to_string(), Entry { value, expires_at });
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let mut entries = self.lock("get");
        match entries.get(key) {
            None => return Ok(None),
            Some(entry) if entry.is_live(Instant::now()) => {
                return Ok(Some(entry.value.clone()));
            }
            Some(_) => {}
        }

        entries.pop(key);
        Ok(None)
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.lock("delete").pop(key);
        Ok(())
    }
}
