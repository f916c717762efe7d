//! Cache backends implementing [`MemoryCacher`].

mod memory;
mod redis;

pub use self::memory::MemoryCache;
pub use self::redis::RedisCache;

use std::sync::Arc;

use tracing::info;

use crate::application::cache::{CacheAside, MemoryCacher};
use crate::config::{CacheBackend, CacheSettings};
use crate::infra::error::InfraError;

/// Build the configured cache, or `None` when caching is disabled.
pub async fn connect(settings: &CacheSettings) -> Result<Option<Arc<dyn MemoryCacher>>, InfraError> {
    let cache: Arc<dyn MemoryCacher> = match &settings.backend {
        CacheBackend::None => return Ok(None),
        CacheBackend::Memory { capacity } => Arc::new(MemoryCache::new(*capacity)),
        CacheBackend::Redis(redis) => Arc::new(
            RedisCache::connect(redis)
                .await
                .map_err(|err| InfraError::cache(err.to_string()))?,
        ),
    };

    info!(
        target = "skue::infra::cache",
        ttl_seconds = settings.ttl.as_secs(),
        "cache ready"
    );
    Ok(Some(cache))
}

/// Cache-aside accessor over `cache` using the configured ttl.
pub fn cache_aside(cache: Option<Arc<dyn MemoryCacher>>, settings: &CacheSettings) -> CacheAside {
    CacheAside::new(cache, settings.ttl)
}
