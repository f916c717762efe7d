//! Redis-backed cache over a multiplexed connection manager.

use std::time::Duration;

use async_trait::async_trait;
use redis::{AsyncCommands, Client, aio::ConnectionManager};
use tracing::info;
use url::Url;

use crate::application::cache::{CacheError, MemoryCacher};
use crate::config::RedisSettings;

/// Cloneable Redis cache; each call leases a clone of the managed connection.
#[derive(Clone)]
pub struct RedisCache {
    connection: ConnectionManager,
}

impl RedisCache {
    pub async fn connect(settings: &RedisSettings) -> Result<Self, CacheError> {
        let url = connection_url(settings)?;
        let client = Client::open(url.as_str()).map_err(CacheError::unavailable)?;
        let mut connection = ConnectionManager::new(client)
            .await
            .map_err(CacheError::unavailable)?;

        let _: String = redis::cmd("PING")
            .query_async(&mut connection)
            .await
            .map_err(CacheError::unavailable)?;

        info!(
            target = "skue::infra::cache::redis",
            address = %settings.address,
            "connected to redis"
        );
        Ok(Self { connection })
    }
}

fn connection_url(settings: &RedisSettings) -> Result<Url, CacheError> {
    let mut url = Url::parse(&format!("redis://{}", settings.address))
        .map_err(|err| CacheError::unavailable(format!("invalid redis address: {err}")))?;

    if let Some(password) = settings.password.as_deref() {
        url.set_password(Some(password))
            .map_err(|_| CacheError::unavailable("redis address cannot carry a password"))?;
    }
    Ok(url)
}

#[async_trait]
impl MemoryCacher for RedisCache {
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        let mut connection = self.connection.clone();
        connection
            .set_ex::<_, _, ()>(key, value, ttl.as_secs().max(1))
            .await
            .map_err(CacheError::command)
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let mut connection = self.connection.clone();
        connection
            .get::<_, Option<Vec<u8>>>(key)
            .await
            .map_err(CacheError::command)
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut connection = self.connection.clone();
        connection
            .del::<_, ()>(key)
            .await
            .map_err(CacheError::command)
    }
}
