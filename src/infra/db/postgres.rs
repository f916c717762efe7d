//! PostgreSQL document store: one JSONB row per resource.

use async_trait::async_trait;
use sqlx::{
    postgres::{PgPool, PgPoolOptions},
    types::Json,
};
use tracing::info;

use super::util::map_sqlx_error;
use crate::application::repos::{DatabasePersistor, StoreError};
use crate::config::PostgresSettings;
use crate::domain::Resource;

#[derive(Clone, Debug)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Open the pool and apply the embedded migrations.
    pub async fn connect(settings: &PostgresSettings) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(settings.max_connections.get())
            .connect(&settings.url)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        info!(
            target = "skue::infra::db::postgres",
            max_connections = settings.max_connections.get(),
            "connected to postgres"
        );
        Ok(Self::new(pool))
    }

    pub async fn count(&self, collection: &str) -> Result<u64, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents WHERE collection = $1")
            .bind(collection)
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(count.max(0) as u64)
    }

    pub async fn drop_collection(&self, collection: &str) -> Result<u64, StoreError> {
        sqlx::query("DELETE FROM documents WHERE collection = $1")
            .bind(collection)
            .execute(&self.pool)
            .await
            .map(|result| result.rows_affected())
            .map_err(map_sqlx_error)
    }
}

#[async_trait]
impl<R: Resource> DatabasePersistor<R> for PostgresStore {
    async fn create(&self, document: &R) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO documents (collection, id, body) VALUES ($1, $2, $3)")
            .bind(R::COLLECTION)
            .bind(document.id())
            .bind(Json(document))
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(map_sqlx_error)
    }

    async fn fetch(&self, id: &str) -> Result<R, StoreError> {
        let body: Option<Json<R>> =
            sqlx::query_scalar("SELECT body FROM documents WHERE collection = $1 AND id = $2")
                .bind(R::COLLECTION)
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

        body.map(|Json(document)| document)
            .ok_or(StoreError::NotFound)
    }

    async fn update(&self, document: &R, id: &str) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE documents SET body = $3 WHERE collection = $1 AND id = $2")
            .bind(R::COLLECTION)
            .bind(id)
            .bind(Json(document))
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn remove(&self, id: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
            .bind(R::COLLECTION)
            .bind(id)
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(map_sqlx_error)
    }

    async fn list(&self, limit: u32) -> Result<Vec<R>, StoreError> {
        let rows: Vec<Json<R>> = sqlx::query_scalar(
            "SELECT body FROM documents WHERE collection = $1 ORDER BY seq LIMIT $2",
        )
        .bind(R::COLLECTION)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(|Json(document)| document).collect())
    }
}
