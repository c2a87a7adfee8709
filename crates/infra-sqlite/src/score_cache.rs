// SQLite ScoreCache Implementation (table: cached_responses)

use crate::error::map_sqlx_error;
use async_trait::async_trait;
use propscore_core::domain::CacheKey;
use propscore_core::error::Result;
use propscore_core::port::{CacheEntry, ScoreCache, TimeProvider};
use serde_json::Value;
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

pub struct SqliteScoreCache {
    pool: SqlitePool,
    time_provider: Arc<dyn TimeProvider>,
}

impl SqliteScoreCache {
    pub fn new(pool: SqlitePool, time_provider: Arc<dyn TimeProvider>) -> Self {
        Self {
            pool,
            time_provider,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CachedRow {
    key: String,
    cached_data: String,
    last_cached_datetime: i64,
}

#[async_trait]
impl ScoreCache for SqliteScoreCache {
    async fn get(&self, key: &CacheKey, ttl: Duration) -> Result<Option<CacheEntry>> {
        let row = sqlx::query_as::<_, CachedRow>(
            "SELECT key, cached_data, last_cached_datetime FROM cached_responses WHERE key = ?",
        )
        .bind(key.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let Some(row) = row else {
            return Ok(None);
        };

        // A corrupt row reads as a miss so the next write replaces it
        let payload: Value = match serde_json::from_str(&row.cached_data) {
            Ok(v) => v,
            Err(e) => {
                warn!(key = %row.key, error = %e, "Unreadable cache entry");
                return Ok(None);
            }
        };

        let entry = CacheEntry {
            key: row.key,
            payload,
            cached_at: row.last_cached_datetime,
        };
        let now = self.time_provider.now_millis();
        Ok(entry.is_fresh(now, ttl).then_some(entry))
    }

    async fn put(&self, key: &CacheKey, payload: &Value) -> Result<()> {
        let now = self.time_provider.now_millis();

        sqlx::query(
            r#"
            INSERT INTO cached_responses (key, cached_data, last_cached_datetime)
            VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET
                cached_data = excluded.cached_data,
                last_cached_datetime = excluded.last_cached_datetime
            "#,
        )
        .bind(key.as_str())
        .bind(payload.to_string())
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn count(&self) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM cached_responses")
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)
    }
}
