//! Redis cache for detection and workload results.
//!
//! Entries are short-lived snapshots keyed by tenant and date range. Applying
//! resolutions invalidates every entry of the project. Cache failures are
//! logged and treated as misses.

use anyhow::{Context, Result};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;
use tracing::{debug, error, instrument, warn};

/// Redis cache client with connection pooling.
#[derive(Clone)]
pub struct RedisCache {
    conn: ConnectionManager,
    default_ttl: Duration,
}

impl RedisCache {
    pub async fn new(redis_url: &str, default_ttl_seconds: u64) -> Result<Self> {
        let client = redis::Client::open(redis_url).context("Failed to create Redis client")?;

        let conn = ConnectionManager::new(client)
            .await
            .context("Failed to connect to Redis")?;

        tracing::info!(ttl_secs = default_ttl_seconds, "Redis cache connected");

        Ok(Self {
            conn,
            default_ttl: Duration::from_secs(default_ttl_seconds),
        })
    }

    #[instrument(skip(self), fields(cache_hit))]
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let mut conn = self.conn.clone();

        match conn.get::<_, Option<String>>(key).await {
            Ok(Some(data)) => match serde_json::from_str(&data) {
                Ok(value) => {
                    debug!(key = key, "Cache hit");
                    tracing::Span::current().record("cache_hit", true);
                    Some(value)
                }
                Err(e) => {
                    warn!(key = key, error = %e, "Failed to deserialize cached value");
                    tracing::Span::current().record("cache_hit", false);
                    None
                }
            },
            Ok(None) => {
                debug!(key = key, "Cache miss");
                tracing::Span::current().record("cache_hit", false);
                None
            }
            Err(e) => {
                error!(key = key, error = %e, "Redis get error");
                tracing::Span::current().record("cache_hit", false);
                None
            }
        }
    }

    /// Store `value` under `key` for the default TTL
    #[instrument(skip(self, value))]
    pub async fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let mut conn = self.conn.clone();

        let data = serde_json::to_string(value).context("Failed to serialize value for cache")?;

        conn.set_ex::<_, _, ()>(key, data, self.default_ttl.as_secs())
            .await
            .context("Failed to set cache value")?;

        debug!(key = key, ttl_secs = self.default_ttl.as_secs(), "Cached value");
        Ok(())
    }

    /// Delete all keys matching a pattern (e.g., "*:project:123:*").
    #[instrument(skip(self))]
    pub async fn delete_pattern(&self, pattern: &str) -> Result<usize> {
        let mut conn = self.conn.clone();

        let mut cursor: u64 = 0;
        let mut keys: Vec<String> = Vec::new();
        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .cursor_arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(1000)
                .query_async(&mut conn)
                .await
                .context("Failed to scan cache keys")?;
            keys.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }

        if keys.is_empty() {
            return Ok(0);
        }

        let deleted: i32 = conn.del(&keys).await.context("Failed to delete cache keys")?;

        debug!(pattern = pattern, deleted = deleted, "Cache pattern delete");
        Ok(deleted as usize)
    }

    pub async fn health_check(&self) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .context("Redis health check failed")?;
        Ok(())
    }
}

/// Cache key builders for consistent key formats.
pub mod keys {
    use chrono::NaiveDate;

    use crate::scheduling::TenantScope;

    fn tenant(scope: &TenantScope) -> String {
        format!("org:{}:project:{}", scope.organization_id, scope.project_id)
    }

    /// Detection result for a range at one confidence threshold
    pub fn detection(scope: &TenantScope, start: NaiveDate, end: NaiveDate, threshold: u8) -> String {
        format!("conflicts:{}:{}:{}:t{}", tenant(scope), start, end, threshold)
    }

    pub fn workload(scope: &TenantScope, start: NaiveDate, end: NaiveDate) -> String {
        format!("workload:{}:{}:{}", tenant(scope), start, end)
    }

    /// Every cached entry of a project
    pub fn project_pattern(scope: &TenantScope) -> String {
        format!("*:{}:*", tenant(scope))
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use uuid::Uuid;

        #[test]
        fn test_project_pattern_covers_all_keys() {
            let scope = TenantScope::new(Uuid::from_u128(1), Uuid::from_u128(2));
            let start = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
            let end = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
            let prefix = project_pattern(&scope).trim_matches('*').to_string();

            assert!(detection(&scope, start, end, 70).contains(&prefix));
            assert!(workload(&scope, start, end).contains(&prefix));
            assert_ne!(detection(&scope, start, end, 70), detection(&scope, start, end, 80));
        }
    }
}
