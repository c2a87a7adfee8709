// Score Cache Port
//
// Keyed JSON store shared by the orchestrator (reader) and workers (writers).
// Expiry is decided at read time from the TTL the caller passes in.

use crate::domain::CacheKey;
use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

/// A cached payload and when it was written
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub key: String,
    pub payload: Value,
    pub cached_at: i64, // epoch ms
}

impl CacheEntry {
    /// Zero TTL disables the age check
    pub fn is_fresh(&self, now_millis: i64, ttl: Duration) -> bool {
        if ttl.is_zero() {
            return true;
        }
        self.cached_at > now_millis - ttl.as_millis() as i64
    }
}

/// Lookup TTL expressed in minutes
pub fn ttl_minutes(minutes: u64) -> Duration {
    Duration::from_secs(minutes * 60)
}

/// Lookup TTL expressed in days
pub fn ttl_days(days: u64) -> Duration {
    ttl_minutes(days * 24 * 60)
}

#[async_trait]
pub trait ScoreCache: Send + Sync {
    /// Fresh entry for `key`, or None on miss/expiry
    async fn get(&self, key: &CacheKey, ttl: Duration) -> Result<Option<CacheEntry>>;

    /// Upsert; overwrites any previous entry and stamps it with the current time
    async fn put(&self, key: &CacheKey, payload: &Value) -> Result<()>;

    /// Number of stored entries, expired ones included
    async fn count(&self) -> Result<i64>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::port::TimeProvider;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    pub struct InMemoryScoreCache {
        entries: Mutex<HashMap<String, CacheEntry>>,
        time_provider: Arc<dyn TimeProvider>,
    }

    impl InMemoryScoreCache {
        pub fn new(time_provider: Arc<dyn TimeProvider>) -> Self {
            Self {
                entries: Mutex::new(HashMap::new()),
                time_provider,
            }
        }

        /// Seed an entry with an explicit timestamp
        pub fn insert_at(&self, key: &CacheKey, payload: Value, cached_at: i64) {
            self.entries.lock().unwrap().insert(
                key.as_str().to_string(),
                CacheEntry {
                    key: key.as_str().to_string(),
                    payload,
                    cached_at,
                },
            );
        }

        /// Raw entry regardless of age
        pub fn peek(&self, key: &CacheKey) -> Option<CacheEntry> {
            self.entries.lock().unwrap().get(key.as_str()).cloned()
        }
    }

    #[async_trait]
    impl ScoreCache for InMemoryScoreCache {
        async fn get(&self, key: &CacheKey, ttl: Duration) -> Result<Option<CacheEntry>> {
            let now = self.time_provider.now_millis();
            Ok(self
                .entries
                .lock()
                .unwrap()
                .get(key.as_str())
                .filter(|e| e.is_fresh(now, ttl))
                .cloned())
        }

        async fn put(&self, key: &CacheKey, payload: &Value) -> Result<()> {
            let now = self.time_provider.now_millis();
            self.insert_at(key, payload.clone(), now);
            Ok(())
        }

        async fn count(&self) -> Result<i64> {
            Ok(self.entries.lock().unwrap().len() as i64)
        }
    }
}
