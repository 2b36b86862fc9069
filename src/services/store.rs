use super::cache::Cache;
use super::clock::{Clock, SystemClock};
use crate::error::Result;
use crate::types::Timeframe;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Key prefix for persisted snapshots.
const INDICATOR_PREFIX: &str = "indicator:";

/// Store key for one (symbol, timeframe) snapshot.
pub fn indicator_key(symbol: &str, timeframe: Timeframe) -> String {
    format!("{}{}:{}", INDICATOR_PREFIX, symbol, timeframe)
}

/// Keyed string store with per-entry expiry.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Round-trip to the backend.
    async fn ping(&self) -> Result<()>;

    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Replace `key` wholesale, expiring after `ttl`.
    async fn set_ex(&self, key: &str, value: String, ttl: Duration) -> Result<()>;

    /// Time left on `key`. `None` when the key is absent.
    /// Keys without an expiry report `Duration::MAX`.
    async fn remaining_ttl(&self, key: &str) -> Result<Option<Duration>>;
}

/// In-process store backed by the TTL cache.
pub struct MemoryStore {
    entries: Cache<String>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Cache::with_clock(Duration::from_secs(300), clock),
        }
    }

    /// Entries held, expired ones included until next touched.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop expired entries.
    pub fn cleanup(&self) {
        self.entries.cleanup();
    }
}

#[async_trait]
impl SnapshotStore for MemoryStore {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key))
    }

    async fn set_ex(&self, key: &str, value: String, ttl: Duration) -> Result<()> {
        self.entries.set_with_ttl(key.to_string(), value, ttl);
        Ok(())
    }

    async fn remaining_ttl(&self, key: &str) -> Result<Option<Duration>> {
        Ok(self.entries.remaining_ttl(key))
    }
}
