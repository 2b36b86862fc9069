use super::clock::{Clock, SystemClock};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;

/// Concurrent keyed map whose entries lapse after a per-entry lifetime.
///
/// Lifetimes are read off an injected [`Clock`]. Lapsed entries are dropped
/// lazily on access or in bulk by [`Cache::cleanup`].
pub struct Cache<V> {
    data: DashMap<String, CacheEntry<V>>,
    default_ttl: Duration,
    clock: Arc<dyn Clock>,
}

struct CacheEntry<V> {
    value: V,
    inserted_at: i64,
    ttl_ms: i64,
}

impl<V> CacheEntry<V> {
    fn expires_at(&self) -> i64 {
        self.inserted_at.saturating_add(self.ttl_ms)
    }

    fn is_live(&self, now: i64) -> bool {
        now < self.expires_at()
    }
}

impl<V: Clone> Cache<V> {
    /// Backed by the wall clock.
    pub fn new(default_ttl: Duration) -> Self {
        Self::with_clock(default_ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(default_ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            data: DashMap::new(),
            default_ttl,
            clock,
        }
    }

    /// Live value for `key`, evicting it if it has lapsed.
    pub fn get(&self, key: &str) -> Option<V> {
        let entry = self.data.get(key)?;
        if entry.is_live(self.clock.now_ms()) {
            Some(entry.value.clone())
        } else {
            drop(entry);
            self.data.remove(key);
            None
        }
    }

    pub fn set(&self, key: String, value: V) {
        self.set_with_ttl(key, value, self.default_ttl);
    }

    /// Insert or replace `key`. The lifetime restarts from now.
    pub fn set_with_ttl(&self, key: String, value: V, ttl: Duration) {
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        self.data.insert(
            key,
            CacheEntry {
                value,
                inserted_at: self.clock.now_ms(),
                ttl_ms,
            },
        );
    }

    /// Time left before `key` expires. `None` when absent or already expired.
    pub fn remaining_ttl(&self, key: &str) -> Option<Duration> {
        let entry = self.data.get(key)?;
        let remaining = entry.expires_at() - self.clock.now_ms();
        if remaining > 0 {
            Some(Duration::from_millis(remaining as u64))
        } else {
            drop(entry);
            self.data.remove(key);
            None
        }
    }

    /// Evict everything that has lapsed.
    pub fn cleanup(&self) {
        let now = self.clock.now_ms();
        self.data.retain(|_, entry| entry.is_live(now));
    }

    /// Stored entries, lapsed ones included until evicted.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
