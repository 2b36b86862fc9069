use super::cache::Cache;
use super::clock::{Clock, SystemClock};
use crate::error::{AppError, Result};
use crate::sources::SymbolDirectory;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Used when the upstream directory cannot be reached.
pub const FALLBACK_SYMBOLS: &[&str] = &["BTCUSDT", "ETHUSDT", "BNBUSDT"];

const SYMBOLS_KEY: &str = "symbols";

/// Symbol directory with a TTL cache and a fixed fallback list.
pub struct CachedDirectory {
    inner: Arc<dyn SymbolDirectory>,
    cache: Cache<Arc<Vec<String>>>,
}

impl CachedDirectory {
    pub fn new(inner: Arc<dyn SymbolDirectory>, ttl: Duration) -> Self {
        Self::with_clock(inner, ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(inner: Arc<dyn SymbolDirectory>, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner,
            cache: Cache::with_clock(ttl, clock),
        }
    }

    /// Ask upstream directly and refill the cache. Errors are returned as-is,
    /// and an empty listing is an error.
    pub async fn refresh(&self) -> Result<Vec<String>> {
        let symbols = self.inner.symbols().await?;
        if symbols.is_empty() {
            return Err(AppError::DataUnavailable(
                "symbol directory returned no symbols".to_string(),
            ));
        }
        debug!("Cached {} symbols", symbols.len());
        self.cache
            .set(SYMBOLS_KEY.to_string(), Arc::new(symbols.clone()));
        Ok(symbols)
    }
}

#[async_trait]
impl SymbolDirectory for CachedDirectory {
    async fn symbols(&self) -> Result<Vec<String>> {
        if let Some(symbols) = self.cache.get(SYMBOLS_KEY) {
            return Ok(symbols.as_ref().clone());
        }

        match self.refresh().await {
            Ok(symbols) => Ok(symbols),
            Err(e) => {
                warn!("Symbol directory unavailable ({}). Using fallback list", e);
                Ok(FALLBACK_SYMBOLS.iter().map(|s| s.to_string()).collect())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::clock::ManualClock;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingDirectory {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl SymbolDirectory for CountingDirectory {
        async fn symbols(&self) -> Result<Vec<String>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(AppError::DataUnavailable("down".to_string()))
            } else {
                Ok(vec!["SOLUSDT".to_string()])
            }
        }
    }

    fn directory(fail: bool) -> (Arc<CountingDirectory>, CachedDirectory, Arc<ManualClock>) {
        let inner = Arc::new(CountingDirectory {
            calls: AtomicUsize::new(0),
            fail,
        });
        let clock = Arc::new(ManualClock::new(0));
        let cached =
            CachedDirectory::with_clock(inner.clone(), Duration::from_secs(300), clock.clone());
        (inner, cached, clock)
    }

    #[tokio::test]
    async fn test_symbols_cached_until_expiry() {
        let (inner, cached, clock) = directory(false);

        assert_eq!(cached.symbols().await.unwrap(), vec!["SOLUSDT"]);
        assert_eq!(cached.symbols().await.unwrap(), vec!["SOLUSDT"]);
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);

        clock.advance(Duration::from_secs(300));
        cached.symbols().await.unwrap();
        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_fallback_on_failure() {
        let (_, cached, _) = directory(true);
        assert_eq!(
            cached.symbols().await.unwrap(),
            vec!["BTCUSDT", "ETHUSDT", "BNBUSDT"]
        );
        assert!(cached.refresh().await.is_err());
    }
}
