use super::cache::Cache;
use super::clock::{Clock, SystemClock};
use crate::error::Result;
use crate::sources::{CandleRequest, CandleSource};
use crate::types::CandleSeries;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::trace;

/// Short-lived memo of candle fetches keyed by request parameters.
pub struct CachedCandleSource {
    inner: Arc<dyn CandleSource>,
    cache: Cache<CandleSeries>,
}

impl CachedCandleSource {
    pub fn new(inner: Arc<dyn CandleSource>, ttl: Duration) -> Self {
        Self::with_clock(inner, ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(inner: Arc<dyn CandleSource>, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner,
            cache: Cache::with_clock(ttl, clock),
        }
    }

    /// Drop expired series.
    pub fn cleanup(&self) {
        self.cache.cleanup();
    }
}

#[async_trait]
impl CandleSource for CachedCandleSource {
    async fn get_candles(&self, request: &CandleRequest) -> Result<CandleSeries> {
        let key = request.cache_key();
        if let Some(series) = self.cache.get(&key) {
            trace!("Candle cache hit for {}", key);
            return Ok(series);
        }

        let series = self.inner.get_candles(request).await?;
        self.cache.set(key, series.clone());
        Ok(series)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::services::clock::ManualClock;
    use crate::types::{Candle, Timeframe};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl CandleSource for CountingSource {
        async fn get_candles(&self, request: &CandleRequest) -> Result<CandleSeries> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if request.symbol == "MISSING" {
                return Err(AppError::DataUnavailable("no bars".to_string()));
            }
            let bar = Candle {
                open_time: 0,
                open: 1.0,
                high: 1.0,
                low: 1.0,
                close: 1.0,
                volume: 1.0,
                close_time: 0,
            };
            Ok(CandleSeries::new(vec![bar, bar]))
        }
    }

    #[tokio::test]
    async fn test_memoises_within_window() {
        let inner = Arc::new(CountingSource {
            calls: AtomicUsize::new(0),
        });
        let clock = Arc::new(ManualClock::new(0));
        let cached =
            CachedCandleSource::with_clock(inner.clone(), Duration::from_secs(30), clock.clone());
        let request = CandleRequest::latest("BTCUSDT", Timeframe::OneMinute);

        cached.get_candles(&request).await.unwrap();
        cached.get_candles(&request).await.unwrap();
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);

        // different window, different key
        let historical = CandleRequest::ending_at("BTCUSDT", Timeframe::OneMinute, 5);
        cached.get_candles(&historical).await.unwrap();
        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);

        clock.advance(Duration::from_secs(30));
        cached.get_candles(&request).await.unwrap();
        assert_eq!(inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_errors_are_not_cached() {
        let inner = Arc::new(CountingSource {
            calls: AtomicUsize::new(0),
        });
        let cached = CachedCandleSource::new(inner.clone(), Duration::from_secs(30));
        let request = CandleRequest::latest("MISSING", Timeframe::OneDay);

        assert!(cached.get_candles(&request).await.is_err());
        assert!(cached.get_candles(&request).await.is_err());
        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
    }
}
