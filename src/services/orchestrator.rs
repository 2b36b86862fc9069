//! Snapshot cache orchestration.
//!
//! Keeps one `IndicatorSnapshot` per (symbol, timeframe) in the store with
//! bounded staleness. Reads follow stale-while-revalidate, a per-key guard
//! keeps at most one refresh in flight, and a periodic sweep catches keys
//! nobody reads.

use super::aggregator::SnapshotAggregator;
use super::clock::{Clock, SystemClock};
use super::store::{indicator_key, SnapshotStore};
use super::symbols::CachedDirectory;
use crate::config::OrchestratorConfig;
use crate::error::{AppError, Result};
use crate::sources::{CandleRequest, CandleSource, SymbolDirectory};
use crate::types::{IndicatorSnapshot, Timeframe};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use futures_util::future::join_all;
use futures_util::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

/// How a cached entry should be treated by a read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Serve as-is.
    Fresh,
    /// Serve, and refresh in the background.
    Stale,
    /// Absent or expired. Compute before answering.
    Missing,
}

/// One timeframe of a multi-timeframe cached read.
#[derive(Debug, Clone)]
pub struct CachedSnapshot {
    pub timeframe: Timeframe,
    pub snapshot: Option<IndicatorSnapshot>,
    pub expires_in: Option<Duration>,
}

/// Outcome counts of one population pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PopulationReport {
    pub refreshed: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl PopulationReport {
    pub fn total(&self) -> usize {
        self.refreshed + self.skipped + self.failed
    }
}

pub struct CacheOrchestrator {
    store: Arc<dyn SnapshotStore>,
    candles: Arc<dyn CandleSource>,
    directory: Arc<CachedDirectory>,
    aggregator: Arc<SnapshotAggregator>,
    config: OrchestratorConfig,
    in_flight: DashMap<String, Arc<Mutex<()>>>,
    clock: Arc<dyn Clock>,
}

impl CacheOrchestrator {
    pub fn new(
        store: Arc<dyn SnapshotStore>,
        candles: Arc<dyn CandleSource>,
        directory: Arc<CachedDirectory>,
        config: OrchestratorConfig,
    ) -> Arc<Self> {
        Self::with_clock(store, candles, directory, config, Arc::new(SystemClock))
    }

    pub fn with_clock(
        store: Arc<dyn SnapshotStore>,
        candles: Arc<dyn CandleSource>,
        directory: Arc<CachedDirectory>,
        config: OrchestratorConfig,
        clock: Arc<dyn Clock>,
    ) -> Arc<Self> {
        Arc::new(Self {
            store,
            candles,
            directory,
            aggregator: Arc::new(SnapshotAggregator::new()),
            config,
            in_flight: DashMap::new(),
            clock,
        })
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Current time on the injected clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// The symbol universe, from cache or upstream, falling back to a fixed list.
    pub async fn symbols(&self) -> Result<Vec<String>> {
        self.directory.symbols().await
    }

    /// Refuse to start unless the store answers and the directory lists symbols.
    pub async fn startup_check(&self) -> Result<()> {
        self.store
            .ping()
            .await
            .map_err(|e| AppError::Fatal(format!("cache store unreachable: {}", e)))?;

        let symbols = self
            .directory
            .refresh()
            .await
            .map_err(|e| AppError::Fatal(format!("symbol directory unavailable: {}", e)))?;

        info!("Startup check passed: store reachable, {} symbols listed", symbols.len());
        Ok(())
    }

    /// Classify an entry by its remaining TTL.
    pub fn classify(&self, remaining: Option<Duration>) -> Freshness {
        let cache = &self.config.cache;
        match remaining {
            None => Freshness::Missing,
            Some(left) if left.is_zero() => Freshness::Missing,
            Some(left) if left <= cache.update_threshold || left < cache.indicator_ttl / 2 => {
                Freshness::Stale
            }
            Some(_) => Freshness::Fresh,
        }
    }

    /// Whether `key` is due: forced, absent, or close to expiry.
    pub async fn should_update(&self, key: &str, force: bool) -> Result<bool> {
        if force {
            return Ok(true);
        }
        let remaining = self.store.remaining_ttl(key).await?;
        Ok(self.classify(remaining) != Freshness::Fresh)
    }

    /// Stale-while-revalidate read.
    pub async fn get_snapshot(
        self: &Arc<Self>,
        symbol: &str,
        timeframe: Timeframe,
    ) -> Result<IndicatorSnapshot> {
        let key = indicator_key(symbol, timeframe);

        match self.read_entry(&key).await {
            Ok((Some(snapshot), remaining)) => match self.classify(remaining) {
                Freshness::Fresh => {
                    trace!("Cache hit for {}", key);
                    return Ok(snapshot);
                }
                Freshness::Stale => {
                    if self.spawn_refresh(symbol, timeframe) {
                        debug!("Serving stale {} while it refreshes", key);
                    }
                    return Ok(snapshot);
                }
                Freshness::Missing => {}
            },
            Ok((None, _)) => {}
            Err(e) => warn!("Cache read failed for {}: {}", key, e),
        }

        self.refresh_blocking(symbol, timeframe).await
    }

    /// Schedule a background refresh unless one is already running for the
    /// key. Returns whether a refresh was scheduled.
    pub fn spawn_refresh(self: &Arc<Self>, symbol: &str, timeframe: Timeframe) -> bool {
        let key = indicator_key(symbol, timeframe);
        let Ok(lock) = self.guard(&key).try_lock_owned() else {
            trace!("Refresh already in flight for {}", key);
            return false;
        };

        let this = Arc::clone(self);
        let symbol = symbol.to_string();
        tokio::spawn(async move {
            let outcome = this.compute_and_store(&symbol, timeframe).await;
            drop(lock);
            this.release(&key);
            if let Err(e) = outcome {
                warn!("Background refresh of {} failed: {}", key, e);
            }
        });
        true
    }

    /// Refresh `(symbol, timeframe)` if it is due. Returns whether a new
    /// snapshot was stored; `false` also covers a refresh already in flight.
    pub async fn refresh_if_needed(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        force: bool,
    ) -> Result<bool> {
        let key = indicator_key(symbol, timeframe);
        if !self.should_update(&key, force).await? {
            return Ok(false);
        }

        let Ok(lock) = self.guard(&key).try_lock_owned() else {
            return Ok(false);
        };
        let outcome = self.compute_and_store(symbol, timeframe).await;
        drop(lock);
        self.release(&key);
        outcome.map(|_| true)
    }

    /// Walk the symbol universe in batches and refresh every due key.
    pub async fn populate_all(&self, force: bool) -> Result<PopulationReport> {
        let symbols = self.directory.symbols().await?;
        let population = &self.config.population;
        let started = Instant::now();
        let mut report = PopulationReport::default();

        info!(
            "Populating {} symbols x {} timeframes (force: {})",
            symbols.len(),
            Timeframe::ALL.len(),
            force
        );

        let batches: Vec<&[String]> = symbols.chunks(population.batch_size.max(1)).collect();
        let batch_count = batches.len();

        for (index, batch) in batches.into_iter().enumerate() {
            let work: Vec<(&str, Timeframe)> = batch
                .iter()
                .flat_map(|s| Timeframe::ALL.iter().map(move |tf| (s.as_str(), *tf)))
                .collect();

            for chunk in work.chunks(population.timeframe_chunk.max(1)) {
                let outcomes: Vec<_> = stream::iter(chunk.iter().copied())
                    .map(|(symbol, timeframe)| async move {
                        let outcome = self.refresh_if_needed(symbol, timeframe, force).await;
                        (symbol, timeframe, outcome)
                    })
                    .buffer_unordered(population.concurrent_requests.max(1))
                    .collect()
                    .await;

                for (symbol, timeframe, outcome) in outcomes {
                    match outcome {
                        Ok(true) => report.refreshed += 1,
                        Ok(false) => report.skipped += 1,
                        Err(e) => {
                            debug!("Refresh failed for {} {}: {}", symbol, timeframe, e);
                            report.failed += 1;
                        }
                    }
                }

                tokio::time::sleep(population.chunk_delay).await;
            }

            debug!("Batch {}/{} done", index + 1, batch_count);
            if index + 1 < batch_count {
                tokio::time::sleep(population.batch_delay).await;
            }
        }

        info!(
            "Population finished in {:.1}s: {} refreshed, {} skipped, {} failed",
            started.elapsed().as_secs_f64(),
            report.refreshed,
            report.skipped,
            report.failed
        );
        Ok(report)
    }

    /// Schedule background refreshes for every due key. Returns how many
    /// were scheduled.
    pub async fn sweep(self: &Arc<Self>) -> Result<usize> {
        let symbols = self.directory.symbols().await?;
        let mut scheduled = 0;

        for symbol in &symbols {
            for &timeframe in Timeframe::ALL.iter() {
                let key = indicator_key(symbol, timeframe);
                match self.should_update(&key, false).await {
                    Ok(true) => {
                        if self.spawn_refresh(symbol, timeframe) {
                            scheduled += 1;
                        }
                    }
                    Ok(false) => {}
                    Err(e) => warn!("Sweep could not read TTL of {}: {}", key, e),
                }
            }
        }

        Ok(scheduled)
    }

    /// Run `sweep` every `sweep_interval`, starting one interval from now.
    pub fn start_periodic_sweep(self: &Arc<Self>) -> JoinHandle<()> {
        let this = Arc::clone(self);
        let period = this.config.cache.sweep_interval.max(Duration::from_secs(1));
        info!("Starting periodic sweep every {}s", period.as_secs());

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.tick().await;

            loop {
                interval.tick().await;
                match this.sweep().await {
                    Ok(0) => debug!("Sweep: nothing due"),
                    Ok(n) => info!("Sweep scheduled {} refreshes", n),
                    Err(e) => error!("Sweep failed: {}", e),
                }
            }
        })
    }

    /// Every timeframe's cached snapshot for `symbol`, without computing.
    pub async fn cached_snapshots(&self, symbol: &str) -> Result<Vec<CachedSnapshot>> {
        let reads = Timeframe::ALL.iter().map(|&timeframe| async move {
            let key = indicator_key(symbol, timeframe);
            let (snapshot, expires_in) = self.read_entry(&key).await?;
            Ok::<_, AppError>(CachedSnapshot {
                timeframe,
                snapshot,
                expires_in,
            })
        });

        join_all(reads).await.into_iter().collect()
    }

    /// Snapshot of the window ending at `end_time_ms`. Never stored.
    pub async fn historical_snapshot(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        end_time_ms: i64,
    ) -> Result<IndicatorSnapshot> {
        let request = CandleRequest::ending_at(symbol, timeframe, end_time_ms);
        self.compute(&request, end_time_ms).await
    }

    fn guard(&self, key: &str) -> Arc<Mutex<()>> {
        self.in_flight.entry(key.to_string()).or_default().clone()
    }

    /// Drop the key's guard once nobody holds or awaits it.
    fn release(&self, key: &str) {
        self.in_flight
            .remove_if(key, |_, guard| Arc::strong_count(guard) == 1);
    }

    /// Compute under the key's guard, unless a concurrent caller filled it
    /// while we waited.
    async fn refresh_blocking(
        &self,
        symbol: &str,
        timeframe: Timeframe,
    ) -> Result<IndicatorSnapshot> {
        let key = indicator_key(symbol, timeframe);
        let lock = self.guard(&key).lock_owned().await;

        let outcome = match self.read_entry(&key).await {
            Ok((Some(snapshot), remaining)) if self.classify(remaining) != Freshness::Missing => {
                Ok(snapshot)
            }
            _ => self.compute_and_store(symbol, timeframe).await,
        };

        drop(lock);
        self.release(&key);
        outcome
    }

    /// Cached value and remaining TTL. Undecodable entries read as absent.
    async fn read_entry(
        &self,
        key: &str,
    ) -> Result<(Option<IndicatorSnapshot>, Option<Duration>)> {
        let remaining = self.store.remaining_ttl(key).await?;
        let Some(raw) = self.store.get(key).await? else {
            return Ok((None, None));
        };

        match serde_json::from_str(&raw) {
            Ok(snapshot) => Ok((Some(snapshot), remaining)),
            Err(e) => {
                warn!("Discarding undecodable entry {}: {}", key, e);
                Ok((None, None))
            }
        }
    }

    /// Compute the latest snapshot and replace the stored entry. On failure
    /// the previous entry is left alone.
    async fn compute_and_store(
        &self,
        symbol: &str,
        timeframe: Timeframe,
    ) -> Result<IndicatorSnapshot> {
        let request = CandleRequest::latest(symbol, timeframe);
        let snapshot = self.compute(&request, self.clock.now_ms()).await?;

        let key = indicator_key(symbol, timeframe);
        let payload = serde_json::to_string(&snapshot)?;
        match self
            .store
            .set_ex(&key, payload, self.config.cache.indicator_ttl)
            .await
        {
            Ok(()) => debug!("Stored {}", key),
            Err(e) => warn!("Failed to store {}: {}", key, e),
        }

        Ok(snapshot)
    }

    async fn compute(
        &self,
        request: &CandleRequest,
        computed_at: i64,
    ) -> Result<IndicatorSnapshot> {
        let series = self.candles.get_candles(request).await?;

        let aggregator = Arc::clone(&self.aggregator);
        let symbol = request.symbol.clone();
        let timeframe = request.timeframe;
        tokio::task::spawn_blocking(move || {
            aggregator.aggregate(&symbol, timeframe, &series, computed_at)
        })
        .await
        .map_err(|e| AppError::Internal(format!("aggregation task failed: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::clock::ManualClock;
    use crate::services::signals::indicators::test_support::create_uptrend_candles;
    use crate::services::store::MemoryStore;
    use crate::types::CandleSeries;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl CandleSource for CountingSource {
        async fn get_candles(&self, request: &CandleRequest) -> Result<CandleSeries> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match request.symbol.as_str() {
                "THINUSDT" => Ok(CandleSeries::new(create_uptrend_candles(1))),
                "DOWNUSDT" => Err(AppError::DataUnavailable("down".to_string())),
                _ => Ok(CandleSeries::new(create_uptrend_candles(60))),
            }
        }
    }

    struct StaticDirectory;

    #[async_trait]
    impl SymbolDirectory for StaticDirectory {
        async fn symbols(&self) -> Result<Vec<String>> {
            Ok(vec!["BTCUSDT".to_string(), "THINUSDT".to_string()])
        }
    }

    struct Fixture {
        orchestrator: Arc<CacheOrchestrator>,
        source: Arc<CountingSource>,
        store: Arc<MemoryStore>,
        clock: Arc<ManualClock>,
    }

    fn fixture() -> Fixture {
        let clock = Arc::new(ManualClock::new(1_700_000_000_000));
        let store = Arc::new(MemoryStore::with_clock(clock.clone()));
        let source = Arc::new(CountingSource {
            calls: AtomicUsize::new(0),
        });
        let directory = Arc::new(CachedDirectory::with_clock(
            Arc::new(StaticDirectory),
            Duration::from_secs(300),
            clock.clone(),
        ));
        let mut config = OrchestratorConfig::default();
        config.population.chunk_delay = Duration::ZERO;
        config.population.batch_delay = Duration::ZERO;
        let orchestrator = CacheOrchestrator::with_clock(
            store.clone(),
            source.clone(),
            directory,
            config,
            clock.clone(),
        );
        Fixture {
            orchestrator,
            source,
            store,
            clock,
        }
    }

    fn calls(fixture: &Fixture) -> usize {
        fixture.source.calls.load(Ordering::SeqCst)
    }

    #[test]
    fn test_classify_thresholds() {
        let orchestrator = fixture().orchestrator;
        let secs = |s| Some(Duration::from_secs(s));

        assert_eq!(orchestrator.classify(None), Freshness::Missing);
        assert_eq!(orchestrator.classify(secs(0)), Freshness::Missing);
        assert_eq!(orchestrator.classify(secs(300)), Freshness::Fresh);
        assert_eq!(orchestrator.classify(secs(150)), Freshness::Fresh);
        // below half the ttl
        assert_eq!(orchestrator.classify(secs(149)), Freshness::Stale);
        assert_eq!(orchestrator.classify(secs(60)), Freshness::Stale);
        assert_eq!(orchestrator.classify(Some(Duration::MAX)), Freshness::Fresh);
    }

    #[tokio::test]
    async fn test_miss_computes_and_stores() {
        let fx = fixture();
        let snapshot = fx
            .orchestrator
            .get_snapshot("BTCUSDT", Timeframe::OneHour)
            .await
            .unwrap();

        assert_eq!(snapshot.symbol, "BTCUSDT");
        assert_eq!(snapshot.computed_at, 1_700_000_000_000);
        assert_eq!(calls(&fx), 1);
        assert_eq!(fx.store.len(), 1);

        fx.orchestrator
            .get_snapshot("BTCUSDT", Timeframe::OneHour)
            .await
            .unwrap();
        assert_eq!(calls(&fx), 1);
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous_entry() {
        let fx = fixture();
        assert!(fx
            .orchestrator
            .get_snapshot("THINUSDT", Timeframe::OneDay)
            .await
            .is_err());
        assert!(fx.store.is_empty());

        let err = fx
            .orchestrator
            .refresh_if_needed("DOWNUSDT", Timeframe::OneDay, true)
            .await
            .unwrap_err();
        assert!(err.is_data_unavailable());
    }

    #[tokio::test]
    async fn test_should_update() {
        let fx = fixture();
        let key = indicator_key("BTCUSDT", Timeframe::FiveMinutes);
        assert!(fx.orchestrator.should_update(&key, false).await.unwrap());

        fx.orchestrator
            .refresh_if_needed("BTCUSDT", Timeframe::FiveMinutes, false)
            .await
            .unwrap();
        assert!(!fx.orchestrator.should_update(&key, false).await.unwrap());
        assert!(fx.orchestrator.should_update(&key, true).await.unwrap());

        fx.clock.advance(Duration::from_secs(240));
        assert!(fx.orchestrator.should_update(&key, false).await.unwrap());
    }

    #[tokio::test]
    async fn test_populate_all_counts_outcomes() {
        let fx = fixture();
        let report = fx.orchestrator.populate_all(false).await.unwrap();

        // BTCUSDT computes on every timeframe, THINUSDT never has enough bars
        assert_eq!(report.refreshed, Timeframe::ALL.len());
        assert_eq!(report.failed, Timeframe::ALL.len());
        assert_eq!(report.skipped, 0);
        assert_eq!(fx.store.len(), Timeframe::ALL.len());

        let again = fx.orchestrator.populate_all(false).await.unwrap();
        assert_eq!(again.skipped, Timeframe::ALL.len());
        assert_eq!(again.total(), 2 * Timeframe::ALL.len());
    }

    #[tokio::test]
    async fn test_guards_are_dropped_when_idle() {
        let fx = fixture();
        for i in 0..100 {
            let symbol = format!("NEW{}USDT", i);
            fx.orchestrator
                .get_snapshot(&symbol, Timeframe::OneMinute)
                .await
                .unwrap();
        }
        assert!(fx
            .orchestrator
            .get_snapshot("THINUSDT", Timeframe::OneMinute)
            .await
            .is_err());
        assert!(fx
            .orchestrator
            .refresh_if_needed("DOWNUSDT", Timeframe::OneHour, true)
            .await
            .is_err());
        assert!(fx.orchestrator.in_flight.is_empty());

        assert!(fx.orchestrator.spawn_refresh("BTCUSDT", Timeframe::OneDay));
        assert_eq!(fx.orchestrator.in_flight.len(), 1);
        for _ in 0..200 {
            if fx.orchestrator.in_flight.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(fx.orchestrator.in_flight.is_empty());
        assert_eq!(fx.store.len(), 101);
    }

    #[tokio::test]
    async fn test_cached_snapshots_reports_every_timeframe() {
        let fx = fixture();
        fx.orchestrator
            .get_snapshot("BTCUSDT", Timeframe::FourHours)
            .await
            .unwrap();

        let cached = fx.orchestrator.cached_snapshots("BTCUSDT").await.unwrap();
        assert_eq!(cached.len(), Timeframe::ALL.len());
        for entry in cached {
            if entry.timeframe == Timeframe::FourHours {
                assert!(entry.snapshot.is_some());
                assert_eq!(entry.expires_in, Some(Duration::from_secs(300)));
            } else {
                assert!(entry.snapshot.is_none());
                assert!(entry.expires_in.is_none());
            }
        }
        assert_eq!(calls(&fx), 1);
    }
}
