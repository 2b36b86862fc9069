use super::SignalPolicy;
use crate::error::Result;
use crate::services::orchestrator::CacheOrchestrator;
use crate::types::{Signal, Timeframe};
use futures_util::future::join_all;
use std::sync::Arc;
use tracing::{debug, info};

/// Evaluate `policy` over every symbol's cached snapshot for `timeframe`.
///
/// Symbols are read in batches through the stale-while-revalidate path.
/// A symbol whose snapshot cannot be produced is skipped.
pub async fn scan_signals<P: SignalPolicy>(
    orchestrator: &Arc<CacheOrchestrator>,
    timeframe: Timeframe,
    policy: &P,
) -> Result<Vec<Signal<P::Class>>> {
    let symbols = orchestrator.symbols().await?;
    let batch_size = orchestrator.config().population.batch_size.max(1);
    let mut signals = Vec::new();

    for batch in symbols.chunks(batch_size) {
        let reads = batch.iter().map(|symbol| async move {
            (symbol, orchestrator.get_snapshot(symbol, timeframe).await)
        });

        let snapshots = join_all(reads).await;
        let evaluated_at = orchestrator.now();
        for (symbol, snapshot) in snapshots {
            match snapshot {
                Ok(snapshot) => signals.extend(policy.evaluate(&snapshot, evaluated_at)),
                Err(e) => debug!(
                    "Skipping {} {} in {} scan: {}",
                    symbol,
                    timeframe,
                    policy.id(),
                    e
                ),
            }
        }
    }

    info!(
        "{} scan on {} produced {} signals from {} symbols",
        policy.id(),
        timeframe,
        signals.len(),
        symbols.len()
    );
    Ok(signals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OrchestratorConfig;
    use crate::error::AppError;
    use crate::services::signals::indicators::test_support::create_uptrend_candles;
    use crate::services::clock::ManualClock;
    use crate::services::signals::{StrengthPolicy, TallyPolicy};
    use crate::services::store::MemoryStore;
    use crate::services::symbols::CachedDirectory;
    use crate::sources::{CandleRequest, CandleSource, SymbolDirectory};
    use crate::types::{CandleSeries, TallySignal};
    use async_trait::async_trait;
    use std::time::Duration;

    const SCAN_AT_MS: i64 = 1_700_000_000_000;

    struct Source;

    #[async_trait]
    impl CandleSource for Source {
        async fn get_candles(&self, request: &CandleRequest) -> Result<CandleSeries> {
            if request.symbol == "GONEUSDT" {
                return Err(AppError::DataUnavailable("delisted".to_string()));
            }
            Ok(CandleSeries::new(create_uptrend_candles(300)))
        }
    }

    struct Directory;

    #[async_trait]
    impl SymbolDirectory for Directory {
        async fn symbols(&self) -> Result<Vec<String>> {
            Ok(vec![
                "BTCUSDT".to_string(),
                "GONEUSDT".to_string(),
                "ETHUSDT".to_string(),
            ])
        }
    }

    fn orchestrator(batch_size: usize) -> Arc<CacheOrchestrator> {
        let mut config = OrchestratorConfig::default();
        config.population.batch_size = batch_size;
        let clock = Arc::new(ManualClock::new(SCAN_AT_MS));
        CacheOrchestrator::with_clock(
            Arc::new(MemoryStore::with_clock(clock.clone())),
            Arc::new(Source),
            Arc::new(CachedDirectory::with_clock(
                Arc::new(Directory),
                Duration::from_secs(300),
                clock.clone(),
            )),
            config,
            clock,
        )
    }

    #[tokio::test]
    async fn test_strength_scan_skips_failed_symbols() {
        let signals = scan_signals(&orchestrator(2), Timeframe::OneHour, &StrengthPolicy)
            .await
            .unwrap();

        let symbols: Vec<_> = signals.iter().map(|s| s.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["BTCUSDT", "ETHUSDT"]);
        for signal in &signals {
            assert_eq!(signal.timeframe, Timeframe::OneHour);
            assert_eq!(signal.timestamp.timestamp_millis(), SCAN_AT_MS);
            // every field is defined on 300 bars, so the gate passed
            assert_eq!(
                Some(signal.strength),
                StrengthPolicy::strength(&signal.indicators)
            );
        }
    }

    #[tokio::test]
    async fn test_tally_scan_flags_overbought_uptrend() {
        // no losing bars puts RSI at 100 with price inside the upper band
        let signals = scan_signals(&orchestrator(200), Timeframe::OneDay, &TallyPolicy)
            .await
            .unwrap();
        assert_eq!(signals.len(), 2);
        assert!(signals
            .iter()
            .all(|s| s.classification == TallySignal::Sell && s.tally.is_some()));
    }
}
