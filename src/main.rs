use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use wraith::config::Config;
use wraith::services::{
    CacheOrchestrator, CachedCandleSource, CachedDirectory, MemoryStore, RedisStore,
    SnapshotStore,
};
use wraith::sources::BinanceClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wraith=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    info!("Starting Wraith against {}", config.fetch.api_url);

    let store: Arc<dyn SnapshotStore> = match config.redis_url {
        Some(ref redis_url) => {
            let store = RedisStore::connect(redis_url)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to connect to Redis: {}", e))?;
            info!("Snapshot store: Redis");
            Arc::new(store)
        }
        None => {
            warn!("REDIS_URL not set, snapshots are kept in memory only");
            Arc::new(MemoryStore::new())
        }
    };

    let binance = Arc::new(BinanceClient::new(&config.fetch, &config.symbols));
    let candles = Arc::new(CachedCandleSource::new(
        binance.clone(),
        config.fetch.candle_cache_ttl,
    ));
    let directory = Arc::new(CachedDirectory::new(binance, config.symbols.cache_ttl));

    let orchestrator =
        CacheOrchestrator::new(store, candles.clone(), directory, config.orchestrator());

    orchestrator.startup_check().await?;

    let report = orchestrator
        .populate_all(config.cache.force_update_on_start)
        .await?;
    info!("Initial population: {} snapshots ready", report.refreshed + report.skipped);

    let sweep = orchestrator.start_periodic_sweep();

    // Prune expired candle windows on the sweep cadence
    let prune_every = config.cache.sweep_interval;
    let prune = tokio::spawn(async move {
        let mut interval = tokio::time::interval(prune_every);
        interval.tick().await;
        loop {
            interval.tick().await;
            candles.cleanup();
        }
    });

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    sweep.abort();
    prune.abort();

    if let Err(e) = sweep.await {
        if !e.is_cancelled() {
            error!("Sweep task ended abnormally: {}", e);
        }
    }

    Ok(())
}
