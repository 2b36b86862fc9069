use std::env;
use std::time::Duration;

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_flag(key: &str, default: bool) -> bool {
    env::var(key)
        .ok()
        .map(|v| v == "true" || v == "1")
        .unwrap_or(default)
}

/// Upstream market-data fetch settings.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Base URL of the exchange REST API.
    pub api_url: String,
    /// Bars requested per kline call.
    pub candle_limit: u32,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Retries after the first attempt for transient failures.
    pub max_retries: u32,
    /// Base retry delay, multiplied by the attempt number.
    pub retry_delay: Duration,
    /// Cap on consecutive rate-limit waits for a single request.
    pub max_rate_limit_waits: u32,
    /// Upper bound on upstream requests in flight. Retry waits do not hold a slot.
    pub max_concurrent_fetches: usize,
    /// Lifetime of the short-lived candle side cache.
    pub candle_cache_ttl: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api1.binance.com/api/v3".to_string(),
            candle_limit: 300,
            timeout: Duration::from_secs(60),
            max_retries: 3,
            retry_delay: Duration::from_millis(3000),
            max_rate_limit_waits: 10,
            max_concurrent_fetches: 50,
            candle_cache_ttl: Duration::from_secs(30),
        }
    }
}

/// Snapshot cache lifetime and refresh policy.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// TTL written with every snapshot.
    pub indicator_ttl: Duration,
    /// Entries with this much life left (or less) are refreshed.
    pub update_threshold: Duration,
    /// Period of the background sweep.
    pub sweep_interval: Duration,
    /// Recompute everything on the startup population pass.
    pub force_update_on_start: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            indicator_ttl: Duration::from_secs(300),
            update_threshold: Duration::from_secs(60),
            sweep_interval: Duration::from_secs(300),
            force_update_on_start: true,
        }
    }
}

/// Batching for the population pass.
#[derive(Debug, Clone)]
pub struct PopulationConfig {
    /// Symbols per batch.
    pub batch_size: usize,
    /// Symbols processed concurrently within a batch.
    pub concurrent_requests: usize,
    /// Timeframes refreshed together for one symbol.
    pub timeframe_chunk: usize,
    /// Pause after each timeframe chunk.
    pub chunk_delay: Duration,
    /// Pause between batches.
    pub batch_delay: Duration,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            batch_size: 200,
            concurrent_requests: 200,
            timeframe_chunk: 200,
            chunk_delay: Duration::from_millis(100),
            batch_delay: Duration::from_millis(50),
        }
    }
}

/// Symbol directory settings.
#[derive(Debug, Clone)]
pub struct SymbolConfig {
    pub quote_asset: String,
    pub cache_ttl: Duration,
}

impl Default for SymbolConfig {
    fn default() -> Self {
        Self {
            quote_asset: "USDT".to_string(),
            cache_ttl: Duration::from_secs(300),
        }
    }
}

/// Everything the cache orchestrator needs to run.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub cache: CacheConfig,
    pub population: PopulationConfig,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            population: PopulationConfig::default(),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Redis URL for the snapshot store. In-memory store when unset.
    pub redis_url: Option<String>,
    pub fetch: FetchConfig,
    pub cache: CacheConfig,
    pub population: PopulationConfig,
    pub symbols: SymbolConfig,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let fetch_defaults = FetchConfig::default();
        let cache_defaults = CacheConfig::default();
        let population_defaults = PopulationConfig::default();
        let symbol_defaults = SymbolConfig::default();

        Self {
            redis_url: env::var("REDIS_URL").ok().filter(|url| !url.is_empty()),
            fetch: FetchConfig {
                api_url: env::var("BINANCE_API_URL").unwrap_or(fetch_defaults.api_url),
                candle_limit: env_or("CANDLE_LIMIT", fetch_defaults.candle_limit),
                timeout: Duration::from_secs(env_or(
                    "HTTP_TIMEOUT_SECS",
                    fetch_defaults.timeout.as_secs(),
                )),
                max_retries: env_or("MAX_RETRIES", fetch_defaults.max_retries),
                retry_delay: Duration::from_millis(env_or(
                    "RETRY_DELAY_MS",
                    fetch_defaults.retry_delay.as_millis() as u64,
                )),
                max_rate_limit_waits: env_or(
                    "MAX_RATE_LIMIT_WAITS",
                    fetch_defaults.max_rate_limit_waits,
                ),
                max_concurrent_fetches: env_or(
                    "MAX_CONCURRENT_FETCHES",
                    fetch_defaults.max_concurrent_fetches,
                )
                .max(1),
                candle_cache_ttl: Duration::from_secs(env_or(
                    "CANDLE_CACHE_SECS",
                    fetch_defaults.candle_cache_ttl.as_secs(),
                )),
            },
            cache: CacheConfig {
                indicator_ttl: Duration::from_secs(env_or(
                    "INDICATOR_TTL_SECS",
                    cache_defaults.indicator_ttl.as_secs(),
                )),
                update_threshold: Duration::from_secs(env_or(
                    "UPDATE_THRESHOLD_SECS",
                    cache_defaults.update_threshold.as_secs(),
                )),
                sweep_interval: Duration::from_secs(
                    env_or("SWEEP_INTERVAL_SECS", cache_defaults.sweep_interval.as_secs()).max(1),
                ),
                force_update_on_start: env_flag(
                    "FORCE_UPDATE_ON_START",
                    cache_defaults.force_update_on_start,
                ),
            },
            population: PopulationConfig {
                batch_size: env_or("BATCH_SIZE", population_defaults.batch_size).max(1),
                concurrent_requests: env_or(
                    "CONCURRENT_REQUESTS",
                    population_defaults.concurrent_requests,
                )
                .max(1),
                timeframe_chunk: env_or("TIMEFRAME_CHUNK", population_defaults.timeframe_chunk)
                    .max(1),
                chunk_delay: Duration::from_millis(env_or(
                    "CHUNK_DELAY_MS",
                    population_defaults.chunk_delay.as_millis() as u64,
                )),
                batch_delay: Duration::from_millis(env_or(
                    "BATCH_DELAY_MS",
                    population_defaults.batch_delay.as_millis() as u64,
                )),
            },
            symbols: SymbolConfig {
                quote_asset: env::var("QUOTE_ASSET").unwrap_or(symbol_defaults.quote_asset),
                cache_ttl: Duration::from_secs(env_or(
                    "SYMBOLS_CACHE_SECS",
                    symbol_defaults.cache_ttl.as_secs(),
                )),
            },
        }
    }

    /// Orchestrator view of this configuration.
    pub fn orchestrator(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            cache: self.cache.clone(),
            population: self.population.clone(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
