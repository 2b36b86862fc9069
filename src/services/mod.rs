pub mod aggregator;
pub mod cache;
pub mod candle_cache;
pub mod clock;
pub mod orchestrator;
pub mod redis_store;
pub mod signals;
pub mod store;
pub mod symbols;

pub use aggregator::SnapshotAggregator;
pub use cache::Cache;
pub use candle_cache::CachedCandleSource;
pub use clock::{Clock, ManualClock, SystemClock};
pub use orchestrator::{CacheOrchestrator, CachedSnapshot, Freshness, PopulationReport};
pub use redis_store::RedisStore;
pub use signals::{scan_signals, SignalPolicy, StrengthPolicy, TallyPolicy};
pub use store::{indicator_key, MemoryStore, SnapshotStore};
pub use symbols::CachedDirectory;
