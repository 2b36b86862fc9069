use thiserror::Error;

/// Application error types.
#[derive(Error, Debug)]
pub enum AppError {
    /// Upstream fetch failed after exhausting retries, or the region is blocked.
    #[error("Data unavailable: {0}")]
    DataUnavailable(String),

    /// Upstream asked us to slow down.
    #[error("Rate limited: retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    /// Too few valid bars to derive the snapshot price.
    #[error("Insufficient data for {symbol} {timeframe}: {bars} valid bars")]
    InsufficientData {
        symbol: String,
        timeframe: String,
        bars: usize,
    },

    #[error("Invalid timeframe: {0}")]
    InvalidTimeframe(String),

    /// A snapshot store command failed.
    #[error("Store error: {0}")]
    Store(String),

    /// Startup dependency unreachable. Population must not begin.
    #[error("Fatal: {0}")]
    Fatal(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),

    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),

    #[error(transparent)]
    Redis(#[from] redis::RedisError),
}

impl AppError {
    /// Whether this failure should be treated as "no data" by callers.
    pub fn is_data_unavailable(&self) -> bool {
        matches!(
            self,
            AppError::DataUnavailable(_) | AppError::RateLimited { .. } | AppError::Reqwest(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
