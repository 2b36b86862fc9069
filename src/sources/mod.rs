pub mod binance;
pub mod retry;

pub use binance::BinanceClient;
pub use retry::{Attempt, RetryPolicy};

use crate::error::Result;
use crate::types::{CandleSeries, Timeframe};
use async_trait::async_trait;

/// Parameters of one kline fetch.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CandleRequest {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub start_time: Option<i64>,
    pub end_time: Option<i64>,
}

impl CandleRequest {
    /// Most recent bars.
    pub fn latest(symbol: &str, timeframe: Timeframe) -> Self {
        Self {
            symbol: symbol.to_string(),
            timeframe,
            start_time: None,
            end_time: None,
        }
    }

    /// Bars up to and including `end_time` (ms).
    pub fn ending_at(symbol: &str, timeframe: Timeframe, end_time: i64) -> Self {
        Self {
            end_time: Some(end_time),
            ..Self::latest(symbol, timeframe)
        }
    }

    /// Memoisation key: `symbol:interval:start:end`.
    pub fn cache_key(&self) -> String {
        let bound = |t: Option<i64>| t.map(|v| v.to_string()).unwrap_or_default();
        format!(
            "{}:{}:{}:{}",
            self.symbol,
            self.timeframe,
            bound(self.start_time),
            bound(self.end_time)
        )
    }
}

/// Upstream supplier of candle series.
#[async_trait]
pub trait CandleSource: Send + Sync {
    /// Ordered bars for the request. Upstream trouble surfaces as
    /// `AppError::DataUnavailable`.
    async fn get_candles(&self, request: &CandleRequest) -> Result<CandleSeries>;
}

/// Upstream list of tradable symbols.
#[async_trait]
pub trait SymbolDirectory: Send + Sync {
    async fn symbols(&self) -> Result<Vec<String>>;
}
