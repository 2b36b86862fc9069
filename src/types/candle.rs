use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// One OHLCV bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candle {
    pub open_time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub close_time: i64,
}

impl Candle {
    /// (high + low + close) / 3.
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }

    /// Largest of high-low and the gaps against the previous close.
    pub fn true_range(&self, previous: &Candle) -> f64 {
        let hl = self.high - self.low;
        let hc = (self.high - previous.close).abs();
        let lc = (self.low - previous.close).abs();
        hl.max(hc).max(lc)
    }

    /// Parse one upstream kline row.
    ///
    /// Rows are positional arrays: open time, open, high, low, close, volume,
    /// then an optional close time. Numbers may arrive as JSON numbers or as
    /// numeric strings. Anything shorter or non-numeric yields `None`.
    pub fn from_row(row: &Value) -> Option<Self> {
        let fields = row.as_array()?;
        if fields.len() < 6 {
            return None;
        }

        let open_time = parse_number(&fields[0])? as i64;
        let close_time = fields
            .get(6)
            .and_then(parse_number)
            .map(|t| t as i64)
            .unwrap_or(open_time);

        Some(Self {
            open_time,
            open: parse_number(&fields[1])?,
            high: parse_number(&fields[2])?,
            low: parse_number(&fields[3])?,
            close: parse_number(&fields[4])?,
            volume: parse_number(&fields[5])?,
            close_time,
        })
    }
}

fn parse_number(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

/// Ordered, immutable run of valid bars. Cloning shares the underlying buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct CandleSeries {
    bars: Arc<[Candle]>,
}

impl Default for CandleSeries {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl CandleSeries {
    pub fn new(bars: Vec<Candle>) -> Self {
        Self { bars: bars.into() }
    }

    /// Build a series from raw kline rows, dropping malformed ones.
    pub fn from_rows(rows: &[Value]) -> Self {
        let bars: Vec<Candle> = rows.iter().filter_map(Candle::from_row).collect();
        let dropped = rows.len() - bars.len();
        if dropped > 0 {
            debug!("Dropped {} malformed kline rows of {}", dropped, rows.len());
        }
        Self::new(bars)
    }

    pub fn bars(&self) -> &[Candle] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Close of the last bar. Requires at least two bars.
    pub fn last_price(&self) -> Option<f64> {
        if self.bars.len() < 2 {
            return None;
        }
        self.bars.last().map(|c| c.close)
    }
}

impl From<Vec<Candle>> for CandleSeries {
    fn from(bars: Vec<Candle>) -> Self {
        Self::new(bars)
    }
}
