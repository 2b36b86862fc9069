use super::Timeframe;
use serde::{Deserialize, Serialize};

/// Periods of the ten tracked moving averages.
pub const MA_PERIODS: [usize; 5] = [10, 20, 50, 100, 200];

/// Retracement ratios, from the swing high down to the swing low.
pub const FIBONACCI_RATIOS: [f64; 7] = [0.0, 0.236, 0.382, 0.5, 0.618, 0.786, 1.0];

/// One MACD reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MacdPoint {
    pub macd: f64,
    pub signal: f64,
    pub histogram: f64,
}

/// Latest MACD reading plus up to two prior periods.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MacdValues {
    pub current: MacdPoint,
    pub previous1: Option<MacdPoint>,
    pub previous2: Option<MacdPoint>,
}

impl MacdValues {
    pub fn histogram(&self) -> f64 {
        self.current.histogram
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdxValues {
    pub adx: f64,
    pub plus_di: f64,
    pub minus_di: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BollingerValues {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

/// On-balance volume. The SMA needs more history than OBV itself.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObvValues {
    pub obv: f64,
    pub obv_sma: Option<f64>,
}

/// Retracement levels between a swing high and low.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FibonacciLevels {
    pub high: f64,
    pub low: f64,
    /// Prices matching `FIBONACCI_RATIOS`, index for index.
    pub levels: [f64; 7],
}

impl FibonacciLevels {
    pub fn from_range(high: f64, low: f64) -> Self {
        let diff = high - low;
        Self {
            high,
            low,
            levels: FIBONACCI_RATIOS.map(|ratio| high - diff * ratio),
        }
    }

    /// `(ratio, price)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        FIBONACCI_RATIOS.iter().copied().zip(self.levels.iter().copied())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IchimokuCloud {
    pub conversion: f64,
    pub base: f64,
    pub span_a: f64,
    pub span_b: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StochasticValues {
    pub k: f64,
    pub d: f64,
}

/// SMA and EMA of closes over `MA_PERIODS`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MovingAverages {
    pub sma: [Option<f64>; 5],
    pub ema: [Option<f64>; 5],
}

impl MovingAverages {
    pub fn sma(&self, period: usize) -> Option<f64> {
        Self::lookup(&self.sma, period)
    }

    pub fn ema(&self, period: usize) -> Option<f64> {
        Self::lookup(&self.ema, period)
    }

    /// All ten averages, SMAs first.
    pub fn all(&self) -> impl Iterator<Item = Option<f64>> + '_ {
        self.sma.iter().chain(self.ema.iter()).copied()
    }

    fn lookup(values: &[Option<f64>; 5], period: usize) -> Option<f64> {
        MA_PERIODS
            .iter()
            .position(|&p| p == period)
            .and_then(|idx| values[idx])
    }
}

/// Fast-over-slow comparisons. Undefined when either side is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Crossovers {
    pub ema_10_20: Option<bool>,
    pub ema_50_200: Option<bool>,
    pub sma_20_50: Option<bool>,
    pub sma_50_200: Option<bool>,
}

impl Crossovers {
    pub fn from_averages(averages: &MovingAverages) -> Self {
        let above = |fast: Option<f64>, slow: Option<f64>| Some(fast? > slow?);
        Self {
            ema_10_20: above(averages.ema(10), averages.ema(20)),
            ema_50_200: above(averages.ema(50), averages.ema(200)),
            sma_20_50: above(averages.sma(20), averages.sma(50)),
            sma_50_200: above(averages.sma(50), averages.sma(200)),
        }
    }

    pub fn all(&self) -> [Option<bool>; 4] {
        [
            self.ema_10_20,
            self.ema_50_200,
            self.sma_20_50,
            self.sma_50_200,
        ]
    }
}

/// Every indicator for one (symbol, timeframe), computed from one candle series.
///
/// Each indicator group is `None` when the series was too short for it. The
/// two counters are always present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndicatorSnapshot {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub price: f64,
    /// Unix milliseconds.
    pub computed_at: i64,
    pub rsi: Option<f64>,
    pub macd: Option<MacdValues>,
    pub averages: MovingAverages,
    pub crossovers: Crossovers,
    pub adx: Option<AdxValues>,
    pub vwap: Option<f64>,
    pub bollinger_bands: Option<BollingerValues>,
    pub obv: Option<ObvValues>,
    pub fibonacci: Option<FibonacciLevels>,
    pub cmf: Option<f64>,
    pub ichimoku: Option<IchimokuCloud>,
    pub atr: Option<f64>,
    pub stochastic: Option<StochasticValues>,
    pub moving_averages: i32,
    pub oscillators: i32,
}

impl IndicatorSnapshot {
    /// A snapshot with a price and nothing else.
    pub fn empty(symbol: impl Into<String>, timeframe: Timeframe, price: f64) -> Self {
        Self {
            symbol: symbol.into(),
            timeframe,
            price,
            computed_at: 0,
            rsi: None,
            macd: None,
            averages: MovingAverages::default(),
            crossovers: Crossovers::default(),
            adx: None,
            vwap: None,
            bollinger_bands: None,
            obv: None,
            fibonacci: None,
            cmf: None,
            ichimoku: None,
            atr: None,
            stochastic: None,
            moving_averages: 0,
            oscillators: 0,
        }
    }

    pub fn macd_histogram(&self) -> Option<f64> {
        self.macd.map(|m| m.histogram())
    }
}
