//! MACD (Moving Average Convergence Divergence) indicator.

use super::{closes, ema_series, Indicator};
use crate::types::{Candle, MacdPoint, MacdValues};

/// MACD indicator.
///
/// Shows the relationship between two EMAs:
/// - MACD Line = EMA(12) - EMA(26)
/// - Signal Line = EMA(9) of MACD Line
/// - Histogram = MACD Line - Signal Line
///
/// The two readings before the latest are kept for crossover checks.
pub struct Macd {
    fast_period: usize,
    slow_period: usize,
    signal_period: usize,
}

impl Default for Macd {
    fn default() -> Self {
        Self {
            fast_period: 12,
            slow_period: 26,
            signal_period: 9,
        }
    }
}

impl Macd {
    /// Full (macd, signal, histogram) series, oldest first.
    fn points(&self, closes: &[f64]) -> Vec<MacdPoint> {
        let fast_ema = ema_series(closes, self.fast_period);
        let slow_ema = ema_series(closes, self.slow_period);
        if slow_ema.is_empty() {
            return Vec::new();
        }

        // Align the EMAs (fast starts earlier)
        let offset = self.slow_period - self.fast_period;
        let macd_line: Vec<f64> = fast_ema
            .iter()
            .skip(offset)
            .zip(&slow_ema)
            .map(|(f, s)| f - s)
            .collect();

        let signal_line = ema_series(&macd_line, self.signal_period);
        let lead = self.signal_period - 1;

        signal_line
            .iter()
            .zip(&macd_line[lead..])
            .map(|(&signal, &macd)| MacdPoint {
                macd,
                signal,
                histogram: macd - signal,
            })
            .collect()
    }
}

impl Indicator for Macd {
    type Output = MacdValues;

    fn id(&self) -> &str {
        "macd"
    }

    fn min_periods(&self) -> usize {
        self.slow_period + self.signal_period
    }

    fn calculate(&self, candles: &[Candle]) -> Option<MacdValues> {
        if candles.len() < self.min_periods() {
            return None;
        }

        let points = self.points(&closes(candles));
        let mut recent = points.iter().rev().copied();
        let current = recent.next()?;

        Some(MacdValues {
            current,
            previous1: recent.next(),
            previous2: recent.next(),
        })
    }
}
