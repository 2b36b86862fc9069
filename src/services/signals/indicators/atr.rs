//! Average True Range (ATR) indicator.

use super::Indicator;
use crate::types::Candle;

/// Wilder average true range.
///
/// Seeded with the mean of the first `period` true ranges, then smoothed with
/// `atr = (atr * (period - 1) + tr) / period`.
pub struct Atr {
    period: usize,
}

impl Default for Atr {
    fn default() -> Self {
        Self { period: 14 }
    }
}

impl Atr {
    pub fn new(period: usize) -> Self {
        Self { period }
    }
}

impl Indicator for Atr {
    type Output = f64;

    fn id(&self) -> &str {
        "atr"
    }

    fn min_periods(&self) -> usize {
        self.period + 1
    }

    fn calculate(&self, candles: &[Candle]) -> Option<f64> {
        if self.period == 0 || candles.len() < self.min_periods() {
            return None;
        }

        let true_ranges: Vec<f64> = candles
            .windows(2)
            .map(|w| w[1].true_range(&w[0]))
            .collect();

        let period = self.period as f64;
        let seed = true_ranges[..self.period].iter().sum::<f64>() / period;
        let atr = true_ranges[self.period..]
            .iter()
            .fold(seed, |atr, tr| (atr * (period - 1.0) + tr) / period);

        Some(atr)
    }
}
