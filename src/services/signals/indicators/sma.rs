//! Simple Moving Average (SMA) indicator.

use super::{sma_last, Indicator};
use crate::types::Candle;

/// Mean of the last `period` closes.
pub struct Sma {
    period: usize,
}

impl Sma {
    pub fn new(period: usize) -> Self {
        Self { period }
    }
}

impl Indicator for Sma {
    type Output = f64;

    fn id(&self) -> &str {
        "sma"
    }

    fn min_periods(&self) -> usize {
        self.period
    }

    fn calculate(&self, candles: &[Candle]) -> Option<f64> {
        if candles.len() < self.min_periods() {
            return None;
        }
        let window = &candles[candles.len() - self.period..];
        let closes: Vec<f64> = window.iter().map(|c| c.close).collect();
        sma_last(&closes, self.period)
    }
}
