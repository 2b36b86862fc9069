//! Exponential Moving Average (EMA) indicator.

use super::{closes, ema_series, Indicator};
use crate::types::Candle;

/// EMA of closes, seeded with the SMA of the first `period` closes.
///
/// One bar beyond the seed window is required so the value has seen at least
/// one exponential update.
pub struct Ema {
    period: usize,
}

impl Ema {
    pub fn new(period: usize) -> Self {
        Self { period }
    }
}

impl Indicator for Ema {
    type Output = f64;

    fn id(&self) -> &str {
        "ema"
    }

    fn min_periods(&self) -> usize {
        self.period + 1
    }

    fn calculate(&self, candles: &[Candle]) -> Option<f64> {
        if candles.len() < self.min_periods() {
            return None;
        }
        ema_series(&closes(candles), self.period).last().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::signals::indicators::test_support::*;

    #[test]
    fn test_ema_min_periods() {
        let ema = Ema::new(10);
        assert_eq!(ema.min_periods(), 11);
        assert!(ema.calculate(&create_uptrend_candles(10)).is_none());
        assert!(ema.calculate(&create_uptrend_candles(11)).is_some());
    }

    #[test]
    fn test_ema_lags_uptrend() {
        let candles = create_uptrend_candles(100);
        let ema = Ema::new(20).calculate(&candles).unwrap();
        let last = candles.last().unwrap().close;
        assert!(ema < last);
        assert!(ema > candles[79].close);
    }

    #[test]
    fn test_ema_seed_then_update() {
        // closes 101, 102.5, 104; seed = 101.75, k = 2/3
        let candles = create_uptrend_candles(3);
        let ema = Ema::new(2).calculate(&candles).unwrap();
        assert!((ema - (101.75 + (104.0 - 101.75) * 2.0 / 3.0)).abs() < 1e-12);
    }

    #[test]
    fn test_ema_flat_series() {
        let candles = create_flat_candles(30, 42.0);
        let ema = Ema::new(10).calculate(&candles).unwrap();
        assert!((ema - 42.0).abs() < 1e-12);
    }
}
