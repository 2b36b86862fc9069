//! Ichimoku Cloud indicator.

use super::{high_low, Indicator};
use crate::types::{Candle, IchimokuCloud};

/// Ichimoku lines from the latest bars, without forward displacement.
pub struct Ichimoku {
    conversion_period: usize,
    base_period: usize,
    span_b_period: usize,
}

impl Default for Ichimoku {
    fn default() -> Self {
        Self {
            conversion_period: 9,
            base_period: 26,
            span_b_period: 52,
        }
    }
}

impl Ichimoku {
    fn midpoint(candles: &[Candle], period: usize) -> f64 {
        let (high, low) = high_low(&candles[candles.len() - period..]);
        (high + low) / 2.0
    }
}

impl Indicator for Ichimoku {
    type Output = IchimokuCloud;

    fn id(&self) -> &str {
        "ichimoku"
    }

    fn min_periods(&self) -> usize {
        self.span_b_period
            .max(self.base_period)
            .max(self.conversion_period)
    }

    fn calculate(&self, candles: &[Candle]) -> Option<IchimokuCloud> {
        if candles.len() < self.min_periods() {
            return None;
        }

        let conversion = Self::midpoint(candles, self.conversion_period);
        let base = Self::midpoint(candles, self.base_period);

        Some(IchimokuCloud {
            conversion,
            base,
            span_a: (conversion + base) / 2.0,
            span_b: Self::midpoint(candles, self.span_b_period),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::signals::indicators::test_support::*;

    #[test]
    fn test_ichimoku_min_periods() {
        let ichimoku = Ichimoku::default();
        assert_eq!(ichimoku.min_periods(), 52);
        assert!(ichimoku.calculate(&create_uptrend_candles(51)).is_none());
        assert!(ichimoku.calculate(&create_uptrend_candles(52)).is_some());
    }

    #[test]
    fn test_ichimoku_uptrend_alignment() {
        let cloud = Ichimoku::default()
            .calculate(&create_uptrend_candles(80))
            .unwrap();
        assert!(cloud.conversion > cloud.base);
        assert!(cloud.base > cloud.span_b);
        assert!(cloud.span_a > cloud.span_b);
    }

    #[test]
    fn test_ichimoku_flat_series() {
        let cloud = Ichimoku::default()
            .calculate(&create_flat_candles(60, 20.0))
            .unwrap();
        assert_eq!(cloud.conversion, 20.0);
        assert_eq!(cloud.span_a, 20.0);
        assert_eq!(cloud.span_b, 20.0);
    }
}
