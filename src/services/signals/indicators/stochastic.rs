//! Stochastic Oscillator indicator.

use super::{high_low, Indicator};
use crate::types::{Candle, StochasticValues};

/// Stochastic Oscillator.
///
/// Compares closing price to price range over a period:
/// %K = (Current Close - Lowest Low) / (Highest High - Lowest Low) * 100
/// %D = SMA(3) of %K
///
/// A window with no range reads 50.
pub struct Stochastic {
    k_period: usize,
    d_period: usize,
}

impl Default for Stochastic {
    fn default() -> Self {
        Self {
            k_period: 14,
            d_period: 3,
        }
    }
}

impl Indicator for Stochastic {
    type Output = StochasticValues;

    fn id(&self) -> &str {
        "stochastic"
    }

    fn min_periods(&self) -> usize {
        self.k_period + self.d_period
    }

    fn calculate(&self, candles: &[Candle]) -> Option<StochasticValues> {
        if self.k_period == 0 || self.d_period == 0 || candles.len() < self.min_periods() {
            return None;
        }

        let k_values: Vec<f64> = candles
            .windows(self.k_period)
            .map(|window| {
                let (highest_high, lowest_low) = high_low(window);
                let close = window[window.len() - 1].close;
                if highest_high != lowest_low {
                    ((close - lowest_low) / (highest_high - lowest_low) * 100.0).clamp(0.0, 100.0)
                } else {
                    50.0
                }
            })
            .collect();

        let k = *k_values.last()?;
        let d = k_values[k_values.len() - self.d_period..].iter().sum::<f64>()
            / self.d_period as f64;

        Some(StochasticValues { k, d })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::signals::indicators::test_support::*;

    #[test]
    fn test_stochastic_min_periods() {
        let stoch = Stochastic::default();
        assert_eq!(stoch.min_periods(), 17);
        assert!(stoch.calculate(&create_uptrend_candles(16)).is_none());
        assert!(stoch.calculate(&create_uptrend_candles(17)).is_some());
    }

    #[test]
    fn test_stochastic_reference_values() {
        let values = Stochastic::default()
            .calculate(&create_reference_candles())
            .unwrap();
        assert!((values.k - 76.536312849162).abs() < 1e-9, "{:?}", values);
        assert!((values.d - 52.832624778777).abs() < 1e-9, "{:?}", values);
    }

    #[test]
    fn test_stochastic_range() {
        for candles in [
            create_uptrend_candles(40),
            create_downtrend_candles(40),
            create_reference_candles(),
        ] {
            let values = Stochastic::default().calculate(&candles).unwrap();
            assert!((0.0..=100.0).contains(&values.k));
            assert!((0.0..=100.0).contains(&values.d));
        }
    }

    #[test]
    fn test_stochastic_zero_range_defaults_to_fifty() {
        let candles: Vec<Candle> = (0..20).map(|i| candle(i, 3.0, 3.0, 3.0, 3.0, 1.0)).collect();
        let values = Stochastic::default().calculate(&candles).unwrap();
        assert_eq!(values.k, 50.0);
        assert_eq!(values.d, 50.0);
    }
}
