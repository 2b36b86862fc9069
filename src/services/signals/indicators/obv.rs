//! On-Balance Volume (OBV) indicator.

use super::{sma_last, Indicator};
use crate::types::{Candle, ObvValues};

/// OBV (On-Balance Volume) indicator.
///
/// Running sum of volume: added on an up close, subtracted on a down close,
/// unchanged when the close repeats. The SMA is taken over the running values
/// and stays undefined until `sma_period` of them exist.
pub struct Obv {
    sma_period: usize,
}

impl Default for Obv {
    fn default() -> Self {
        Self { sma_period: 9 }
    }
}

impl Obv {
    fn running(candles: &[Candle]) -> Vec<f64> {
        let mut obv = 0.0;
        candles
            .windows(2)
            .map(|w| {
                if w[1].close > w[0].close {
                    obv += w[1].volume;
                } else if w[1].close < w[0].close {
                    obv -= w[1].volume;
                }
                obv
            })
            .collect()
    }
}

impl Indicator for Obv {
    type Output = ObvValues;

    fn id(&self) -> &str {
        "obv"
    }

    fn min_periods(&self) -> usize {
        2
    }

    fn calculate(&self, candles: &[Candle]) -> Option<ObvValues> {
        if candles.len() < self.min_periods() {
            return None;
        }

        let values = Self::running(candles);
        let obv = *values.last()?;

        Some(ObvValues {
            obv,
            obv_sma: sma_last(&values, self.sma_period),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::signals::indicators::test_support::*;

    #[test]
    fn test_obv_min_periods() {
        let obv = Obv::default();
        assert!(obv.calculate(&create_uptrend_candles(1)).is_none());
        let two = obv.calculate(&create_uptrend_candles(2)).unwrap();
        assert_eq!(two.obv, 1000.0);
        assert!(two.obv_sma.is_none());
    }

    #[test]
    fn test_obv_sma_needs_nine_values() {
        let obv = Obv::default();
        assert!(obv
            .calculate(&create_uptrend_candles(9))
            .unwrap()
            .obv_sma
            .is_none());
        // 10 bars -> 9 running values: 1000..9000
        let values = obv.calculate(&create_uptrend_candles(10)).unwrap();
        assert_eq!(values.obv, 9000.0);
        assert_eq!(values.obv_sma, Some(5000.0));
    }

    #[test]
    fn test_obv_downtrend_negative() {
        let values = Obv::default()
            .calculate(&create_downtrend_candles(20))
            .unwrap();
        assert_eq!(values.obv, -19000.0);
    }

    #[test]
    fn test_obv_flat_series_zero() {
        let values = Obv::default()
            .calculate(&create_flat_candles(30, 3.0))
            .unwrap();
        assert_eq!(values.obv, 0.0);
        assert_eq!(values.obv_sma, Some(0.0));
    }
}
