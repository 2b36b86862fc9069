//! Volume Weighted Average Price (VWAP) indicator.

use super::Indicator;
use crate::types::Candle;

/// Cumulative typical-price VWAP over the whole series.
#[derive(Default)]
pub struct Vwap;

impl Indicator for Vwap {
    type Output = f64;

    fn id(&self) -> &str {
        "vwap"
    }

    fn min_periods(&self) -> usize {
        1
    }

    fn calculate(&self, candles: &[Candle]) -> Option<f64> {
        let (price_volume, volume) = candles.iter().fold((0.0, 0.0), |(pv, v), c| {
            (pv + c.typical_price() * c.volume, v + c.volume)
        });

        if volume == 0.0 {
            return None;
        }
        Some(price_volume / volume)
    }
}
