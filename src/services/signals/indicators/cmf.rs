//! Chaikin Money Flow (CMF) indicator.

use super::Indicator;
use crate::types::Candle;

/// Sum of money-flow volume over sum of volume for the last `period` bars.
///
/// Bars with no range have no defined multiplier and are left out of both
/// sums.
pub struct Cmf {
    period: usize,
}

impl Default for Cmf {
    fn default() -> Self {
        Self { period: 20 }
    }
}

impl Cmf {
    pub fn new(period: usize) -> Self {
        Self { period }
    }

    fn money_flow_multiplier(candle: &Candle) -> Option<f64> {
        let range = candle.high - candle.low;
        if range == 0.0 {
            return None;
        }
        Some(((candle.close - candle.low) - (candle.high - candle.close)) / range)
    }
}

impl Indicator for Cmf {
    type Output = f64;

    fn id(&self) -> &str {
        "cmf"
    }

    fn min_periods(&self) -> usize {
        self.period
    }

    fn calculate(&self, candles: &[Candle]) -> Option<f64> {
        if self.period == 0 || candles.len() < self.period {
            return None;
        }

        let (flow, volume) = candles[candles.len() - self.period..]
            .iter()
            .filter_map(|c| Self::money_flow_multiplier(c).map(|mfm| (mfm * c.volume, c.volume)))
            .fold((0.0, 0.0), |(f, v), (mfv, vol)| (f + mfv, v + vol));

        if volume == 0.0 {
            return None;
        }
        Some(flow / volume)
    }
}
