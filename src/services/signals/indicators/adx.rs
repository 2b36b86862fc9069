//! Average Directional Index (ADX) indicator.

use super::{wilder_sum, Indicator};
use crate::types::{AdxValues, Candle};

/// ADX (Average Directional Index) indicator.
///
/// True range and directional movement are smoothed with Wilder's running
/// sum. +DI and -DI are the smoothed movements as a percentage of smoothed
/// true range; the reported `adx` is the directional index (DX) of the latest
/// smoothed values:
/// - Below 20: Weak trend / ranging market
/// - 20-40: Trending
/// - Above 40: Strong trend
pub struct Adx {
    period: usize,
}

impl Default for Adx {
    fn default() -> Self {
        Self { period: 14 }
    }
}

impl Adx {
    pub fn new(period: usize) -> Self {
        Self { period }
    }

    /// (+DM, -DM) between two bars.
    fn directional_movement(current: &Candle, previous: &Candle) -> (f64, f64) {
        let up_move = current.high - previous.high;
        let down_move = previous.low - current.low;

        let plus_dm = if up_move > down_move && up_move > 0.0 {
            up_move
        } else {
            0.0
        };
        let minus_dm = if down_move > up_move && down_move > 0.0 {
            down_move
        } else {
            0.0
        };
        (plus_dm, minus_dm)
    }
}

impl Indicator for Adx {
    type Output = AdxValues;

    fn id(&self) -> &str {
        "adx"
    }

    fn min_periods(&self) -> usize {
        self.period + 1
    }

    fn calculate(&self, candles: &[Candle]) -> Option<AdxValues> {
        if self.period == 0 || candles.len() < self.min_periods() {
            return None;
        }

        let mut tr = Vec::with_capacity(candles.len() - 1);
        let mut plus_dm = Vec::with_capacity(candles.len() - 1);
        let mut minus_dm = Vec::with_capacity(candles.len() - 1);

        for w in candles.windows(2) {
            let (plus, minus) = Self::directional_movement(&w[1], &w[0]);
            tr.push(w[1].true_range(&w[0]));
            plus_dm.push(plus);
            minus_dm.push(minus);
        }

        let smoothed_tr = wilder_sum(&tr, self.period)?;
        if smoothed_tr == 0.0 {
            return None;
        }
        let smoothed_plus = wilder_sum(&plus_dm, self.period)?;
        let smoothed_minus = wilder_sum(&minus_dm, self.period)?;

        let plus_di = smoothed_plus / smoothed_tr * 100.0;
        let minus_di = smoothed_minus / smoothed_tr * 100.0;
        let di_sum = plus_di + minus_di;
        let adx = if di_sum > 0.0 {
            (plus_di - minus_di).abs() / di_sum * 100.0
        } else {
            0.0
        };

        Some(AdxValues {
            adx,
            plus_di,
            minus_di,
        })
    }
}
