//! Technical indicator implementations.
//!
//! Every indicator is a small struct holding its periods. `calculate` returns
//! `None` when the series is shorter than `min_periods()` or when the maths is
//! undefined for the input (zero volume, zero range), never an error.

pub mod adx;
pub mod atr;
pub mod bollinger;
pub mod cmf;
pub mod ema;
pub mod fibonacci;
pub mod ichimoku;
pub mod macd;
pub mod obv;
pub mod rsi;
pub mod sma;
pub mod stochastic;
pub mod vwap;

pub use adx::Adx;
pub use atr::Atr;
pub use bollinger::BollingerBands;
pub use cmf::Cmf;
pub use ema::Ema;
pub use fibonacci::Fibonacci;
pub use ichimoku::Ichimoku;
pub use macd::Macd;
pub use obv::Obv;
pub use rsi::Rsi;
pub use sma::Sma;
pub use stochastic::Stochastic;
pub use vwap::Vwap;

use crate::types::Candle;

/// A pure function of a candle series.
pub trait Indicator: Send + Sync {
    type Output;

    /// Short identifier used in logs.
    fn id(&self) -> &str;

    /// Bars required before `calculate` can return a value.
    fn min_periods(&self) -> usize;

    fn calculate(&self, candles: &[Candle]) -> Option<Self::Output>;
}

/// Closing prices, in order.
pub(crate) fn closes(candles: &[Candle]) -> Vec<f64> {
    candles.iter().map(|c| c.close).collect()
}

/// Mean of the last `period` values.
pub(crate) fn sma_last(values: &[f64], period: usize) -> Option<f64> {
    if period == 0 || values.len() < period {
        return None;
    }
    let window = &values[values.len() - period..];
    Some(window.iter().sum::<f64>() / period as f64)
}

/// EMA series seeded with the SMA of the first `period` values.
///
/// Element `i` of the result lines up with `values[period - 1 + i]`.
pub(crate) fn ema_series(values: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || values.len() < period {
        return Vec::new();
    }

    let multiplier = 2.0 / (period as f64 + 1.0);
    let mut ema = Vec::with_capacity(values.len() - period + 1);
    let mut current = values[..period].iter().sum::<f64>() / period as f64;
    ema.push(current);

    for value in &values[period..] {
        current = (value - current) * multiplier + current;
        ema.push(current);
    }

    ema
}

/// Wilder running sum: seeded by the plain sum of the first `period` values,
/// then `s = s - s / period + x`. Returns the final smoothed value.
pub(crate) fn wilder_sum(values: &[f64], period: usize) -> Option<f64> {
    if period == 0 || values.len() < period {
        return None;
    }
    let mut smoothed: f64 = values[..period].iter().sum();
    for value in &values[period..] {
        smoothed = smoothed - smoothed / period as f64 + value;
    }
    Some(smoothed)
}

/// Highest high and lowest low over a window.
pub(crate) fn high_low(window: &[Candle]) -> (f64, f64) {
    window.iter().fold(
        (f64::NEG_INFINITY, f64::INFINITY),
        |(high, low), c| (high.max(c.high), low.min(c.low)),
    )
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sma_last_window() {
        assert_eq!(sma_last(&[1.0, 2.0, 3.0, 4.0], 2), Some(3.5));
        assert_eq!(sma_last(&[1.0], 2), None);
        assert_eq!(sma_last(&[1.0], 0), None);
    }

    #[test]
    fn test_ema_series_seeded_by_sma() {
        let ema = ema_series(&[2.0, 4.0, 6.0, 8.0], 3);
        assert_eq!(ema.len(), 2);
        assert_eq!(ema[0], 4.0);
        assert_eq!(ema[1], 6.0);
    }

    #[test]
    fn test_wilder_sum_recurrence() {
        // seed 6, then 6 - 2 + 3 = 7
        assert_eq!(wilder_sum(&[1.0, 2.0, 3.0, 3.0], 3), Some(7.0));
        assert_eq!(wilder_sum(&[1.0, 2.0], 3), None);
    }
}
