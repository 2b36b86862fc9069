//! Fibonacci retracement levels.

use super::{high_low, Indicator};
use crate::types::{Candle, FibonacciLevels};

/// Retracement levels between the highest high and lowest low of the last
/// `period` bars.
pub struct Fibonacci {
    period: usize,
}

impl Default for Fibonacci {
    fn default() -> Self {
        Self { period: 20 }
    }
}

impl Fibonacci {
    pub fn new(period: usize) -> Self {
        Self { period }
    }
}

impl Indicator for Fibonacci {
    type Output = FibonacciLevels;

    fn id(&self) -> &str {
        "fibonacci"
    }

    fn min_periods(&self) -> usize {
        self.period
    }

    fn calculate(&self, candles: &[Candle]) -> Option<FibonacciLevels> {
        if self.period == 0 || candles.len() < self.period {
            return None;
        }
        let (high, low) = high_low(&candles[candles.len() - self.period..]);
        Some(FibonacciLevels::from_range(high, low))
    }
}
