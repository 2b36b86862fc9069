//! Tally/threshold policy.

use super::SignalPolicy;
use crate::services::aggregator::{moving_average_score, oscillator_score};
use crate::types::{IndicatorSnapshot, Signal, Tally, TallySignal};
use chrono::{DateTime, Utc};

/// Distance from a Fibonacci level, as a fraction of price, that counts as "at" it.
const FIBONACCI_PROXIMITY: f64 = 0.001;

/// Fuller counters: the aggregator's two counters plus trend, volume, band
/// and Fibonacci points, and the four crossovers.
pub fn full_tally(snapshot: &IndicatorSnapshot) -> Tally {
    let price = snapshot.price;
    let mut oscillators = oscillator_score(snapshot.rsi, snapshot.macd_histogram());

    if let Some(adx) = snapshot.adx {
        if adx.adx > 25.0 && adx.plus_di > adx.minus_di {
            oscillators += 1;
        }
    }

    if matches!(snapshot.vwap, Some(vwap) if price > vwap) {
        oscillators += 1;
    }

    if let Some(bands) = snapshot.bollinger_bands {
        if price <= bands.lower || price > bands.middle {
            oscillators += 1;
        }
    }

    if let Some(obv) = snapshot.obv {
        if matches!(obv.obv_sma, Some(sma) if obv.obv > sma) {
            oscillators += 1;
        }
    }

    if let Some(fib) = snapshot.fibonacci {
        if fib
            .levels
            .iter()
            .any(|level| (price - level).abs() < price * FIBONACCI_PROXIMITY)
        {
            oscillators += 2;
        }
    }

    // an undefined cross counts as bearish
    let crossovers: i32 = snapshot
        .crossovers
        .all()
        .iter()
        .map(|c| if *c == Some(true) { 1 } else { -1 })
        .sum();

    Tally {
        moving_averages: moving_average_score(price, &snapshot.averages) + crossovers,
        oscillators,
    }
}

/// Emits `Buy`, `Sell` or `trending` only when a rule matches.
///
/// Needs RSI, the MACD histogram and both OBV values; other groups are used
/// when present.
#[derive(Debug, Default, Clone, Copy)]
pub struct TallyPolicy;

impl TallyPolicy {
    fn classify(
        snapshot: &IndicatorSnapshot,
        rsi: f64,
        histogram: f64,
        tally: &Tally,
    ) -> Option<TallySignal> {
        let price = snapshot.price;

        if let Some(bands) = snapshot.bollinger_bands {
            if histogram > 0.0 && price < bands.middle && rsi <= 1.0 {
                return Some(TallySignal::Buy);
            }
            if price > bands.middle && price < bands.upper && rsi >= 99.0 {
                return Some(TallySignal::Sell);
            }
        }

        if tally.moving_averages > 12 && rsi < 60.0 && histogram > 0.0 {
            return Some(TallySignal::Trending);
        }
        None
    }
}

impl SignalPolicy for TallyPolicy {
    type Class = TallySignal;

    fn id(&self) -> &str {
        "tally"
    }

    fn evaluate(
        &self,
        snapshot: &IndicatorSnapshot,
        evaluated_at: DateTime<Utc>,
    ) -> Option<Signal<TallySignal>> {
        let rsi = snapshot.rsi?;
        let histogram = snapshot.macd_histogram()?;
        if snapshot.obv.and_then(|o| o.obv_sma).is_none() {
            return None;
        }

        let tally = full_tally(snapshot);
        let class = Self::classify(snapshot, rsi, histogram, &tally)?;

        Some(Signal::new(class, tally.oscillators, snapshot, evaluated_at).with_tally(tally))
    }
}
