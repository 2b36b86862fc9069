//! Strength-sum policy.
//!
//! Every factor must be defined before anything is scored. A snapshot with a
//! single missing field is reported as `NEUTRAL` with strength 0.

use super::SignalPolicy;
use crate::types::{
    AdxValues, BollingerValues, IchimokuCloud, IndicatorSnapshot, MacdPoint, Signal, SignalType,
    StochasticValues,
};
use chrono::{DateTime, Utc};

const BUY_THRESHOLD: i32 = 5;
const SELL_THRESHOLD: i32 = -5;

/// Fully defined view of a snapshot.
struct Factors {
    price: f64,
    rsi: f64,
    macd: MacdPoint,
    smas: [f64; 5],
    emas: [f64; 5],
    adx: AdxValues,
    vwap: f64,
    bands: BollingerValues,
    obv: f64,
    obv_sma: f64,
    cmf: f64,
    cloud: IchimokuCloud,
    atr: f64,
    stochastic: StochasticValues,
}

fn all_defined(values: [Option<f64>; 5]) -> Option<[f64; 5]> {
    let mut out = [0.0; 5];
    for (slot, value) in out.iter_mut().zip(values) {
        *slot = value?;
    }
    Some(out)
}

impl Factors {
    fn gather(snapshot: &IndicatorSnapshot) -> Option<Self> {
        let obv = snapshot.obv?;
        Some(Self {
            price: snapshot.price,
            rsi: snapshot.rsi?,
            macd: snapshot.macd?.current,
            smas: all_defined(snapshot.averages.sma)?,
            emas: all_defined(snapshot.averages.ema)?,
            adx: snapshot.adx?,
            vwap: snapshot.vwap?,
            bands: snapshot.bollinger_bands?,
            obv: obv.obv,
            obv_sma: obv.obv_sma?,
            cmf: snapshot.cmf?,
            cloud: snapshot.ichimoku?,
            atr: snapshot.atr?,
            stochastic: snapshot.stochastic?,
        })
    }

    fn strength(&self) -> i32 {
        let price = self.price;
        let mut strength = 0;

        if self.rsi <= 30.0 {
            strength += 2;
        } else if self.rsi >= 70.0 {
            strength -= 2;
        }

        if self.macd.histogram > 0.0 {
            strength += 2;
        } else if self.macd.histogram < 0.0 {
            strength -= 2;
        }

        strength += unanimity(price, &self.smas);
        strength += unanimity(price, &self.emas);

        if self.adx.adx > 25.0 {
            if self.adx.plus_di > self.adx.minus_di {
                strength += 1;
            } else if self.adx.minus_di > self.adx.plus_di {
                strength -= 1;
            }
        }

        if price > self.vwap {
            strength += 1;
        } else if price < self.vwap {
            strength -= 1;
        }

        if price < self.bands.lower {
            strength += 1;
        } else if price > self.bands.upper {
            strength -= 1;
        }

        if self.obv > self.obv_sma {
            strength += 1;
        } else if self.obv < self.obv_sma {
            strength -= 1;
        }

        if self.cmf > 0.0 {
            strength += 1;
        } else if self.cmf < 0.0 {
            strength -= 1;
        }

        let cloud = &self.cloud;
        if price > cloud.conversion
            && price > cloud.base
            && cloud.span_a > cloud.span_b
            && price > cloud.span_a
        {
            strength += 2;
        } else if price < cloud.conversion
            && price < cloud.base
            && cloud.span_a < cloud.span_b
            && price < cloud.span_a
        {
            strength -= 2;
        }

        // band is centred on price itself, so only a negative ATR can trip it
        if price > price + 2.0 * self.atr {
            strength += 1;
        } else if price < price - 2.0 * self.atr {
            strength -= 1;
        }

        let StochasticValues { k, d } = self.stochastic;
        if k <= 20.0 && d <= 20.0 {
            strength += 2;
        } else if k >= 80.0 && d >= 80.0 {
            strength -= 2;
        } else if k > d {
            strength += 1;
        } else if k < d {
            strength -= 1;
        }

        strength
    }
}

/// +2 when price is above every average, -2 when below every one.
fn unanimity(price: f64, averages: &[f64; 5]) -> i32 {
    if averages.iter().all(|&ma| price > ma) {
        2
    } else if averages.iter().all(|&ma| price < ma) {
        -2
    } else {
        0
    }
}

/// Weighted sum over every indicator group, `BUY` at 5 or more and `SELL` at
/// -5 or less.
#[derive(Debug, Default, Clone, Copy)]
pub struct StrengthPolicy;

impl StrengthPolicy {
    /// Signed strength, or `None` when any required field is undefined.
    pub fn strength(snapshot: &IndicatorSnapshot) -> Option<i32> {
        Factors::gather(snapshot).map(|f| f.strength())
    }
}

impl SignalPolicy for StrengthPolicy {
    type Class = SignalType;

    fn id(&self) -> &str {
        "strength"
    }

    fn evaluate(
        &self,
        snapshot: &IndicatorSnapshot,
        evaluated_at: DateTime<Utc>,
    ) -> Option<Signal<SignalType>> {
        let Some(strength) = Self::strength(snapshot) else {
            return Some(Signal::new(SignalType::Neutral, 0, snapshot, evaluated_at));
        };

        let class = if strength >= BUY_THRESHOLD {
            SignalType::Buy
        } else if strength <= SELL_THRESHOLD {
            SignalType::Sell
        } else {
            SignalType::Neutral
        };
        Some(Signal::new(class, strength, snapshot, evaluated_at))
    }
}
