use super::signals::indicators::{
    Adx, Atr, BollingerBands, Cmf, Ema, Fibonacci, Ichimoku, Indicator, Macd, Obv, Rsi, Sma,
    Stochastic, Vwap,
};
use crate::error::{AppError, Result};
use crate::types::{
    AdxValues, BollingerValues, Candle, CandleSeries, Crossovers, FibonacciLevels, IchimokuCloud,
    IndicatorSnapshot, MacdValues, MovingAverages, ObvValues, StochasticValues, Timeframe,
    MA_PERIODS,
};
use tracing::trace;

type Momentum = (Option<f64>, Option<MacdValues>, Option<StochasticValues>);
type Trend = (MovingAverages, Option<AdxValues>, Option<IchimokuCloud>);

struct VolumeAndVolatility {
    atr: Option<f64>,
    bollinger: Option<BollingerValues>,
    vwap: Option<f64>,
    obv: Option<ObvValues>,
    cmf: Option<f64>,
    fibonacci: Option<FibonacciLevels>,
}

/// Runs the full indicator set over one series and merges the results.
pub struct SnapshotAggregator {
    rsi: Rsi,
    macd: Macd,
    stochastic: Stochastic,
    smas: Vec<Sma>,
    emas: Vec<Ema>,
    adx: Adx,
    ichimoku: Ichimoku,
    atr: Atr,
    bollinger: BollingerBands,
    vwap: Vwap,
    obv: Obv,
    cmf: Cmf,
    fibonacci: Fibonacci,
}

impl Default for SnapshotAggregator {
    fn default() -> Self {
        Self {
            rsi: Rsi::default(),
            macd: Macd::default(),
            stochastic: Stochastic::default(),
            smas: MA_PERIODS.iter().map(|&p| Sma::new(p)).collect(),
            emas: MA_PERIODS.iter().map(|&p| Ema::new(p)).collect(),
            adx: Adx::default(),
            ichimoku: Ichimoku::default(),
            atr: Atr::default(),
            bollinger: BollingerBands::default(),
            vwap: Vwap,
            obv: Obv::default(),
            cmf: Cmf::default(),
            fibonacci: Fibonacci::default(),
        }
    }
}

fn run<I: Indicator>(indicator: &I, candles: &[Candle]) -> Option<I::Output> {
    let value = indicator.calculate(candles);
    if value.is_none() {
        trace!(
            "{} undefined over {} bars (needs {})",
            indicator.id(),
            candles.len(),
            indicator.min_periods()
        );
    }
    value
}

impl SnapshotAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the snapshot for one (symbol, timeframe).
    ///
    /// Fails only when fewer than two valid bars exist; any single indicator
    /// lacking history is left undefined.
    pub fn aggregate(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        series: &CandleSeries,
        computed_at: i64,
    ) -> Result<IndicatorSnapshot> {
        let price = series.last_price().ok_or_else(|| AppError::InsufficientData {
            symbol: symbol.to_string(),
            timeframe: timeframe.to_string(),
            bars: series.len(),
        })?;
        let candles = series.bars();

        let ((rsi, macd, stochastic), ((averages, adx, ichimoku), rest)) = rayon::join(
            || self.momentum(candles),
            || rayon::join(|| self.trend(candles), || self.volume_and_volatility(candles)),
        );

        let mut snapshot = IndicatorSnapshot {
            symbol: symbol.to_string(),
            timeframe,
            price,
            computed_at,
            rsi,
            macd,
            crossovers: Crossovers::from_averages(&averages),
            averages,
            adx,
            vwap: rest.vwap,
            bollinger_bands: rest.bollinger,
            obv: rest.obv,
            fibonacci: rest.fibonacci,
            cmf: rest.cmf,
            ichimoku,
            atr: rest.atr,
            stochastic,
            moving_averages: 0,
            oscillators: 0,
        };
        snapshot.oscillators = oscillator_score(snapshot.rsi, snapshot.macd_histogram());
        snapshot.moving_averages = moving_average_score(price, &snapshot.averages);

        Ok(snapshot)
    }

    fn momentum(&self, candles: &[Candle]) -> Momentum {
        (
            run(&self.rsi, candles),
            run(&self.macd, candles),
            run(&self.stochastic, candles),
        )
    }

    fn trend(&self, candles: &[Candle]) -> Trend {
        let mut averages = MovingAverages::default();
        for (slot, sma) in averages.sma.iter_mut().zip(&self.smas) {
            *slot = run(sma, candles);
        }
        for (slot, ema) in averages.ema.iter_mut().zip(&self.emas) {
            *slot = run(ema, candles);
        }
        (
            averages,
            run(&self.adx, candles),
            run(&self.ichimoku, candles),
        )
    }

    fn volume_and_volatility(&self, candles: &[Candle]) -> VolumeAndVolatility {
        VolumeAndVolatility {
            atr: run(&self.atr, candles),
            bollinger: run(&self.bollinger, candles),
            vwap: run(&self.vwap, candles),
            obv: run(&self.obv, candles),
            cmf: run(&self.cmf, candles),
            fibonacci: run(&self.fibonacci, candles),
        }
    }
}

/// +1 oversold / -1 overbought RSI, plus the sign of the MACD histogram.
pub fn oscillator_score(rsi: Option<f64>, histogram: Option<f64>) -> i32 {
    let mut score = 0;
    match rsi {
        Some(r) if r <= 30.0 => score += 1,
        Some(r) if r >= 70.0 => score -= 1,
        _ => {}
    }
    match histogram {
        Some(h) if h > 0.0 => score += 1,
        Some(h) if h < 0.0 => score -= 1,
        _ => {}
    }
    score
}

/// +1 for each defined average below price, -1 for each at or above it.
pub fn moving_average_score(price: f64, averages: &MovingAverages) -> i32 {
    averages
        .all()
        .flatten()
        .map(|ma| if price > ma { 1 } else { -1 })
        .sum()
}
