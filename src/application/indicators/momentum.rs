use serde::{Deserialize, Serialize};
use ta::indicators::RelativeStrengthIndex;

use super::series::{
    ema_series, ratio, require_period, rolling_extreme, rolling_sum, run_indicator, sma_series,
    ta_error,
};
use super::{IndicatorColumn, IndicatorError};
use crate::domain::market::ohlcv::Bar;
use crate::domain::ml::feature_registry::Feature;

/// Ultimate oscillator weights for the short, medium and long averages.
const UO_WEIGHTS: (f64, f64, f64) = (4.0, 2.0, 1.0);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MomentumParams {
    pub rsi: usize,
    pub stoch: usize,
    pub stoch_signal: usize,
    pub tsi_slow: usize,
    pub tsi_fast: usize,
    pub uo_short: usize,
    pub uo_medium: usize,
    pub uo_long: usize,
}

impl Default for MomentumParams {
    fn default() -> Self {
        Self {
            rsi: 14,
            stoch: 14,
            stoch_signal: 3,
            tsi_slow: 25,
            tsi_fast: 13,
            uo_short: 7,
            uo_medium: 14,
            uo_long: 28,
        }
    }
}

/// RSI, stochastic %K/%D, true strength index and ultimate oscillator.
pub fn compute(
    bars: &[Bar],
    params: &MomentumParams,
) -> Result<Vec<IndicatorColumn>, IndicatorError> {
    require_period("stoch", params.stoch)?;
    require_period("stoch_signal", params.stoch_signal)?;
    require_period("tsi_slow", params.tsi_slow)?;
    require_period("tsi_fast", params.tsi_fast)?;
    require_period("uo_short", params.uo_short)?;
    require_period("uo_medium", params.uo_medium)?;
    require_period("uo_long", params.uo_long)?;

    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let rsi = RelativeStrengthIndex::new(params.rsi).map_err(|e| ta_error("rsi", e))?;

    let stoch = stochastic(bars, params.stoch);
    let stoch_signal = sma_series(&stoch, params.stoch_signal);

    Ok(vec![
        IndicatorColumn::warmed(Feature::Rsi, run_indicator(rsi, &closes), params.rsi),
        IndicatorColumn::new(Feature::Stoch, stoch),
        IndicatorColumn::new(Feature::StochSignal, stoch_signal),
        IndicatorColumn::new(
            Feature::Tsi,
            true_strength(&closes, params.tsi_slow, params.tsi_fast),
        ),
        IndicatorColumn::new(Feature::UltimateOscillator, ultimate_oscillator(bars, params)),
    ])
}

/// %K = 100 * (close - lowest low) / (highest high - lowest low)
fn stochastic(bars: &[Bar], period: usize) -> Vec<Option<f64>> {
    let highs: Vec<f64> = bars.iter().map(|b| b.high).collect();
    let lows: Vec<f64> = bars.iter().map(|b| b.low).collect();
    let highest = rolling_extreme(&highs, period, f64::max);
    let lowest = rolling_extreme(&lows, period, f64::min);

    bars.iter()
        .enumerate()
        .map(|(i, bar)| {
            let (hh, ll) = (highest[i]?, lowest[i]?);
            ratio(100.0 * (bar.close - ll), hh - ll)
        })
        .collect()
}

/// 100 * EMA_fast(EMA_slow(dC)) / EMA_fast(EMA_slow(|dC|))
fn true_strength(closes: &[f64], slow: usize, fast: usize) -> Vec<Option<f64>> {
    let changes: Vec<f64> = closes.windows(2).map(|w| w[1] - w[0]).collect();
    let magnitudes: Vec<f64> = changes.iter().map(|c| c.abs()).collect();

    let smoothed = ema_series(&ema_series(&changes, slow), fast);
    let smoothed_abs = ema_series(&ema_series(&magnitudes, slow), fast);
    let warmup = slow + fast - 1;

    let mut out = Vec::with_capacity(closes.len());
    if !closes.is_empty() {
        out.push(None);
    }
    for (j, (s, a)) in smoothed.iter().zip(&smoothed_abs).enumerate() {
        let index = j + 1;
        out.push(if index < warmup {
            None
        } else {
            ratio(100.0 * s, *a)
        });
    }
    out
}

fn ultimate_oscillator(bars: &[Bar], params: &MomentumParams) -> Vec<Option<f64>> {
    let mut buying_pressure = Vec::with_capacity(bars.len());
    let mut true_range = Vec::with_capacity(bars.len());
    for (i, bar) in bars.iter().enumerate() {
        if i == 0 {
            buying_pressure.push(None);
            true_range.push(None);
            continue;
        }
        let prev_close = bars[i - 1].close;
        let floor = bar.low.min(prev_close);
        buying_pressure.push(Some(bar.close - floor));
        true_range.push(Some(bar.high.max(prev_close) - floor));
    }

    let average = |period: usize| -> Vec<Option<f64>> {
        let bp = rolling_sum(&buying_pressure, period);
        let tr = rolling_sum(&true_range, period);
        bp.iter()
            .zip(&tr)
            .map(|(b, t)| ratio((*b)?, (*t)?))
            .collect()
    };

    let short = average(params.uo_short);
    let medium = average(params.uo_medium);
    let long = average(params.uo_long);
    let (ws, wm, wl) = UO_WEIGHTS;

    (0..bars.len())
        .map(|i| {
            let weighted = ws * short[i]? + wm * medium[i]? + wl * long[i]?;
            Some(100.0 * weighted / (ws + wm + wl))
        })
        .collect()
}
