use serde::{Deserialize, Serialize};
use ta::indicators::{MovingAverageConvergenceDivergence, SimpleMovingAverage};

use super::series::{run_indicator, ta_error};
use super::{IndicatorColumn, IndicatorError};
use crate::domain::market::ohlcv::Bar;
use crate::domain::ml::feature_registry::Feature;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendParams {
    pub sma_fast: usize,
    pub sma_slow: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
}

impl Default for TrendParams {
    fn default() -> Self {
        Self {
            sma_fast: 12,
            sma_slow: 26,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
        }
    }
}

/// Fast/slow SMA of close and the MACD line, signal and histogram.
pub fn compute(bars: &[Bar], params: &TrendParams) -> Result<Vec<IndicatorColumn>, IndicatorError> {
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();

    let sma_fast = SimpleMovingAverage::new(params.sma_fast).map_err(|e| ta_error("sma_fast", e))?;
    let sma_slow = SimpleMovingAverage::new(params.sma_slow).map_err(|e| ta_error("sma_slow", e))?;
    let macd = MovingAverageConvergenceDivergence::new(
        params.macd_fast,
        params.macd_slow,
        params.macd_signal,
    )
    .map_err(|e| ta_error("macd", e))?;

    let macd_out = run_indicator(macd, &closes);
    let macd_line = macd_out.iter().map(|o| o.macd).collect();
    let macd_signal = macd_out.iter().map(|o| o.signal).collect();
    let macd_diff = macd_out.iter().map(|o| o.histogram).collect();

    // The signal line needs a full slow EMA before its own EMA starts.
    let line_warmup = params.macd_slow - 1;
    let signal_warmup = line_warmup + params.macd_signal - 1;

    Ok(vec![
        IndicatorColumn::warmed(
            Feature::SmaFast,
            run_indicator(sma_fast, &closes),
            params.sma_fast - 1,
        ),
        IndicatorColumn::warmed(
            Feature::SmaSlow,
            run_indicator(sma_slow, &closes),
            params.sma_slow - 1,
        ),
        IndicatorColumn::warmed(Feature::Macd, macd_line, line_warmup),
        IndicatorColumn::warmed(Feature::MacdSignal, macd_signal, signal_warmup),
        IndicatorColumn::warmed(Feature::MacdDiff, macd_diff, signal_warmup),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::indicators::tests::trending_bars;

    #[test]
    fn test_sma_matches_manual_mean() {
        let bars = trending_bars(40);
        let columns = compute(&bars, &TrendParams::default()).unwrap();
        let sma_fast = &columns[0];
        assert_eq!(sma_fast.feature, Feature::SmaFast);

        assert!(sma_fast.values[10].is_none());
        let expected: f64 = bars[..12].iter().map(|b| b.close).sum::<f64>() / 12.0;
        let actual = sma_fast.values[11].unwrap();
        assert!((actual - expected).abs() < 1e-9);
    }

    #[test]
    fn test_macd_histogram_is_line_minus_signal() {
        let bars = trending_bars(60);
        let columns = compute(&bars, &TrendParams::default()).unwrap();
        let (line, signal, diff) = (&columns[2], &columns[3], &columns[4]);

        assert!(signal.values[32].is_none());
        for i in 33..60 {
            let expected = line.values[i].unwrap() - signal.values[i].unwrap();
            assert!((diff.values[i].unwrap() - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn test_flat_series_has_zero_macd() {
        let mut bars = trending_bars(40);
        for bar in &mut bars {
            bar.open = 100.0;
            bar.high = 100.0;
            bar.low = 100.0;
            bar.close = 100.0;
        }
        let columns = compute(&bars, &TrendParams::default()).unwrap();
        assert!(columns[2].values.iter().flatten().all(|v| v.abs() < 1e-12));
    }

    #[test]
    fn test_rejects_zero_period() {
        let params = TrendParams {
            sma_fast: 0,
            ..TrendParams::default()
        };
        assert!(compute(&trending_bars(5), &params).is_err());
    }
}
