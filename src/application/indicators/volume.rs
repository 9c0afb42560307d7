use serde::{Deserialize, Serialize};

use super::series::{ratio, require_period, rolling_sum, sma_series};
use super::{IndicatorColumn, IndicatorError};
use crate::domain::market::ohlcv::Bar;
use crate::domain::ml::feature_registry::Feature;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumeParams {
    pub vwap: usize,
    pub mfi: usize,
    pub eom_sma: usize,
}

impl Default for VolumeParams {
    fn default() -> Self {
        Self {
            vwap: 14,
            mfi: 14,
            eom_sma: 14,
        }
    }
}

/// Accumulation/distribution, on-balance volume, rolling VWAP, money flow
/// index and ease of movement (raw and smoothed).
pub fn compute(bars: &[Bar], params: &VolumeParams) -> Result<Vec<IndicatorColumn>, IndicatorError> {
    require_period("vwap", params.vwap)?;
    require_period("mfi", params.mfi)?;
    require_period("eom_sma", params.eom_sma)?;

    let ease = ease_of_movement(bars);
    let ease_sma = sma_series(&ease, params.eom_sma);

    Ok(vec![
        IndicatorColumn::new(Feature::AccDist, accumulation_distribution(bars)),
        IndicatorColumn::new(Feature::OnBalanceVolume, on_balance_volume(bars)),
        IndicatorColumn::new(Feature::Vwap, rolling_vwap(bars, params.vwap)),
        IndicatorColumn::new(Feature::MoneyFlowIndex, money_flow_index(bars, params.mfi)),
        IndicatorColumn::new(Feature::EaseOfMovement, ease),
        IndicatorColumn::new(Feature::EaseOfMovementSma, ease_sma),
    ])
}

/// Running sum of close-location value times volume.
fn accumulation_distribution(bars: &[Bar]) -> Vec<Option<f64>> {
    let mut total = 0.0;
    bars.iter()
        .map(|bar| {
            let clv = ratio(
                (bar.close - bar.low) - (bar.high - bar.close),
                bar.high - bar.low,
            )
            .unwrap_or(0.0);
            total += clv * bar.volume;
            Some(total)
        })
        .collect()
}

fn on_balance_volume(bars: &[Bar]) -> Vec<Option<f64>> {
    let mut total = 0.0;
    let mut out = Vec::with_capacity(bars.len());
    for (i, bar) in bars.iter().enumerate() {
        if i > 0 {
            let prev = bars[i - 1].close;
            if bar.close > prev {
                total += bar.volume;
            } else if bar.close < prev {
                total -= bar.volume;
            }
        }
        out.push(Some(total));
    }
    out
}

fn rolling_vwap(bars: &[Bar], period: usize) -> Vec<Option<f64>> {
    let weighted: Vec<Option<f64>> = bars
        .iter()
        .map(|b| Some(b.typical_price() * b.volume))
        .collect();
    let volumes: Vec<Option<f64>> = bars.iter().map(|b| Some(b.volume)).collect();

    rolling_sum(&weighted, period)
        .into_iter()
        .zip(rolling_sum(&volumes, period))
        .map(|(pv, v)| ratio(pv?, v?))
        .collect()
}

/// 100 * positive flow / (positive + negative flow) over `period` bars.
fn money_flow_index(bars: &[Bar], period: usize) -> Vec<Option<f64>> {
    let mut positive = Vec::with_capacity(bars.len());
    let mut negative = Vec::with_capacity(bars.len());
    for (i, bar) in bars.iter().enumerate() {
        if i == 0 {
            positive.push(None);
            negative.push(None);
            continue;
        }
        let tp = bar.typical_price();
        let prev_tp = bars[i - 1].typical_price();
        let flow = tp * bar.volume;
        positive.push(Some(if tp > prev_tp { flow } else { 0.0 }));
        negative.push(Some(if tp < prev_tp { flow } else { 0.0 }));
    }

    rolling_sum(&positive, period)
        .into_iter()
        .zip(rolling_sum(&negative, period))
        .map(|(pos, neg)| {
            let (pos, neg) = (pos?, neg?);
            ratio(100.0 * pos, pos + neg)
        })
        .collect()
}

/// (dHigh + dLow) * (high - low) / (2 * volume)
fn ease_of_movement(bars: &[Bar]) -> Vec<Option<f64>> {
    bars.iter()
        .enumerate()
        .map(|(i, bar)| {
            if i == 0 {
                return None;
            }
            let prev = &bars[i - 1];
            let distance = (bar.high - prev.high) + (bar.low - prev.low);
            ratio(distance * (bar.high - bar.low), 2.0 * bar.volume)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::indicators::tests::trending_bars;

    #[test]
    fn test_obv_follows_close_direction() {
        let mut bars = trending_bars(4);
        bars[0].close = 100.0;
        bars[1].close = 101.0;
        bars[2].close = 100.5;
        bars[3].close = 100.5;
        for bar in &mut bars {
            bar.volume = 10.0;
        }

        let obv = on_balance_volume(&bars);
        assert_eq!(obv, vec![Some(0.0), Some(10.0), Some(0.0), Some(0.0)]);
    }

    #[test]
    fn test_adi_zero_for_flat_bars() {
        let mut bars = trending_bars(5);
        for bar in &mut bars {
            bar.open = 10.0;
            bar.high = 10.0;
            bar.low = 10.0;
            bar.close = 10.0;
        }
        assert!(
            accumulation_distribution(&bars)
                .iter()
                .all(|v| *v == Some(0.0))
        );
    }

    #[test]
    fn test_vwap_of_constant_price_is_that_price() {
        let mut bars = trending_bars(20);
        for bar in &mut bars {
            bar.open = 42.0;
            bar.high = 42.0;
            bar.low = 42.0;
            bar.close = 42.0;
        }
        let vwap = rolling_vwap(&bars, 14);
        assert!(vwap[12].is_none());
        assert!((vwap[19].unwrap() - 42.0).abs() < 1e-9);
    }

    #[test]
    fn test_mfi_bounds_and_warmup() {
        let bars = trending_bars(40);
        let mfi = money_flow_index(&bars, 14);
        assert!(mfi[13].is_none());
        for v in mfi[14..].iter().flatten() {
            assert!((0.0..=100.0).contains(v));
        }
    }

    #[test]
    fn test_ease_of_movement_zero_volume_is_undefined() {
        let mut bars = trending_bars(3);
        bars[2].volume = 0.0;
        let eom = ease_of_movement(&bars);
        assert!(eom[0].is_none());
        assert!(eom[1].is_some());
        assert!(eom[2].is_none());
    }

    #[test]
    fn test_compute_returns_six_columns() {
        let columns = compute(&trending_bars(30), &VolumeParams::default()).unwrap();
        let features: Vec<Feature> = columns.iter().map(|c| c.feature).collect();
        assert_eq!(features, Feature::indicators()[14..].to_vec());
    }
}
