use serde::{Deserialize, Serialize};
use ta::DataItem;
use ta::indicators::{AverageTrueRange, BollingerBands};

use super::series::{run_indicator, ta_error};
use super::{IndicatorColumn, IndicatorError};
use crate::domain::market::ohlcv::Bar;
use crate::domain::ml::feature_registry::Feature;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolatilityParams {
    pub atr: usize,
    pub bollinger: usize,
    pub bollinger_width: f64,
}

impl Default for VolatilityParams {
    fn default() -> Self {
        Self {
            atr: 14,
            bollinger: 20,
            bollinger_width: 2.0,
        }
    }
}

/// Average true range and the Bollinger mid/upper/lower bands.
pub fn compute(
    bars: &[Bar],
    params: &VolatilityParams,
) -> Result<Vec<IndicatorColumn>, IndicatorError> {
    let atr = AverageTrueRange::new(params.atr).map_err(|e| ta_error("atr", e))?;
    let bands = BollingerBands::new(params.bollinger, params.bollinger_width)
        .map_err(|e| ta_error("bollinger", e))?;

    let items = bars
        .iter()
        .enumerate()
        .map(|(index, bar)| {
            DataItem::builder()
                .open(bar.open)
                .high(bar.high)
                .low(bar.low)
                .close(bar.close)
                .volume(bar.volume)
                .build()
                .map_err(|e| IndicatorError::InvalidBar {
                    index,
                    reason: format!("{:?}", e),
                })
        })
        .collect::<Result<Vec<_>, _>>()?;
    let item_refs: Vec<&DataItem> = items.iter().collect();

    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let band_out = run_indicator(bands, &closes);
    let band_warmup = params.bollinger - 1;

    Ok(vec![
        IndicatorColumn::warmed(
            Feature::Atr,
            run_indicator(atr, &item_refs),
            params.atr - 1,
        ),
        IndicatorColumn::warmed(
            Feature::BollingerMid,
            band_out.iter().map(|b| b.average).collect(),
            band_warmup,
        ),
        IndicatorColumn::warmed(
            Feature::BollingerHigh,
            band_out.iter().map(|b| b.upper).collect(),
            band_warmup,
        ),
        IndicatorColumn::warmed(
            Feature::BollingerLow,
            band_out.iter().map(|b| b.lower).collect(),
            band_warmup,
        ),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::indicators::tests::trending_bars;

    #[test]
    fn test_bands_bracket_the_mean() {
        let bars = trending_bars(50);
        let columns = compute(&bars, &VolatilityParams::default()).unwrap();
        let (mid, upper, lower) = (&columns[1], &columns[2], &columns[3]);

        assert!(mid.values[18].is_none());
        for i in 19..50 {
            let m = mid.values[i].unwrap();
            assert!(upper.values[i].unwrap() >= m);
            assert!(lower.values[i].unwrap() <= m);
        }
    }

    #[test]
    fn test_atr_positive_for_ranging_bars() {
        let bars = trending_bars(30);
        let columns = compute(&bars, &VolatilityParams::default()).unwrap();
        let atr = &columns[0];
        assert_eq!(atr.feature, Feature::Atr);
        assert!(atr.values[12].is_none());
        assert!(atr.values[13..].iter().all(|v| v.unwrap() > 0.0));
    }

    #[test]
    fn test_flat_bars_have_zero_width() {
        let mut bars = trending_bars(25);
        for bar in &mut bars {
            bar.open = 50.0;
            bar.high = 50.0;
            bar.low = 50.0;
            bar.close = 50.0;
        }
        let columns = compute(&bars, &VolatilityParams::default()).unwrap();
        assert!((columns[1].values[24].unwrap() - 50.0).abs() < 1e-9);
        assert_eq!(columns[0].values[24], Some(0.0));
    }
}
