use ndarray::{Array2, ArrayView1, ArrayView2, Axis, s};

use crate::application::indicators::IndicatorFrame;
use crate::domain::errors::PipelineError;
use crate::domain::ml::feature_registry::{
    FEATURE_COUNT, Feature, FeatureRow, PRICE_FEATURE_COUNT,
};

/// `N x F` matrix of raw (unscaled) features in registry order.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    values: Array2<f64>,
}

impl FeatureMatrix {
    /// Wraps an existing matrix; `None` if it is not `FEATURE_COUNT` wide.
    pub fn from_array(values: Array2<f64>) -> Option<Self> {
        (values.ncols() == FEATURE_COUNT).then_some(Self { values })
    }

    /// Row-wise concatenation of several matrices.
    pub fn stack(parts: &[FeatureMatrix]) -> Option<Self> {
        if parts.is_empty() {
            return None;
        }
        let views: Vec<ArrayView2<'_, f64>> = parts.iter().map(|p| p.values.view()).collect();
        ndarray::concatenate(Axis(0), &views)
            .ok()
            .map(|values| Self { values })
    }

    pub fn rows(&self) -> usize {
        self.values.nrows()
    }

    pub fn values(&self) -> ArrayView2<'_, f64> {
        self.values.view()
    }

    pub fn prices(&self) -> ArrayView2<'_, f64> {
        self.values.slice(s![.., ..PRICE_FEATURE_COUNT])
    }

    pub fn indicators(&self) -> ArrayView2<'_, f64> {
        self.values.slice(s![.., PRICE_FEATURE_COUNT..])
    }

    pub fn column(&self, feature: Feature) -> ArrayView1<'_, f64> {
        self.values.column(feature.index())
    }

    pub fn row(&self, index: usize) -> Option<FeatureRow> {
        if index >= self.rows() {
            return None;
        }
        let mut values = [0.0; FEATURE_COUNT];
        for (slot, v) in values.iter_mut().zip(self.values.row(index)) {
            *slot = *v;
        }
        Some(FeatureRow::from_values(values))
    }

    pub fn last_row(&self) -> Option<FeatureRow> {
        self.rows().checked_sub(1).and_then(|i| self.row(i))
    }
}

/// Projects the engine output onto the fixed feature ordering.
pub fn select_features(frame: &IndicatorFrame) -> Result<FeatureMatrix, PipelineError> {
    let rows = frame.len();
    let mut values = Array2::zeros((rows, FEATURE_COUNT));

    for feature in Feature::ALL {
        let column = frame
            .column(feature)
            .ok_or_else(|| PipelineError::MissingFeature {
                column: feature.name().to_string(),
            })?;

        if column.len() != rows {
            return Err(PipelineError::Unexpected {
                source: anyhow::anyhow!(
                    "column {} has {} values for {} rows",
                    feature.name(),
                    column.len(),
                    rows
                ),
            });
        }

        values
            .column_mut(feature.index())
            .iter_mut()
            .zip(column)
            .for_each(|(target, v)| *target = *v);
    }

    Ok(FeatureMatrix { values })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::indicators::{
        IndicatorColumn, IndicatorEngine, IndicatorError, IndicatorParams, IndicatorSet,
        MomentumParams, StandardIndicators, TrendParams, VolatilityParams, VolumeParams,
    };
    use crate::domain::market::ohlcv::{Bar, OhlcvSeries};
    use chrono::{Duration, TimeZone, Utc};

    fn series(count: usize) -> OhlcvSeries {
        let start = Utc.with_ymd_and_hms(2023, 6, 1, 0, 0, 0).unwrap();
        let bars = (0..count)
            .map(|i| {
                let p = 50.0 + i as f64;
                Bar {
                    timestamp: start + Duration::days(i as i64),
                    open: p,
                    high: p + 1.0,
                    low: p - 1.0,
                    close: p + 0.5,
                    volume: 500.0,
                }
            })
            .collect();
        OhlcvSeries::new("SEL", bars).unwrap()
    }

    /// Standard indicators minus the money flow index.
    struct WithoutMfi;

    impl IndicatorSet for WithoutMfi {
        fn trend(
            &self,
            bars: &[Bar],
            params: &TrendParams,
        ) -> Result<Vec<IndicatorColumn>, IndicatorError> {
            StandardIndicators.trend(bars, params)
        }

        fn momentum(
            &self,
            bars: &[Bar],
            params: &MomentumParams,
        ) -> Result<Vec<IndicatorColumn>, IndicatorError> {
            StandardIndicators.momentum(bars, params)
        }

        fn volatility(
            &self,
            bars: &[Bar],
            params: &VolatilityParams,
        ) -> Result<Vec<IndicatorColumn>, IndicatorError> {
            StandardIndicators.volatility(bars, params)
        }

        fn volume(
            &self,
            bars: &[Bar],
            params: &VolumeParams,
        ) -> Result<Vec<IndicatorColumn>, IndicatorError> {
            let mut columns = StandardIndicators.volume(bars, params)?;
            columns.retain(|c| c.feature != Feature::MoneyFlowIndex);
            Ok(columns)
        }
    }

    #[test]
    fn test_selects_in_registry_order() {
        let series = series(30);
        let frame = IndicatorEngine::default().compute(&series).unwrap();
        let matrix = select_features(&frame).unwrap();

        assert_eq!(matrix.rows(), 30);
        assert_eq!(matrix.values().ncols(), FEATURE_COUNT);
        assert_eq!(matrix.column(Feature::Close)[0], 50.5);
        assert_eq!(matrix.prices().ncols(), 4);
        assert_eq!(matrix.indicators().ncols(), 20);

        let last = matrix.last_row().unwrap();
        assert_eq!(last[Feature::Close], series.latest().close);
        assert_eq!(
            last[Feature::SmaFast],
            frame.column(Feature::SmaFast).unwrap()[29]
        );
    }

    #[test]
    fn test_missing_column_is_reported_by_name() {
        let engine = IndicatorEngine::new(Box::new(WithoutMfi), IndicatorParams::default());
        let frame = engine.compute(&series(30)).unwrap();

        match select_features(&frame) {
            Err(PipelineError::MissingFeature { column }) => assert_eq!(column, "volume_mfi"),
            other => panic!("expected MissingFeature, got {:?}", other),
        }
    }

    #[test]
    fn test_stack_concatenates_rows() {
        let engine = IndicatorEngine::default();
        let a = select_features(&engine.compute(&series(20)).unwrap()).unwrap();
        let b = select_features(&engine.compute(&series(25)).unwrap()).unwrap();

        let stacked = FeatureMatrix::stack(&[a, b]).unwrap();
        assert_eq!(stacked.rows(), 45);
        assert!(FeatureMatrix::stack(&[]).is_none());
    }

    #[test]
    fn test_row_access_matches_columns() {
        let matrix = select_features(&IndicatorEngine::default().compute(&series(12)).unwrap())
            .unwrap();

        let last = matrix.last_row().unwrap();
        assert_eq!(matrix.row(11), Some(last));
        assert_eq!(last.as_slice().len(), FEATURE_COUNT);
        assert_eq!(last[Feature::Close], matrix.column(Feature::Close)[11]);
        assert!(matrix.row(12).is_none());
    }
}
