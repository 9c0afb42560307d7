use ndarray::Axis;
use serde::Serialize;
use tracing::info;

use super::baselines::{
    LINEAR_TREND_WINDOW, MOVING_AVERAGE_WINDOW, linear_trend_forecast, moving_average_forecast,
};
use super::predictor::Predictor;
use super::reconstructor::PredictionReconstructor;
use super::scaler::DualScaler;
use super::windower::SequenceBatch;
use crate::domain::ml::feature_registry::Feature;

/// Error statistics in price units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ForecastErrors {
    pub mae: f64,
    pub mse: f64,
    pub rmse: f64,
    pub samples: usize,
}

impl ForecastErrors {
    /// `None` when there is nothing to compare.
    pub fn between(predicted: &[f64], actual: &[f64]) -> Option<Self> {
        let samples = predicted.len().min(actual.len());
        if samples == 0 {
            return None;
        }
        let (abs_sum, sq_sum) = predicted
            .iter()
            .zip(actual)
            .fold((0.0, 0.0), |(a, s), (p, y)| {
                let err = p - y;
                (a + err.abs(), s + err * err)
            });
        let mse = sq_sum / samples as f64;
        Some(Self {
            mae: abs_sum / samples as f64,
            mse,
            rmse: mse.sqrt(),
            samples,
        })
    }
}

/// One evaluated test window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BacktestRecord {
    pub window: usize,
    pub actual: f64,
    pub predicted: f64,
    pub moving_average: Option<f64>,
    pub linear_trend: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BacktestReport {
    pub model: Option<ForecastErrors>,
    pub moving_average: Option<ForecastErrors>,
    pub linear_trend: Option<ForecastErrors>,
    #[serde(skip)]
    pub records: Vec<BacktestRecord>,
}

/// Predicts every window and compares against its target, all in price units.
///
/// Baselines are computed from the closes inside each window so they see
/// exactly the history the model sees.
pub fn backtest(
    predictor: &dyn Predictor,
    batch: &SequenceBatch,
    scaler: &DualScaler,
) -> anyhow::Result<BacktestReport> {
    let reconstructor = PredictionReconstructor::new(scaler);

    let normalized = predictor.predict_batch(batch)?;
    if normalized.len() != batch.len() {
        anyhow::bail!(
            "{} returned {} predictions for {} windows",
            predictor.name(),
            normalized.len(),
            batch.len()
        );
    }
    let predicted = reconstructor.reconstruct_many(&normalized)?;
    let actual = reconstructor.reconstruct_many(&batch.targets().to_vec())?;

    let mut records = Vec::with_capacity(batch.len());
    for (i, window) in batch.inputs().axis_iter(Axis(0)).enumerate() {
        let closes = reconstructor.reconstruct_many(&window.column(Feature::Close.index()).to_vec())?;
        records.push(BacktestRecord {
            window: i,
            actual: actual[i],
            predicted: predicted[i],
            moving_average: moving_average_forecast(&closes, MOVING_AVERAGE_WINDOW),
            linear_trend: linear_trend_forecast(&closes, LINEAR_TREND_WINDOW),
        });
    }

    let report = BacktestReport {
        model: ForecastErrors::between(&predicted, &actual),
        moving_average: baseline_errors(&records, |r| r.moving_average),
        linear_trend: baseline_errors(&records, |r| r.linear_trend),
        records,
    };

    if let Some(errors) = &report.model {
        info!(
            "Backtesting completed: MAE={:.2}, MSE={:.2}, RMSE={:.2} over {} windows",
            errors.mae, errors.mse, errors.rmse, errors.samples
        );
    }
    Ok(report)
}

fn baseline_errors(
    records: &[BacktestRecord],
    forecast: impl Fn(&BacktestRecord) -> Option<f64>,
) -> Option<ForecastErrors> {
    let (predicted, actual): (Vec<f64>, Vec<f64>) = records
        .iter()
        .filter_map(|r| forecast(r).map(|f| (f, r.actual)))
        .unzip();
    ForecastErrors::between(&predicted, &actual)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ml::scaler::ScaledFeatures;
    use crate::application::ml::windower::SequenceWindower;
    use crate::domain::ml::feature_registry::{FEATURE_COUNT, PRICE_FEATURE_COUNT};
    use ndarray::{Array2, ArrayView2};

    struct LastClose;

    impl Predictor for LastClose {
        fn predict(&self, window: ArrayView2<'_, f64>) -> anyhow::Result<f64> {
            let last = window.nrows() - 1;
            Ok(window[[last, Feature::Close.index()]])
        }
        fn name(&self) -> &str {
            "last-close"
        }
        fn version(&self) -> &str {
            "test"
        }
        fn sequence_length(&self) -> usize {
            12
        }
    }

    /// Drops the last window from every batch.
    struct ShortBatch;

    impl Predictor for ShortBatch {
        fn predict(&self, _window: ArrayView2<'_, f64>) -> anyhow::Result<f64> {
            Ok(0.5)
        }
        fn predict_batch(&self, batch: &SequenceBatch) -> anyhow::Result<Vec<f64>> {
            Ok(vec![0.5; batch.len().saturating_sub(1)])
        }
        fn name(&self) -> &str {
            "short-batch"
        }
        fn version(&self) -> &str {
            "test"
        }
        fn sequence_length(&self) -> usize {
            12
        }
    }

    fn scaler() -> DualScaler {
        let prices = ndarray::array![[0.0, 0.0, 0.0, 100.0], [1.0, 1.0, 1.0, 200.0]];
        let indicators = Array2::from_elem((2, FEATURE_COUNT - PRICE_FEATURE_COUNT), 0.0);
        DualScaler::fit(prices.view(), indicators.view()).unwrap()
    }

    #[test]
    fn test_errors_between() {
        let errors = ForecastErrors::between(&[1.0, 3.0], &[2.0, 1.0]).unwrap();
        assert_eq!(errors.mae, 1.5);
        assert_eq!(errors.mse, 2.5);
        assert!((errors.rmse - 2.5f64.sqrt()).abs() < 1e-12);
        assert!(ForecastErrors::between(&[], &[]).is_none());
    }

    #[test]
    fn test_backtest_in_price_units() {
        // Normalized close rises by 0.01 per row
        let values = Array2::from_shape_fn((30, FEATURE_COUNT), |(r, _)| r as f64 * 0.01);
        let scaled = ScaledFeatures::from_normalized(values).unwrap();
        let batch = SequenceWindower::new(12).windows(&scaled).unwrap();

        let report = backtest(&LastClose, &batch, &scaler()).unwrap();
        let errors = report.model.unwrap();

        // Last close lags the target by one row = 0.01 normalized = 1.0 price
        assert_eq!(errors.samples, batch.len());
        assert!((errors.mae - 1.0).abs() < 1e-9);
        assert_eq!(report.records.len(), batch.len());
        assert!(report.records[0].moving_average.is_some());
        assert!(report.linear_trend.unwrap().mae < 1e-6);
    }

    #[test]
    fn test_backtest_rejects_missing_predictions() {
        let values = Array2::from_elem((20, FEATURE_COUNT), 0.5);
        let scaled = ScaledFeatures::from_normalized(values).unwrap();
        let batch = SequenceWindower::new(12).windows(&scaled).unwrap();

        let err = backtest(&ShortBatch, &batch, &scaler()).unwrap_err();
        assert!(err.to_string().contains("short-batch"));
    }
}
