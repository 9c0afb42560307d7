use std::sync::Arc;

use chrono::{Duration, NaiveDate, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::application::indicators::IndicatorEngine;
use crate::application::ml::feature_selector::{FeatureMatrix, select_features};
use crate::application::ml::predictor::Predictor;
use crate::application::ml::reconstructor::PredictionReconstructor;
use crate::application::ml::scaler::DualScaler;
use crate::application::ml::windower::SequenceWindower;
use crate::domain::errors::PipelineError;
use crate::domain::market::ohlcv::{Bar, OhlcvSeries};
use crate::domain::ml::feature_registry::FeatureRow;
use crate::domain::ports::MarketDataSource;

/// Indicator computation followed by feature selection.
pub fn build_features(
    engine: &IndicatorEngine,
    series: &OhlcvSeries,
) -> Result<FeatureMatrix, PipelineError> {
    let frame = engine
        .compute(series)
        .map_err(|e| PipelineError::IndicatorComputation { source: e.into() })?;
    select_features(&frame)
}

/// Result of one pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct Forecast {
    pub predicted_price: f64,
    pub normalized_prediction: f64,
    /// Raw (unscaled) features of the newest bar.
    pub latest_features: FeatureRow,
    pub windows: usize,
}

/// Everything a forecast needs, built once at startup and shared read-only.
pub struct ForecastContext {
    engine: IndicatorEngine,
    windower: SequenceWindower,
    scaler: DualScaler,
    predictor: Arc<dyn Predictor>,
}

impl ForecastContext {
    pub fn new(
        engine: IndicatorEngine,
        windower: SequenceWindower,
        scaler: DualScaler,
        predictor: Arc<dyn Predictor>,
    ) -> Self {
        Self {
            engine,
            windower,
            scaler,
            predictor,
        }
    }

    pub fn scaler(&self) -> &DualScaler {
        &self.scaler
    }

    pub fn predictor(&self) -> &dyn Predictor {
        self.predictor.as_ref()
    }

    /// Runs every stage in order; the first failure aborts the run.
    pub fn forecast(&self, series: &OhlcvSeries) -> Result<Forecast, PipelineError> {
        let features = build_features(&self.engine, series)?;

        let scaled = self
            .scaler
            .transform_features(&features)
            .map_err(|e| PipelineError::Unexpected { source: e.into() })?;

        let batch = self.windower.windows(&scaled)?;
        debug!(
            "{}: {} windows of {}x{}",
            series.symbol(),
            batch.len(),
            self.windower.sequence_length(),
            scaled.values().ncols()
        );

        let window = batch.last_window().ok_or_else(|| PipelineError::Unexpected {
            source: anyhow::anyhow!("windowing produced no windows"),
        })?;

        let normalized = self
            .predictor
            .predict(window)
            .map_err(|source| PipelineError::Prediction { source })?;
        if !normalized.is_finite() {
            return Err(PipelineError::Prediction {
                source: anyhow::anyhow!("model returned {}", normalized),
            });
        }

        let predicted_price = PredictionReconstructor::new(&self.scaler)
            .reconstruct(normalized)
            .map_err(|e| PipelineError::Unexpected { source: e.into() })?;

        let latest_features = features
            .last_row()
            .ok_or_else(|| PipelineError::Unexpected {
                source: anyhow::anyhow!("feature matrix is empty"),
            })?;

        Ok(Forecast {
            predicted_price,
            normalized_prediction: normalized,
            latest_features,
            windows: batch.len(),
        })
    }
}

/// Forecast plus the history it was computed from.
#[derive(Debug, Clone, Serialize)]
pub struct ForecastReport {
    pub symbol: String,
    pub predicted_price: f64,
    #[serde(skip)]
    pub latest_features: FeatureRow,
    pub history: Vec<Bar>,
    pub last_updated: NaiveDate,
}

/// Fetches history for a symbol and runs it through the shared context.
pub struct ForecastService {
    source: Arc<dyn MarketDataSource>,
    context: Arc<ForecastContext>,
    lookback_days: i64,
    history_points: usize,
}

impl ForecastService {
    pub fn new(
        source: Arc<dyn MarketDataSource>,
        context: Arc<ForecastContext>,
        lookback_days: i64,
        history_points: usize,
    ) -> Self {
        Self {
            source,
            context,
            lookback_days,
            history_points,
        }
    }

    pub fn context(&self) -> &ForecastContext {
        &self.context
    }

    pub async fn predict(&self, symbol: &str) -> Result<ForecastReport, PipelineError> {
        self.predict_as_of(symbol, Utc::now().date_naive()).await
    }

    /// Forecast using the `lookback_days` calendar days ending at `as_of`.
    pub async fn predict_as_of(
        &self,
        symbol: &str,
        as_of: NaiveDate,
    ) -> Result<ForecastReport, PipelineError> {
        let from = as_of - Duration::days(self.lookback_days);
        info!(
            "Fetching {} from {} ({} to {})",
            symbol,
            self.source.name(),
            from,
            as_of
        );

        let series = self
            .source
            .fetch(symbol, from, as_of)
            .await
            .map_err(|e| PipelineError::DataFetch {
                symbol: symbol.to_string(),
                source: e.into(),
            })?;

        let forecast = self.context.forecast(&series).inspect_err(|e| {
            warn!("Forecast for {} failed: {}", symbol, e.diagnostic());
        })?;

        info!(
            "Predicted price for {}: {:.4} ({} windows)",
            symbol, forecast.predicted_price, forecast.windows
        );

        Ok(ForecastReport {
            symbol: series.symbol().to_string(),
            predicted_price: forecast.predicted_price,
            latest_features: forecast.latest_features,
            history: series.tail(self.history_points).to_vec(),
            last_updated: series.latest().timestamp.date_naive(),
        })
    }
}
