//! Offline training: fit the scaler, window every symbol, train and backtest.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, bail, ensure};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::application::indicators::IndicatorEngine;
use crate::application::ml::evaluation::{BacktestReport, ForecastErrors, backtest};
use crate::application::ml::feature_selector::FeatureMatrix;
use crate::application::ml::forest_predictor::{ForestParams, ForestPredictor};
use crate::application::ml::scaler::DualScaler;
use crate::application::ml::windower::{DEFAULT_SEQUENCE_LENGTH, SequenceBatch, SequenceWindower};
use crate::application::pipeline::build_features;
use crate::domain::errors::PipelineError;
use crate::domain::market::ticker::normalize_ticker;
use crate::domain::ml::feature_registry::FEATURE_COUNT;
use crate::domain::ports::MarketDataSource;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingPlan {
    pub symbols: Vec<String>,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub sequence_length: usize,
    pub test_fraction: f64,
    pub forest: ForestParams,
}

impl Default for TrainingPlan {
    fn default() -> Self {
        Self {
            symbols: ["AAPL", "MSFT", "GOOGL", "AMZN"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            start: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or_default(),
            end: NaiveDate::from_ymd_opt(2024, 1, 8).unwrap_or_default(),
            sequence_length: DEFAULT_SEQUENCE_LENGTH,
            test_fraction: 0.2,
            forest: ForestParams::default(),
        }
    }
}

impl TrainingPlan {
    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        toml::from_str(content).context("Failed to parse training plan")
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read training plan {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(!self.symbols.is_empty(), "training plan lists no symbols");
        for symbol in &self.symbols {
            if let Err(e) = normalize_ticker(symbol) {
                bail!("{}: {:?}", e, symbol);
            }
        }
        ensure!(
            self.start < self.end,
            "start date {} must be before end date {}",
            self.start,
            self.end
        );
        ensure!(self.sequence_length > 0, "sequence_length must be > 0");
        ensure!(
            (0.0..1.0).contains(&self.test_fraction),
            "test_fraction must be in [0, 1), got {}",
            self.test_fraction
        );
        ensure!(self.forest.n_trees > 0, "n_trees must be > 0");
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SymbolSummary {
    pub symbol: String,
    pub bars: usize,
    pub train_windows: usize,
    pub test_windows: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrainingReport {
    pub trained_at: DateTime<Utc>,
    pub model: String,
    pub sequence_length: usize,
    pub feature_count: usize,
    pub forest: ForestParams,
    pub symbols: Vec<SymbolSummary>,
    pub skipped: Vec<String>,
    pub train_windows: usize,
    pub test_windows: usize,
    pub test_errors: Option<ForecastErrors>,
    pub moving_average_errors: Option<ForecastErrors>,
    pub linear_trend_errors: Option<ForecastErrors>,
}

pub struct TrainingOutcome {
    pub scaler: DualScaler,
    pub predictor: ForestPredictor,
    pub report: TrainingReport,
    pub backtest: Option<BacktestReport>,
}

pub struct TrainingJob {
    source: Arc<dyn MarketDataSource>,
    engine: IndicatorEngine,
    plan: TrainingPlan,
}

impl TrainingJob {
    pub fn new(source: Arc<dyn MarketDataSource>, plan: TrainingPlan) -> Self {
        Self {
            source,
            engine: IndicatorEngine::default(),
            plan,
        }
    }

    pub async fn run(&self) -> anyhow::Result<TrainingOutcome> {
        self.plan.validate()?;
        let plan = &self.plan;

        // Raw features per symbol
        let mut datasets: Vec<(String, FeatureMatrix)> = Vec::new();
        let mut skipped = Vec::new();
        for symbol in &plan.symbols {
            info!("Fetching {} data for {}...", self.source.name(), symbol);
            let series = match self.source.fetch(symbol, plan.start, plan.end).await {
                Ok(series) => series,
                Err(e) => {
                    warn!("Skipping {}: {}", symbol, e);
                    skipped.push(symbol.clone());
                    continue;
                }
            };

            match build_features(&self.engine, &series) {
                Ok(features) => {
                    info!("Processed {} bars for {}", features.rows(), symbol);
                    datasets.push((symbol.clone(), features));
                }
                Err(e) => {
                    warn!("Skipping {}: {}", symbol, e.diagnostic());
                    skipped.push(symbol.clone());
                }
            }
        }

        if datasets.is_empty() {
            bail!("No data fetched for any symbol");
        }

        // One scaler over every symbol's raw rows
        let matrices: Vec<FeatureMatrix> = datasets.iter().map(|(_, m)| m.clone()).collect();
        let combined = FeatureMatrix::stack(&matrices).context("Failed to combine feature rows")?;
        let scaler = DualScaler::fit_features(&combined).context("Failed to fit scaler")?;
        info!("Fitted scaler on {} rows", combined.rows());

        // Windows never cross a symbol boundary
        let windower = SequenceWindower::new(plan.sequence_length);
        let mut train_parts = Vec::new();
        let mut test_parts = Vec::new();
        let mut summaries = Vec::new();
        for (symbol, features) in &datasets {
            let scaled = scaler.transform_features(features)?;
            let batch = match windower.windows(&scaled) {
                Ok(batch) => batch,
                Err(e @ PipelineError::InsufficientData { .. }) => {
                    warn!("Skipping {}: {}", symbol, e);
                    skipped.push(symbol.clone());
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            let (train, test) = batch.split_chronological(plan.test_fraction);
            summaries.push(SymbolSummary {
                symbol: symbol.clone(),
                bars: features.rows(),
                train_windows: train.len(),
                test_windows: test.len(),
            });
            train_parts.push(train);
            test_parts.push(test);
        }

        let train = SequenceBatch::concat(&train_parts)
            .filter(|b| !b.is_empty())
            .context("No training windows: every symbol is shorter than sequence_length + 2 bars")?;
        let test = SequenceBatch::concat(&test_parts).filter(|b| !b.is_empty());
        info!(
            "Created {} training and {} test windows",
            train.len(),
            test.as_ref().map_or(0, SequenceBatch::len)
        );

        let predictor = ForestPredictor::train(&train, &plan.forest)?;

        let backtest_report = match &test {
            Some(test) => Some(backtest(&predictor, test, &scaler)?),
            None => {
                warn!("No test windows; skipping backtest");
                None
            }
        };

        let report = TrainingReport {
            trained_at: Utc::now(),
            model: "SmartCore Random Forest".to_string(),
            sequence_length: plan.sequence_length,
            feature_count: FEATURE_COUNT,
            forest: plan.forest,
            symbols: summaries,
            skipped,
            train_windows: train.len(),
            test_windows: test.as_ref().map_or(0, SequenceBatch::len),
            test_errors: backtest_report.as_ref().and_then(|b| b.model),
            moving_average_errors: backtest_report.as_ref().and_then(|b| b.moving_average),
            linear_trend_errors: backtest_report.as_ref().and_then(|b| b.linear_trend),
        };

        Ok(TrainingOutcome {
            scaler,
            predictor,
            report,
            backtest: backtest_report,
        })
    }
}
