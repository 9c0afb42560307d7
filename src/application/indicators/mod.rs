//! Technical indicator computation.
//!
//! Indicators are produced through the [`IndicatorSet`] capability, one pure
//! function per category, each with an explicit parameter struct. The engine
//! validates the raw bars, collects every category's columns and fills the
//! lookback gaps so each column has exactly one value per input bar.

pub mod momentum;
mod series;
pub mod trend;
pub mod volatility;
pub mod volume;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::domain::market::ohlcv::{Bar, OhlcvSeries};
use crate::domain::ml::feature_registry::Feature;

pub use momentum::MomentumParams;
pub use trend::TrendParams;
pub use volatility::VolatilityParams;
pub use volume::VolumeParams;

#[derive(Debug, Error, PartialEq)]
pub enum IndicatorError {
    #[error("Invalid bar at index {index}: {reason}")]
    InvalidBar { index: usize, reason: String },

    #[error("Invalid parameter for {indicator}: {reason}")]
    InvalidParameter {
        indicator: &'static str,
        reason: String,
    },

    #[error("Column {feature} has {actual} values, expected {expected}")]
    LengthMismatch {
        feature: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Column {feature} produced twice")]
    DuplicateColumn { feature: &'static str },
}

/// One derived column. `None` marks a bar with no defined value yet
/// (lookback warm-up or a zero-range division).
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorColumn {
    pub feature: Feature,
    pub values: Vec<Option<f64>>,
}

impl IndicatorColumn {
    pub fn new(feature: Feature, values: Vec<Option<f64>>) -> Self {
        Self { feature, values }
    }

    /// Column from a dense series whose first `warmup` values are not meaningful.
    pub fn warmed(feature: Feature, values: Vec<f64>, warmup: usize) -> Self {
        Self::new(feature, series::mask_warmup(values, warmup))
    }
}

/// Parameter sets for every indicator category.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorParams {
    pub trend: TrendParams,
    pub momentum: MomentumParams,
    pub volatility: VolatilityParams,
    pub volume: VolumeParams,
}

/// Indicator capability: one pure function per category.
pub trait IndicatorSet: Send + Sync {
    fn trend(&self, bars: &[Bar], params: &TrendParams)
    -> Result<Vec<IndicatorColumn>, IndicatorError>;

    fn momentum(
        &self,
        bars: &[Bar],
        params: &MomentumParams,
    ) -> Result<Vec<IndicatorColumn>, IndicatorError>;

    fn volatility(
        &self,
        bars: &[Bar],
        params: &VolatilityParams,
    ) -> Result<Vec<IndicatorColumn>, IndicatorError>;

    fn volume(
        &self,
        bars: &[Bar],
        params: &VolumeParams,
    ) -> Result<Vec<IndicatorColumn>, IndicatorError>;
}

/// Production indicator set (see the category modules for definitions).
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardIndicators;

impl IndicatorSet for StandardIndicators {
    fn trend(
        &self,
        bars: &[Bar],
        params: &TrendParams,
    ) -> Result<Vec<IndicatorColumn>, IndicatorError> {
        trend::compute(bars, params)
    }

    fn momentum(
        &self,
        bars: &[Bar],
        params: &MomentumParams,
    ) -> Result<Vec<IndicatorColumn>, IndicatorError> {
        momentum::compute(bars, params)
    }

    fn volatility(
        &self,
        bars: &[Bar],
        params: &VolatilityParams,
    ) -> Result<Vec<IndicatorColumn>, IndicatorError> {
        volatility::compute(bars, params)
    }

    fn volume(
        &self,
        bars: &[Bar],
        params: &VolumeParams,
    ) -> Result<Vec<IndicatorColumn>, IndicatorError> {
        volume::compute(bars, params)
    }
}

/// Fully populated named columns, one value per input bar.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorFrame {
    len: usize,
    columns: HashMap<Feature, Vec<f64>>,
}

impl IndicatorFrame {
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn column(&self, feature: Feature) -> Option<&[f64]> {
        self.columns.get(&feature).map(Vec::as_slice)
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }
}

pub struct IndicatorEngine {
    indicators: Box<dyn IndicatorSet>,
    params: IndicatorParams,
}

impl Default for IndicatorEngine {
    fn default() -> Self {
        Self::new(Box::new(StandardIndicators), IndicatorParams::default())
    }
}

impl IndicatorEngine {
    pub fn new(indicators: Box<dyn IndicatorSet>, params: IndicatorParams) -> Self {
        Self { indicators, params }
    }

    /// Price columns plus every indicator column, gaps filled.
    pub fn compute(&self, series: &OhlcvSeries) -> Result<IndicatorFrame, IndicatorError> {
        let bars = series.bars();
        validate_bars(bars)?;

        let len = bars.len();
        let mut columns: HashMap<Feature, Vec<f64>> = HashMap::with_capacity(Feature::ALL.len());
        columns.insert(Feature::Open, bars.iter().map(|b| b.open).collect());
        columns.insert(Feature::High, bars.iter().map(|b| b.high).collect());
        columns.insert(Feature::Low, bars.iter().map(|b| b.low).collect());
        columns.insert(Feature::Close, bars.iter().map(|b| b.close).collect());

        let derived = [
            self.indicators.trend(bars, &self.params.trend)?,
            self.indicators.momentum(bars, &self.params.momentum)?,
            self.indicators.volatility(bars, &self.params.volatility)?,
            self.indicators.volume(bars, &self.params.volume)?,
        ];

        for column in derived.into_iter().flatten() {
            let name = column.feature.name();
            if column.values.len() != len {
                return Err(IndicatorError::LengthMismatch {
                    feature: name,
                    expected: len,
                    actual: column.values.len(),
                });
            }
            if columns.contains_key(&column.feature) {
                return Err(IndicatorError::DuplicateColumn { feature: name });
            }
            let filled = fill_missing(&column.values, neutral_value(column.feature));
            columns.insert(column.feature, filled);
        }

        debug!(
            "Computed {} columns over {} bars for {}",
            columns.len(),
            len,
            series.symbol()
        );

        Ok(IndicatorFrame { len, columns })
    }
}

/// Rejects bars no indicator can be computed from.
pub fn validate_bars(bars: &[Bar]) -> Result<(), IndicatorError> {
    for (index, bar) in bars.iter().enumerate() {
        let invalid = |reason: &str| IndicatorError::InvalidBar {
            index,
            reason: reason.to_string(),
        };

        let values = [bar.open, bar.high, bar.low, bar.close, bar.volume];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(invalid("non-finite value"));
        }
        if bar.low <= 0.0 {
            return Err(invalid("prices must be positive"));
        }
        if bar.high < bar.low {
            return Err(invalid("high below low"));
        }
        if bar.open < bar.low || bar.open > bar.high {
            return Err(invalid("open outside the high/low range"));
        }
        if bar.close < bar.low || bar.close > bar.high {
            return Err(invalid("close outside the high/low range"));
        }
        if bar.volume < 0.0 {
            return Err(invalid("negative volume"));
        }
    }
    Ok(())
}

/// Value used when a column never becomes defined.
pub fn neutral_value(feature: Feature) -> f64 {
    match feature {
        Feature::Rsi
        | Feature::Stoch
        | Feature::StochSignal
        | Feature::UltimateOscillator
        | Feature::MoneyFlowIndex => 50.0,
        _ => 0.0,
    }
}

/// Forward fill, then backward fill the leading gap; `neutral` if nothing is defined.
pub fn fill_missing(values: &[Option<f64>], neutral: f64) -> Vec<f64> {
    let Some(first) = values.iter().flatten().copied().find(|v| v.is_finite()) else {
        return vec![neutral; values.len()];
    };

    let mut last = first;
    values
        .iter()
        .map(|value| {
            if let Some(v) = value
                && v.is_finite()
            {
                last = *v;
            }
            last
        })
        .collect()
}
