//! Min-max normalization with independent price and indicator groups.
//!
//! Prices trend without bound over years while most indicators are bounded
//! oscillators, so each group gets its own per-column ranges. Every column is
//! scaled independently of the others; the close reconstruction relies on it.

use ndarray::{Array2, ArrayView2, Axis, concatenate, s};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::ml::feature_selector::FeatureMatrix;
use crate::domain::ml::feature_registry::{FEATURE_COUNT, FEATURE_NAMES, PRICE_FEATURE_COUNT};

#[derive(Debug, Error, PartialEq)]
pub enum ScalerError {
    #[error("Cannot fit a scaler on an empty sample")]
    EmptySample,

    #[error("Expected {expected} columns, got {actual}")]
    ColumnMismatch { expected: usize, actual: usize },

    #[error("Non-finite value in column {column}")]
    NonFinite { column: String },
}

/// Fitted `(min, max)` of one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnRange {
    pub name: String,
    pub min: f64,
    pub max: f64,
}

impl ColumnRange {
    /// `max - min`, or 1.0 for a constant column.
    pub fn span(&self) -> f64 {
        let span = self.max - self.min;
        if span == 0.0 { 1.0 } else { span }
    }

    /// Not clipped: values outside the fitted range leave [0, 1].
    pub fn scale(&self, x: f64) -> f64 {
        (x - self.min) / self.span()
    }

    pub fn unscale(&self, scaled: f64) -> f64 {
        scaled * self.span() + self.min
    }
}

/// Ordered per-column ranges for one group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MinMaxScaler {
    columns: Vec<ColumnRange>,
}

impl MinMaxScaler {
    pub fn fit(names: &[&str], sample: ArrayView2<'_, f64>) -> Result<Self, ScalerError> {
        if sample.nrows() == 0 {
            return Err(ScalerError::EmptySample);
        }
        check_width(names.len(), sample.ncols())?;

        let columns = names
            .iter()
            .zip(sample.axis_iter(Axis(1)))
            .map(|(name, column)| {
                if column.iter().any(|v| !v.is_finite()) {
                    return Err(ScalerError::NonFinite {
                        column: name.to_string(),
                    });
                }
                let min = column.iter().copied().fold(f64::INFINITY, f64::min);
                let max = column.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                Ok(ColumnRange {
                    name: name.to_string(),
                    min,
                    max,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { columns })
    }

    pub fn columns(&self) -> &[ColumnRange] {
        &self.columns
    }

    pub fn transform(&self, sample: ArrayView2<'_, f64>) -> Result<Array2<f64>, ScalerError> {
        self.apply(sample, ColumnRange::scale)
    }

    pub fn inverse_transform(&self, scaled: ArrayView2<'_, f64>) -> Result<Array2<f64>, ScalerError> {
        self.apply(scaled, ColumnRange::unscale)
    }

    fn apply(
        &self,
        sample: ArrayView2<'_, f64>,
        op: fn(&ColumnRange, f64) -> f64,
    ) -> Result<Array2<f64>, ScalerError> {
        check_width(self.columns.len(), sample.ncols())?;
        let mut out = sample.to_owned();
        for (mut column, range) in out.axis_iter_mut(Axis(1)).zip(&self.columns) {
            column.mapv_inplace(|v| op(range, v));
        }
        Ok(out)
    }
}

fn check_width(expected: usize, actual: usize) -> Result<(), ScalerError> {
    if expected != actual {
        return Err(ScalerError::ColumnMismatch { expected, actual });
    }
    Ok(())
}

/// Normalized `N x F` feature matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct ScaledFeatures {
    values: Array2<f64>,
}

impl ScaledFeatures {
    /// Wraps values already in normalized space; `None` unless `FEATURE_COUNT` wide.
    pub fn from_normalized(values: Array2<f64>) -> Option<Self> {
        (values.ncols() == FEATURE_COUNT).then_some(Self { values })
    }

    pub fn rows(&self) -> usize {
        self.values.nrows()
    }

    pub fn values(&self) -> ArrayView2<'_, f64> {
        self.values.view()
    }
}

/// Fitted once during training, read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DualScaler {
    price_columns: MinMaxScaler,
    indicator_columns: MinMaxScaler,
}

impl DualScaler {
    pub fn fit(
        prices: ArrayView2<'_, f64>,
        indicators: ArrayView2<'_, f64>,
    ) -> Result<Self, ScalerError> {
        Ok(Self {
            price_columns: MinMaxScaler::fit(&FEATURE_NAMES[..PRICE_FEATURE_COUNT], prices)?,
            indicator_columns: MinMaxScaler::fit(&FEATURE_NAMES[PRICE_FEATURE_COUNT..], indicators)?,
        })
    }

    pub fn fit_features(features: &FeatureMatrix) -> Result<Self, ScalerError> {
        Self::fit(features.prices(), features.indicators())
    }

    pub fn price_columns(&self) -> &[ColumnRange] {
        self.price_columns.columns()
    }

    pub fn indicator_columns(&self) -> &[ColumnRange] {
        self.indicator_columns.columns()
    }

    pub fn transform(
        &self,
        prices: ArrayView2<'_, f64>,
        indicators: ArrayView2<'_, f64>,
    ) -> Result<(Array2<f64>, Array2<f64>), ScalerError> {
        Ok((
            self.price_columns.transform(prices)?,
            self.indicator_columns.transform(indicators)?,
        ))
    }

    pub fn inverse_transform(
        &self,
        prices: ArrayView2<'_, f64>,
        indicators: ArrayView2<'_, f64>,
    ) -> Result<(Array2<f64>, Array2<f64>), ScalerError> {
        Ok((
            self.price_columns.inverse_transform(prices)?,
            self.indicator_columns.inverse_transform(indicators)?,
        ))
    }

    pub fn inverse_transform_prices(
        &self,
        prices: ArrayView2<'_, f64>,
    ) -> Result<Array2<f64>, ScalerError> {
        self.price_columns.inverse_transform(prices)
    }

    /// Scales both groups and joins them back in feature order.
    pub fn transform_features(&self, features: &FeatureMatrix) -> Result<ScaledFeatures, ScalerError> {
        let (prices, indicators) = self.transform(features.prices(), features.indicators())?;
        let values = concatenate(Axis(1), &[prices.view(), indicators.view()]).map_err(|_| {
            ScalerError::ColumnMismatch {
                expected: FEATURE_COUNT,
                actual: prices.ncols() + indicators.ncols(),
            }
        })?;
        Ok(ScaledFeatures { values })
    }

    /// Splits normalized features back into raw feature space.
    pub fn inverse_transform_features(
        &self,
        scaled: &ScaledFeatures,
    ) -> Result<FeatureMatrix, ScalerError> {
        let values = scaled.values();
        let (prices, indicators) = self.inverse_transform(
            values.slice(s![.., ..PRICE_FEATURE_COUNT]),
            values.slice(s![.., PRICE_FEATURE_COUNT..]),
        )?;
        let joined = concatenate(Axis(1), &[prices.view(), indicators.view()]).map_err(|_| {
            ScalerError::ColumnMismatch {
                expected: FEATURE_COUNT,
                actual: prices.ncols() + indicators.ncols(),
            }
        })?;
        FeatureMatrix::from_array(joined).ok_or(ScalerError::ColumnMismatch {
            expected: FEATURE_COUNT,
            actual: values.ncols(),
        })
    }

    /// Checks that the persisted column names match the current feature layout.
    pub fn validate_layout(&self) -> Result<(), String> {
        let names: Vec<&str> = self
            .price_columns()
            .iter()
            .chain(self.indicator_columns())
            .map(|c| c.name.as_str())
            .collect();

        if names.len() != FEATURE_COUNT {
            return Err(format!(
                "expected {} columns, found {}",
                FEATURE_COUNT,
                names.len()
            ));
        }
        if self.price_columns().len() != PRICE_FEATURE_COUNT {
            return Err(format!(
                "expected {} price columns, found {}",
                PRICE_FEATURE_COUNT,
                self.price_columns().len()
            ));
        }
        for (position, (found, expected)) in names.iter().zip(FEATURE_NAMES).enumerate() {
            if *found != expected {
                return Err(format!(
                    "column {} is '{}', expected '{}'",
                    position, found, expected
                ));
            }
        }
        if let Some(bad) = self
            .price_columns()
            .iter()
            .chain(self.indicator_columns())
            .find(|c| !c.min.is_finite() || !c.max.is_finite() || c.min > c.max)
        {
            return Err(format!("column '{}' has an invalid range", bad.name));
        }
        Ok(())
    }
}
