use anyhow::{Context, anyhow, bail};
use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};
use smartcore::ensemble::random_forest_regressor::{
    RandomForestRegressor, RandomForestRegressorParameters,
};
use smartcore::linalg::basic::matrix::DenseMatrix;
use tracing::info;

use super::predictor::Predictor;
use super::windower::SequenceBatch;
use crate::domain::ml::feature_registry::FEATURE_COUNT;

type Forest = RandomForestRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>>;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestParams {
    /// Number of trees in the random forest
    pub n_trees: usize,
    /// Maximum depth of trees
    pub max_depth: u16,
    /// Minimum samples required to split an internal node
    pub min_split: usize,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: 10,
            min_split: 5,
        }
    }
}

/// Random forest over the flattened `T x F` window.
#[derive(Serialize, Deserialize)]
pub struct ForestPredictor {
    sequence_length: usize,
    feature_count: usize,
    model: Forest,
}

impl ForestPredictor {
    pub fn train(batch: &SequenceBatch, params: &ForestParams) -> anyhow::Result<Self> {
        if batch.is_empty() {
            bail!("cannot train on an empty batch");
        }

        let x = DenseMatrix::from_2d_vec(&batch.flattened_inputs())
            .map_err(|e| anyhow!("Matrix error: {}", e))?;
        let y: Vec<f64> = batch.targets().to_vec();

        let forest_params = RandomForestRegressorParameters::default()
            .with_n_trees(params.n_trees)
            .with_max_depth(params.max_depth)
            .with_min_samples_split(params.min_split);

        info!(
            "Training random forest: {} windows, {} trees, depth {}",
            batch.len(),
            params.n_trees,
            params.max_depth
        );
        let model = RandomForestRegressor::fit(&x, &y, forest_params)
            .map_err(|e| anyhow!("Training failed: {}", e))?;

        Ok(Self {
            sequence_length: batch.sequence_length(),
            feature_count: FEATURE_COUNT,
            model,
        })
    }

    pub fn from_json(bytes: &[u8]) -> anyhow::Result<Self> {
        let predictor: Self =
            serde_json::from_slice(bytes).context("Failed to deserialize forest model")?;
        if predictor.feature_count != FEATURE_COUNT {
            bail!(
                "model expects {} features, current layout has {}",
                predictor.feature_count,
                FEATURE_COUNT
            );
        }
        Ok(predictor)
    }

    pub fn to_json(&self) -> anyhow::Result<Vec<u8>> {
        serde_json::to_vec(self).context("Failed to serialize forest model")
    }

    fn check_shape(&self, window: &ArrayView2<'_, f64>) -> anyhow::Result<()> {
        let (rows, cols) = window.dim();
        if rows != self.sequence_length || cols != self.feature_count {
            bail!(
                "window shape {}x{} does not match model shape {}x{}",
                rows,
                cols,
                self.sequence_length,
                self.feature_count
            );
        }
        Ok(())
    }
}

impl Predictor for ForestPredictor {
    fn predict(&self, window: ArrayView2<'_, f64>) -> anyhow::Result<f64> {
        self.check_shape(&window)?;

        let input: Vec<f64> = window.iter().copied().collect();
        let matrix =
            DenseMatrix::from_2d_vec(&vec![input]).map_err(|e| anyhow!("Matrix error: {}", e))?;

        let predictions = self
            .model
            .predict(&matrix)
            .map_err(|e| anyhow!("Prediction failed: {}", e))?;
        predictions
            .first()
            .copied()
            .ok_or_else(|| anyhow!("No prediction returned"))
    }

    /// Every window in a single smartcore call.
    fn predict_batch(&self, batch: &SequenceBatch) -> anyhow::Result<Vec<f64>> {
        if batch.is_empty() {
            return Ok(Vec::new());
        }
        if batch.sequence_length() != self.sequence_length {
            bail!(
                "window length {} does not match model length {}",
                batch.sequence_length(),
                self.sequence_length
            );
        }
        let x = DenseMatrix::from_2d_vec(&batch.flattened_inputs())
            .map_err(|e| anyhow!("Matrix error: {}", e))?;
        self.model
            .predict(&x)
            .map_err(|e| anyhow!("Prediction failed: {}", e))
    }

    fn name(&self) -> &str {
        "SmartCore Random Forest"
    }

    fn version(&self) -> &str {
        "v1.0"
    }

    fn sequence_length(&self) -> usize {
        self.sequence_length
    }
}
