use ndarray::{ArrayView2, Axis};

use super::windower::SequenceBatch;

/// Trained sequence-regression model.
///
/// Maps one normalized `T x F` window to a normalized next close. Must be
/// deterministic for a fixed model and input.
pub trait Predictor: Send + Sync {
    fn predict(&self, window: ArrayView2<'_, f64>) -> anyhow::Result<f64>;

    /// One prediction per window, in batch order.
    fn predict_batch(&self, batch: &SequenceBatch) -> anyhow::Result<Vec<f64>> {
        batch
            .inputs()
            .axis_iter(Axis(0))
            .map(|window| self.predict(window))
            .collect()
    }

    /// Get model name/type
    fn name(&self) -> &str;

    /// Get model version/id
    fn version(&self) -> &str;

    /// Window length the model was trained on.
    fn sequence_length(&self) -> usize;
}
