use ndarray::{Array1, Array3, ArrayView1, ArrayView2, ArrayView3, Axis, s};

use crate::application::ml::scaler::ScaledFeatures;
use crate::domain::errors::PipelineError;
use crate::domain::ml::feature_registry::{FEATURE_COUNT, Feature};

pub const DEFAULT_SEQUENCE_LENGTH: usize = 60;

/// Slices normalized rows into `T x F` windows with next-row close targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceWindower {
    sequence_length: usize,
}

impl Default for SequenceWindower {
    fn default() -> Self {
        Self::new(DEFAULT_SEQUENCE_LENGTH)
    }
}

impl SequenceWindower {
    pub fn new(sequence_length: usize) -> Self {
        Self { sequence_length }
    }

    pub fn sequence_length(&self) -> usize {
        self.sequence_length
    }

    /// Smallest row count that yields at least one window.
    pub fn min_rows(&self) -> usize {
        self.sequence_length + 2
    }

    /// `N - T - 1` windows for `N` rows. The last row never starts a window.
    pub fn window_count(&self, rows: usize) -> usize {
        rows.saturating_sub(self.sequence_length + 1)
    }

    /// `window[i] = rows[i..i+T]`, `target[i] = rows[i+T][close]`.
    pub fn windows(&self, features: &ScaledFeatures) -> Result<SequenceBatch, PipelineError> {
        let rows = features.rows();
        let count = self.window_count(rows);
        if count == 0 || self.sequence_length == 0 {
            return Err(PipelineError::InsufficientData {
                rows,
                required: self.min_rows(),
            });
        }

        let values = features.values();
        let close = Feature::Close.index();
        let t = self.sequence_length;

        let mut inputs = Array3::zeros((count, t, FEATURE_COUNT));
        let mut targets = Array1::zeros(count);
        for i in 0..count {
            inputs
                .index_axis_mut(Axis(0), i)
                .assign(&values.slice(s![i..i + t, ..]));
            targets[i] = values[[i + t, close]];
        }

        Ok(SequenceBatch { inputs, targets })
    }
}

/// Windows and their aligned targets, in chronological order.
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceBatch {
    inputs: Array3<f64>,
    targets: Array1<f64>,
}

impl SequenceBatch {
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn sequence_length(&self) -> usize {
        self.inputs.len_of(Axis(1))
    }

    pub fn inputs(&self) -> ArrayView3<'_, f64> {
        self.inputs.view()
    }

    pub fn targets(&self) -> ArrayView1<'_, f64> {
        self.targets.view()
    }

    pub fn window(&self, index: usize) -> Option<ArrayView2<'_, f64>> {
        (index < self.len()).then(|| self.inputs.index_axis(Axis(0), index))
    }

    pub fn last_window(&self) -> Option<ArrayView2<'_, f64>> {
        self.len().checked_sub(1).and_then(|i| self.window(i))
    }

    /// Chronological train/test split, no shuffling. The test part holds
    /// `ceil(len * test_fraction)` windows.
    pub fn split_chronological(&self, test_fraction: f64) -> (SequenceBatch, SequenceBatch) {
        let len = self.len();
        let test = ((len as f64) * test_fraction.clamp(0.0, 1.0)).ceil() as usize;
        let train = len - test.min(len);
        (self.slice(0, train), self.slice(train, len))
    }

    fn slice(&self, start: usize, end: usize) -> SequenceBatch {
        SequenceBatch {
            inputs: self.inputs.slice(s![start..end, .., ..]).to_owned(),
            targets: self.targets.slice(s![start..end]).to_owned(),
        }
    }

    /// Joins batches with the same window shape.
    pub fn concat(parts: &[SequenceBatch]) -> Option<SequenceBatch> {
        let first = parts.first()?;
        let inputs: Vec<ArrayView3<'_, f64>> = parts.iter().map(|p| p.inputs.view()).collect();
        let targets: Vec<ArrayView1<'_, f64>> = parts.iter().map(|p| p.targets.view()).collect();

        let inputs = ndarray::concatenate(Axis(0), &inputs).ok()?;
        let targets = ndarray::concatenate(Axis(0), &targets).ok()?;
        debug_assert_eq!(inputs.len_of(Axis(1)), first.sequence_length());
        Some(SequenceBatch { inputs, targets })
    }

    /// Each window flattened row-major to `T * F` values.
    pub fn flattened_inputs(&self) -> Vec<Vec<f64>> {
        self.inputs
            .axis_iter(Axis(0))
            .map(|window| window.iter().copied().collect())
            .collect()
    }
}
