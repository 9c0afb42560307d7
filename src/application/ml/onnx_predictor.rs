use super::predictor::Predictor;
use crate::domain::errors::ArtifactError;
use anyhow::anyhow;
use ndarray::ArrayView2;
use ort::session::Session;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::info;

/// Externally trained sequence model (e.g. an exported LSTM) fed `[1, T, F]` f32.
pub struct OnnxPredictor {
    session: Mutex<Session>,
    model_path: PathBuf,
    sequence_length: usize,
}

impl OnnxPredictor {
    /// Loading failure is returned to the caller; the server treats it as fatal.
    pub fn load(model_path: &Path, sequence_length: usize) -> Result<Self, ArtifactError> {
        let session = Session::builder()
            .map_err(|e| model_error(model_path, e))?
            .commit_from_file(model_path)
            .map_err(|e| model_error(model_path, e))?;

        info!("Successfully loaded ONNX model from {:?}", model_path);
        Ok(Self {
            session: Mutex::new(session),
            model_path: model_path.to_path_buf(),
            sequence_length,
        })
    }
}

fn model_error(path: &Path, err: impl std::fmt::Display) -> ArtifactError {
    ArtifactError::Model {
        path: path.to_path_buf(),
        source: anyhow!("{}", err),
    }
}

impl Predictor for OnnxPredictor {
    fn predict(&self, window: ArrayView2<'_, f64>) -> anyhow::Result<f64> {
        let (rows, features) = window.dim();
        if rows != self.sequence_length {
            return Err(anyhow!(
                "window has {} rows, model expects {}",
                rows,
                self.sequence_length
            ));
        }

        // Single batch: [1, seq_len, features]
        let flat_data: Vec<f32> = window.iter().map(|v| *v as f32).collect();
        let shape = vec![1, rows, features];

        let input_value = ort::value::Value::from_array((shape.as_slice(), flat_data))
            .map_err(|e| anyhow!("Input value creation failed: {}", e))?;
        let inputs = ort::inputs![input_value];

        let mut session = self
            .session
            .lock()
            .map_err(|e| anyhow!("Mutex lock failed: {}", e))?;
        let outputs = session
            .run(inputs)
            .map_err(|e| anyhow!("Inference with {} failed: {}", self.model_path.display(), e))?;

        let output_value = outputs
            .iter()
            .next()
            .map(|(_, v)| v)
            .ok_or_else(|| anyhow!("No output found"))?;
        let data = output_value
            .try_extract_tensor::<f32>()
            .map_err(|e| anyhow!("{}", e))?;
        let value = *data.1.iter().next().ok_or_else(|| anyhow!("Empty output"))?;
        Ok(value as f64)
    }

    fn name(&self) -> &str {
        "ONNX Runtime"
    }

    fn version(&self) -> &str {
        "v1.0"
    }

    fn sequence_length(&self) -> usize {
        self.sequence_length
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_model_is_an_error() {
        let path = Path::new("does_not_exist.onnx");
        match OnnxPredictor::load(path, 60) {
            Err(ArtifactError::Model { path: p, .. }) => assert_eq!(p, path),
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("loading a missing model must fail"),
        }
    }
}
