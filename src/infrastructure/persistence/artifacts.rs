use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, anyhow};
use serde::Serialize;
use tracing::info;

use crate::application::ml::evaluation::BacktestRecord;
use crate::application::ml::forest_predictor::ForestPredictor;
use crate::application::ml::onnx_predictor::OnnxPredictor;
use crate::application::ml::predictor::Predictor;
use crate::application::ml::scaler::DualScaler;
use crate::domain::errors::ArtifactError;

pub const REPORT_FILE: &str = "training_report.json";
pub const BACKTEST_FILE: &str = "backtest.csv";

/// Scaler, model and training outputs in one directory.
pub struct ArtifactStore {
    dir: PathBuf,
    scaler_file: String,
    model_file: String,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>, scaler_file: &str, model_file: &str) -> Self {
        Self {
            dir: dir.into(),
            scaler_file: scaler_file.to_string(),
            model_file: model_file.to_string(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn scaler_path(&self) -> PathBuf {
        self.dir.join(&self.scaler_file)
    }

    pub fn model_path(&self) -> PathBuf {
        self.dir.join(&self.model_file)
    }

    pub fn load_scaler(&self) -> Result<DualScaler, ArtifactError> {
        let path = self.scaler_path();
        let content = fs::read_to_string(&path).map_err(|source| ArtifactError::Io {
            path: path.clone(),
            source,
        })?;
        let scaler: DualScaler =
            serde_json::from_str(&content).map_err(|e| ArtifactError::Decode {
                path: path.clone(),
                source: e.into(),
            })?;
        scaler
            .validate_layout()
            .map_err(|reason| ArtifactError::LayoutMismatch {
                path: path.clone(),
                reason,
            })?;

        info!("Loaded scaler from {:?}", path);
        Ok(scaler)
    }

    /// `.onnx` files load through ONNX Runtime, anything else as a forest.
    pub fn load_predictor(
        &self,
        sequence_length: usize,
    ) -> Result<Arc<dyn Predictor>, ArtifactError> {
        let path = self.model_path();
        if path.extension().is_some_and(|ext| ext == "onnx") {
            return Ok(Arc::new(OnnxPredictor::load(&path, sequence_length)?));
        }

        let bytes = fs::read(&path).map_err(|source| ArtifactError::Io {
            path: path.clone(),
            source,
        })?;
        let forest = ForestPredictor::from_json(&bytes).map_err(|source| ArtifactError::Model {
            path: path.clone(),
            source,
        })?;
        if forest.sequence_length() != sequence_length {
            return Err(ArtifactError::LayoutMismatch {
                path,
                reason: format!(
                    "model was trained on windows of {}, configured length is {}",
                    forest.sequence_length(),
                    sequence_length
                ),
            });
        }

        info!("Loaded {} from {:?}", forest.name(), path);
        Ok(Arc::new(forest))
    }

    pub fn save_scaler(&self, scaler: &DualScaler) -> Result<PathBuf, ArtifactError> {
        let path = self.scaler_path();
        let content = serde_json::to_vec_pretty(scaler).map_err(|e| ArtifactError::Write {
            path: path.clone(),
            source: e.into(),
        })?;
        self.write_atomic(&path, &content)?;
        Ok(path)
    }

    pub fn save_forest(&self, forest: &ForestPredictor) -> Result<PathBuf, ArtifactError> {
        let path = self.model_path();
        let content = forest.to_json().map_err(|source| ArtifactError::Write {
            path: path.clone(),
            source,
        })?;
        self.write_atomic(&path, &content)?;
        Ok(path)
    }

    pub fn save_report<T: Serialize>(&self, report: &T) -> Result<PathBuf, ArtifactError> {
        let path = self.dir.join(REPORT_FILE);
        let content = serde_json::to_vec_pretty(report).map_err(|e| ArtifactError::Write {
            path: path.clone(),
            source: e.into(),
        })?;
        self.write_atomic(&path, &content)?;
        Ok(path)
    }

    /// One CSV row per evaluated window.
    pub fn save_backtest(&self, records: &[BacktestRecord]) -> Result<PathBuf, ArtifactError> {
        let path = self.dir.join(BACKTEST_FILE);
        let write = || -> anyhow::Result<Vec<u8>> {
            let mut writer = csv::Writer::from_writer(Vec::new());
            for record in records {
                writer.serialize(record)?;
            }
            writer
                .into_inner()
                .map_err(|e| anyhow!("Failed to flush CSV: {}", e))
        };
        let content = write().map_err(|source| ArtifactError::Write {
            path: path.clone(),
            source,
        })?;
        self.write_atomic(&path, &content)?;
        Ok(path)
    }

    // Write to temp file then rename
    fn write_atomic(&self, path: &Path, content: &[u8]) -> Result<(), ArtifactError> {
        let result = (|| -> anyhow::Result<()> {
            fs::create_dir_all(&self.dir).context("Failed to create artifact directory")?;
            let temp_path = path.with_extension("tmp");
            fs::write(&temp_path, content).context("Failed to write temp file")?;
            fs::rename(&temp_path, path).context("Failed to rename artifact file")?;
            Ok(())
        })();

        result.map_err(|source| ArtifactError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        info!("Saved {:?}", path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ml::feature_selector::FeatureMatrix;
    use crate::domain::ml::feature_registry::FEATURE_COUNT;
    use ndarray::Array2;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "pricecast-artifacts-{}-{}",
            name,
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    fn scaler() -> DualScaler {
        let values = Array2::from_shape_fn((5, FEATURE_COUNT), |(r, c)| (r + c) as f64 + 1.0);
        DualScaler::fit_features(&FeatureMatrix::from_array(values).unwrap()).unwrap()
    }

    #[test]
    fn test_scaler_round_trip() {
        let store = ArtifactStore::new(temp_dir("scaler"), "scaler.json", "model.json");
        let original = scaler();

        store.save_scaler(&original).unwrap();
        let loaded = store.load_scaler().unwrap();
        assert_eq!(loaded, original);

        let _ = fs::remove_dir_all(store.dir());
    }

    #[test]
    fn test_missing_files_are_io_errors() {
        let store = ArtifactStore::new(temp_dir("missing"), "scaler.json", "model.json");
        assert!(matches!(store.load_scaler(), Err(ArtifactError::Io { .. })));
        assert!(matches!(store.load_predictor(60), Err(ArtifactError::Io { .. })));
    }

    #[test]
    fn test_corrupt_scaler_is_decode_error() {
        let store = ArtifactStore::new(temp_dir("corrupt"), "scaler.json", "model.json");
        fs::create_dir_all(store.dir()).unwrap();
        fs::write(store.scaler_path(), "{ not json").unwrap();

        assert!(matches!(store.load_scaler(), Err(ArtifactError::Decode { .. })));
        let _ = fs::remove_dir_all(store.dir());
    }

    #[test]
    fn test_backtest_csv_has_header_and_rows() {
        let store = ArtifactStore::new(temp_dir("csv"), "scaler.json", "model.json");
        let records = vec![
            BacktestRecord {
                window: 0,
                actual: 101.0,
                predicted: 100.5,
                moving_average: Some(100.0),
                linear_trend: None,
            },
            BacktestRecord {
                window: 1,
                actual: 102.0,
                predicted: 101.5,
                moving_average: Some(100.8),
                linear_trend: Some(102.2),
            },
        ];

        let path = store.save_backtest(&records).unwrap();
        let content = fs::read_to_string(path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "window,actual,predicted,moving_average,linear_trend");
        assert_eq!(lines.len(), 3);
        assert!(lines[1].ends_with(','));

        let _ = fs::remove_dir_all(store.dir());
    }
}
