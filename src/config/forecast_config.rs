//! Forecast pipeline and artifact configuration.

use super::{VarLookup, parse_var, process_env};
use crate::application::ml::windower::DEFAULT_SEQUENCE_LENGTH;
use anyhow::{Result, ensure};
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct ForecastEnvConfig {
    pub sequence_length: usize,
    /// Calendar days of history fetched per request
    pub lookback_days: i64,
    /// Bars returned as historical data
    pub history_points: usize,
    pub model_dir: PathBuf,
    pub scaler_file: String,
    pub model_file: String,
}

impl Default for ForecastEnvConfig {
    fn default() -> Self {
        Self {
            sequence_length: DEFAULT_SEQUENCE_LENGTH,
            lookback_days: 365,
            history_points: 300,
            model_dir: PathBuf::from("models"),
            scaler_file: "scaler.json".to_string(),
            model_file: "model.json".to_string(),
        }
    }
}

impl ForecastEnvConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_vars(&process_env)
    }

    pub fn from_vars(vars: VarLookup<'_>) -> Result<Self> {
        let defaults = Self::default();
        let config = Self {
            sequence_length: parse_var(vars, "SEQUENCE_LENGTH", defaults.sequence_length)?,
            lookback_days: parse_var(vars, "LOOKBACK_DAYS", defaults.lookback_days)?,
            history_points: parse_var(vars, "HISTORY_POINTS", defaults.history_points)?,
            model_dir: vars("MODEL_DIR").map(PathBuf::from).unwrap_or(defaults.model_dir),
            scaler_file: vars("SCALER_FILE").unwrap_or(defaults.scaler_file),
            model_file: vars("MODEL_FILE").unwrap_or(defaults.model_file),
        };

        ensure!(config.sequence_length > 0, "SEQUENCE_LENGTH must be > 0");
        ensure!(config.lookback_days > 0, "LOOKBACK_DAYS must be > 0");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forecast_defaults() {
        let config = ForecastEnvConfig::from_vars(&|_: &str| None).unwrap();
        assert_eq!(config.sequence_length, 60);
        assert_eq!(config.lookback_days, 365);
        assert_eq!(config.history_points, 300);
        assert_eq!(config.model_dir, PathBuf::from("models"));
        assert_eq!(config.scaler_file, "scaler.json");
        assert_eq!(config.model_file, "model.json");
    }

    #[test]
    fn test_rejects_zero_sequence_length() {
        let vars = |key: &str| (key == "SEQUENCE_LENGTH").then(|| "0".to_string());
        assert!(ForecastEnvConfig::from_vars(&vars).is_err());
    }

    #[test]
    fn test_overrides() {
        let vars = |key: &str| match key {
            "MODEL_DIR" => Some("/tmp/artifacts".to_string()),
            "MODEL_FILE" => Some("lstm.onnx".to_string()),
            "LOOKBACK_DAYS" => Some("730".to_string()),
            _ => None,
        };
        let config = ForecastEnvConfig::from_vars(&vars).unwrap();
        assert_eq!(config.model_dir, PathBuf::from("/tmp/artifacts"));
        assert_eq!(config.model_file, "lstm.onnx");
        assert_eq!(config.lookback_days, 730);
    }
}
