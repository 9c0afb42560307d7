//! Configuration module for pricecast.
//!
//! This module provides structured configuration loading from environment variables,
//! organized by concern: market data, forecasting and the HTTP server.
//! Every loader has a `from_vars` variant taking a lookup function so tests can
//! supply variables without touching the process environment.

mod forecast_config;
mod market_data_config;
mod server_config;

pub use forecast_config::ForecastEnvConfig;
pub use market_data_config::MarketDataEnvConfig;
pub use server_config::ServerEnvConfig;

use anyhow::{Context, Result, anyhow};
use std::env;
use std::fmt::Display;
use std::str::FromStr;

/// Variable lookup used by every `from_vars` loader.
pub type VarLookup<'a> = &'a dyn Fn(&str) -> Option<String>;

pub(crate) fn process_env(key: &str) -> Option<String> {
    env::var(key).ok()
}

/// Parses `key`, falling back to `default` when the variable is unset.
pub(crate) fn parse_var<T>(vars: VarLookup<'_>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match vars(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow!("{}", e))
            .context(format!("Failed to parse {}", key)),
    }
}

/// Where market data comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataMode {
    Polygon,
    Mock,
}

impl FromStr for DataMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "polygon" => Ok(DataMode::Polygon),
            "mock" => Ok(DataMode::Mock),
            _ => anyhow::bail!("Invalid DATA_SOURCE: {}. Must be 'polygon' or 'mock'", s),
        }
    }
}

/// Main application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub data_mode: DataMode,
    pub market_data: MarketDataEnvConfig,
    pub forecast: ForecastEnvConfig,
    pub server: ServerEnvConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_vars(&process_env)
    }

    pub fn from_vars(vars: VarLookup<'_>) -> Result<Self> {
        let data_mode = DataMode::from_str(
            &vars("DATA_SOURCE").unwrap_or_else(|| "polygon".to_string()),
        )?;

        let market_data =
            MarketDataEnvConfig::from_vars(vars).context("Failed to load market data config")?;
        let forecast = ForecastEnvConfig::from_vars(vars).context("Failed to load forecast config")?;
        let server = ServerEnvConfig::from_vars(vars).context("Failed to load server config")?;

        if data_mode == DataMode::Polygon && market_data.polygon_api_key.is_none() {
            anyhow::bail!("POLYGON_API_KEY must be set when DATA_SOURCE=polygon");
        }

        Ok(Self {
            data_mode,
            market_data,
            forecast,
            server,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_mock_mode_needs_no_credentials() {
        let vars = lookup(&[("DATA_SOURCE", "mock")]);
        let config = Config::from_vars(&vars).unwrap();

        assert_eq!(config.data_mode, DataMode::Mock);
        assert_eq!(config.forecast.sequence_length, 60);
        assert_eq!(config.server.port, 5000);
    }

    #[test]
    fn test_polygon_mode_requires_api_key() {
        let vars = lookup(&[]);
        let err = Config::from_vars(&vars).unwrap_err();
        assert!(err.to_string().contains("POLYGON_API_KEY"));

        let vars = lookup(&[("POLYGON_API_KEY", "abc123")]);
        let config = Config::from_vars(&vars).unwrap();
        assert_eq!(config.data_mode, DataMode::Polygon);
        assert_eq!(config.market_data.polygon_api_key.as_deref(), Some("abc123"));
    }

    #[test]
    fn test_invalid_values_are_reported_with_key() {
        let vars = lookup(&[("DATA_SOURCE", "mock"), ("SEQUENCE_LENGTH", "sixty")]);
        let err = Config::from_vars(&vars).unwrap_err();
        assert!(format!("{:#}", err).contains("SEQUENCE_LENGTH"));

        let vars = lookup(&[("DATA_SOURCE", "yahoo")]);
        assert!(Config::from_vars(&vars).is_err());
    }

    #[test]
    fn test_parse_var_default_and_override() {
        let vars = lookup(&[("X", " 42 ")]);
        assert_eq!(parse_var::<u16>(&vars, "X", 1).unwrap(), 42);
        assert_eq!(parse_var::<u16>(&vars, "Y", 7).unwrap(), 7);
    }
}
