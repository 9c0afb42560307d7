//! Market data provider configuration.

use super::{VarLookup, parse_var, process_env};
use anyhow::Result;

#[derive(Clone)]
pub struct MarketDataEnvConfig {
    /// Required for the polygon source; never logged
    pub polygon_api_key: Option<String>,
    pub polygon_base_url: String,
    pub http_timeout_secs: u64,
}

impl std::fmt::Debug for MarketDataEnvConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarketDataEnvConfig")
            .field(
                "polygon_api_key",
                &self.polygon_api_key.as_ref().map(|_| "<redacted>"),
            )
            .field("polygon_base_url", &self.polygon_base_url)
            .field("http_timeout_secs", &self.http_timeout_secs)
            .finish()
    }
}

impl MarketDataEnvConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_vars(&process_env)
    }

    pub fn from_vars(vars: VarLookup<'_>) -> Result<Self> {
        Ok(Self {
            polygon_api_key: vars("POLYGON_API_KEY").filter(|k| !k.trim().is_empty()),
            polygon_base_url: vars("POLYGON_BASE_URL")
                .unwrap_or_else(|| "https://api.polygon.io".to_string()),
            http_timeout_secs: parse_var(vars, "HTTP_TIMEOUT_SECS", 30)?,
        })
    }
}
