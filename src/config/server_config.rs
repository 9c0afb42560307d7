//! HTTP server configuration parsing from environment variables.

use super::{VarLookup, parse_var, process_env};
use anyhow::Result;

/// Server environment configuration
#[derive(Debug, Clone)]
pub struct ServerEnvConfig {
    pub port: u16,
    pub bind_address: String,
}

impl Default for ServerEnvConfig {
    fn default() -> Self {
        Self {
            port: 5000,
            bind_address: "127.0.0.1".to_string(),
        }
    }
}

impl ServerEnvConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_vars(&process_env)
    }

    pub fn from_vars(vars: VarLookup<'_>) -> Result<Self> {
        Ok(Self {
            port: parse_var(vars, "SERVER_PORT", 5000)?,
            bind_address: vars("SERVER_BIND_ADDRESS").unwrap_or_else(|| "127.0.0.1".to_string()),
        })
    }

    /// `address:port` for the listener
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}
