use std::path::PathBuf;

use chrono::NaiveDate;
use thiserror::Error;

/// Classified failure of a forecast pipeline run.
///
/// The `Display` text is safe to hand to untrusted callers: causes are kept in
/// `#[source]` fields and only surface through [`PipelineError::diagnostic`].
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Failed to fetch market data for {symbol}")]
    DataFetch {
        symbol: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Failed to compute technical indicators")]
    IndicatorComputation {
        #[source]
        source: anyhow::Error,
    },

    #[error("Required feature column missing: {column}")]
    MissingFeature { column: String },

    #[error("Insufficient data: {rows} rows available, at least {required} required")]
    InsufficientData { rows: usize, required: usize },

    #[error("Model prediction failed")]
    Prediction {
        #[source]
        source: anyhow::Error,
    },

    #[error("Unexpected pipeline failure")]
    Unexpected {
        #[source]
        source: anyhow::Error,
    },
}

/// Coarse classification used by callers to pick a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    DataFetch,
    IndicatorComputation,
    MissingFeature,
    InsufficientData,
    Prediction,
    Unexpected,
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::DataFetch { .. } => ErrorKind::DataFetch,
            PipelineError::IndicatorComputation { .. } => ErrorKind::IndicatorComputation,
            PipelineError::MissingFeature { .. } => ErrorKind::MissingFeature,
            PipelineError::InsufficientData { .. } => ErrorKind::InsufficientData,
            PipelineError::Prediction { .. } => ErrorKind::Prediction,
            PipelineError::Unexpected { .. } => ErrorKind::Unexpected,
        }
    }

    /// Input or upstream data problems the caller can act on.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::DataFetch | ErrorKind::IndicatorComputation | ErrorKind::InsufficientData
        )
    }

    /// Full cause chain, for logs only.
    pub fn diagnostic(&self) -> String {
        let mut message = self.to_string();
        let mut cause = std::error::Error::source(self);
        while let Some(inner) = cause {
            message.push_str(": ");
            message.push_str(&inner.to_string());
            cause = inner.source();
        }
        message
    }
}

/// Errors loading or writing persisted scaler/model artifacts.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("Failed to read artifact {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decode artifact {}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("Artifact {} does not match the feature layout: {reason}", path.display())]
    LayoutMismatch { path: PathBuf, reason: String },

    #[error("Failed to load model {}", path.display())]
    Model {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("Failed to write artifact {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },
}

/// Errors raised by market data sources.
#[derive(Debug, Error)]
pub enum MarketDataError {
    #[error("Invalid symbol {symbol:?}")]
    InvalidSymbol { symbol: String },

    #[error("Request for {symbol} failed")]
    Request {
        symbol: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Provider returned status {status} for {symbol}")]
    Status { symbol: String, status: u16 },

    #[error("No bars for {symbol} between {from} and {to}")]
    Empty {
        symbol: String,
        from: NaiveDate,
        to: NaiveDate,
    },

    #[error("Malformed bars for {symbol}: {reason}")]
    Malformed { symbol: String, reason: String },
}
