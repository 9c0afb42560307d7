//! Pricecast Server - next-day close forecasts over HTTP
//!
//! Loads the fitted scaler and model once, then serves `POST /api/predict`.
//!
//! # Usage
//! ```sh
//! POLYGON_API_KEY=... cargo run --bin server
//! DATA_SOURCE=mock cargo run --bin server
//! ```
//!
//! # Environment Variables
//! - `DATA_SOURCE` - `polygon` (default) or `mock`
//! - `MODEL_DIR`, `SCALER_FILE`, `MODEL_FILE` - artifact locations
//! - `SERVER_BIND_ADDRESS`, `SERVER_PORT` - listen address (default 127.0.0.1:5000)

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use pricecast::application::indicators::IndicatorEngine;
use pricecast::application::ml::windower::SequenceWindower;
use pricecast::application::pipeline::{ForecastContext, ForecastService};
use pricecast::config::{Config, DataMode};
use pricecast::domain::ports::MarketDataSource;
use pricecast::infrastructure::core::HttpClientFactory;
use pricecast::infrastructure::persistence::ArtifactStore;
use pricecast::infrastructure::{MockMarketData, PolygonMarketData};
use pricecast::interfaces::{AppState, router};
use tracing::{Level, info};
use tracing_subscriber::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let stdout_layer = tracing_subscriber::fmt::layer().with_target(false);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(stdout_layer)
        .init();

    info!("Pricecast Server {} starting...", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;
    info!(
        "Configuration loaded: Source={:?}, Window={}, Lookback={}d",
        config.data_mode, config.forecast.sequence_length, config.forecast.lookback_days
    );

    // Artifacts are loaded once; any failure here stops startup
    let store = ArtifactStore::new(
        &config.forecast.model_dir,
        &config.forecast.scaler_file,
        &config.forecast.model_file,
    );
    let scaler = store
        .load_scaler()
        .context("Failed to load scaler artifact")?;
    let predictor = store
        .load_predictor(config.forecast.sequence_length)
        .context("Failed to load model artifact")?;
    info!("Model ready: {} ({})", predictor.name(), predictor.version());

    let context = Arc::new(ForecastContext::new(
        IndicatorEngine::default(),
        SequenceWindower::new(config.forecast.sequence_length),
        scaler,
        predictor,
    ));

    let source: Arc<dyn MarketDataSource> = match config.data_mode {
        DataMode::Polygon => {
            let client = HttpClientFactory::create_client(Duration::from_secs(
                config.market_data.http_timeout_secs,
            ))?;
            let api_key = config
                .market_data
                .polygon_api_key
                .clone()
                .context("POLYGON_API_KEY must be set when DATA_SOURCE=polygon")?;
            Arc::new(PolygonMarketData::new(
                client,
                api_key,
                &config.market_data.polygon_base_url,
            )?)
        }
        DataMode::Mock => Arc::new(MockMarketData::synthetic(42)),
    };
    info!("Market data source: {}", source.name());

    let service = Arc::new(ForecastService::new(
        source,
        context,
        config.forecast.lookback_days,
        config.forecast.history_points,
    ));
    let app = router(AppState::new(service));

    let addr = config.server.listen_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl+C: {}", e);
        return;
    }
    info!("Shutdown signal received. Exiting...");
}
