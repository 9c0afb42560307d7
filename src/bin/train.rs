//! Offline training: fetch history, fit the scaler, train a random forest and
//! write every artifact the server needs into the model directory.
//!
//! # Usage
//! ```sh
//! cargo run --bin train -- --plan plans/default.toml
//! cargo run --bin train -- --mock --symbols AAPL,MSFT --n-trees 20
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use pricecast::application::training::{TrainingJob, TrainingPlan};
use pricecast::config::MarketDataEnvConfig;
use pricecast::domain::ports::MarketDataSource;
use pricecast::infrastructure::core::HttpClientFactory;
use pricecast::infrastructure::persistence::ArtifactStore;
use pricecast::infrastructure::{MockMarketData, PolygonMarketData};
use tracing::{Level, info, warn};
use tracing_subscriber::prelude::*;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// TOML training plan; flags below override its values
    #[arg(long)]
    plan: Option<PathBuf>,

    /// Comma-separated ticker list
    #[arg(long, value_delimiter = ',')]
    symbols: Option<Vec<String>>,

    /// First day of history (YYYY-MM-DD)
    #[arg(long)]
    start: Option<NaiveDate>,

    /// Last day of history (YYYY-MM-DD)
    #[arg(long)]
    end: Option<NaiveDate>,

    /// Bars per input window
    #[arg(long)]
    sequence_length: Option<usize>,

    /// Share of each symbol's windows held out for evaluation
    #[arg(long)]
    test_fraction: Option<f64>,

    /// Number of trees in the random forest
    #[arg(long)]
    n_trees: Option<usize>,

    /// Maximum depth of trees
    #[arg(long)]
    max_depth: Option<u16>,

    /// Minimum samples required to split an internal node
    #[arg(long)]
    min_split: Option<usize>,

    /// Output directory for scaler, model, report and backtest
    #[arg(long, default_value = "models")]
    model_dir: PathBuf,

    /// Scaler file name inside the model directory
    #[arg(long, default_value = "scaler.json")]
    scaler_file: String,

    /// Model file name inside the model directory
    #[arg(long, default_value = "model.json")]
    model_file: String,

    /// Use the synthetic data source instead of Polygon
    #[arg(long)]
    mock: bool,

    /// Seed for the synthetic data source
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

impl Args {
    fn resolve_plan(&self) -> Result<TrainingPlan> {
        let mut plan = match &self.plan {
            Some(path) => TrainingPlan::from_file(path)?,
            None => TrainingPlan::default(),
        };

        if let Some(symbols) = &self.symbols {
            plan.symbols = symbols
                .iter()
                .map(|s| s.trim().to_uppercase())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Some(start) = self.start {
            plan.start = start;
        }
        if let Some(end) = self.end {
            plan.end = end;
        }
        if let Some(length) = self.sequence_length {
            plan.sequence_length = length;
        }
        if let Some(fraction) = self.test_fraction {
            plan.test_fraction = fraction;
        }
        if let Some(n_trees) = self.n_trees {
            plan.forest.n_trees = n_trees;
        }
        if let Some(max_depth) = self.max_depth {
            plan.forest.max_depth = max_depth;
        }
        if let Some(min_split) = self.min_split {
            plan.forest.min_split = min_split;
        }

        plan.validate()?;
        Ok(plan)
    }
}

fn market_data_source(args: &Args) -> Result<Arc<dyn MarketDataSource>> {
    if args.mock {
        return Ok(Arc::new(MockMarketData::synthetic(args.seed)));
    }

    let config = MarketDataEnvConfig::from_env()?;
    let api_key = config
        .polygon_api_key
        .clone()
        .context("POLYGON_API_KEY must be set (or pass --mock)")?;
    let client = HttpClientFactory::create_client(Duration::from_secs(config.http_timeout_secs))?;
    Ok(Arc::new(PolygonMarketData::new(
        client,
        api_key,
        &config.polygon_base_url,
    )?))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let args = Args::parse();
    let plan = args.resolve_plan()?;
    info!(
        "Training on {:?} from {} to {} (window {}, test fraction {})",
        plan.symbols, plan.start, plan.end, plan.sequence_length, plan.test_fraction
    );

    let source = market_data_source(&args)?;
    let outcome = TrainingJob::new(source, plan).run().await?;

    let store = ArtifactStore::new(&args.model_dir, &args.scaler_file, &args.model_file);
    let scaler_path = store.save_scaler(&outcome.scaler)?;
    let model_path = store.save_forest(&outcome.predictor)?;
    let report_path = store.save_report(&outcome.report)?;
    info!("Saved scaler to {:?}", scaler_path);
    info!("Saved model to {:?}", model_path);
    info!("Saved training report to {:?}", report_path);

    match &outcome.backtest {
        Some(backtest) => {
            let csv_path = store.save_backtest(&backtest.records)?;
            info!("Saved backtest to {:?}", csv_path);
        }
        None => warn!("No test windows; backtest not written"),
    }

    let report = &outcome.report;
    println!("\n=== Training Summary ===");
    println!("Model:           {}", report.model);
    println!("Train windows:   {}", report.train_windows);
    println!("Test windows:    {}", report.test_windows);
    for symbol in &report.symbols {
        println!(
            "  {:<8} {:>5} bars  {:>5} train  {:>4} test",
            symbol.symbol, symbol.bars, symbol.train_windows, symbol.test_windows
        );
    }
    if !report.skipped.is_empty() {
        println!("Skipped:         {}", report.skipped.join(", "));
    }

    let rows = [
        ("Random forest", report.test_errors),
        ("Moving average", report.moving_average_errors),
        ("Linear trend", report.linear_trend_errors),
    ];
    println!("\n{:<16} {:>12} {:>12} {:>12}", "Forecast", "MAE", "MSE", "RMSE");
    for (label, errors) in rows {
        match errors {
            Some(e) => println!("{:<16} {:>12.4} {:>12.4} {:>12.4}", label, e.mae, e.mse, e.rmse),
            None => println!("{:<16} {:>12}", label, "n/a"),
        }
    }

    Ok(())
}
