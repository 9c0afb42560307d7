use std::collections::{HashMap, HashSet};

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::domain::errors::MarketDataError;
use crate::domain::market::ohlcv::{Bar, OhlcvSeries};
use crate::domain::ports::MarketDataSource;

enum Mode {
    /// Seeded random walk for any symbol
    Synthetic { seed: u64 },
    /// Only the given bars
    Fixed(HashMap<String, Vec<Bar>>),
}

/// Offline market data for tests and dry runs.
pub struct MockMarketData {
    mode: Mode,
    failing: HashSet<String>,
}

impl MockMarketData {
    /// Deterministic weekday bars for every symbol.
    pub fn synthetic(seed: u64) -> Self {
        Self {
            mode: Mode::Synthetic { seed },
            failing: HashSet::new(),
        }
    }

    /// Serves the given series, filtered to the requested dates. Unknown
    /// symbols have no data.
    pub fn with_series(series: Vec<OhlcvSeries>) -> Self {
        let fixed = series
            .into_iter()
            .map(|s| (s.symbol().to_string(), s.bars().to_vec()))
            .collect();
        Self {
            mode: Mode::Fixed(fixed),
            failing: HashSet::new(),
        }
    }

    /// Makes every fetch for `symbol` fail with a request error.
    pub fn failing_for(mut self, symbol: &str) -> Self {
        self.failing.insert(symbol.to_string());
        self
    }

    fn generate(seed: u64, symbol: &str, from: NaiveDate, to: NaiveDate) -> Vec<Bar> {
        let symbol_seed = symbol
            .bytes()
            .fold(seed, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64));
        let mut rng = StdRng::seed_from_u64(symbol_seed);
        let mut close: f64 = rng.random_range(50.0..250.0);

        let mut bars = Vec::new();
        let mut day = from;
        while day <= to {
            if !matches!(day.weekday(), Weekday::Sat | Weekday::Sun) {
                let open = close;
                close = (open * (1.0 + rng.random_range(-0.02..0.02))).max(1.0);
                let high = open.max(close) * (1.0 + rng.random_range(0.0..0.01));
                let low = open.min(close) * (1.0 - rng.random_range(0.0..0.01));
                bars.push(Bar {
                    timestamp: Utc.from_utc_datetime(&day.and_time(NaiveTime::MIN)),
                    open,
                    high,
                    low,
                    close,
                    volume: rng.random_range(1_000_000.0..5_000_000.0_f64).round(),
                });
            }
            day += Duration::days(1);
        }
        bars
    }
}

#[async_trait]
impl MarketDataSource for MockMarketData {
    async fn fetch(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<OhlcvSeries, MarketDataError> {
        if self.failing.contains(symbol) {
            return Err(MarketDataError::Request {
                symbol: symbol.to_string(),
                source: anyhow!("simulated outage"),
            });
        }

        let bars = match &self.mode {
            Mode::Synthetic { seed } => Self::generate(*seed, symbol, from, to),
            Mode::Fixed(series) => series
                .get(symbol)
                .map(|bars| {
                    bars.iter()
                        .filter(|b| {
                            let date = b.timestamp.date_naive();
                            date >= from && date <= to
                        })
                        .copied()
                        .collect()
                })
                .unwrap_or_default(),
        };

        if bars.is_empty() {
            return Err(MarketDataError::Empty {
                symbol: symbol.to_string(),
                from,
                to,
            });
        }

        OhlcvSeries::new(symbol, bars).map_err(|e| MarketDataError::Malformed {
            symbol: symbol.to_string(),
            reason: e.to_string(),
        })
    }

    fn name(&self) -> &str {
        "mock"
    }
}
