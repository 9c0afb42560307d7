use anyhow::{anyhow, bail};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::{debug, error};

use crate::domain::errors::MarketDataError;
use crate::domain::market::ohlcv::{Bar, OhlcvSeries};
use crate::domain::market::ticker::normalize_ticker;
use crate::domain::ports::MarketDataSource;

/// Daily aggregates from the Polygon.io REST API.
pub struct PolygonMarketData {
    client: Client,
    api_key: String,
    base_url: Url,
}

#[derive(Debug, Deserialize)]
struct AggregatesResponse {
    #[serde(default)]
    results: Vec<PolygonBar>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
struct PolygonBar {
    /// Window start, Unix milliseconds
    t: i64,
    o: f64,
    h: f64,
    l: f64,
    c: f64,
    v: f64,
}

impl PolygonMarketData {
    pub fn new(client: Client, api_key: String, base_url: &str) -> anyhow::Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| anyhow!("Invalid Polygon base URL {}: {}", base_url, e))?;
        if base_url.cannot_be_a_base() {
            bail!("Polygon base URL {} cannot carry a path", base_url);
        }
        Ok(Self {
            client,
            api_key,
            base_url,
        })
    }

    /// Each variable part is pushed as its own path segment, so `/`, `?` and
    /// `#` in a symbol are percent-encoded rather than reshaping the request.
    fn aggregates_url(&self, symbol: &str, from: NaiveDate, to: NaiveDate) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["v2", "aggs", "ticker"])
                .push(symbol)
                .extend(["range", "1", "day"])
                .push(&from.format("%Y-%m-%d").to_string())
                .push(&to.format("%Y-%m-%d").to_string());
        }
        url
    }
}

fn to_series(symbol: &str, bars: Vec<PolygonBar>) -> Result<OhlcvSeries, MarketDataError> {
    let bars = bars
        .into_iter()
        .map(|bar| {
            let timestamp = DateTime::<Utc>::from_timestamp_millis(bar.t).ok_or_else(|| {
                MarketDataError::Malformed {
                    symbol: symbol.to_string(),
                    reason: format!("invalid timestamp {}", bar.t),
                }
            })?;
            Ok(Bar {
                timestamp,
                open: bar.o,
                high: bar.h,
                low: bar.l,
                close: bar.c,
                volume: bar.v,
            })
        })
        .collect::<Result<Vec<_>, MarketDataError>>()?;

    OhlcvSeries::new(symbol, bars).map_err(|e| MarketDataError::Malformed {
        symbol: symbol.to_string(),
        reason: e.to_string(),
    })
}

#[async_trait]
impl MarketDataSource for PolygonMarketData {
    async fn fetch(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<OhlcvSeries, MarketDataError> {
        let ticker = normalize_ticker(symbol).map_err(|_| MarketDataError::InvalidSymbol {
            symbol: symbol.to_string(),
        })?;
        let symbol = ticker.as_str();
        let url = self.aggregates_url(symbol, from, to);
        debug!("PolygonMarketData: fetching {} ({} to {})", symbol, from, to);

        let request_error = |e: reqwest::Error| MarketDataError::Request {
            symbol: symbol.to_string(),
            // The query string carries the API key
            source: anyhow!(e.without_url()),
        };

        let response = self
            .client
            .get(url)
            .query(&[
                ("adjusted", "true"),
                ("sort", "asc"),
                ("limit", "50000"),
                ("apiKey", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(request_error)?;

        if !response.status().is_success() {
            let status = response.status();
            error!("PolygonMarketData: API error {} for {}", status, symbol);
            return Err(MarketDataError::Status {
                symbol: symbol.to_string(),
                status: status.as_u16(),
            });
        }

        let body: AggregatesResponse = response.json().await.map_err(request_error)?;
        if body.results.is_empty() {
            return Err(MarketDataError::Empty {
                symbol: symbol.to_string(),
                from,
                to,
            });
        }

        to_series(symbol, body.results)
    }

    fn name(&self) -> &str {
        "polygon"
    }
}
