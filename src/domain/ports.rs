use async_trait::async_trait;
use chrono::NaiveDate;

use crate::domain::errors::MarketDataError;
use crate::domain::market::ohlcv::OhlcvSeries;

/// Source of daily OHLCV history.
///
/// Implementations must not retry: a failed or empty fetch is reported immediately.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Daily bars for `symbol` with `from <= date <= to`, oldest first.
    async fn fetch(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<OhlcvSeries, MarketDataError>;

    fn name(&self) -> &str;
}
