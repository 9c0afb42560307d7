use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One daily OHLCV bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    /// (high + low + close) / 3
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum SeriesError {
    #[error("series for {symbol} contains no bars")]
    Empty { symbol: String },

    #[error("series for {symbol} is not strictly increasing at bar {index}")]
    NotIncreasing { symbol: String, index: usize },
}

/// Chronologically ordered bars for a single symbol.
///
/// Construction guarantees at least one bar and strictly increasing timestamps,
/// so downstream stages never have to re-check ordering.
#[derive(Debug, Clone, PartialEq)]
pub struct OhlcvSeries {
    symbol: String,
    bars: Vec<Bar>,
}

impl OhlcvSeries {
    pub fn new(symbol: impl Into<String>, bars: Vec<Bar>) -> Result<Self, SeriesError> {
        let symbol = symbol.into();

        if bars.is_empty() {
            return Err(SeriesError::Empty { symbol });
        }

        if let Some(index) = bars
            .windows(2)
            .position(|pair| pair[1].timestamp <= pair[0].timestamp)
        {
            return Err(SeriesError::NotIncreasing {
                symbol,
                index: index + 1,
            });
        }

        Ok(Self { symbol, bars })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Most recent bar.
    pub fn latest(&self) -> &Bar {
        &self.bars[self.bars.len() - 1]
    }

    /// The last `n` bars (or all of them if the series is shorter).
    pub fn tail(&self, n: usize) -> &[Bar] {
        let start = self.bars.len().saturating_sub(n);
        &self.bars[start..]
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|bar| bar.close).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn bar(day: i64, close: f64) -> Bar {
        Bar {
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::days(day),
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 1000.0,
        }
    }

    #[test]
    fn test_rejects_empty_series() {
        let result = OhlcvSeries::new("AAPL", Vec::new());
        assert_eq!(
            result.unwrap_err(),
            SeriesError::Empty {
                symbol: "AAPL".to_string()
            }
        );
    }

    #[test]
    fn test_rejects_duplicate_timestamps() {
        let bars = vec![bar(0, 10.0), bar(1, 11.0), bar(1, 12.0)];
        let result = OhlcvSeries::new("AAPL", bars);
        assert_eq!(
            result.unwrap_err(),
            SeriesError::NotIncreasing {
                symbol: "AAPL".to_string(),
                index: 2
            }
        );
    }

    #[test]
    fn test_tail_and_latest() {
        let bars = (0..5).map(|d| bar(d, 100.0 + d as f64)).collect();
        let series = OhlcvSeries::new("MSFT", bars).unwrap();

        assert_eq!(series.len(), 5);
        assert_eq!(series.latest().close, 104.0);
        assert_eq!(series.tail(2).len(), 2);
        assert_eq!(series.tail(10).len(), 5);
        assert_eq!(series.closes()[0], 100.0);
    }

    #[test]
    fn test_typical_price() {
        let b = bar(0, 10.0);
        assert!((b.typical_price() - 10.0).abs() < 1e-12);
    }
}
