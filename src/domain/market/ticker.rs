use thiserror::Error;

/// Longest ticker accepted, including any exchange prefix (`X:BTCUSD`).
pub const MAX_TICKER_LEN: usize = 16;

#[derive(Debug, Error, PartialEq)]
pub enum TickerError {
    #[error("No symbol provided")]
    Empty,

    #[error("Invalid symbol")]
    Invalid,
}

/// Trims and upper-cases `raw`, then checks it is a plain ticker.
///
/// Accepted: ASCII letters, digits, `.`, `:` and `-`, starting with a letter
/// or digit. Anything else (path separators, `?`, `#`, `%`, whitespace) is
/// rejected, so a ticker is always safe as a single URL path segment.
pub fn normalize_ticker(raw: &str) -> Result<String, TickerError> {
    let ticker = raw.trim().to_ascii_uppercase();
    if ticker.is_empty() {
        return Err(TickerError::Empty);
    }
    if ticker.len() > MAX_TICKER_LEN {
        return Err(TickerError::Invalid);
    }

    let mut chars = ticker.chars();
    let starts_alphanumeric = chars.next().is_some_and(|c| c.is_ascii_alphanumeric());
    let rest_allowed = chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | ':' | '-'));
    if !(starts_alphanumeric && rest_allowed) {
        return Err(TickerError::Invalid);
    }
    Ok(ticker)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_common_tickers() {
        assert_eq!(normalize_ticker(" aapl ").unwrap(), "AAPL");
        assert_eq!(normalize_ticker("BRK.B").unwrap(), "BRK.B");
        assert_eq!(normalize_ticker("x:btcusd").unwrap(), "X:BTCUSD");
        assert_eq!(normalize_ticker("RDS-A").unwrap(), "RDS-A");
    }

    #[test]
    fn test_blank_is_empty() {
        assert_eq!(normalize_ticker(""), Err(TickerError::Empty));
        assert_eq!(normalize_ticker("   "), Err(TickerError::Empty));
    }

    #[test]
    fn test_rejects_url_syntax() {
        for raw in [
            "../../../v3/reference/tickers?x=",
            "AAPL/range/1/day/1990-01-01/2030-01-01#",
            "AAPL?apiKey=x",
            "AAPL#",
            "..",
            ".A",
            "AA PL",
            "AAPL%2F",
            "ÄAPL",
        ] {
            assert_eq!(normalize_ticker(raw), Err(TickerError::Invalid), "{raw}");
        }
    }

    #[test]
    fn test_rejects_overlong() {
        assert_eq!(
            normalize_ticker(&"A".repeat(MAX_TICKER_LEN + 1)),
            Err(TickerError::Invalid)
        );
        assert!(normalize_ticker(&"A".repeat(MAX_TICKER_LEN)).is_ok());
    }
}
