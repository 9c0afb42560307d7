use serde::{Deserialize, Serialize};

use crate::application::pipeline::ForecastReport;
use crate::domain::market::ohlcv::Bar;
use crate::domain::market::ticker::{TickerError, normalize_ticker};
use crate::domain::ml::feature_registry::{Feature, FeatureRow};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PredictRequest {
    #[serde(default)]
    pub symbol: Option<String>,
}

impl PredictRequest {
    /// Validated, upper-cased ticker.
    pub fn ticker(&self) -> Result<String, TickerError> {
        normalize_ticker(self.symbol.as_deref().unwrap_or_default())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub predicted_price: f64,
    pub historical_data: Vec<Bar>,
    pub additional_info: AdditionalInfo,
    /// `YYYY-MM-DD` of the newest bar.
    pub last_updated: String,
}

impl From<ForecastReport> for PredictionResponse {
    fn from(report: ForecastReport) -> Self {
        Self {
            predicted_price: report.predicted_price,
            additional_info: AdditionalInfo::from(&report.latest_features),
            last_updated: report.last_updated.format("%Y-%m-%d").to_string(),
            historical_data: report.history,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BollingerBandsView {
    pub middle: f64,
    pub upper: f64,
    pub lower: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolumeIndicatorsView {
    pub adi: f64,
    pub obv: f64,
    pub mfi: f64,
}

/// Latest raw indicator values shown next to the forecast.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdditionalInfo {
    pub moving_average_fast: f64,
    pub moving_average_slow: f64,
    pub rsi: f64,
    pub stochastic: f64,
    pub stochastic_signal: f64,
    pub macd: f64,
    pub macd_signal: f64,
    pub macd_histogram: f64,
    pub atr: f64,
    pub bollinger_bands: BollingerBandsView,
    pub volume_indicators: VolumeIndicatorsView,
}

impl From<&FeatureRow> for AdditionalInfo {
    fn from(row: &FeatureRow) -> Self {
        Self {
            moving_average_fast: row[Feature::SmaFast],
            moving_average_slow: row[Feature::SmaSlow],
            rsi: row[Feature::Rsi],
            stochastic: row[Feature::Stoch],
            stochastic_signal: row[Feature::StochSignal],
            macd: row[Feature::Macd],
            macd_signal: row[Feature::MacdSignal],
            macd_histogram: row[Feature::MacdDiff],
            atr: row[Feature::Atr],
            bollinger_bands: BollingerBandsView {
                middle: row[Feature::BollingerMid],
                upper: row[Feature::BollingerHigh],
                lower: row[Feature::BollingerLow],
            },
            volume_indicators: VolumeIndicatorsView {
                adi: row[Feature::AccDist],
                obv: row[Feature::OnBalanceVolume],
                mfi: row[Feature::MoneyFlowIndex],
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ml::feature_registry::FEATURE_COUNT;

    #[test]
    fn test_symbol_normalization() {
        let request = |symbol: &str| PredictRequest {
            symbol: Some(symbol.to_string()),
        };
        assert_eq!(request("  ").ticker(), Err(TickerError::Empty));
        assert_eq!(PredictRequest::default().ticker(), Err(TickerError::Empty));
        assert_eq!(request(" aapl ").ticker().as_deref(), Ok("AAPL"));
        assert_eq!(
            request("../../../v3/reference/tickers?x=").ticker(),
            Err(TickerError::Invalid)
        );
    }

    #[test]
    fn test_additional_info_reads_named_columns() {
        let mut values = [0.0; FEATURE_COUNT];
        for feature in Feature::ALL {
            values[feature.index()] = feature.index() as f64;
        }
        let info = AdditionalInfo::from(&FeatureRow::from_values(values));

        assert_eq!(info.moving_average_fast, Feature::SmaFast.index() as f64);
        assert_eq!(info.macd_histogram, Feature::MacdDiff.index() as f64);
        assert_eq!(info.bollinger_bands.upper, Feature::BollingerHigh.index() as f64);
        assert_eq!(info.volume_indicators.mfi, Feature::MoneyFlowIndex.index() as f64);
    }
}
