use std::ops::Index;

/// Number of model input columns (4 prices + 20 indicators).
pub const FEATURE_COUNT: usize = 24;

/// Number of columns in the price scaler group.
pub const PRICE_FEATURE_COUNT: usize = 4;

/// Ordered list of feature names.
/// This order MUST match the persisted scaler artifact and every trained model.
/// Any change here is a breaking change for ML models.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "open",
    "high",
    "low",
    "close",
    "trend_sma_fast",
    "trend_sma_slow",
    "trend_macd",
    "trend_macd_signal",
    "trend_macd_diff",
    "momentum_rsi",
    "momentum_stoch",
    "momentum_stoch_signal",
    "momentum_tsi",
    "momentum_uo",
    "volatility_atr",
    "volatility_bbm",
    "volatility_bbh",
    "volatility_bbl",
    "volume_adi",
    "volume_obv",
    "volume_vwap",
    "volume_mfi",
    "volume_em",
    "volume_sma_em",
];

/// Scaler group a feature belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureGroup {
    Price,
    Indicator,
}

/// A model input column. The discriminant is the column's index in every
/// feature matrix, so positions are always looked up through this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Feature {
    Open,
    High,
    Low,
    Close,
    SmaFast,
    SmaSlow,
    Macd,
    MacdSignal,
    MacdDiff,
    Rsi,
    Stoch,
    StochSignal,
    Tsi,
    UltimateOscillator,
    Atr,
    BollingerMid,
    BollingerHigh,
    BollingerLow,
    AccDist,
    OnBalanceVolume,
    Vwap,
    MoneyFlowIndex,
    EaseOfMovement,
    EaseOfMovementSma,
}

impl Feature {
    pub const ALL: [Feature; FEATURE_COUNT] = [
        Feature::Open,
        Feature::High,
        Feature::Low,
        Feature::Close,
        Feature::SmaFast,
        Feature::SmaSlow,
        Feature::Macd,
        Feature::MacdSignal,
        Feature::MacdDiff,
        Feature::Rsi,
        Feature::Stoch,
        Feature::StochSignal,
        Feature::Tsi,
        Feature::UltimateOscillator,
        Feature::Atr,
        Feature::BollingerMid,
        Feature::BollingerHigh,
        Feature::BollingerLow,
        Feature::AccDist,
        Feature::OnBalanceVolume,
        Feature::Vwap,
        Feature::MoneyFlowIndex,
        Feature::EaseOfMovement,
        Feature::EaseOfMovementSma,
    ];

    pub const PRICES: [Feature; PRICE_FEATURE_COUNT] =
        [Feature::Open, Feature::High, Feature::Low, Feature::Close];

    /// Column index within the full feature matrix.
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Column index within this feature's scaler group.
    pub const fn group_index(self) -> usize {
        let index = self.index();
        if index < PRICE_FEATURE_COUNT {
            index
        } else {
            index - PRICE_FEATURE_COUNT
        }
    }

    pub const fn group(self) -> FeatureGroup {
        if self.index() < PRICE_FEATURE_COUNT {
            FeatureGroup::Price
        } else {
            FeatureGroup::Indicator
        }
    }

    pub const fn name(self) -> &'static str {
        FEATURE_NAMES[self.index()]
    }

    pub fn from_name(name: &str) -> Option<Feature> {
        Feature::ALL.into_iter().find(|feature| feature.name() == name)
    }

    /// The 20 derived columns, in model order.
    pub fn indicators() -> &'static [Feature] {
        &Feature::ALL[PRICE_FEATURE_COUNT..]
    }
}

/// One bar's worth of model inputs, addressed by name.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureRow {
    values: [f64; FEATURE_COUNT],
}

impl FeatureRow {
    pub fn from_values(values: [f64; FEATURE_COUNT]) -> Self {
        Self { values }
    }

    pub fn get(&self, feature: Feature) -> f64 {
        self.values[feature.index()]
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }
}

impl Index<Feature> for FeatureRow {
    type Output = f64;

    fn index(&self, feature: Feature) -> &f64 {
        &self.values[feature.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_feature_vector_length() {
        assert_eq!(Feature::ALL.len(), FEATURE_NAMES.len());
        assert_eq!(Feature::indicators().len(), 20);
    }

    #[test]
    fn test_feature_consistency() {
        for (position, feature) in Feature::ALL.iter().enumerate() {
            assert_eq!(feature.index(), position);
            assert_eq!(Feature::from_name(feature.name()), Some(*feature));
        }

        let unique: HashSet<&str> = FEATURE_NAMES.iter().copied().collect();
        assert_eq!(unique.len(), FEATURE_COUNT);
    }

    #[test]
    fn test_close_position_is_fixed() {
        assert_eq!(Feature::Close.index(), 3);
        assert_eq!(Feature::Close.group(), FeatureGroup::Price);
        assert_eq!(Feature::Close.group_index(), 3);
        assert_eq!(Feature::SmaFast.group_index(), 0);
        assert_eq!(Feature::EaseOfMovementSma.group_index(), 19);
    }

    #[test]
    fn test_row_named_access() {
        let mut values = [0.0; FEATURE_COUNT];
        values[Feature::Rsi.index()] = 70.0;
        values[Feature::Close.index()] = 101.5;
        let row = FeatureRow::from_values(values);

        assert_eq!(row[Feature::Rsi], 70.0);
        assert_eq!(row.get(Feature::Close), 101.5);
        assert_eq!(row.as_slice().len(), FEATURE_COUNT);
    }
}
