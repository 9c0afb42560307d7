use ndarray::Array2;

use crate::application::ml::scaler::{DualScaler, ScalerError};
use crate::domain::ml::feature_registry::{Feature, PRICE_FEATURE_COUNT};

/// Position of close within the price group.
const CLOSE_SLOT: usize = Feature::Close.group_index();

/// Maps normalized close predictions back to prices.
///
/// Places the prediction in the close slot of a zeroed price row and inverts the
/// price group. Correct only while the scaler is per-column; a scaler that mixes
/// columns would make the placeholder values leak into the result.
pub struct PredictionReconstructor<'a> {
    scaler: &'a DualScaler,
}

impl<'a> PredictionReconstructor<'a> {
    pub fn new(scaler: &'a DualScaler) -> Self {
        Self { scaler }
    }

    pub fn reconstruct(&self, normalized: f64) -> Result<f64, ScalerError> {
        let restored = self.reconstruct_many(&[normalized])?;
        Ok(restored[0])
    }

    pub fn reconstruct_many(&self, normalized: &[f64]) -> Result<Vec<f64>, ScalerError> {
        let mut placeholder = Array2::zeros((normalized.len(), PRICE_FEATURE_COUNT));
        for (row, value) in normalized.iter().enumerate() {
            placeholder[[row, CLOSE_SLOT]] = *value;
        }

        let restored = self.scaler.inverse_transform_prices(placeholder.view())?;
        Ok(restored.column(CLOSE_SLOT).to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ml::feature_registry::FEATURE_COUNT;
    use ndarray::Array2;

    fn scaler_with_close_range(min: f64, max: f64) -> DualScaler {
        let prices = ndarray::array![[1.0, 2.0, 0.5, min], [3.0, 9.0, 1.5, max]];
        let indicators = Array2::from_elem((2, FEATURE_COUNT - PRICE_FEATURE_COUNT), 1.0);
        DualScaler::fit(prices.view(), indicators.view()).unwrap()
    }

    #[test]
    fn test_reconstructs_with_close_range() {
        let scaler = scaler_with_close_range(80.0, 120.0);
        let reconstructor = PredictionReconstructor::new(&scaler);

        for p in [0.0, 0.25, 0.5, 1.0, 1.3, -0.2] {
            let expected = p * (120.0 - 80.0) + 80.0;
            assert!((reconstructor.reconstruct(p).unwrap() - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn test_other_price_columns_do_not_leak() {
        let a = scaler_with_close_range(10.0, 20.0);
        // Same close range, very different open/high/low ranges
        let prices = ndarray::array![[500.0, 900.0, 100.0, 10.0], [7000.0, 9000.0, 6.0, 20.0]];
        let indicators = Array2::from_elem((2, FEATURE_COUNT - PRICE_FEATURE_COUNT), 3.0);
        let b = DualScaler::fit(prices.view(), indicators.view()).unwrap();

        let ra = PredictionReconstructor::new(&a).reconstruct(0.7).unwrap();
        let rb = PredictionReconstructor::new(&b).reconstruct(0.7).unwrap();
        assert_eq!(ra, rb);
    }

    #[test]
    fn test_batch_matches_single() {
        let scaler = scaler_with_close_range(50.0, 150.0);
        let reconstructor = PredictionReconstructor::new(&scaler);

        let batch = reconstructor.reconstruct_many(&[0.1, 0.9]).unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0], reconstructor.reconstruct(0.1).unwrap());
        assert_eq!(batch[1], reconstructor.reconstruct(0.9).unwrap());
        assert!(reconstructor.reconstruct_many(&[]).unwrap().is_empty());
    }
}
