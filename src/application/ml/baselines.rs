//! Naive forecasts used as reference points for the trained model.

pub const MOVING_AVERAGE_WINDOW: usize = 10;
pub const LINEAR_TREND_WINDOW: usize = 30;
const LINEAR_TREND_MIN_POINTS: usize = 10;

/// Mean of the last `window` closes, `None` if fewer are available.
pub fn moving_average_forecast(closes: &[f64], window: usize) -> Option<f64> {
    if window == 0 || closes.len() < window {
        return None;
    }
    let tail = &closes[closes.len() - window..];
    Some(tail.iter().sum::<f64>() / window as f64)
}

/// Least-squares line through the last `window` closes, extrapolated one step.
/// Needs at least 10 points.
pub fn linear_trend_forecast(closes: &[f64], window: usize) -> Option<f64> {
    if closes.len() < LINEAR_TREND_MIN_POINTS {
        return None;
    }
    let tail = &closes[closes.len().saturating_sub(window.max(LINEAR_TREND_MIN_POINTS))..];
    let n = tail.len() as f64;

    let mean_x = (n - 1.0) / 2.0;
    let mean_y = tail.iter().sum::<f64>() / n;
    let (mut covariance, mut variance) = (0.0, 0.0);
    for (i, y) in tail.iter().enumerate() {
        let dx = i as f64 - mean_x;
        covariance += dx * (y - mean_y);
        variance += dx * dx;
    }
    let slope = covariance / variance;
    Some(mean_y + slope * (n - mean_x))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_moving_average_needs_full_window() {
        let closes: Vec<f64> = (1..=9).map(f64::from).collect();
        assert_eq!(moving_average_forecast(&closes, MOVING_AVERAGE_WINDOW), None);

        let closes: Vec<f64> = (1..=12).map(f64::from).collect();
        // mean of 3..=12
        assert_eq!(moving_average_forecast(&closes, MOVING_AVERAGE_WINDOW), Some(7.5));
    }

    #[test]
    fn test_linear_trend_extrapolates_a_line() {
        let closes: Vec<f64> = (0..40).map(|i| 100.0 + 2.0 * i as f64).collect();
        let forecast = linear_trend_forecast(&closes, LINEAR_TREND_WINDOW).unwrap();
        assert!((forecast - 180.0).abs() < 1e-9);
    }

    #[test]
    fn test_linear_trend_minimum_points() {
        let closes = vec![5.0; 9];
        assert_eq!(linear_trend_forecast(&closes, LINEAR_TREND_WINDOW), None);

        let closes = vec![5.0; 12];
        assert!((linear_trend_forecast(&closes, LINEAR_TREND_WINDOW).unwrap() - 5.0).abs() < 1e-12);
    }
}
