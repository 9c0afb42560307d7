//! Small rolling-window helpers shared by the indicator categories.

use ta::Next;

use super::IndicatorError;

pub(crate) fn require_period(indicator: &'static str, period: usize) -> Result<(), IndicatorError> {
    if period == 0 {
        return Err(IndicatorError::InvalidParameter {
            indicator,
            reason: "period must be > 0".to_string(),
        });
    }
    Ok(())
}

/// Wraps a `ta` constructor error.
pub(crate) fn ta_error(indicator: &'static str, err: impl std::fmt::Debug) -> IndicatorError {
    IndicatorError::InvalidParameter {
        indicator,
        reason: format!("{:?}", err),
    }
}

/// Feeds every value through a `ta` indicator and collects the outputs.
pub(crate) fn run_indicator<I, T>(mut indicator: I, values: &[T]) -> Vec<I::Output>
where
    I: Next<T>,
    T: Copy,
{
    values.iter().map(|value| indicator.next(*value)).collect()
}

/// Drops the first `warmup` entries and any non-finite output.
pub(crate) fn mask_warmup(values: Vec<f64>, warmup: usize) -> Vec<Option<f64>> {
    values
        .into_iter()
        .enumerate()
        .map(|(i, v)| (i >= warmup && v.is_finite()).then_some(v))
        .collect()
}

/// Exponential moving average seeded with the first value, alpha = 2 / (period + 1).
pub(crate) fn ema_series(values: &[f64], period: usize) -> Vec<f64> {
    let alpha = 2.0 / (period as f64 + 1.0);
    let mut out = Vec::with_capacity(values.len());
    let mut current = None;
    for &value in values {
        let next = match current {
            None => value,
            Some(prev) => alpha * value + (1.0 - alpha) * prev,
        };
        current = Some(next);
        out.push(next);
    }
    out
}

/// Rolling sum over complete windows; `None` until the first full window or
/// whenever a window contains a missing value.
pub(crate) fn rolling_sum(values: &[Option<f64>], period: usize) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|i| {
            if i + 1 < period {
                return None;
            }
            values[i + 1 - period..=i]
                .iter()
                .try_fold(0.0, |acc, v| v.map(|v| acc + v))
        })
        .collect()
}

/// Rolling mean over complete windows.
pub(crate) fn sma_series(values: &[Option<f64>], period: usize) -> Vec<Option<f64>> {
    rolling_sum(values, period)
        .into_iter()
        .map(|sum| sum.map(|s| s / period as f64))
        .collect()
}

pub(crate) fn rolling_extreme(
    values: &[f64],
    period: usize,
    pick: fn(f64, f64) -> f64,
) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|i| {
            if i + 1 < period {
                return None;
            }
            values[i + 1 - period..=i].iter().copied().reduce(pick)
        })
        .collect()
}

/// `numerator / denominator`, or `None` when the denominator is zero.
pub(crate) fn ratio(numerator: f64, denominator: f64) -> Option<f64> {
    if denominator == 0.0 {
        None
    } else {
        Some(numerator / denominator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rolling_sum_waits_for_full_window() {
        let values = vec![Some(1.0), Some(2.0), Some(3.0), Some(4.0)];
        assert_eq!(
            rolling_sum(&values, 3),
            vec![None, None, Some(6.0), Some(9.0)]
        );
    }

    #[test]
    fn test_rolling_sum_skips_windows_with_gaps() {
        let values = vec![None, Some(2.0), Some(3.0), Some(4.0)];
        assert_eq!(rolling_sum(&values, 2), vec![None, None, Some(5.0), Some(7.0)]);
    }

    #[test]
    fn test_ema_seeded_with_first_value() {
        let ema = ema_series(&[10.0, 10.0, 13.0], 2);
        assert_eq!(ema[0], 10.0);
        assert_eq!(ema[1], 10.0);
        // alpha = 2/3
        assert!((ema[2] - 12.0).abs() < 1e-12);
    }

    #[test]
    fn test_mask_warmup_drops_non_finite() {
        let masked = mask_warmup(vec![1.0, 2.0, f64::NAN, 4.0], 1);
        assert_eq!(masked, vec![None, Some(2.0), None, Some(4.0)]);
    }

    #[test]
    fn test_rolling_extreme() {
        let values = [3.0, 1.0, 4.0, 1.0, 5.0];
        let highs = rolling_extreme(&values, 2, f64::max);
        assert_eq!(highs, vec![None, Some(3.0), Some(4.0), Some(4.0), Some(5.0)]);
    }

    #[test]
    fn test_require_period() {
        assert!(require_period("sma", 0).is_err());
        assert!(require_period("sma", 1).is_ok());
    }
}
