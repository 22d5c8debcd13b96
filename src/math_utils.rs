//! Mathematical utility functions shared by the estimators and the validator.

use crate::errors::{CycleAnalysisError, CycleResult};
use statrs::distribution::{ContinuousCDF, Normal};

/// Variance below this is treated as a constant series.
pub const ZERO_VARIANCE_THRESHOLD: f64 = 1e-13;

/// Total ordering for f64 that places NaN last.
pub fn float_total_cmp(a: &f64, b: &f64) -> std::cmp::Ordering {
    a.total_cmp(b)
}

/// Arithmetic mean; NaN for an empty slice.
pub fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return f64::NAN;
    }
    data.iter().sum::<f64>() / data.len() as f64
}

/// Population (biased, divide by n) variance.
///
/// The biased form keeps autocovariance sequences positive semi-definite,
/// which the Levinson-Durbin recursion relies on.
pub fn calculate_variance(data: &[f64]) -> f64 {
    if data.is_empty() {
        return f64::NAN;
    }
    let m = mean(data);
    data.iter().map(|&x| (x - m) * (x - m)).sum::<f64>() / data.len() as f64
}

/// Lag-1 autocorrelation of a series (biased estimator).
///
/// Returns 0.0 for a constant series. The result is clamped to `[-0.99, 0.99]`
/// so that the AR(1) background spectrum built from it stays finite.
pub fn lag_one_autocorrelation(data: &[f64]) -> f64 {
    let n = data.len();
    if n < 2 {
        return 0.0;
    }
    let m = mean(data);
    let denom: f64 = data.iter().map(|&x| (x - m) * (x - m)).sum();
    if denom <= ZERO_VARIANCE_THRESHOLD * n as f64 {
        return 0.0;
    }
    let num: f64 = data
        .windows(2)
        .map(|w| (w[0] - m) * (w[1] - m))
        .sum();
    (num / denom).clamp(-0.99, 0.99)
}

/// Biased autocovariances γ₀..γ_max_lag of the mean-removed series.
pub fn autocovariances(data: &[f64], max_lag: usize) -> CycleResult<Vec<f64>> {
    let n = data.len();
    if n <= max_lag {
        return Err(CycleAnalysisError::InsufficientData {
            required: max_lag + 1,
            actual: n,
        });
    }
    let m = mean(data);
    let centered: Vec<f64> = data.iter().map(|&x| x - m).collect();
    let gamma = (0..=max_lag)
        .map(|lag| {
            centered[lag..]
                .iter()
                .zip(centered.iter())
                .map(|(a, b)| a * b)
                .sum::<f64>()
                / n as f64
        })
        .collect();
    Ok(gamma)
}

/// Two-sided standard normal quantile for a confidence level.
///
/// 0.95 gives ≈ 1.96.
pub fn two_sided_normal_quantile(confidence: f64) -> CycleResult<f64> {
    let normal = standard_normal()?;
    Ok(normal.inverse_cdf(0.5 + confidence / 2.0))
}

/// Two-tailed p-value of a standard normal statistic.
pub fn two_tailed_normal_p_value(z: f64) -> CycleResult<f64> {
    if !z.is_finite() {
        return Err(CycleAnalysisError::NumericalError {
            reason: format!("z statistic is not finite: {}", z),
            operation: Some("two_tailed_normal_p_value".to_string()),
        });
    }
    let normal = standard_normal()?;
    Ok((2.0 * normal.sf(z.abs())).min(1.0))
}

/// Standard normal CDF Φ(x).
pub fn standard_normal_cdf(x: f64) -> CycleResult<f64> {
    Ok(standard_normal()?.cdf(x))
}

fn standard_normal() -> CycleResult<Normal> {
    Normal::new(0.0, 1.0).map_err(|e| CycleAnalysisError::NumericalError {
        reason: format!("standard normal construction failed: {}", e),
        operation: None,
    })
}
