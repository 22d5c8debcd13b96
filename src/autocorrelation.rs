//! Partial autocorrelation (PACF) cycle estimator.
//!
//! Biased autocovariances up to `max_lag` feed the Levinson-Durbin recursion,
//! whose reflection coefficients are the partial autocorrelations φ_kk. A lag
//! is significant when |φ_kk| exceeds the large-sample band `z/√N`.

use crate::errors::{validate_data_length, CycleAnalysisError, CycleResult};
use crate::estimators::{dedupe_and_rank, CycleEstimator, DetectedPeak, EstimationMethod, LagWindow};
use crate::linear_algebra::levinson_durbin;
use crate::math_utils::{autocovariances, two_sided_normal_quantile, ZERO_VARIANCE_THRESHOLD};
use crate::preprocessing::AnalysisSeries;

/// Partial-autocorrelation period estimator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PartialAutocorrelationEstimator {
    /// Two-sided confidence level of the significance band
    pub confidence_level: f64,
    /// Drop lags inside the band
    pub significant_only: bool,
}

impl Default for PartialAutocorrelationEstimator {
    fn default() -> Self {
        Self {
            confidence_level: 0.95,
            significant_only: true,
        }
    }
}

impl PartialAutocorrelationEstimator {
    /// Partial autocorrelations φ_11..φ_{max_lag,max_lag} of `values`.
    pub fn pacf(values: &[f64], max_lag: usize) -> CycleResult<Vec<f64>> {
        let gamma = autocovariances(values, max_lag)?;
        if gamma[0] <= ZERO_VARIANCE_THRESHOLD {
            return Err(CycleAnalysisError::SingularSystem {
                lag: 0,
                reason: format!("series variance {:e} is effectively zero", gamma[0]),
            });
        }
        Ok(levinson_durbin(&gamma, max_lag)?.reflection)
    }

    /// Half-width of the significance band for `n` observations.
    pub fn band(&self, n: usize) -> CycleResult<f64> {
        Ok(two_sided_normal_quantile(self.confidence_level)? / (n as f64).sqrt())
    }
}

impl CycleEstimator for PartialAutocorrelationEstimator {
    fn method(&self) -> EstimationMethod {
        EstimationMethod::Pacf
    }

    /// Enough values that every autocovariance up to `max_lag` averages over
    /// more than `max_lag` products.
    fn burn_in(&self, window: LagWindow) -> usize {
        window.max_lag + 2
    }

    fn significant_only(&self) -> bool {
        self.significant_only
    }

    fn candidates(&self, series: &AnalysisSeries, window: LagWindow) -> CycleResult<Vec<DetectedPeak>> {
        let values = &series.values;
        validate_data_length(values, window.max_lag + self.burn_in(window))?;

        let pacf = Self::pacf(values, window.max_lag)?;
        let band = self.band(values.len())?;

        let peaks: Vec<DetectedPeak> = (window.min_lag..=window.max_lag)
            .map(|lag| {
                let strength = pacf[lag - 1].abs();
                DetectedPeak {
                    instrument: series.instrument.clone(),
                    method: EstimationMethod::Pacf,
                    lag,
                    strength,
                    significant: strength > band,
                    threshold: band,
                }
            })
            .collect();

        let peaks = dedupe_and_rank(peaks);
        log::debug!(
            "{}: pacf band ±{:.4}, {} of {} lags significant in {}",
            series.instrument,
            band,
            peaks.iter().filter(|p| p.significant).count(),
            peaks.len(),
            window
        );
        Ok(peaks)
    }
}
