//! Statistical tests for cycle significance and coverage validation.
//!
//! Two families live here. The AR(1) red-noise background and its chi-squared
//! confidence contours decide whether a spectral or wavelet peak is
//! significant. The one-sample proportion z-test and the exact binomial tail
//! decide whether catalog coverage across instruments exceeds chance.

use crate::errors::{validate_parameter, CycleAnalysisError, CycleResult};
use crate::math_utils::{calculate_variance, lag_one_autocorrelation, two_tailed_normal_p_value};
use statrs::distribution::{Binomial, ChiSquared, ContinuousCDF, DiscreteCDF};
use std::f64::consts::PI;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Empirical decorrelation factor for the Morlet wavelet (Torrence & Compo 1998, Table 2).
pub const MORLET_DECORRELATION_GAMMA: f64 = 2.32;

/// AR(1) red-noise model fitted to an analysis series.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RedNoiseModel {
    /// Lag-1 autocorrelation α
    pub alpha: f64,
    /// Series variance σ²
    pub variance: f64,
}

impl RedNoiseModel {
    /// Fit α and σ² from the series.
    pub fn fit(data: &[f64]) -> Self {
        Self {
            alpha: lag_one_autocorrelation(data),
            variance: calculate_variance(data),
        }
    }

    /// Normalised AR(1) spectrum at `frequency` (cycles per sample).
    ///
    /// `(1 - α²) / (1 + α² - 2α cos 2πf)`; integrates to one over the band so
    /// multiplying by σ² gives the background power.
    pub fn normalized_spectrum(&self, frequency: f64) -> f64 {
        let a = self.alpha;
        (1.0 - a * a) / (1.0 + a * a - 2.0 * a * (2.0 * PI * frequency).cos())
    }

    /// Background power at `frequency`.
    pub fn background_power(&self, frequency: f64) -> f64 {
        self.variance * self.normalized_spectrum(frequency)
    }

    /// Significance threshold for a single periodogram ordinate (2 dof).
    pub fn periodogram_threshold(&self, frequency: f64, confidence: f64) -> CycleResult<f64> {
        Ok(self.background_power(frequency) * chi_squared_ratio(2.0, confidence)?)
    }

    /// Significance threshold for a time-averaged wavelet power.
    ///
    /// `n_averaged` points at `scale` give `ν = 2·√(1 + (n_a / (γ s))²)`
    /// degrees of freedom.
    pub fn global_wavelet_threshold(
        &self,
        period: f64,
        scale: f64,
        n_averaged: usize,
        confidence: f64,
    ) -> CycleResult<f64> {
        let ratio = n_averaged as f64 / (MORLET_DECORRELATION_GAMMA * scale);
        let dof = (2.0 * (1.0 + ratio * ratio).sqrt()).max(2.0);
        Ok(self.background_power(1.0 / period) * chi_squared_ratio(dof, confidence)?)
    }
}

/// `χ²_ν(confidence) / ν`, the multiplier that turns a mean spectrum into a
/// confidence contour.
pub fn chi_squared_ratio(dof: f64, confidence: f64) -> CycleResult<f64> {
    validate_parameter(confidence, 0.5, 0.9999, "confidence_level")?;
    let chi = ChiSquared::new(dof).map_err(|e| CycleAnalysisError::NumericalError {
        reason: format!("chi-squared with {} dof: {}", dof, e),
        operation: Some("chi_squared_ratio".to_string()),
    })?;
    Ok(chi.inverse_cdf(confidence) / dof)
}

/// Result of a one-sample proportion z-test.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ProportionTest {
    /// Observed successes
    pub observed: usize,
    /// Trials
    pub trials: usize,
    /// Null success probability
    pub null_probability: f64,
    /// Expected successes `N·p`
    pub expected: f64,
    /// z statistic
    pub z: f64,
    /// Two-tailed p-value from the standard normal
    pub p_value: f64,
}

/// One-sample proportion z-test `z = (k - Np) / √(Np(1-p))`.
///
/// Degenerate variance (N = 0, p = 0 or p = 1) yields `z = 0`, `p = 1`.
pub fn proportion_z_test(
    observed: usize,
    trials: usize,
    null_probability: f64,
) -> CycleResult<ProportionTest> {
    validate_parameter(null_probability, 0.0, 1.0, "null_probability")?;
    if observed > trials {
        return Err(CycleAnalysisError::InvalidParameter {
            parameter: "observed".to_string(),
            value: observed as f64,
            constraint: format!("<= trials ({})", trials),
        });
    }

    let n = trials as f64;
    let expected = n * null_probability;
    let variance = n * null_probability * (1.0 - null_probability);

    let (z, p_value) = if variance > 0.0 {
        let z = (observed as f64 - expected) / variance.sqrt();
        (z, two_tailed_normal_p_value(z)?)
    } else {
        log::warn!(
            "Degenerate proportion test (N = {}, p = {}); reporting z = 0",
            trials,
            null_probability
        );
        (0.0, 1.0)
    };

    Ok(ProportionTest {
        observed,
        trials,
        null_probability,
        expected,
        z,
        p_value,
    })
}

/// One-sided exact binomial tail `P(X ≥ observed)` for `X ~ Binomial(trials, p)`.
pub fn binomial_upper_tail(observed: usize, trials: usize, p: f64) -> CycleResult<f64> {
    validate_parameter(p, 0.0, 1.0, "null_probability")?;
    if observed == 0 {
        return Ok(1.0);
    }
    if observed > trials {
        return Ok(0.0);
    }
    let binomial = Binomial::new(p, trials as u64).map_err(|e| {
        CycleAnalysisError::NumericalError {
            reason: format!("binomial({}, {}): {}", trials, p, e),
            operation: Some("binomial_upper_tail".to_string()),
        }
    })?;
    Ok(binomial.sf(observed as u64 - 1).clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_white_noise_background_is_flat() {
        let model = RedNoiseModel {
            alpha: 0.0,
            variance: 2.0,
        };
        assert_approx_eq!(model.background_power(0.01), 2.0);
        assert_approx_eq!(model.background_power(0.4), 2.0);
    }

    #[test]
    fn test_red_noise_concentrates_at_low_frequency() {
        let model = RedNoiseModel {
            alpha: 0.7,
            variance: 1.0,
        };
        assert!(model.normalized_spectrum(0.005) > model.normalized_spectrum(0.25));
        // Zero frequency: (1 + α)/(1 - α)
        assert_approx_eq!(model.normalized_spectrum(0.0), 1.7 / 0.3, 1e-12);
    }

    #[test]
    fn test_chi_squared_ratio_two_dof() {
        // χ²₂(0.95) = -2 ln 0.05 = 5.9915
        assert_approx_eq!(chi_squared_ratio(2.0, 0.95).unwrap(), 2.995732, 1e-5);
        assert!(chi_squared_ratio(2.0, 0.3).is_err());
    }

    #[test]
    fn test_global_threshold_tightens_with_averaging() {
        let model = RedNoiseModel {
            alpha: 0.1,
            variance: 1.0,
        };
        let few = model.global_wavelet_threshold(100.0, 97.0, 10, 0.95).unwrap();
        let many = model.global_wavelet_threshold(100.0, 97.0, 2000, 0.95).unwrap();
        assert!(many < few);
        assert!(many > model.background_power(0.01));
    }

    #[test]
    fn test_proportion_z_test_reference_values() {
        // N = 245, n_obs = 193, p = 53·5/506
        let p = 53.0 * 5.0 / 506.0;
        let test = proportion_z_test(193, 245, p).unwrap();
        assert_approx_eq!(test.expected, 128.31027667984188, 1e-9);
        assert_approx_eq!(test.z, 8.275063023047785, 1e-9);
        assert!(test.p_value > 0.0 && test.p_value < 1e-15);
    }

    #[test]
    fn test_proportion_z_test_degenerate() {
        let all = proportion_z_test(5, 5, 1.0).unwrap();
        assert_eq!(all.z, 0.0);
        assert_eq!(all.p_value, 1.0);
        let none = proportion_z_test(0, 0, 0.5).unwrap();
        assert_eq!(none.z, 0.0);
        assert!(proportion_z_test(6, 5, 0.5).is_err());
    }

    #[test]
    fn test_binomial_upper_tail() {
        // P(X >= 1) for Binomial(2, 0.5) = 0.75
        assert_approx_eq!(binomial_upper_tail(1, 2, 0.5).unwrap(), 0.75, 1e-12);
        assert_approx_eq!(binomial_upper_tail(0, 10, 0.3).unwrap(), 1.0);
        assert_approx_eq!(binomial_upper_tail(10, 10, 0.5).unwrap(), 0.5f64.powi(10), 1e-12);
    }
}
