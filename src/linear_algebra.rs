//! Linear algebra routines for autocorrelation analysis.
//!
//! The Yule-Walker system for an AR(p) fit is Toeplitz in the autocovariances,
//! so it is solved with the O(p²) Levinson-Durbin recursion. The reflection
//! coefficient produced at step k is the partial autocorrelation at lag k.

use crate::errors::{CycleAnalysisError, CycleResult};

/// Relative floor on the prediction-error variance before the system is
/// declared singular.
const MIN_RELATIVE_ERROR_VARIANCE: f64 = 1e-12;

/// Output of the Levinson-Durbin recursion.
#[derive(Debug, Clone)]
pub struct LevinsonDurbin {
    /// Partial autocorrelations φ_kk for k = 1..=order (index 0 is lag 1)
    pub reflection: Vec<f64>,
    /// AR(order) coefficients φ_order,1..φ_order,order
    pub coefficients: Vec<f64>,
    /// Prediction-error variance after each step (index 0 is γ₀)
    pub error_variance: Vec<f64>,
}

impl LevinsonDurbin {
    /// Partial autocorrelation at `lag` (1-based), if computed.
    pub fn pacf(&self, lag: usize) -> Option<f64> {
        lag.checked_sub(1).and_then(|i| self.reflection.get(i).copied())
    }
}

/// Validates that a vector contains no NaN or Inf values
fn ensure_finite_vector(v: &[f64], operation: &str) -> CycleResult<()> {
    for (i, &val) in v.iter().enumerate() {
        if !val.is_finite() {
            return Err(CycleAnalysisError::NumericalError {
                reason: format!("Non-finite value ({}) at position [{}]", val, i),
                operation: Some(operation.to_string()),
            });
        }
    }
    Ok(())
}

/// Solve the Yule-Walker equations of order `order` by Levinson-Durbin.
///
/// `autocov` must hold γ₀..γ_order. Fails with `SingularSystem` when γ₀ is not
/// positive, a reflection coefficient reaches magnitude one, or the
/// prediction-error variance collapses relative to γ₀.
pub fn levinson_durbin(autocov: &[f64], order: usize) -> CycleResult<LevinsonDurbin> {
    if autocov.len() <= order {
        return Err(CycleAnalysisError::InsufficientData {
            required: order + 1,
            actual: autocov.len(),
        });
    }
    ensure_finite_vector(&autocov[..=order], "levinson_durbin")?;

    let gamma0 = autocov[0];
    if gamma0 <= 0.0 {
        return Err(CycleAnalysisError::SingularSystem {
            lag: 0,
            reason: format!("non-positive lag-0 autocovariance ({:e})", gamma0),
        });
    }

    let mut phi = vec![0.0; order];
    let mut previous = vec![0.0; order];
    let mut reflection = Vec::with_capacity(order);
    let mut error_variance = Vec::with_capacity(order + 1);
    let mut v = gamma0;
    error_variance.push(v);

    for k in 1..=order {
        let mut acc = autocov[k];
        for j in 1..k {
            acc -= previous[j - 1] * autocov[k - j];
        }
        let kappa = acc / v;

        if !kappa.is_finite() || kappa.abs() >= 1.0 {
            return Err(CycleAnalysisError::SingularSystem {
                lag: k,
                reason: format!("reflection coefficient {} outside (-1, 1)", kappa),
            });
        }

        phi[k - 1] = kappa;
        for j in 1..k {
            phi[j - 1] = previous[j - 1] - kappa * previous[k - j - 1];
        }

        v *= 1.0 - kappa * kappa;
        if v <= MIN_RELATIVE_ERROR_VARIANCE * gamma0 {
            return Err(CycleAnalysisError::SingularSystem {
                lag: k,
                reason: format!(
                    "prediction-error variance collapsed to {:e} (γ₀ = {:e})",
                    v, gamma0
                ),
            });
        }

        reflection.push(kappa);
        error_variance.push(v);
        previous[..k].copy_from_slice(&phi[..k]);
    }

    Ok(LevinsonDurbin {
        reflection,
        coefficients: phi,
        error_variance,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_ar1_theoretical_pacf() {
        // AR(1) with φ = 0.6: γ_k ∝ 0.6^k, PACF is 0.6 then zero
        let autocov: Vec<f64> = (0..6).map(|k| 0.6f64.powi(k)).collect();
        let ld = levinson_durbin(&autocov, 5).unwrap();
        assert_approx_eq!(ld.pacf(1).unwrap(), 0.6, 1e-12);
        for lag in 2..=5 {
            assert_approx_eq!(ld.pacf(lag).unwrap(), 0.0, 1e-12);
        }
        assert_approx_eq!(ld.coefficients[0], 0.6, 1e-12);
        assert_approx_eq!(ld.error_variance[1], 1.0 - 0.36, 1e-12);
    }

    #[test]
    fn test_ar2_coefficients_recovered() {
        // AR(2) x_t = 0.5 x_{t-1} - 0.3 x_{t-2}; ρ1 = φ1/(1-φ2), ρ2 = φ1ρ1 + φ2
        let (phi1, phi2) = (0.5, -0.3);
        let rho1 = phi1 / (1.0 - phi2);
        let rho2 = phi1 * rho1 + phi2;
        let rho3 = phi1 * rho2 + phi2 * rho1;
        let autocov = vec![1.0, rho1, rho2, rho3];

        let ld = levinson_durbin(&autocov, 3).unwrap();
        assert_approx_eq!(ld.pacf(2).unwrap(), phi2, 1e-12);
        assert_approx_eq!(ld.pacf(3).unwrap(), 0.0, 1e-12);
        assert_approx_eq!(ld.coefficients[0], phi1, 1e-12);
        assert_approx_eq!(ld.coefficients[1], phi2, 1e-12);
    }

    #[test]
    fn test_zero_variance_is_singular() {
        let result = levinson_durbin(&[0.0, 0.0, 0.0], 2);
        assert!(matches!(
            result,
            Err(CycleAnalysisError::SingularSystem { lag: 0, .. })
        ));
    }

    #[test]
    fn test_perfect_correlation_is_singular() {
        // γ_k = γ₀ for all k: a constant-like process with unit reflection
        let result = levinson_durbin(&[2.0, 2.0, 2.0], 2);
        assert!(matches!(
            result,
            Err(CycleAnalysisError::SingularSystem { lag: 1, .. })
        ));
    }

    #[test]
    fn test_short_autocovariance_rejected() {
        assert!(matches!(
            levinson_durbin(&[1.0, 0.5], 3),
            Err(CycleAnalysisError::InsufficientData { .. })
        ));
    }

    #[test]
    fn test_non_finite_rejected() {
        assert!(matches!(
            levinson_durbin(&[1.0, f64::NAN], 1),
            Err(CycleAnalysisError::NumericalError { .. })
        ));
    }
}
