//! Continuous wavelet cycle estimator.
//!
//! Morlet continuous wavelet transform computed in Fourier space (Torrence &
//! Compo 1998). One scale is evaluated per integer period of the lag window.
//! Points inside the cone of influence are dropped before time-averaging, and
//! local maxima of the resulting global wavelet spectrum are tested against
//! the time-averaged AR(1) red-noise contour.

use crate::errors::{validate_data_length, validate_parameter, CycleResult};
use crate::estimators::{dedupe_and_rank, CycleEstimator, DetectedPeak, EstimationMethod, LagWindow};
use crate::fft_ops::{forward_fft_real, inverse_fft_normalized};
use crate::math_utils::mean;
use crate::preprocessing::AnalysisSeries;
use crate::statistical_tests::RedNoiseModel;
use num_complex::Complex64;
use std::f64::consts::PI;

/// Default Morlet non-dimensional frequency.
pub const DEFAULT_OMEGA0: f64 = 6.0;

/// Time-averaged wavelet power at one period.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlobalPower {
    /// Fourier period in samples
    pub period: usize,
    /// Wavelet scale
    pub scale: f64,
    /// Mean power over admissible points
    pub power: f64,
    /// Points outside the cone of influence
    pub n_admissible: usize,
}

/// Morlet wavelet period estimator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaveletEstimator {
    /// Morlet ω₀
    pub omega0: f64,
    /// Confidence level of the red-noise contour
    pub confidence_level: f64,
    /// Drop peaks below the contour
    pub significant_only: bool,
}

impl Default for WaveletEstimator {
    fn default() -> Self {
        Self {
            omega0: DEFAULT_OMEGA0,
            confidence_level: 0.95,
            significant_only: true,
        }
    }
}

impl WaveletEstimator {
    /// Ratio of Fourier period to wavelet scale, `4π / (ω₀ + √(2 + ω₀²))`.
    pub fn fourier_factor(&self) -> f64 {
        4.0 * PI / (self.omega0 + (2.0 + self.omega0 * self.omega0).sqrt())
    }

    /// Whether `(t, period)` lies outside the cone of influence of a length-`n` series.
    pub fn is_admissible(&self, t: usize, n: usize, period: f64) -> bool {
        let edge_distance = (t + 1).min(n - t) as f64;
        period <= self.fourier_factor() / std::f64::consts::SQRT_2 * edge_distance
    }

    /// Global wavelet spectrum over `periods`.
    ///
    /// Periods with no admissible point are skipped.
    pub fn global_spectrum(
        &self,
        values: &[f64],
        periods: impl IntoIterator<Item = usize>,
    ) -> CycleResult<Vec<GlobalPower>> {
        validate_parameter(self.omega0, 5.0, 20.0, "omega0")?;
        let n = values.len();
        validate_data_length(values, 4)?;

        let m = n.next_power_of_two();
        let centre = mean(values);
        let mut padded: Vec<f64> = values.iter().map(|&x| x - centre).collect();
        padded.resize(m, 0.0);
        let spectrum = forward_fft_real(&padded)?;

        let omega: Vec<f64> = (0..m)
            .map(|k| {
                if k <= m / 2 {
                    2.0 * PI * k as f64 / m as f64
                } else {
                    -2.0 * PI * (m - k) as f64 / m as f64
                }
            })
            .collect();

        let ff = self.fourier_factor();
        let psi_norm = PI.powf(-0.25);
        let mut out = Vec::new();

        for period in periods {
            let admissible: Vec<usize> = (0..n)
                .filter(|&t| self.is_admissible(t, n, period as f64))
                .collect();
            if admissible.is_empty() {
                continue;
            }

            let scale = period as f64 / ff;
            let amplitude = (2.0 * PI * scale).sqrt() * psi_norm;
            let mut buffer: Vec<Complex64> = spectrum
                .iter()
                .zip(&omega)
                .map(|(x, &w)| {
                    if w > 0.0 {
                        let arg = scale * w - self.omega0;
                        *x * (amplitude * (-0.5 * arg * arg).exp())
                    } else {
                        Complex64::new(0.0, 0.0)
                    }
                })
                .collect();
            inverse_fft_normalized(&mut buffer)?;

            let power = admissible.iter().map(|&t| buffer[t].norm_sqr()).sum::<f64>()
                / admissible.len() as f64;
            out.push(GlobalPower {
                period,
                scale,
                power,
                n_admissible: admissible.len(),
            });
        }

        Ok(out)
    }
}

impl CycleEstimator for WaveletEstimator {
    fn method(&self) -> EstimationMethod {
        EstimationMethod::Wavelet
    }

    /// Twice the longest lag, so the longest period keeps admissible points
    /// after the cone of influence is removed from both ends.
    fn burn_in(&self, window: LagWindow) -> usize {
        2 * window.max_lag
    }

    fn significant_only(&self) -> bool {
        self.significant_only
    }

    fn candidates(&self, series: &AnalysisSeries, window: LagWindow) -> CycleResult<Vec<DetectedPeak>> {
        let values = &series.values;
        validate_data_length(values, window.max_lag + self.burn_in(window))?;

        // One period either side of the window so edge periods have neighbours
        let lo = window.min_lag.saturating_sub(1).max(2);
        let hi = window.max_lag + 1;
        let global = self.global_spectrum(values, lo..=hi)?;
        let background = RedNoiseModel::fit(values);

        let mut peaks = Vec::new();
        for (i, g) in global.iter().enumerate() {
            if !window.contains(g.period) {
                continue;
            }
            let rises = i == 0 || g.power > global[i - 1].power;
            let holds = i + 1 == global.len() || g.power >= global[i + 1].power;
            if !(rises && holds) {
                continue;
            }
            let threshold = background.global_wavelet_threshold(
                g.period as f64,
                g.scale,
                g.n_admissible,
                self.confidence_level,
            )?;
            peaks.push(DetectedPeak {
                instrument: series.instrument.clone(),
                method: EstimationMethod::Wavelet,
                lag: g.period,
                strength: g.power,
                significant: g.power > threshold,
                threshold,
            });
        }

        let peaks = dedupe_and_rank(peaks);
        log::debug!(
            "{}: wavelet evaluated {} periods in {}, {} local maxima, {} significant",
            series.instrument,
            global.len(),
            window,
            peaks.len(),
            peaks.iter().filter(|p| p.significant).count()
        );
        Ok(peaks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocessing::{PreprocessingInfo, SeriesTransform};
    use crate::series::AssetClass;
    use assert_approx_eq::assert_approx_eq;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use rand_distr::{Distribution, Normal};

    fn analysis(values: Vec<f64>) -> AnalysisSeries {
        let n = values.len();
        AnalysisSeries {
            instrument: "WAV".to_string(),
            asset_class: AssetClass::Forex,
            values,
            info: PreprocessingInfo {
                transform: SeriesTransform::LogReturn,
                input_length: n + 1,
                output_length: n,
                required_length: n + 1,
            },
        }
    }

    fn noisy_sine(n: usize, period: f64, seed: u64) -> Vec<f64> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let noise = Normal::new(0.0, 0.002).unwrap();
        (0..n)
            .map(|t| 0.01 * (2.0 * PI * t as f64 / period).sin() + noise.sample(&mut rng))
            .collect()
    }

    #[test]
    fn test_fourier_factor_for_omega_six() {
        assert_approx_eq!(WaveletEstimator::default().fourier_factor(), 1.0330436, 1e-6);
    }

    #[test]
    fn test_cone_of_influence_excludes_edges() {
        let w = WaveletEstimator::default();
        assert!(!w.is_admissible(0, 1000, 100.0));
        assert!(!w.is_admissible(999, 1000, 100.0));
        assert!(w.is_admissible(500, 1000, 100.0));
    }

    #[test]
    fn test_detects_sine_period() {
        let estimator = WaveletEstimator::default();
        let window = LagWindow::new(150, 400).unwrap();
        let peaks = estimator.detect(&analysis(noisy_sine(1960, 196.0, 5)), window).unwrap();

        assert!(!peaks.is_empty());
        assert!(peaks[0].lag.abs_diff(196) <= 2, "peak at {}", peaks[0].lag);
        assert!(peaks[0].significant);
        for p in &peaks {
            assert!(window.contains(p.lag));
        }
    }

    #[test]
    fn test_global_spectrum_skips_periods_inside_cone() {
        let estimator = WaveletEstimator::default();
        let values = noisy_sine(300, 50.0, 9);
        let global = estimator.global_spectrum(&values, [50, 400]).unwrap();
        assert_eq!(global.len(), 1);
        assert_eq!(global[0].period, 50);
        assert!(global[0].n_admissible > 0);
    }

    #[test]
    fn test_short_series_rejected() {
        let estimator = WaveletEstimator::default();
        let window = LagWindow::new(150, 400).unwrap();
        assert!(estimator.detect(&analysis(noisy_sine(1000, 196.0, 1)), window).is_err());
    }
}
