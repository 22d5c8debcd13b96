//! Periodogram (power spectral density) cycle estimator.
//!
//! The analysis series is mean-centred, tapered and transformed with a
//! cached FFT plan. Each Fourier bin k maps to the period N/k, rounded to the
//! nearest trading day. Local power maxima inside the lag window are compared
//! against the AR(1) red-noise background at the configured confidence level.

use crate::errors::{validate_data_length, CycleResult};
use crate::estimators::{dedupe_and_rank, CycleEstimator, DetectedPeak, EstimationMethod, LagWindow};
use crate::fft_ops::{windowed_periodogram, Periodogram, TaperWindow};
use crate::preprocessing::AnalysisSeries;
use crate::statistical_tests::RedNoiseModel;

/// Default confidence level for peak significance.
pub const DEFAULT_CONFIDENCE_LEVEL: f64 = 0.95;

/// Periodogram-based period estimator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeriodogramEstimator {
    /// Confidence level of the red-noise contour
    pub confidence_level: f64,
    /// Taper applied before the FFT
    pub taper: TaperWindow,
    /// Drop peaks below the contour
    pub significant_only: bool,
}

impl Default for PeriodogramEstimator {
    fn default() -> Self {
        Self {
            confidence_level: DEFAULT_CONFIDENCE_LEVEL,
            taper: TaperWindow::Hann,
            significant_only: true,
        }
    }
}

impl PeriodogramEstimator {
    /// Local maxima of the periodogram whose rounded period lies in `window`.
    ///
    /// Neighbours are taken from the full spectrum so a bin on the window
    /// edge is only a peak if it beats the bin just outside.
    fn candidate_bins(periodogram: &Periodogram, window: LagWindow) -> Vec<(usize, usize)> {
        let power = &periodogram.power;
        let last = power.len() - 1;
        (1..=last)
            .filter_map(|k| {
                let lag = periodogram.period(k).round() as usize;
                if !window.contains(lag) {
                    return None;
                }
                let rises = power[k] > power[k - 1];
                let holds = k == last || power[k] >= power[k + 1];
                (rises && holds).then_some((k, lag))
            })
            .collect()
    }
}

impl CycleEstimator for PeriodogramEstimator {
    fn method(&self) -> EstimationMethod {
        EstimationMethod::Psd
    }

    /// One full period of the longest lag beyond the lag itself, so the
    /// longest candidate is resolved by at least two cycles.
    fn burn_in(&self, window: LagWindow) -> usize {
        window.max_lag
    }

    fn significant_only(&self) -> bool {
        self.significant_only
    }

    fn candidates(&self, series: &AnalysisSeries, window: LagWindow) -> CycleResult<Vec<DetectedPeak>> {
        let values = &series.values;
        validate_data_length(values, window.max_lag + self.burn_in(window))?;

        let periodogram = windowed_periodogram(values, self.taper)?;
        let background = RedNoiseModel::fit(values);

        let mut peaks = Vec::new();
        for (k, lag) in Self::candidate_bins(&periodogram, window) {
            let threshold =
                background.periodogram_threshold(periodogram.frequency(k), self.confidence_level)?;
            let strength = periodogram.power[k];
            peaks.push(DetectedPeak {
                instrument: series.instrument.clone(),
                method: EstimationMethod::Psd,
                lag,
                strength,
                significant: strength > threshold,
                threshold,
            });
        }

        let peaks = dedupe_and_rank(peaks);
        log::debug!(
            "{}: psd found {} local maxima in {}, {} significant (alpha = {:.3})",
            series.instrument,
            peaks.len(),
            window,
            peaks.iter().filter(|p| p.significant).count(),
            background.alpha
        );
        Ok(peaks)
    }
}
