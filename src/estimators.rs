//! Cycle estimator interface and detected-peak bookkeeping.
//!
//! The three period estimators (periodogram, partial autocorrelation and
//! wavelet) share one capability: given an analysis series and a lag window,
//! return the detected periods with their strength and significance. The
//! matcher and coverage validator only ever see [`DetectedPeak`]s, so they are
//! method-agnostic.

use crate::autocorrelation::PartialAutocorrelationEstimator;
use crate::config::{PeakSelection, ScanConfig};
use crate::errors::{validate_lag_window, CycleResult};
use crate::math_utils::float_total_cmp;
use crate::preprocessing::{AnalysisSeries, SeriesTransform};
use crate::spectral::PeriodogramEstimator;
use crate::wavelet::WaveletEstimator;
use std::cmp::Ordering;
use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Period estimation method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum EstimationMethod {
    /// Windowed periodogram (power spectral density)
    Psd,
    /// Partial autocorrelation function
    Pacf,
    /// Morlet continuous wavelet transform
    Wavelet,
}

impl EstimationMethod {
    /// All methods in report order.
    pub const ALL: [EstimationMethod; 3] = [
        EstimationMethod::Psd,
        EstimationMethod::Pacf,
        EstimationMethod::Wavelet,
    ];

    /// Lower-case tag used in exported rows.
    pub fn as_str(&self) -> &'static str {
        match self {
            EstimationMethod::Psd => "psd",
            EstimationMethod::Pacf => "pacf",
            EstimationMethod::Wavelet => "wavelet",
        }
    }

    /// Parse a method tag.
    pub fn parse(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "psd" => Some(EstimationMethod::Psd),
            "pacf" => Some(EstimationMethod::Pacf),
            "wavelet" | "cwt" => Some(EstimationMethod::Wavelet),
            _ => None,
        }
    }

    /// Transform each method analyses by default.
    ///
    /// Spectral methods work on log returns; the partial autocorrelation
    /// scan works on first price differences.
    pub fn default_transform(&self) -> SeriesTransform {
        match self {
            EstimationMethod::Psd | EstimationMethod::Wavelet => SeriesTransform::LogReturn,
            EstimationMethod::Pacf => SeriesTransform::Difference(1),
        }
    }
}

impl std::fmt::Display for EstimationMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inclusive `[min_lag, max_lag]` scan window in trading days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LagWindow {
    /// Shortest lag considered
    pub min_lag: usize,
    /// Longest lag considered
    pub max_lag: usize,
}

impl LagWindow {
    /// Validated window.
    pub fn new(min_lag: usize, max_lag: usize) -> CycleResult<Self> {
        validate_lag_window(min_lag, max_lag)?;
        Ok(Self { min_lag, max_lag })
    }

    /// Whether `lag` is inside the window.
    pub fn contains(&self, lag: usize) -> bool {
        lag >= self.min_lag && lag <= self.max_lag
    }

    /// Number of integer lags in the window (`L`).
    pub fn span(&self) -> usize {
        self.max_lag - self.min_lag + 1
    }
}

impl std::fmt::Display for LagWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.min_lag, self.max_lag)
    }
}

/// A candidate period found by an estimator.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DetectedPeak {
    /// Instrument identifier
    pub instrument: String,
    /// Estimator that produced the peak
    pub method: EstimationMethod,
    /// Period in trading days
    pub lag: usize,
    /// Spectral power, |PACF| or global wavelet power
    pub strength: f64,
    /// Whether `strength` cleared `threshold`
    pub significant: bool,
    /// Significance threshold the strength was compared against
    pub threshold: f64,
}

impl DetectedPeak {
    /// Strength over threshold; above one means significant.
    pub fn margin(&self) -> f64 {
        if self.threshold > 0.0 {
            self.strength / self.threshold
        } else {
            f64::INFINITY
        }
    }
}

/// Common interface of the period estimators.
pub trait CycleEstimator: Send + Sync {
    /// Method tag of the estimator.
    fn method(&self) -> EstimationMethod;

    /// Observations beyond `max_lag` the estimator needs on its input.
    fn burn_in(&self, window: LagWindow) -> usize;

    /// Whether [`CycleEstimator::detect`] drops insignificant peaks.
    fn significant_only(&self) -> bool;

    /// Every candidate period in `window`, significant or not.
    ///
    /// Candidates come back deduplicated by lag and sorted by descending
    /// strength, ties by shorter lag.
    fn candidates(&self, series: &AnalysisSeries, window: LagWindow) -> CycleResult<Vec<DetectedPeak>>;

    /// Detect periods in `series` within `window`.
    ///
    /// Same ordering as [`CycleEstimator::candidates`], filtered to significant
    /// peaks when the estimator asks for it. An empty vector is a valid
    /// "no cycle" outcome.
    fn detect(&self, series: &AnalysisSeries, window: LagWindow) -> CycleResult<Vec<DetectedPeak>> {
        let candidates = self.candidates(series, window)?;
        Ok(finalize_peaks(candidates, self.significant_only()))
    }
}

/// Estimator for `method` configured from a scan configuration.
pub fn build_estimator(method: EstimationMethod, config: &ScanConfig) -> Box<dyn CycleEstimator> {
    match method {
        EstimationMethod::Psd => Box::new(PeriodogramEstimator {
            confidence_level: config.confidence_level,
            taper: config.taper,
            significant_only: config.significant_only,
        }),
        EstimationMethod::Pacf => Box::new(PartialAutocorrelationEstimator {
            confidence_level: config.confidence_level,
            significant_only: config.significant_only,
        }),
        EstimationMethod::Wavelet => Box::new(WaveletEstimator {
            confidence_level: config.confidence_level,
            significant_only: config.significant_only,
            ..WaveletEstimator::default()
        }),
    }
}

/// Descending strength, then shorter lag.
pub fn peak_order(a: &DetectedPeak, b: &DetectedPeak) -> Ordering {
    float_total_cmp(&b.strength, &a.strength).then(a.lag.cmp(&b.lag))
}

/// Sort peaks by [`peak_order`].
pub fn rank_peaks(peaks: &mut [DetectedPeak]) {
    peaks.sort_by(peak_order);
}

/// Collapse peaks sharing a lag, keeping the strongest, then rank.
pub fn dedupe_and_rank(peaks: Vec<DetectedPeak>) -> Vec<DetectedPeak> {
    let mut by_lag: BTreeMap<usize, DetectedPeak> = BTreeMap::new();
    for peak in peaks {
        match by_lag.get(&peak.lag) {
            Some(existing) if existing.strength >= peak.strength => {}
            _ => {
                by_lag.insert(peak.lag, peak);
            }
        }
    }
    let mut ranked: Vec<DetectedPeak> = by_lag.into_values().collect();
    rank_peaks(&mut ranked);
    ranked
}

/// Final estimator step: optional significance filter, dedupe and ranking.
pub fn finalize_peaks(peaks: Vec<DetectedPeak>, significant_only: bool) -> Vec<DetectedPeak> {
    let kept: Vec<DetectedPeak> = if significant_only {
        peaks.into_iter().filter(|p| p.significant).collect()
    } else {
        peaks
    };
    dedupe_and_rank(kept)
}

/// Peak selection over the full candidate set, then the significance filter.
///
/// The power share is measured against the strongest candidates whether or
/// not they are significant, so a lone significant peak in a flat spectrum
/// does not pass as dominant.
pub fn select_peaks(
    candidates: Vec<DetectedPeak>,
    selection: &PeakSelection,
    significant_only: bool,
) -> Vec<DetectedPeak> {
    finalize_peaks(apply_peak_selection(candidates, selection), significant_only)
}

/// Apply the peak-selection post-filter to ranked peaks.
///
/// * `min_separation`: walk the ranking and keep a peak only if it is at
///   least that many days from every kept peak. If that would leave a single
///   peak when two were available, the runner-up is kept anyway.
/// * `max_peaks`: truncate to the strongest `n`.
/// * `min_power_share`: drop everything unless the kept peaks carry at least
///   this share of the strength of the ten strongest input peaks.
pub fn apply_peak_selection(peaks: Vec<DetectedPeak>, selection: &PeakSelection) -> Vec<DetectedPeak> {
    if selection.is_noop() || peaks.is_empty() {
        return peaks;
    }

    let top_ten_total: f64 = peaks.iter().take(10).map(|p| p.strength).sum();

    let mut kept: Vec<DetectedPeak> = match selection.min_separation {
        Some(separation) if separation > 0 => {
            let mut kept: Vec<DetectedPeak> = Vec::new();
            for peak in &peaks {
                if selection.max_peaks.is_some_and(|m| kept.len() >= m) {
                    break;
                }
                if kept.iter().all(|k| k.lag.abs_diff(peak.lag) >= separation) {
                    kept.push(peak.clone());
                }
            }
            if kept.len() == 1 && peaks.len() >= 2 && selection.max_peaks.map_or(true, |m| m >= 2) {
                kept.push(peaks[1].clone());
            }
            kept
        }
        _ => peaks,
    };

    if let Some(max) = selection.max_peaks {
        kept.truncate(max);
    }

    if let Some(share) = selection.min_power_share {
        let kept_total: f64 = kept.iter().map(|p| p.strength).sum();
        if top_ten_total <= 0.0 || kept_total / top_ten_total < share {
            return Vec::new();
        }
    }

    rank_peaks(&mut kept);
    kept
}
