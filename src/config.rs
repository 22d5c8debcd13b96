//! # Scan Configuration
//!
//! Configuration structures for a cycle scan (one method over one universe)
//! and for a study (several scans across historical windows and tolerances).
//! All run-level validation happens here, before any instrument is touched.

use crate::coverage::{CoverageDenominator, NullModel};
use crate::errors::{validate_lag_window, validate_parameter, CycleAnalysisError, CycleResult};
use crate::estimators::{EstimationMethod, LagWindow};
use crate::fft_ops::TaperWindow;
use crate::matcher::Tolerance;
use crate::preprocessing::SeriesTransform;
use crate::series::{AssetClass, InstrumentSeries};
use chrono::NaiveDate;

pub use crate::series::HistoricalWindow;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Universal partial-autocorrelation scan window.
pub const PACF_WINDOW: (usize, usize) = (179, 676);

/// Highest differencing order accepted.
pub const MAX_DIFFERENCE_ORDER: usize = 4;

/// Which instruments a scan covers.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum UniverseSelector {
    /// Every supplied instrument
    #[default]
    All,
    /// Instruments of one asset class
    AssetClass(AssetClass),
    /// Explicit identifiers
    Instruments(Vec<String>),
}

impl UniverseSelector {
    /// Whether `series` belongs to the universe.
    pub fn includes(&self, series: &InstrumentSeries) -> bool {
        match self {
            UniverseSelector::All => true,
            UniverseSelector::AssetClass(class) => series.asset_class() == *class,
            UniverseSelector::Instruments(ids) => ids.iter().any(|id| id == series.id()),
        }
    }

    /// Label used in report scopes.
    pub fn label(&self) -> String {
        match self {
            UniverseSelector::All => "all".to_string(),
            UniverseSelector::AssetClass(class) => class.as_str().to_string(),
            UniverseSelector::Instruments(ids) => format!("list({})", ids.len()),
        }
    }
}

/// Optional post-filter on ranked peaks.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PeakSelection {
    /// Keep at most this many peaks
    pub max_peaks: Option<usize>,
    /// Minimum distance in days between kept peaks
    pub min_separation: Option<usize>,
    /// Minimum share of top-ten strength the kept peaks must carry
    pub min_power_share: Option<f64>,
}

impl PeakSelection {
    /// No post-filter.
    pub fn none() -> Self {
        Self::default()
    }

    /// Two strongest peaks at least 71 days apart.
    pub fn top_two_separated() -> Self {
        Self {
            max_peaks: Some(2),
            min_separation: Some(71),
            min_power_share: None,
        }
    }

    /// Two strongest peaks, kept only when they dominate the spectrum.
    pub fn top_two_dominant(share: f64) -> Self {
        Self {
            max_peaks: Some(2),
            min_separation: None,
            min_power_share: Some(share),
        }
    }

    /// Whether the filter does nothing.
    pub fn is_noop(&self) -> bool {
        self.max_peaks.is_none() && self.min_separation.is_none() && self.min_power_share.is_none()
    }

    fn validate(&self) -> CycleResult<()> {
        if self.max_peaks == Some(0) {
            return Err(CycleAnalysisError::InvalidParameter {
                parameter: "max_peaks".to_string(),
                value: 0.0,
                constraint: ">= 1".to_string(),
            });
        }
        if let Some(share) = self.min_power_share {
            validate_parameter(share, 0.0, 1.0, "min_power_share")?;
        }
        Ok(())
    }
}

/// Parameters of one scan: one method over one universe.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ScanConfig {
    /// Instruments covered
    pub universe: UniverseSelector,
    /// Period estimator
    pub method: EstimationMethod,
    /// Lag window in trading days
    pub lag_window: LagWindow,
    /// Transform from prices to the analysis series
    pub transform: SeriesTransform,
    /// Matching tolerance
    pub tolerance: Tolerance,
    /// Confidence level for peak significance
    pub confidence_level: f64,
    /// Override of the estimator burn-in plus transform loss
    pub buffer: Option<usize>,
    /// Drop peaks below the significance threshold
    pub significant_only: bool,
    /// Post-filter on ranked peaks
    pub peak_selection: PeakSelection,
    /// Null model for expected coverage
    pub null_model: NullModel,
    /// Which instruments count toward N
    pub denominator: CoverageDenominator,
    /// Periodogram taper
    pub taper: TaperWindow,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self::psd()
    }
}

impl ScanConfig {
    fn with_method(method: EstimationMethod, min_lag: usize, max_lag: usize) -> Self {
        Self {
            universe: UniverseSelector::All,
            method,
            lag_window: LagWindow { min_lag, max_lag },
            transform: method.default_transform(),
            tolerance: Tolerance::default(),
            confidence_level: 0.95,
            buffer: None,
            significant_only: true,
            peak_selection: PeakSelection::none(),
            null_model: NullModel::Uniform,
            denominator: CoverageDenominator::Analyzed,
            taper: TaperWindow::Hann,
        }
    }

    /// Periodogram scan over 179-511 days on log returns.
    pub fn psd() -> Self {
        Self::with_method(EstimationMethod::Psd, 179, 511)
    }

    /// Periodogram scan of one asset class with its default window and
    /// dominant-peak filter.
    pub fn psd_for(asset_class: AssetClass) -> Self {
        let (min_lag, max_lag) = asset_class.default_psd_window();
        Self {
            universe: UniverseSelector::AssetClass(asset_class),
            peak_selection: PeakSelection::top_two_dominant(asset_class.default_power_share()),
            ..Self::with_method(EstimationMethod::Psd, min_lag, max_lag)
        }
    }

    /// Partial-autocorrelation scan over 179-676 days on first differences.
    pub fn pacf() -> Self {
        Self::with_method(EstimationMethod::Pacf, PACF_WINDOW.0, PACF_WINDOW.1)
    }

    /// Wavelet scan over 179-511 days on log returns.
    pub fn wavelet() -> Self {
        Self::with_method(EstimationMethod::Wavelet, 179, 511)
    }

    /// Builder: universe.
    pub fn with_universe(mut self, universe: UniverseSelector) -> Self {
        self.universe = universe;
        self
    }

    /// Builder: lag window (validated later).
    pub fn with_lag_window(mut self, min_lag: usize, max_lag: usize) -> Self {
        self.lag_window = LagWindow { min_lag, max_lag };
        self
    }

    /// Builder: transform.
    pub fn with_transform(mut self, transform: SeriesTransform) -> Self {
        self.transform = transform;
        self
    }

    /// Builder: tolerance.
    pub fn with_tolerance(mut self, tolerance: Tolerance) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Builder: confidence level.
    pub fn with_confidence_level(mut self, confidence_level: f64) -> Self {
        self.confidence_level = confidence_level;
        self
    }

    /// Builder: explicit buffer.
    pub fn with_buffer(mut self, buffer: usize) -> Self {
        self.buffer = Some(buffer);
        self
    }

    /// Builder: peak post-filter.
    pub fn with_peak_selection(mut self, selection: PeakSelection) -> Self {
        self.peak_selection = selection;
        self
    }

    /// Builder: null model.
    pub fn with_null_model(mut self, null_model: NullModel) -> Self {
        self.null_model = null_model;
        self
    }

    /// Builder: coverage denominator.
    pub fn with_denominator(mut self, denominator: CoverageDenominator) -> Self {
        self.denominator = denominator;
        self
    }

    /// Check run-level parameters.
    pub fn validate(&self) -> CycleResult<()> {
        validate_lag_window(self.lag_window.min_lag, self.lag_window.max_lag)?;
        validate_parameter(self.confidence_level, 0.5, 0.9999, "confidence_level")?;
        if let SeriesTransform::Difference(d) = self.transform {
            if d > MAX_DIFFERENCE_ORDER {
                return Err(CycleAnalysisError::InvalidParameter {
                    parameter: "difference_order".to_string(),
                    value: d as f64,
                    constraint: format!("<= {}", MAX_DIFFERENCE_ORDER),
                });
            }
        }
        if let UniverseSelector::Instruments(ids) = &self.universe {
            if ids.is_empty() {
                return Err(CycleAnalysisError::InvalidParameter {
                    parameter: "universe".to_string(),
                    value: 0.0,
                    constraint: "non-empty instrument list".to_string(),
                });
            }
        }
        if let NullModel::MergedIntervals { draws } = self.null_model {
            if draws == 0 {
                return Err(CycleAnalysisError::InvalidParameter {
                    parameter: "draws".to_string(),
                    value: 0.0,
                    constraint: ">= 1".to_string(),
                });
            }
        }
        self.peak_selection.validate()
    }
}

/// Parameters of a multi-method, multi-window study.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StudyConfig {
    /// One scan per method
    pub scans: Vec<ScanConfig>,
    /// Historical windows; each gets an independent report
    pub windows: Vec<HistoricalWindow>,
    /// Tolerances to report
    pub tolerances: Vec<Tolerance>,
}

impl Default for StudyConfig {
    fn default() -> Self {
        Self::standard()
    }
}

impl StudyConfig {
    /// PSD, PACF and wavelet over the full history and two truncations,
    /// at every tolerance.
    pub fn standard() -> Self {
        let windows = [(2020, "pre-2020"), (2015, "pre-2015")]
            .into_iter()
            .filter_map(|(year, label)| {
                NaiveDate::from_ymd_opt(year, 1, 1).map(|end| HistoricalWindow::until(label, end))
            });
        Self {
            scans: vec![ScanConfig::psd(), ScanConfig::pacf(), ScanConfig::wavelet()],
            windows: std::iter::once(HistoricalWindow::full()).chain(windows).collect(),
            tolerances: Tolerance::ALLOWED
                .iter()
                .filter_map(|&t| Tolerance::new(t).ok())
                .collect(),
        }
    }

    /// Check every scan, and that windows and tolerances are present.
    pub fn validate(&self) -> CycleResult<()> {
        if self.scans.is_empty() || self.windows.is_empty() || self.tolerances.is_empty() {
            return Err(CycleAnalysisError::InvalidParameter {
                parameter: "study".to_string(),
                value: 0.0,
                constraint: "at least one scan, window and tolerance".to_string(),
            });
        }
        let mut labels: Vec<&str> = self.windows.iter().map(|w| w.label.as_str()).collect();
        labels.sort_unstable();
        if labels.windows(2).any(|w| w[0] == w[1]) {
            return Err(CycleAnalysisError::InvalidParameter {
                parameter: "windows".to_string(),
                value: self.windows.len() as f64,
                constraint: "distinct window labels".to_string(),
            });
        }
        self.scans.iter().try_for_each(ScanConfig::validate)
    }
}
