//! # Scan Results Structures
//!
//! Per-instrument outcomes, the record of one scan, and the collected
//! reports of a study.

use crate::catalog::CycleCatalog;
use crate::config::{HistoricalWindow, ScanConfig};
use crate::coverage::CarReport;
use crate::errors::{CycleAnalysisError, FailureCode};
use crate::estimators::{DetectedPeak, EstimationMethod};
use crate::matcher::{match_peaks, MatchRecord, Tolerance};
use crate::preprocessing::PreprocessingInfo;
use crate::series::AssetClass;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Processing status of one instrument.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum InstrumentStatus {
    /// Estimation ran to completion (possibly with no peaks)
    Analyzed,
    /// Estimation failed; the instrument is excluded from coverage counts
    Failed {
        /// Failure category
        code: FailureCode,
        /// Error message
        message: String,
    },
}

impl InstrumentStatus {
    /// Status for an instrument-scoped error.
    ///
    /// Run-level errors should never reach an instrument; they are recorded
    /// as numerical failures if they do.
    pub fn from_error(error: &CycleAnalysisError) -> Self {
        InstrumentStatus::Failed {
            code: error.failure_code().unwrap_or(FailureCode::Numerical),
            message: error.to_string(),
        }
    }
}

/// Everything produced for one instrument in one scan.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct InstrumentOutcome {
    /// Instrument identifier
    pub instrument: String,
    /// Asset class
    pub asset_class: AssetClass,
    /// Method used
    pub method: EstimationMethod,
    /// Success or failure
    pub status: InstrumentStatus,
    /// Ranked peaks after any post-filter
    pub peaks: Vec<DetectedPeak>,
    /// Catalog matches, by catalog id
    pub matches: Vec<MatchRecord>,
    /// Preprocessing details when the series was prepared
    pub preprocessing: Option<PreprocessingInfo>,
}

impl InstrumentOutcome {
    /// Outcome of a failed instrument.
    pub fn failed(
        instrument: impl Into<String>,
        asset_class: AssetClass,
        method: EstimationMethod,
        error: &CycleAnalysisError,
    ) -> Self {
        Self {
            instrument: instrument.into(),
            asset_class,
            method,
            status: InstrumentStatus::from_error(error),
            peaks: Vec::new(),
            matches: Vec::new(),
            preprocessing: None,
        }
    }

    /// Whether analysis failed.
    pub fn is_failed(&self) -> bool {
        matches!(self.status, InstrumentStatus::Failed { .. })
    }

    /// Whether at least one catalog match exists.
    pub fn is_matched(&self) -> bool {
        !self.matches.is_empty()
    }

    /// Whether at least one significant peak was found.
    pub fn has_detections(&self) -> bool {
        self.peaks.iter().any(|p| p.significant)
    }

    /// Copy with matches recomputed at another tolerance.
    pub fn rematched(&self, catalog: &CycleCatalog, tolerance: Tolerance) -> Self {
        let matches = if self.is_failed() {
            Vec::new()
        } else {
            match_peaks(&self.instrument, &self.peaks, catalog, tolerance)
        };
        Self {
            matches,
            ..self.clone()
        }
    }
}

/// Outcomes of one scan over one historical window.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ScanRun {
    /// Configuration the scan ran with
    pub config: ScanConfig,
    /// Historical window applied to every series
    pub window: HistoricalWindow,
    /// Catalog version matched against
    pub catalog_version: String,
    /// One outcome per selected instrument, in input order
    pub outcomes: Vec<InstrumentOutcome>,
}

impl ScanRun {
    /// Instruments analysed successfully.
    pub fn n_analyzed(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.is_failed()).count()
    }

    /// Instruments that failed.
    pub fn n_failed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_failed()).count()
    }

    /// All match records in instrument order, then catalog id.
    pub fn records(&self) -> impl Iterator<Item = &MatchRecord> {
        self.outcomes.iter().flat_map(|o| o.matches.iter())
    }

    /// Copy of the run with every instrument rematched at `tolerance`.
    pub fn rematched(&self, catalog: &CycleCatalog, tolerance: Tolerance) -> Self {
        Self {
            config: self.config.clone().with_tolerance(tolerance),
            window: self.window.clone(),
            catalog_version: self.catalog_version.clone(),
            outcomes: self
                .outcomes
                .iter()
                .map(|o| o.rematched(catalog, tolerance))
                .collect(),
        }
    }
}

/// Results of a study: every scan run and its CAR reports.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StudyReport {
    /// Scan runs at each configured tolerance
    pub runs: Vec<ScanRun>,
    /// One report per method, window and tolerance
    pub reports: Vec<CarReport>,
}

impl StudyReport {
    /// Report for a method, window label and tolerance.
    pub fn find(
        &self,
        method: EstimationMethod,
        window: &str,
        tolerance: Tolerance,
    ) -> Option<&CarReport> {
        self.reports.iter().find(|r| {
            r.scope.method == method && r.scope.window == window && r.scope.tolerance == tolerance
        })
    }

    /// Reports of one method, in study order.
    pub fn for_method(&self, method: EstimationMethod) -> impl Iterator<Item = &CarReport> {
        self.reports.iter().filter(move |r| r.scope.method == method)
    }
}
