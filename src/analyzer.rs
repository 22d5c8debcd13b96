//! # Cycle Scanner and Study Orchestration
//!
//! [`CycleScanner`] runs one method over a universe of instruments:
//! preprocessing, period estimation, optional peak post-filter and catalog
//! matching per instrument, followed by coverage validation across the
//! universe. [`CycleStudy`] repeats that for several methods, historical
//! windows and tolerances, producing one independent report per combination.
//!
//! Per-instrument failures are captured as a status on the instrument and
//! never abort a scan. Invalid configuration and unusable catalogs are
//! rejected when the scanner is constructed, before any work starts.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use plastic_cycles::analyzer::CycleScanner;
//! use plastic_cycles::catalog::CycleCatalog;
//! use plastic_cycles::config::ScanConfig;
//! use plastic_cycles::generators::{generate_cyclic_prices, CyclicSeriesConfig};
//! use plastic_cycles::series::AssetClass;
//!
//! # fn main() -> Result<(), plastic_cycles::errors::CycleAnalysisError> {
//! let series = generate_cyclic_prices("SYN", AssetClass::Equity, &CyclicSeriesConfig::default())?;
//! let scanner = CycleScanner::new(CycleCatalog::shared(), ScanConfig::psd())?;
//! let run = scanner.scan(&[series]);
//! let report = scanner.validate(&run, "synthetic")?;
//! println!("CAR = {:.1}% (z = {:.2})", report.car_pct(), report.z);
//! # Ok(())
//! # }
//! ```

use crate::catalog::CycleCatalog;
use crate::config::{HistoricalWindow, ScanConfig, StudyConfig};
use crate::coverage::{validate as validate_coverage, CarReport, CoverageScope};
use crate::errors::{CycleAnalysisError, CycleResult};
use crate::estimators::{build_estimator, select_peaks, CycleEstimator};
use crate::matcher::match_peaks;
use crate::preprocessing::prepare_analysis_series;
use crate::results::{InstrumentOutcome, InstrumentStatus, ScanRun, StudyReport};
use crate::series::InstrumentSeries;
use std::sync::Arc;

/// Runs one estimation method over a universe of instruments.
pub struct CycleScanner {
    catalog: Arc<CycleCatalog>,
    config: ScanConfig,
    estimator: Box<dyn CycleEstimator>,
}

impl std::fmt::Debug for CycleScanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CycleScanner")
            .field("catalog", &self.catalog.version())
            .field("config", &self.config)
            .finish()
    }
}

impl CycleScanner {
    /// Validate the configuration and build the estimator.
    ///
    /// A buffer override must cover the estimator burn-in plus the
    /// observations the transform consumes, otherwise an instrument of
    /// exactly the required length could never be analysed.
    pub fn new(catalog: Arc<CycleCatalog>, config: ScanConfig) -> CycleResult<Self> {
        config.validate()?;
        if catalog.is_empty() {
            return Err(CycleAnalysisError::CatalogLoad {
                reason: "catalog has no entries".to_string(),
            });
        }
        let estimator = build_estimator(config.method, &config);
        let minimum = Self::minimum_buffer(estimator.as_ref(), &config);
        if let Some(buffer) = config.buffer.filter(|&b| b < minimum) {
            return Err(CycleAnalysisError::InvalidParameter {
                parameter: "buffer".to_string(),
                value: buffer as f64,
                constraint: format!(">= {} for {} over {}", minimum, config.method, config.lag_window),
            });
        }
        Ok(Self {
            catalog,
            config,
            estimator,
        })
    }

    /// Scan configuration.
    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Catalog matched against.
    pub fn catalog(&self) -> &CycleCatalog {
        &self.catalog
    }

    fn minimum_buffer(estimator: &dyn CycleEstimator, config: &ScanConfig) -> usize {
        estimator.burn_in(config.lag_window) + config.transform.consumed()
    }

    /// Observations beyond `max_lag` an instrument needs.
    ///
    /// The configured override, or the estimator burn-in plus the
    /// observations consumed by the transform.
    pub fn buffer(&self) -> usize {
        self.config
            .buffer
            .unwrap_or_else(|| Self::minimum_buffer(self.estimator.as_ref(), &self.config))
    }

    /// Minimum raw observations per instrument, `max_lag + buffer`.
    pub fn required_length(&self) -> usize {
        self.config.lag_window.max_lag + self.buffer()
    }

    /// Preprocess, estimate, filter and match one instrument.
    pub fn analyze_instrument(&self, series: &InstrumentSeries) -> InstrumentOutcome {
        match self.try_analyze(series) {
            Ok(outcome) => outcome,
            Err(e) => {
                log::warn!(
                    "{} ({}): {} failed: {}",
                    series.id(),
                    series.asset_class(),
                    self.config.method,
                    e
                );
                InstrumentOutcome::failed(series.id(), series.asset_class(), self.config.method, &e)
            }
        }
    }

    fn try_analyze(&self, series: &InstrumentSeries) -> CycleResult<InstrumentOutcome> {
        let window = self.config.lag_window;
        let prepared = prepare_analysis_series(series, self.config.transform, window.max_lag, self.buffer())?;
        let candidates = self.estimator.candidates(&prepared, window)?;
        let peaks = select_peaks(
            candidates,
            &self.config.peak_selection,
            self.estimator.significant_only(),
        );
        let matches = match_peaks(series.id(), &peaks, &self.catalog, self.config.tolerance);

        log::debug!(
            "{}: {} peaks, {} catalog matches ({})",
            series.id(),
            peaks.len(),
            matches.len(),
            self.config.method
        );

        Ok(InstrumentOutcome {
            instrument: series.id().to_string(),
            asset_class: series.asset_class(),
            method: self.config.method,
            status: InstrumentStatus::Analyzed,
            peaks,
            matches,
            preprocessing: Some(prepared.info),
        })
    }

    /// Scan the full history of every instrument in the universe.
    pub fn scan(&self, instruments: &[InstrumentSeries]) -> ScanRun {
        self.scan_window(instruments, &HistoricalWindow::full())
    }

    /// Scan every instrument in the universe truncated to `window`.
    ///
    /// Outcomes keep input order whether or not the `parallel` feature is on.
    pub fn scan_window(&self, instruments: &[InstrumentSeries], window: &HistoricalWindow) -> ScanRun {
        let selected: Vec<InstrumentSeries> = instruments
            .iter()
            .filter(|s| self.config.universe.includes(s))
            .map(|s| s.restrict(window))
            .collect();

        #[cfg(feature = "parallel")]
        let outcomes: Vec<InstrumentOutcome> = {
            use rayon::prelude::*;
            selected.par_iter().map(|s| self.analyze_instrument(s)).collect()
        };
        #[cfg(not(feature = "parallel"))]
        let outcomes: Vec<InstrumentOutcome> =
            selected.iter().map(|s| self.analyze_instrument(s)).collect();

        let run = ScanRun {
            config: self.config.clone(),
            window: window.clone(),
            catalog_version: self.catalog.version().to_string(),
            outcomes,
        };
        log::info!(
            "{} scan [{}] over {}: {} instruments, {} analysed, {} failed",
            self.config.method,
            window.label,
            self.config.lag_window,
            run.outcomes.len(),
            run.n_analyzed(),
            run.n_failed()
        );
        run
    }

    /// Coverage report for a scan run.
    pub fn validate(&self, run: &ScanRun, universe_label: &str) -> CycleResult<CarReport> {
        let scope = CoverageScope {
            method: run.config.method,
            universe: universe_label.to_string(),
            window: run.window.label.clone(),
            tolerance: run.config.tolerance,
            lag_window: run.config.lag_window,
        };
        validate_coverage(
            &run.outcomes,
            scope,
            &self.catalog,
            run.config.null_model,
            run.config.denominator,
        )
    }
}

/// Methods × historical windows × tolerances.
#[derive(Debug, Clone)]
pub struct CycleStudy {
    catalog: Arc<CycleCatalog>,
    config: StudyConfig,
}

impl CycleStudy {
    /// Validate the study configuration.
    pub fn new(catalog: Arc<CycleCatalog>, config: StudyConfig) -> CycleResult<Self> {
        config.validate()?;
        Ok(Self { catalog, config })
    }

    /// Study configuration.
    pub fn config(&self) -> &StudyConfig {
        &self.config
    }

    /// Run every scan over every window, then report at every tolerance.
    ///
    /// Detection runs once per method and window; only matching is repeated
    /// per tolerance.
    pub fn run(&self, instruments: &[InstrumentSeries]) -> CycleResult<StudyReport> {
        let mut report = StudyReport::default();
        for scan_config in &self.config.scans {
            let scanner = CycleScanner::new(Arc::clone(&self.catalog), scan_config.clone())?;
            let universe = scan_config.universe.label();
            for window in &self.config.windows {
                let base = scanner.scan_window(instruments, window);
                for &tolerance in &self.config.tolerances {
                    let run = base.rematched(&self.catalog, tolerance);
                    report.reports.push(scanner.validate(&run, &universe)?);
                    report.runs.push(run);
                }
            }
        }
        log::info!(
            "Study complete: {} reports over {} scans",
            report.reports.len(),
            self.config.scans.len()
        );
        Ok(report)
    }
}
