//! # Plastic Cycles
//!
//! Cycle detection in financial time series and statistical validation
//! against the plastic-number cycle catalog.
//!
//! The crate estimates dominant periods in daily price series with three
//! independent methods, matches them against a fixed catalog of 53 candidate
//! cycle lengths, and tests across an instrument universe whether the catalog
//! is hit more often than random placement would allow.
//!
//! ## Key Features
//!
//! - **Three estimators behind one interface**: windowed periodogram, partial
//!   autocorrelation (Levinson-Durbin) and Morlet continuous wavelet, each with
//!   an analytic significance threshold
//! - **Deterministic matching**: greedy, injective assignment of significant
//!   peaks to catalog entries within a 1-3 day tolerance
//! - **Coverage Acceptance Ratio**: observed vs. expected coverage with a
//!   proportion z-test and an exact binomial tail
//! - **Fault isolation**: per-instrument failures are recorded, never fatal
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use plastic_cycles::{
//!     generate_cyclic_prices, AssetClass, CycleCatalog, CycleScanner, CyclicSeriesConfig,
//!     ScanConfig,
//! };
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let universe: Vec<_> = (0..3)
//!         .map(|i| {
//!             let config = CyclicSeriesConfig { seed: i, ..CyclicSeriesConfig::default() };
//!             generate_cyclic_prices(&format!("SYN{}", i), AssetClass::Equity, &config)
//!         })
//!         .collect::<Result<_, _>>()?;
//!
//!     let scanner = CycleScanner::new(CycleCatalog::shared(), ScanConfig::psd())?;
//!     let run = scanner.scan(&universe);
//!     for record in run.records() {
//!         println!(
//!             "{}: detected {} matches catalog #{} ({} days, delta {})",
//!             record.instrument, record.peak.lag, record.catalog_id, record.catalog_lag, record.delta
//!         );
//!     }
//!
//!     let report = scanner.validate(&run, "synthetic")?;
//!     println!("CAR {:.1}% vs {:.1}% expected, p = {:.2e}",
//!         report.car_pct(), report.expected_pct(), report.p_value);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! Data flows from [`preprocessing`] through one of the [`estimators`]
//! ([`spectral`], [`autocorrelation`], [`wavelet`]) to the [`matcher`] and
//! finally the [`coverage`] validator. [`analyzer`] orchestrates scans and
//! multi-window studies; [`export`] writes the results as CSV.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
#![warn(clippy::all)]

// Core modules
pub mod errors;
pub mod fft_ops;
pub mod linear_algebra;
pub mod math_utils;
pub mod statistical_tests;

// Data model
pub mod catalog;
pub mod config;
pub mod preprocessing;
pub mod results;
pub mod series;

// Estimation and validation
pub mod analyzer;
pub mod autocorrelation;
pub mod coverage;
pub mod estimators;
pub mod generators;
pub mod matcher;
pub mod spectral;
pub mod wavelet;

#[cfg(feature = "serde")]
#[cfg_attr(docsrs, doc(cfg(feature = "serde")))]
pub mod export;

// Re-exports for convenience - main public API
pub use analyzer::{CycleScanner, CycleStudy};
pub use catalog::{CatalogEntry, CycleCatalog, PLASTIC_NUMBER};
pub use config::{HistoricalWindow, PeakSelection, ScanConfig, StudyConfig, UniverseSelector};
pub use coverage::{CarReport, CoverageDenominator, CoverageScope, NullModel};
pub use errors::{CycleAnalysisError, CycleResult, FailureCode};
pub use estimators::{CycleEstimator, DetectedPeak, EstimationMethod, LagWindow};
pub use matcher::{match_peaks, MatchRecord, Tolerance};
pub use preprocessing::{prepare_analysis_series, AnalysisSeries, SeriesTransform};
pub use results::{InstrumentOutcome, InstrumentStatus, ScanRun, StudyReport};
pub use series::{AssetClass, InstrumentSeries, PricePoint};

// Estimator exports
pub use autocorrelation::PartialAutocorrelationEstimator;
pub use spectral::PeriodogramEstimator;
pub use wavelet::WaveletEstimator;

// Data generation exports
pub use generators::{
    generate_cyclic_prices, generate_random_walk_prices, generate_seasonal_ar_prices,
    CycleComponent, CyclicSeriesConfig, RandomWalkConfig, SeasonalArConfig,
};

// FFT operations exports
pub use fft_ops::{clear_fft_cache, get_cached_fft_forward, get_cached_fft_inverse, get_fft_cache_stats};
