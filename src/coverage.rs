//! Coverage Acceptance Ratio (CAR) validation.
//!
//! For one scope (method, universe, historical window, tolerance) the
//! validator counts instruments with at least one catalog match, compares
//! that count with what random placement of detected lags would produce, and
//! tests the excess with a one-sample proportion z-test and an exact binomial
//! tail. Methods are never pooled.

use crate::catalog::CycleCatalog;
use crate::errors::{validate_parameter, CycleResult};
use crate::estimators::{EstimationMethod, LagWindow};
use crate::matcher::Tolerance;
use crate::results::InstrumentOutcome;
use crate::statistical_tests::{binomial_upper_tail, proportion_z_test};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Null model for the probability that a random lag lands on the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum NullModel {
    /// `p = min(1, C·(2T+1)/L)`: every entry claims its own tolerance window
    #[default]
    Uniform,
    /// Union of the tolerance windows clipped to the scan range, then
    /// `1 - (1 - p)^draws` for instruments reporting `draws` peaks
    MergedIntervals {
        /// Peaks reported per instrument
        draws: usize,
    },
}

impl NullModel {
    /// Tag used in report rows.
    pub fn label(&self) -> String {
        match self {
            NullModel::Uniform => "uniform".to_string(),
            NullModel::MergedIntervals { draws } => format!("merged(k={})", draws),
        }
    }
}

/// Which instruments form the denominator N.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CoverageDenominator {
    /// Every successfully analysed instrument
    #[default]
    Analyzed,
    /// Only analysed instruments with at least one significant peak
    WithDetections,
}

/// What a report aggregates over.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CoverageScope {
    /// Estimation method
    pub method: EstimationMethod,
    /// Universe label
    pub universe: String,
    /// Historical window label
    pub window: String,
    /// Matching tolerance
    pub tolerance: Tolerance,
    /// Scanned lag range
    pub lag_window: LagWindow,
}

/// Aggregate coverage statistics for one scope.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CarReport {
    /// Scope of the aggregation
    pub scope: CoverageScope,
    /// Instruments considered (N)
    pub n: usize,
    /// Instruments with at least one match
    pub matched: usize,
    /// Instruments whose analysis failed (excluded from N)
    pub failed: usize,
    /// Analysed instruments left out of N by the denominator rule
    pub excluded: usize,
    /// `matched / n`
    pub car: f64,
    /// Null probability p
    pub expected_probability: f64,
    /// `n · p`
    pub expected_count: f64,
    /// `(car - p) · 100` percentage points
    pub excess_pp: f64,
    /// z statistic
    pub z: f64,
    /// Two-tailed normal p-value
    pub p_value: f64,
    /// One-sided exact binomial p-value `P(X ≥ matched)`
    pub binomial_p_value: f64,
    /// Null model used
    pub null_model: NullModel,
    /// Catalog size C
    pub catalog_size: usize,
}

impl CarReport {
    /// CAR in percent.
    pub fn car_pct(&self) -> f64 {
        self.car * 100.0
    }

    /// Expected coverage in percent.
    pub fn expected_pct(&self) -> f64 {
        self.expected_probability * 100.0
    }
}

/// Probability that one random lag in the window falls within tolerance of
/// some catalog entry.
pub fn expected_probability(
    null_model: NullModel,
    catalog: &CycleCatalog,
    window: LagWindow,
    tolerance: Tolerance,
) -> f64 {
    let span = window.span() as f64;
    match null_model {
        NullModel::Uniform => {
            (catalog.len() as f64 * tolerance.window_width() as f64 / span).min(1.0)
        }
        NullModel::MergedIntervals { draws } => {
            let single = merged_interval_days(catalog, window, tolerance) as f64 / span;
            1.0 - (1.0 - single.min(1.0)).powi(draws.min(i32::MAX as usize) as i32)
        }
    }
}

/// Days of the window covered by the union of `[c - T, c + T]` intervals.
pub fn merged_interval_days(catalog: &CycleCatalog, window: LagWindow, tolerance: Tolerance) -> usize {
    let t = tolerance.days();
    let mut covered = 0;
    let mut cursor = window.min_lag;
    for entry in catalog.entries() {
        let lo = entry.lag.saturating_sub(t).max(cursor);
        let hi = (entry.lag + t).min(window.max_lag);
        if lo <= hi {
            covered += hi - lo + 1;
            cursor = hi + 1;
        }
    }
    covered
}

/// CAR statistics for `matched` of `n` instruments under null probability `p`.
///
/// `failed` and `excluded` are carried into the report unchanged.
pub fn coverage_statistics(
    scope: CoverageScope,
    n: usize,
    matched: usize,
    p: f64,
    null_model: NullModel,
    catalog_size: usize,
) -> CycleResult<CarReport> {
    validate_parameter(p, 0.0, 1.0, "expected_probability")?;
    let test = proportion_z_test(matched, n, p)?;
    let binomial_p_value = if n == 0 { 1.0 } else { binomial_upper_tail(matched, n, p)? };
    let car = if n == 0 { 0.0 } else { matched as f64 / n as f64 };

    Ok(CarReport {
        scope,
        n,
        matched,
        failed: 0,
        excluded: 0,
        car,
        expected_probability: p,
        expected_count: test.expected,
        excess_pp: (car - p) * 100.0,
        z: test.z,
        p_value: test.p_value,
        binomial_p_value,
        null_model,
        catalog_size,
    })
}

/// Aggregate instrument outcomes of one scope into a CAR report.
///
/// Failed instruments are excluded from N and reported as `failed`. An
/// instrument counts as matched when it has at least one match record.
pub fn validate(
    outcomes: &[InstrumentOutcome],
    scope: CoverageScope,
    catalog: &CycleCatalog,
    null_model: NullModel,
    denominator: CoverageDenominator,
) -> CycleResult<CarReport> {
    let failed = outcomes.iter().filter(|o| o.is_failed()).count();
    let analysed: Vec<&InstrumentOutcome> = outcomes.iter().filter(|o| !o.is_failed()).collect();
    let considered: Vec<&InstrumentOutcome> = match denominator {
        CoverageDenominator::Analyzed => analysed.clone(),
        CoverageDenominator::WithDetections => analysed
            .iter()
            .copied()
            .filter(|o| o.has_detections())
            .collect(),
    };

    let n = considered.len();
    let matched = considered.iter().filter(|o| o.is_matched()).count();
    let p = expected_probability(null_model, catalog, scope.lag_window, scope.tolerance);

    let mut report = coverage_statistics(scope, n, matched, p, null_model, catalog.len())?;
    report.failed = failed;
    report.excluded = analysed.len() - n;

    log::info!(
        "CAR {} {} {} T={}: {}/{} matched ({:.2}% vs {:.2}% expected), z = {:.3}, p = {:.3e}, {} failed",
        report.scope.method,
        report.scope.universe,
        report.scope.window,
        report.scope.tolerance,
        matched,
        n,
        report.car_pct(),
        report.expected_pct(),
        report.z,
        report.p_value,
        failed
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn scope(min_lag: usize, max_lag: usize) -> CoverageScope {
        CoverageScope {
            method: EstimationMethod::Psd,
            universe: "all".to_string(),
            window: "full".to_string(),
            tolerance: Tolerance::default(),
            lag_window: LagWindow::new(min_lag, max_lag).unwrap(),
        }
    }

    #[test]
    fn test_uniform_probability() {
        let catalog = CycleCatalog::builtin();
        let p = expected_probability(
            NullModel::Uniform,
            &catalog,
            LagWindow::new(175, 680).unwrap(),
            Tolerance::default(),
        );
        assert_approx_eq!(p, 0.5237154150197628, 1e-12);
    }

    #[test]
    fn test_uniform_probability_capped_and_monotone() {
        let catalog = CycleCatalog::builtin();
        let narrow = LagWindow::new(179, 300).unwrap();
        let p3 = expected_probability(NullModel::Uniform, &catalog, narrow, Tolerance::new(3).unwrap());
        assert_eq!(p3, 1.0);

        let wide = LagWindow::new(179, 676).unwrap();
        let mut last = 0.0;
        for t in Tolerance::ALLOWED {
            let p = expected_probability(NullModel::Uniform, &catalog, wide, Tolerance::new(t).unwrap());
            assert!(p >= last && p <= 1.0);
            last = p;
        }
    }

    #[test]
    fn test_merged_intervals_do_not_double_count() {
        let catalog = CycleCatalog::from_reader("t", "id,lag\n1,100\n2,102\n3,150\n".as_bytes()).unwrap();
        let window = LagWindow::new(90, 160).unwrap();
        // [98,104] ∪ [148,152] = 7 + 5 days
        assert_eq!(merged_interval_days(&catalog, window, Tolerance::default()), 12);

        let clipped = LagWindow::new(101, 149).unwrap();
        // [101,104] ∪ [148,149]
        assert_eq!(merged_interval_days(&catalog, clipped, Tolerance::default()), 6);

        let single = 12.0 / 71.0;
        let p = expected_probability(
            NullModel::MergedIntervals { draws: 2 },
            &catalog,
            window,
            Tolerance::default(),
        );
        assert_approx_eq!(p, 1.0 - (1.0 - single) * (1.0 - single), 1e-12);
    }

    #[test]
    fn test_reference_statistics() {
        let p = 53.0 * 5.0 / 506.0;
        let report = coverage_statistics(scope(175, 680), 245, 193, p, NullModel::Uniform, 53).unwrap();
        assert_approx_eq!(report.car_pct(), 78.77551020408163, 1e-9);
        assert_approx_eq!(report.expected_count, 128.31027667984188, 1e-9);
        assert_approx_eq!(report.z, 8.275063023047785, 1e-9);
        assert_approx_eq!(report.excess_pp, 26.403968702105352, 1e-9);
        assert!(report.p_value < 1e-15);
        assert!(report.binomial_p_value < 1e-12);
    }

    #[test]
    fn test_empty_scope_is_degenerate() {
        let report = coverage_statistics(scope(179, 676), 0, 0, 0.5, NullModel::Uniform, 53).unwrap();
        assert_eq!(report.car, 0.0);
        assert_eq!(report.z, 0.0);
        assert_eq!(report.p_value, 1.0);
        assert_eq!(report.binomial_p_value, 1.0);
    }
}
