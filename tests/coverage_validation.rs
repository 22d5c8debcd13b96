//! Coverage Acceptance Ratio aggregation over synthetic instrument outcomes.

use assert_approx_eq::assert_approx_eq;
use plastic_cycles::coverage::{coverage_statistics, expected_probability, validate};
use plastic_cycles::{
    match_peaks, AssetClass, CoverageDenominator, CoverageScope, CycleAnalysisError,
    CycleCatalog, DetectedPeak, EstimationMethod, InstrumentOutcome, InstrumentStatus, LagWindow,
    NullModel, Tolerance,
};

fn peak(instrument: &str, lag: usize, significant: bool) -> DetectedPeak {
    DetectedPeak {
        instrument: instrument.to_string(),
        method: EstimationMethod::Psd,
        lag,
        strength: 1.0,
        significant,
        threshold: 0.5,
    }
}

fn outcome(catalog: &CycleCatalog, id: &str, lags: &[usize]) -> InstrumentOutcome {
    let peaks: Vec<DetectedPeak> = lags.iter().map(|&l| peak(id, l, true)).collect();
    let matches = match_peaks(id, &peaks, catalog, Tolerance::default());
    InstrumentOutcome {
        instrument: id.to_string(),
        asset_class: AssetClass::Equity,
        method: EstimationMethod::Psd,
        status: InstrumentStatus::Analyzed,
        peaks,
        matches,
        preprocessing: None,
    }
}

fn scope(min_lag: usize, max_lag: usize) -> CoverageScope {
    CoverageScope {
        method: EstimationMethod::Psd,
        universe: "all".to_string(),
        window: "full".to_string(),
        tolerance: Tolerance::default(),
        lag_window: LagWindow::new(min_lag, max_lag).unwrap(),
    }
}

/// 193 matched (peak on 196), 40 unmatched with a peak on 300, 12 with no peaks.
fn reference_universe(catalog: &CycleCatalog) -> Vec<InstrumentOutcome> {
    let mut outcomes = Vec::new();
    for i in 0..193 {
        outcomes.push(outcome(catalog, &format!("M{:03}", i), &[196]));
    }
    for i in 0..40 {
        outcomes.push(outcome(catalog, &format!("U{:03}", i), &[300]));
    }
    for i in 0..12 {
        outcomes.push(outcome(catalog, &format!("E{:03}", i), &[]));
    }
    outcomes
}

#[test]
fn test_reference_study_values() {
    let catalog = CycleCatalog::builtin();
    let outcomes = reference_universe(&catalog);
    assert!(catalog.nearest(300).unwrap().1 > 2);

    let report = validate(
        &outcomes,
        scope(175, 680),
        &catalog,
        NullModel::Uniform,
        CoverageDenominator::Analyzed,
    )
    .unwrap();

    assert_eq!(report.n, 245);
    assert_eq!(report.matched, 193);
    assert_approx_eq!(report.expected_probability, 0.5237154150197628, 1e-12);
    assert_approx_eq!(report.expected_count, 128.31027667984188, 1e-9);
    assert_approx_eq!(report.z, 8.275063023047785, 1e-9);
    assert_approx_eq!(report.car_pct(), 78.77551020408163, 1e-9);
    assert_approx_eq!(report.excess_pp, 26.403968702105352, 1e-9);
    assert!(report.p_value < 1e-15);
    assert!(report.binomial_p_value < 1e-12);
    assert_eq!(report.catalog_size, 53);
}

#[test]
fn test_reference_study_on_pacf_window() {
    let catalog = CycleCatalog::builtin();
    let report = coverage_statistics(
        scope(179, 676),
        245,
        193,
        expected_probability(
            NullModel::Uniform,
            &catalog,
            LagWindow::new(179, 676).unwrap(),
            Tolerance::default(),
        ),
        NullModel::Uniform,
        catalog.len(),
    )
    .unwrap();
    assert_approx_eq!(report.expected_probability, 0.5321285140562249, 1e-12);
    assert_approx_eq!(report.z, 8.018950095163424, 1e-9);
}

#[test]
fn test_failed_instruments_leave_denominator() {
    let catalog = CycleCatalog::builtin();
    let mut outcomes = reference_universe(&catalog);
    let error = CycleAnalysisError::InsufficientData {
        required: 1023,
        actual: 400,
    };
    for i in 0..5 {
        outcomes.push(InstrumentOutcome::failed(
            format!("F{}", i),
            AssetClass::Forex,
            EstimationMethod::Psd,
            &error,
        ));
    }

    let report = validate(
        &outcomes,
        scope(175, 680),
        &catalog,
        NullModel::Uniform,
        CoverageDenominator::Analyzed,
    )
    .unwrap();
    assert_eq!(report.n, 245);
    assert_eq!(report.failed, 5);
    assert_approx_eq!(report.z, 8.275063023047785, 1e-9);
}

#[test]
fn test_detections_denominator_drops_empty_instruments() {
    let catalog = CycleCatalog::builtin();
    let outcomes = reference_universe(&catalog);
    let report = validate(
        &outcomes,
        scope(175, 680),
        &catalog,
        NullModel::Uniform,
        CoverageDenominator::WithDetections,
    )
    .unwrap();
    assert_eq!(report.n, 233);
    assert_eq!(report.excluded, 12);
    assert_eq!(report.matched, 193);
}

#[test]
fn test_insignificant_peaks_never_count_as_matches() {
    let catalog = CycleCatalog::builtin();
    let peaks = vec![peak("X", 196, false)];
    let matches = match_peaks("X", &peaks, &catalog, Tolerance::new(3).unwrap());
    assert!(matches.is_empty());
}

#[test]
fn test_expected_probability_grows_with_catalog_and_tolerance() {
    let window = LagWindow::new(179, 676).unwrap();
    let builtin = CycleCatalog::builtin();
    let small = CycleCatalog::from_entries(
        "small",
        builtin.entries()[..20].to_vec(),
    )
    .unwrap();

    for t in Tolerance::ALLOWED {
        let tol = Tolerance::new(t).unwrap();
        let p_small = expected_probability(NullModel::Uniform, &small, window, tol);
        let p_full = expected_probability(NullModel::Uniform, &builtin, window, tol);
        assert!(p_small < p_full);
    }

    let merged_loose = expected_probability(
        NullModel::MergedIntervals { draws: 1 },
        &builtin,
        window,
        Tolerance::new(3).unwrap(),
    );
    let merged_tight = expected_probability(
        NullModel::MergedIntervals { draws: 1 },
        &builtin,
        window,
        Tolerance::new(1).unwrap(),
    );
    assert!(merged_tight < merged_loose);
}

#[test]
fn test_empty_universe_reports_no_evidence() {
    let catalog = CycleCatalog::builtin();
    let report = validate(
        &[],
        scope(179, 511),
        &catalog,
        NullModel::Uniform,
        CoverageDenominator::Analyzed,
    )
    .unwrap();
    assert_eq!(report.n, 0);
    assert_eq!(report.car, 0.0);
    assert_eq!(report.z, 0.0);
    assert_eq!(report.p_value, 1.0);
}
