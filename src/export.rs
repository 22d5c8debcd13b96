//! Tabular CSV export of match records, coverage reports and status rows.
//!
//! Row order is deterministic (input instrument order, then catalog id), and
//! floats are written in shortest round-trip form, so identical runs produce
//! byte-identical files.

use crate::coverage::CarReport;
use crate::errors::{CycleAnalysisError, CycleResult};
use crate::results::{InstrumentStatus, ScanRun};
use serde::{Deserialize, Serialize};
use std::io::Write;

/// Column names of [`MatchRow`].
pub const MATCH_HEADER: [&str; 7] = [
    "instrument",
    "method",
    "catalog_id",
    "catalog_lag",
    "detected_lag",
    "delta",
    "tolerance",
];

/// Column names of [`CarRow`].
pub const CAR_HEADER: [&str; 19] = [
    "method",
    "universe",
    "window",
    "tolerance",
    "min_lag",
    "max_lag",
    "null_model",
    "catalog_size",
    "n",
    "matched",
    "failed",
    "excluded",
    "car_pct",
    "expected_count",
    "expected_pct",
    "excess_pp",
    "z",
    "p_value",
    "binomial_p_value",
];

/// Column names of [`StatusRow`].
pub const STATUS_HEADER: [&str; 5] = ["instrument", "asset_class", "status", "code", "message"];

/// One exported match record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRow {
    /// Instrument identifier
    pub instrument: String,
    /// Method tag
    pub method: String,
    /// Catalog entry id
    pub catalog_id: usize,
    /// Catalog target lag
    pub catalog_lag: usize,
    /// Detected lag
    pub detected_lag: usize,
    /// `|detected - catalog|`
    pub delta: usize,
    /// Tolerance in days
    pub tolerance: usize,
}

/// One exported coverage report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarRow {
    /// Method tag
    pub method: String,
    /// Universe label
    pub universe: String,
    /// Historical window label
    pub window: String,
    /// Tolerance in days
    pub tolerance: usize,
    /// Scan window start
    pub min_lag: usize,
    /// Scan window end
    pub max_lag: usize,
    /// Null model tag
    pub null_model: String,
    /// Catalog size
    pub catalog_size: usize,
    /// Instruments considered
    pub n: usize,
    /// Instruments matched
    pub matched: usize,
    /// Instruments failed
    pub failed: usize,
    /// Analysed instruments excluded from N
    pub excluded: usize,
    /// CAR in percent
    pub car_pct: f64,
    /// Expected matched count
    pub expected_count: f64,
    /// Expected coverage in percent
    pub expected_pct: f64,
    /// Excess coverage in percentage points
    pub excess_pp: f64,
    /// z statistic
    pub z: f64,
    /// Two-tailed p-value
    pub p_value: f64,
    /// One-sided binomial p-value
    pub binomial_p_value: f64,
}

/// One exported processing status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRow {
    /// Instrument identifier
    pub instrument: String,
    /// Asset class tag
    pub asset_class: String,
    /// `SUCCESS` or `ERROR`
    pub status: String,
    /// Failure code, empty on success
    pub code: String,
    /// Detail message
    pub message: String,
}

/// Flatten a run into match rows.
pub fn match_rows(run: &ScanRun) -> Vec<MatchRow> {
    run.records()
        .map(|r| MatchRow {
            instrument: r.instrument.clone(),
            method: r.method().as_str().to_string(),
            catalog_id: r.catalog_id,
            catalog_lag: r.catalog_lag,
            detected_lag: r.peak.lag,
            delta: r.delta,
            tolerance: r.tolerance.days(),
        })
        .collect()
}

/// Convert reports into rows.
pub fn car_rows(reports: &[CarReport]) -> Vec<CarRow> {
    reports
        .iter()
        .map(|r| CarRow {
            method: r.scope.method.as_str().to_string(),
            universe: r.scope.universe.clone(),
            window: r.scope.window.clone(),
            tolerance: r.scope.tolerance.days(),
            min_lag: r.scope.lag_window.min_lag,
            max_lag: r.scope.lag_window.max_lag,
            null_model: r.null_model.label(),
            catalog_size: r.catalog_size,
            n: r.n,
            matched: r.matched,
            failed: r.failed,
            excluded: r.excluded,
            car_pct: r.car_pct(),
            expected_count: r.expected_count,
            expected_pct: r.expected_pct(),
            excess_pp: r.excess_pp,
            z: r.z,
            p_value: r.p_value,
            binomial_p_value: r.binomial_p_value,
        })
        .collect()
}

/// One status row per instrument of a run.
pub fn status_rows(run: &ScanRun) -> Vec<StatusRow> {
    run.outcomes
        .iter()
        .map(|o| match &o.status {
            InstrumentStatus::Analyzed => StatusRow {
                instrument: o.instrument.clone(),
                asset_class: o.asset_class.as_str().to_string(),
                status: "SUCCESS".to_string(),
                code: String::new(),
                message: format!("{} peaks, {} matches", o.peaks.len(), o.matches.len()),
            },
            InstrumentStatus::Failed { code, message } => StatusRow {
                instrument: o.instrument.clone(),
                asset_class: o.asset_class.as_str().to_string(),
                status: "ERROR".to_string(),
                code: code.as_str().to_string(),
                message: message.clone(),
            },
        })
        .collect()
}

fn csv_error(e: csv::Error) -> CycleAnalysisError {
    CycleAnalysisError::Serialization {
        format: "csv".to_string(),
        reason: e.to_string(),
    }
}

/// Serialize `rows` after a header line.
///
/// The serializer derives the header from the first record, so an empty
/// table gets `header` written explicitly.
fn write_rows<W: Write, T: Serialize>(writer: W, header: &[&str], rows: &[T]) -> CycleResult<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    if rows.is_empty() {
        csv_writer.write_record(header).map_err(csv_error)?;
    }
    for row in rows {
        csv_writer.serialize(row).map_err(csv_error)?;
    }
    csv_writer
        .flush()
        .map_err(|e| CycleAnalysisError::io("flush csv output", e))
}

/// Write match rows as CSV with a header.
pub fn write_match_rows<W: Write>(writer: W, rows: &[MatchRow]) -> CycleResult<()> {
    write_rows(writer, &MATCH_HEADER, rows)
}

/// Write coverage report rows as CSV with a header.
pub fn write_car_rows<W: Write>(writer: W, rows: &[CarRow]) -> CycleResult<()> {
    write_rows(writer, &CAR_HEADER, rows)
}

/// Write status rows as CSV with a header.
pub fn write_status_rows<W: Write>(writer: W, rows: &[StatusRow]) -> CycleResult<()> {
    write_rows(writer, &STATUS_HEADER, rows)
}
