//! Series preprocessing for cycle detection.
//!
//! Turns a validated price series into the stationary analysis series an
//! estimator consumes: log or simple returns, or a finite difference of the
//! price level. The length check lives here so every estimator sees the same
//! `max_lag + buffer` rule.

use crate::errors::{validate_all_finite, CycleAnalysisError, CycleResult};
use crate::series::{AssetClass, InstrumentSeries};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Transform applied to closing prices before estimation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SeriesTransform {
    /// `ln(c_t / c_{t-1})`
    #[default]
    LogReturn,
    /// `c_t / c_{t-1} - 1`
    SimpleReturn,
    /// d-th finite difference of the price level (0 keeps levels)
    Difference(usize),
}

impl SeriesTransform {
    /// Observations consumed by the transform.
    pub fn consumed(&self) -> usize {
        match self {
            SeriesTransform::LogReturn | SeriesTransform::SimpleReturn => 1,
            SeriesTransform::Difference(d) => *d,
        }
    }

    /// Apply the transform to a price vector.
    pub fn apply(&self, closes: &[f64]) -> Vec<f64> {
        match self {
            SeriesTransform::LogReturn => closes.windows(2).map(|w| (w[1] / w[0]).ln()).collect(),
            SeriesTransform::SimpleReturn => closes.windows(2).map(|w| w[1] / w[0] - 1.0).collect(),
            SeriesTransform::Difference(d) => {
                let mut values = closes.to_vec();
                for _ in 0..*d {
                    values = values.windows(2).map(|w| w[1] - w[0]).collect();
                }
                values
            }
        }
    }
}

impl std::fmt::Display for SeriesTransform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SeriesTransform::LogReturn => f.write_str("log_return"),
            SeriesTransform::SimpleReturn => f.write_str("simple_return"),
            SeriesTransform::Difference(d) => write!(f, "diff{}", d),
        }
    }
}

/// Preprocessing information for one analysis series.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PreprocessingInfo {
    /// Transform applied
    pub transform: SeriesTransform,
    /// Raw observations before the transform
    pub input_length: usize,
    /// Values after the transform
    pub output_length: usize,
    /// Observations required by the length check
    pub required_length: usize,
}

/// Stationary series handed to an estimator.
#[derive(Debug, Clone)]
pub struct AnalysisSeries {
    /// Instrument identifier
    pub instrument: String,
    /// Instrument asset class
    pub asset_class: AssetClass,
    /// Transformed values
    pub values: Vec<f64>,
    /// How the values were produced
    pub info: PreprocessingInfo,
}

/// Transform a price series for analysis.
///
/// Fails with `InsufficientData` when the instrument has fewer than
/// `max_lag + buffer` observations; exactly that many is accepted.
///
/// # Example
/// ```rust
/// use chrono::{Duration, NaiveDate};
/// use plastic_cycles::preprocessing::{prepare_analysis_series, SeriesTransform};
/// use plastic_cycles::series::{AssetClass, InstrumentSeries, PricePoint};
///
/// let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
/// let points: Vec<PricePoint> = (0..30)
///     .map(|i| PricePoint::new(start + Duration::days(i), 100.0 + i as f64))
///     .collect();
/// let series = InstrumentSeries::new("DEMO", AssetClass::Equity, points).unwrap();
///
/// let prepared = prepare_analysis_series(&series, SeriesTransform::LogReturn, 20, 10).unwrap();
/// assert_eq!(prepared.values.len(), 29);
/// assert!(prepare_analysis_series(&series, SeriesTransform::LogReturn, 20, 11).is_err());
/// ```
pub fn prepare_analysis_series(
    series: &InstrumentSeries,
    transform: SeriesTransform,
    max_lag: usize,
    buffer: usize,
) -> CycleResult<AnalysisSeries> {
    let required = max_lag.saturating_add(buffer);
    let input_length = series.len();
    if input_length < required {
        return Err(CycleAnalysisError::InsufficientData {
            required,
            actual: input_length,
        });
    }
    if input_length <= transform.consumed() {
        return Err(CycleAnalysisError::InsufficientData {
            required: transform.consumed() + 1,
            actual: input_length,
        });
    }

    let values = transform.apply(&series.closes());
    validate_all_finite(&values, "analysis series")?;

    log::debug!(
        "{}: {} closes -> {} values ({})",
        series.id(),
        input_length,
        values.len(),
        transform
    );

    Ok(AnalysisSeries {
        instrument: series.id().to_string(),
        asset_class: series.asset_class(),
        info: PreprocessingInfo {
            transform,
            input_length,
            output_length: values.len(),
            required_length: required,
        },
        values,
    })
}
