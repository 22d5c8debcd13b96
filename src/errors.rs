//! Error types and validation functions for cycle analysis.
//!
//! Errors fall into two scopes. Instrument-scoped errors (short series,
//! singular autocovariance systems, malformed series, numerical failures) are
//! caught at the instrument boundary and recorded as a status; they never
//! abort a batch. Run-scoped errors (invalid configuration, unusable cycle
//! catalog) abort before any instrument is processed.

use std::sync::Arc;
use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Comprehensive error types for cycle detection and coverage validation.
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum CycleAnalysisError {
    /// Series too short for the requested lag window.
    #[error("Insufficient data: need at least {required} points, got {actual}")]
    InsufficientData {
        /// Minimum required data points
        required: usize,
        /// Actual number of data points provided
        actual: usize,
    },

    /// Autocorrelation solve is numerically unstable.
    #[error("Singular autocovariance system at lag {lag}: {reason}")]
    SingularSystem {
        /// Recursion step at which the system broke down
        lag: usize,
        /// Detailed reason for the breakdown
        reason: String,
    },

    /// Instrument series violates the data model (ordering, duplicates, prices).
    #[error("Invalid series {instrument}: {reason}")]
    InvalidSeries {
        /// Instrument identifier
        instrument: String,
        /// What invariant was violated
        reason: String,
    },

    /// Invalid parameter value for the run configuration.
    #[error("Invalid parameter: {parameter} = {value}, expected {constraint}")]
    InvalidParameter {
        /// Parameter name
        parameter: String,
        /// Invalid value provided
        value: f64,
        /// Valid range or constraint description
        constraint: String,
    },

    /// Cycle catalog table missing or malformed.
    #[error("Cycle catalog could not be loaded: {reason}")]
    CatalogLoad {
        /// Detailed reason for the load failure
        reason: String,
    },

    /// Numerical computation error due to instability or non-finite values.
    #[error("Numerical computation failed: {reason}")]
    NumericalError {
        /// Detailed reason for numerical failure
        reason: String,
        /// Operation that failed
        operation: Option<String>,
    },

    /// FFT computation error for spectral analysis.
    #[error("FFT computation failed: input size {size} not supported")]
    FftError {
        /// Input size that caused the FFT failure
        size: usize,
    },

    /// I/O operation error.
    #[error("I/O operation failed: {operation}")]
    Io {
        /// I/O operation that failed
        operation: String,
        /// Underlying error if available
        #[source]
        source: Option<Arc<std::io::Error>>,
    },

    /// Serialization error while writing tabular output.
    #[error("Serialization failed ({format}): {reason}")]
    Serialization {
        /// Output format (CSV, JSON, ...)
        format: String,
        /// Underlying failure description
        reason: String,
    },
}

/// Result type for cycle analysis operations.
pub type CycleResult<T> = Result<T, CycleAnalysisError>;

/// Status code recorded for an instrument whose analysis failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum FailureCode {
    /// Series shorter than `max_lag + buffer`
    InsufficientData,
    /// Autocovariance system could not be solved
    SingularSystem,
    /// Series violates ordering or price invariants
    InvalidSeries,
    /// Non-finite values or FFT failure
    Numerical,
}

impl FailureCode {
    /// Stable upper-case tag used in exported status rows.
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureCode::InsufficientData => "INSUFFICIENT_DATA",
            FailureCode::SingularSystem => "SINGULAR_SYSTEM",
            FailureCode::InvalidSeries => "INVALID_SERIES",
            FailureCode::Numerical => "NUMERICAL",
        }
    }
}

impl std::fmt::Display for FailureCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl CycleAnalysisError {
    /// Whether the error concerns a single instrument and must not abort a batch.
    pub fn is_instrument_scoped(&self) -> bool {
        self.failure_code().is_some()
    }

    /// Status code for instrument-scoped errors, `None` for run-level errors.
    pub fn failure_code(&self) -> Option<FailureCode> {
        match self {
            CycleAnalysisError::InsufficientData { .. } => Some(FailureCode::InsufficientData),
            CycleAnalysisError::SingularSystem { .. } => Some(FailureCode::SingularSystem),
            CycleAnalysisError::InvalidSeries { .. } => Some(FailureCode::InvalidSeries),
            CycleAnalysisError::NumericalError { .. } | CycleAnalysisError::FftError { .. } => {
                Some(FailureCode::Numerical)
            }
            _ => None,
        }
    }

    /// Wrap an I/O error with the operation that produced it.
    pub fn io(operation: impl Into<String>, source: std::io::Error) -> Self {
        CycleAnalysisError::Io {
            operation: operation.into(),
            source: Some(Arc::new(source)),
        }
    }
}

/// Validates that data has sufficient length for analysis.
///
/// # Example
/// ```rust
/// use plastic_cycles::errors::validate_data_length;
///
/// let data = vec![1.0, 2.0, 3.0];
/// assert!(validate_data_length(&data, 2).is_ok());
/// assert!(validate_data_length(&data, 5).is_err());
/// ```
pub fn validate_data_length(data: &[f64], min_required: usize) -> CycleResult<()> {
    if data.len() < min_required {
        Err(CycleAnalysisError::InsufficientData {
            required: min_required,
            actual: data.len(),
        })
    } else {
        Ok(())
    }
}

/// Validates that a parameter is within expected bounds (inclusive).
///
/// # Example
/// ```rust
/// use plastic_cycles::errors::validate_parameter;
///
/// assert!(validate_parameter(0.95, 0.5, 0.9999, "confidence").is_ok());
/// assert!(validate_parameter(1.5, 0.5, 0.9999, "confidence").is_err());
/// ```
pub fn validate_parameter(value: f64, min: f64, max: f64, name: &str) -> CycleResult<()> {
    if value.is_nan() {
        return Err(CycleAnalysisError::InvalidParameter {
            parameter: name.to_string(),
            value,
            constraint: "must not be NaN".to_string(),
        });
    }

    if min.is_nan() || max.is_nan() || min > max {
        return Err(CycleAnalysisError::NumericalError {
            reason: format!(
                "Invalid bounds for parameter {}: min={}, max={}",
                name, min, max
            ),
            operation: None,
        });
    }

    if value < min || value > max {
        Err(CycleAnalysisError::InvalidParameter {
            parameter: name.to_string(),
            value,
            constraint: format!("[{}, {}]", min, max),
        })
    } else {
        Ok(())
    }
}

/// Validates a `[min_lag, max_lag]` scan window.
///
/// Both ends must be at least 2 days and `min_lag < max_lag`.
pub fn validate_lag_window(min_lag: usize, max_lag: usize) -> CycleResult<()> {
    if min_lag < 2 {
        return Err(CycleAnalysisError::InvalidParameter {
            parameter: "min_lag".to_string(),
            value: min_lag as f64,
            constraint: ">= 2".to_string(),
        });
    }
    if min_lag >= max_lag {
        return Err(CycleAnalysisError::InvalidParameter {
            parameter: "min_lag".to_string(),
            value: min_lag as f64,
            constraint: format!("< max_lag ({})", max_lag),
        });
    }
    Ok(())
}

/// Validates that all values in a slice are finite.
///
/// Returns immediately on the first non-finite value.
///
/// # Example
/// ```rust
/// use plastic_cycles::errors::validate_all_finite;
///
/// assert!(validate_all_finite(&[1.0, 2.0], "test").is_ok());
/// assert!(validate_all_finite(&[1.0, f64::NAN], "test").is_err());
/// ```
pub fn validate_all_finite(data: &[f64], name: &str) -> CycleResult<()> {
    if let Some((i, &value)) = data.iter().enumerate().find(|(_, v)| !v.is_finite()) {
        return Err(CycleAnalysisError::NumericalError {
            reason: format!("{} contains non-finite value at index {}: {}", name, i, value),
            operation: None,
        });
    }
    Ok(())
}
