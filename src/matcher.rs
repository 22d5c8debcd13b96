//! Catalog matching of detected peaks.
//!
//! Significant peaks are paired with catalog entries whose target lag lies
//! within the tolerance. Assignment is greedy over all candidate pairs in a
//! fixed order, so each entry and each peak is used at most once and the
//! outcome never depends on input order.

use crate::catalog::CycleCatalog;
use crate::errors::{CycleAnalysisError, CycleResult};
use crate::estimators::{DetectedPeak, EstimationMethod};
use crate::math_utils::float_total_cmp;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Matching tolerance in trading days, one of 1, 2 or 3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "usize", into = "usize"))]
pub struct Tolerance(usize);

impl Tolerance {
    /// Accepted tolerances.
    pub const ALLOWED: [usize; 3] = [1, 2, 3];

    /// Validated tolerance.
    pub fn new(days: usize) -> CycleResult<Self> {
        if Self::ALLOWED.contains(&days) {
            Ok(Self(days))
        } else {
            Err(CycleAnalysisError::InvalidParameter {
                parameter: "tolerance".to_string(),
                value: days as f64,
                constraint: "one of {1, 2, 3}".to_string(),
            })
        }
    }

    /// Tolerance in days.
    pub fn days(&self) -> usize {
        self.0
    }

    /// Width of a tolerance window, `2T + 1`.
    pub fn window_width(&self) -> usize {
        2 * self.0 + 1
    }
}

impl Default for Tolerance {
    fn default() -> Self {
        Self(2)
    }
}

impl TryFrom<usize> for Tolerance {
    type Error = CycleAnalysisError;

    fn try_from(days: usize) -> CycleResult<Self> {
        Self::new(days)
    }
}

impl From<Tolerance> for usize {
    fn from(t: Tolerance) -> usize {
        t.0
    }
}

impl std::fmt::Display for Tolerance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A detected peak paired with a catalog entry.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MatchRecord {
    /// Instrument identifier
    pub instrument: String,
    /// Catalog entry id
    pub catalog_id: usize,
    /// Catalog target lag
    pub catalog_lag: usize,
    /// The matched peak
    pub peak: DetectedPeak,
    /// `|detected - catalog|`
    pub delta: usize,
    /// Tolerance the match was made under
    pub tolerance: Tolerance,
}

impl MatchRecord {
    /// Estimator that produced the matched peak.
    pub fn method(&self) -> EstimationMethod {
        self.peak.method
    }
}

/// Match significant peaks of one instrument and method against the catalog.
///
/// Candidate pairs with delta ≤ T are taken in order of ascending delta, then
/// lower catalog id, then stronger peak, then shorter lag; a pair is accepted
/// when neither side has been used. Records are returned in catalog id order.
pub fn match_peaks(
    instrument: &str,
    peaks: &[DetectedPeak],
    catalog: &CycleCatalog,
    tolerance: Tolerance,
) -> Vec<MatchRecord> {
    let t = tolerance.days();
    let significant: Vec<&DetectedPeak> = peaks.iter().filter(|p| p.significant).collect();

    let mut candidates: Vec<(usize, usize, usize)> = Vec::new();
    for (e, entry) in catalog.entries().iter().enumerate() {
        for (p, peak) in significant.iter().enumerate() {
            let delta = entry.lag.abs_diff(peak.lag);
            if delta <= t {
                candidates.push((delta, e, p));
            }
        }
    }
    candidates.sort_by(|a, b| {
        let (pa, pb) = (significant[a.2], significant[b.2]);
        a.0.cmp(&b.0)
            .then(a.1.cmp(&b.1))
            .then(float_total_cmp(&pb.strength, &pa.strength))
            .then(pa.lag.cmp(&pb.lag))
    });

    let mut entry_used = vec![false; catalog.len()];
    let mut peak_used = vec![false; significant.len()];
    let mut records = Vec::new();
    for (delta, e, p) in candidates {
        if entry_used[e] || peak_used[p] {
            continue;
        }
        entry_used[e] = true;
        peak_used[p] = true;
        let entry = &catalog.entries()[e];
        records.push(MatchRecord {
            instrument: instrument.to_string(),
            catalog_id: entry.id,
            catalog_lag: entry.lag,
            peak: significant[p].clone(),
            delta,
            tolerance,
        });
    }

    records.sort_by_key(|r| r.catalog_id);
    records
}
