//! Instrument price series.
//!
//! An [`InstrumentSeries`] is an ordered sequence of daily closing prices for
//! one instrument. Construction enforces the data-model invariants so the
//! estimators can assume a clean, strictly increasing, positive series.

use crate::errors::{CycleAnalysisError, CycleResult};
use chrono::NaiveDate;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Broad asset class of an instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum AssetClass {
    /// Single stocks
    Equity,
    /// Commodity futures
    Commodity,
    /// Market indices
    Index,
    /// Currency pairs
    Forex,
    /// Crypto assets
    Crypto,
}

impl AssetClass {
    /// Every asset class, in tag order.
    pub const ALL: [AssetClass; 5] = [
        AssetClass::Equity,
        AssetClass::Commodity,
        AssetClass::Index,
        AssetClass::Forex,
        AssetClass::Crypto,
    ];

    /// Short tag used in reports (`eq`, `co`, `ix`, `fx`, `cr`).
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetClass::Equity => "eq",
            AssetClass::Commodity => "co",
            AssetClass::Index => "ix",
            AssetClass::Forex => "fx",
            AssetClass::Crypto => "cr",
        }
    }

    /// Parse a short tag or full name, case-insensitively.
    pub fn parse(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "eq" | "equity" => Some(AssetClass::Equity),
            "co" | "commodity" => Some(AssetClass::Commodity),
            "ix" | "index" => Some(AssetClass::Index),
            "fx" | "forex" => Some(AssetClass::Forex),
            "cr" | "crypto" => Some(AssetClass::Crypto),
            _ => None,
        }
    }

    /// Default `(min_lag, max_lag)` for periodogram scans of this class.
    ///
    /// Commodities and indices start higher because their short-period
    /// spectrum is dominated by roll and rebalancing effects.
    pub fn default_psd_window(&self) -> (usize, usize) {
        match self {
            AssetClass::Equity | AssetClass::Forex | AssetClass::Crypto => (179, 511),
            AssetClass::Commodity => (249, 511),
            AssetClass::Index => (342, 718),
        }
    }

    /// Minimum share of top-ten peak power the leading peaks must carry
    /// when a power-share filter is applied.
    pub fn default_power_share(&self) -> f64 {
        match self {
            AssetClass::Equity => 0.30,
            _ => 0.60,
        }
    }
}

impl std::fmt::Display for AssetClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One daily close.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PricePoint {
    /// Trading date
    pub date: NaiveDate,
    /// Closing price
    pub close: f64,
}

impl PricePoint {
    /// Create a price point.
    pub fn new(date: NaiveDate, close: f64) -> Self {
        Self { date, close }
    }
}

/// Half-open date range `[start, end)` used to truncate history.
///
/// `None` on either side leaves that side unbounded.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HistoricalWindow {
    /// Label used in reports
    pub label: String,
    /// Inclusive start date
    pub start: Option<NaiveDate>,
    /// Exclusive end date
    pub end: Option<NaiveDate>,
}

impl HistoricalWindow {
    /// Entire available history.
    pub fn full() -> Self {
        Self {
            label: "full".to_string(),
            start: None,
            end: None,
        }
    }

    /// History before `end`.
    pub fn until(label: impl Into<String>, end: NaiveDate) -> Self {
        Self {
            label: label.into(),
            start: None,
            end: Some(end),
        }
    }

    /// History in `[start, end)`.
    pub fn between(label: impl Into<String>, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            label: label.into(),
            start: Some(start),
            end: Some(end),
        }
    }

    /// Whether `date` falls in the window.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.map_or(true, |s| date >= s) && self.end.map_or(true, |e| date < e)
    }
}

impl Default for HistoricalWindow {
    fn default() -> Self {
        Self::full()
    }
}

/// Validated daily price history of one instrument.
///
/// Deserialization goes through [`InstrumentSeries::new`], so a decoded
/// series satisfies the same invariants as a constructed one.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "RawInstrumentSeries"))]
pub struct InstrumentSeries {
    id: String,
    asset_class: AssetClass,
    points: Vec<PricePoint>,
}

/// Unchecked wire form of [`InstrumentSeries`].
#[cfg(feature = "serde")]
#[derive(Deserialize)]
struct RawInstrumentSeries {
    id: String,
    asset_class: AssetClass,
    points: Vec<PricePoint>,
}

#[cfg(feature = "serde")]
impl TryFrom<RawInstrumentSeries> for InstrumentSeries {
    type Error = CycleAnalysisError;

    fn try_from(raw: RawInstrumentSeries) -> CycleResult<Self> {
        Self::new(raw.id, raw.asset_class, raw.points)
    }
}

impl InstrumentSeries {
    /// Build a series, checking that dates strictly increase and every
    /// close is finite and positive.
    pub fn new(
        id: impl Into<String>,
        asset_class: AssetClass,
        points: Vec<PricePoint>,
    ) -> CycleResult<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(CycleAnalysisError::InvalidSeries {
                instrument: id,
                reason: "empty instrument identifier".to_string(),
            });
        }

        for (i, point) in points.iter().enumerate() {
            if !point.close.is_finite() || point.close <= 0.0 {
                return Err(CycleAnalysisError::InvalidSeries {
                    instrument: id,
                    reason: format!(
                        "close at {} (index {}) must be finite and positive, got {}",
                        point.date, i, point.close
                    ),
                });
            }
        }

        if let Some(w) = points.windows(2).find(|w| w[1].date <= w[0].date) {
            let reason = if w[1].date == w[0].date {
                format!("duplicate date {}", w[1].date)
            } else {
                format!("dates out of order: {} follows {}", w[1].date, w[0].date)
            };
            return Err(CycleAnalysisError::InvalidSeries {
                instrument: id,
                reason,
            });
        }

        Ok(Self {
            id,
            asset_class,
            points,
        })
    }

    /// Build a series from parallel date and close slices.
    pub fn from_columns(
        id: impl Into<String>,
        asset_class: AssetClass,
        dates: &[NaiveDate],
        closes: &[f64],
    ) -> CycleResult<Self> {
        let id = id.into();
        if dates.len() != closes.len() {
            return Err(CycleAnalysisError::InvalidSeries {
                instrument: id,
                reason: format!(
                    "{} dates but {} closes",
                    dates.len(),
                    closes.len()
                ),
            });
        }
        let points = dates
            .iter()
            .zip(closes)
            .map(|(&d, &c)| PricePoint::new(d, c))
            .collect();
        Self::new(id, asset_class, points)
    }

    /// Instrument identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Asset class.
    pub fn asset_class(&self) -> AssetClass {
        self.asset_class
    }

    /// Ordered price points.
    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    /// Closing prices in date order.
    pub fn closes(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.close).collect()
    }

    /// Number of observations.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the series has no observations.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// First and last date, if any.
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        match (self.points.first(), self.points.last()) {
            (Some(first), Some(last)) => Some((first.date, last.date)),
            _ => None,
        }
    }

    /// Copy of the series restricted to a historical window.
    ///
    /// Ordering invariants survive filtering, so no revalidation is needed.
    pub fn restrict(&self, window: &HistoricalWindow) -> Self {
        Self {
            id: self.id.clone(),
            asset_class: self.asset_class,
            points: self
                .points
                .iter()
                .filter(|p| window.contains(p.date))
                .copied()
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample() -> InstrumentSeries {
        let points = vec![
            PricePoint::new(date(2020, 1, 2), 10.0),
            PricePoint::new(date(2020, 1, 3), 10.5),
            PricePoint::new(date(2020, 1, 6), 10.2),
            PricePoint::new(date(2020, 1, 7), 10.9),
        ];
        InstrumentSeries::new("ABC", AssetClass::Equity, points).unwrap()
    }

    #[test]
    fn test_valid_series() {
        let s = sample();
        assert_eq!(s.len(), 4);
        assert_eq!(s.id(), "ABC");
        assert_eq!(s.date_range(), Some((date(2020, 1, 2), date(2020, 1, 7))));
    }

    #[test]
    fn test_duplicate_date_rejected() {
        let points = vec![
            PricePoint::new(date(2020, 1, 2), 10.0),
            PricePoint::new(date(2020, 1, 2), 10.5),
        ];
        let err = InstrumentSeries::new("DUP", AssetClass::Forex, points).unwrap_err();
        assert!(matches!(err, CycleAnalysisError::InvalidSeries { .. }));
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_unordered_dates_rejected() {
        let points = vec![
            PricePoint::new(date(2020, 1, 3), 10.0),
            PricePoint::new(date(2020, 1, 2), 10.5),
        ];
        assert!(InstrumentSeries::new("ORD", AssetClass::Index, points).is_err());
    }

    #[test]
    fn test_non_positive_close_rejected() {
        let points = vec![
            PricePoint::new(date(2020, 1, 2), 10.0),
            PricePoint::new(date(2020, 1, 3), 0.0),
        ];
        assert!(InstrumentSeries::new("ZERO", AssetClass::Commodity, points).is_err());
        let nan = vec![PricePoint::new(date(2020, 1, 2), f64::NAN)];
        assert!(InstrumentSeries::new("NAN", AssetClass::Commodity, nan).is_err());
    }

    #[test]
    fn test_from_columns_length_mismatch() {
        let err = InstrumentSeries::from_columns(
            "X",
            AssetClass::Crypto,
            &[date(2020, 1, 2)],
            &[1.0, 2.0],
        );
        assert!(err.is_err());
    }

    #[test]
    fn test_restrict_window() {
        let s = sample();
        let early = s.restrict(&HistoricalWindow::until("pre", date(2020, 1, 6)));
        assert_eq!(early.len(), 2);
        let mid = s.restrict(&HistoricalWindow::between(
            "mid",
            date(2020, 1, 3),
            date(2020, 1, 7),
        ));
        assert_eq!(mid.closes(), vec![10.5, 10.2]);
        assert_eq!(s.restrict(&HistoricalWindow::full()).len(), 4);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_deserialization_enforces_invariants() {
        let valid = serde_json::to_value(sample()).unwrap();
        let decoded: InstrumentSeries = serde_json::from_value(valid.clone()).unwrap();
        assert_eq!(decoded, sample());

        let mut duplicate = valid.clone();
        duplicate["points"][1]["date"] = duplicate["points"][0]["date"].clone();
        let err = serde_json::from_value::<InstrumentSeries>(duplicate).unwrap_err();
        assert!(err.to_string().contains("duplicate date"));

        let mut negative = valid.clone();
        negative["points"][2]["close"] = serde_json::json!(-3.0);
        assert!(serde_json::from_value::<InstrumentSeries>(negative).is_err());

        let mut blank = valid;
        blank["id"] = serde_json::json!("  ");
        assert!(serde_json::from_value::<InstrumentSeries>(blank).is_err());
    }

    #[test]
    fn test_asset_class_tags() {
        for class in AssetClass::ALL {
            assert_eq!(AssetClass::parse(class.as_str()), Some(class));
        }
        assert_eq!(AssetClass::parse("Index"), Some(AssetClass::Index));
        assert_eq!(AssetClass::parse("bond"), None);
        assert_eq!(AssetClass::Commodity.default_psd_window(), (249, 511));
        assert_eq!(AssetClass::Index.default_psd_window(), (342, 718));
    }
}
