//! Plastic-number cycle catalog.
//!
//! The catalog is a fixed, versioned table of 53 candidate cycle lengths in
//! trading days. Each built-in entry is tagged with the plastic-number power
//! band it falls in: `rho^n` means ρⁿ ≤ lag < ρⁿ⁺¹, where ρ is the real root
//! of x³ = x + 1. External tables with the same shape can be loaded from CSV.

use crate::errors::{CycleAnalysisError, CycleResult};
use std::io::Read;
use std::path::Path;
use std::sync::{Arc, LazyLock};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Plastic number ρ, the real root of x³ = x + 1.
pub const PLASTIC_NUMBER: f64 = 1.324_717_957_244_746;

/// Version tag of the built-in table.
pub const BUILTIN_VERSION: &str = "plastic-53/v1";

/// Target lags of the built-in table, in trading days.
pub const BUILTIN_LAGS: [usize; 53] = [
    179, 183, 189, 196, 202, 206, 220, 237, 243, 250, 260, 268, 273, 291, 308, 314, 322, 331,
    345, 355, 362, 368, 385, 403, 408, 416, 426, 439, 457, 470, 480, 487, 493, 510, 528, 534,
    541, 551, 564, 582, 605, 622, 636, 645, 653, 659, 676, 694, 699, 707, 717, 730, 747,
];

static SHARED_CATALOG: LazyLock<Arc<CycleCatalog>> = LazyLock::new(|| Arc::new(CycleCatalog::builtin()));

/// One catalog row.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CatalogEntry {
    /// 1-based identifier
    pub id: usize,
    /// Target cycle length in trading days
    pub lag: usize,
    /// Generation rule tag
    pub rule: String,
}

/// Plastic power band tag for a lag.
pub fn plastic_power_rule(lag: usize) -> String {
    let target = lag as f64;
    let mut exponent = 0;
    let mut power = 1.0;
    while power * PLASTIC_NUMBER <= target {
        power *= PLASTIC_NUMBER;
        exponent += 1;
    }
    format!("rho^{}", exponent)
}

/// Immutable, ordered table of catalog entries.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CycleCatalog {
    version: String,
    entries: Vec<CatalogEntry>,
}

impl CycleCatalog {
    /// The built-in 53-entry table.
    pub fn builtin() -> Self {
        let entries = BUILTIN_LAGS
            .iter()
            .enumerate()
            .map(|(i, &lag)| CatalogEntry {
                id: i + 1,
                lag,
                rule: plastic_power_rule(lag),
            })
            .collect();
        Self {
            version: BUILTIN_VERSION.to_string(),
            entries,
        }
    }

    /// Process-wide shared instance of the built-in table.
    pub fn shared() -> Arc<CycleCatalog> {
        Arc::clone(&SHARED_CATALOG)
    }

    /// Build a catalog from entries, checking ids run 1..=n and lags are
    /// distinct, at least 2 and strictly increasing.
    pub fn from_entries(version: impl Into<String>, entries: Vec<CatalogEntry>) -> CycleResult<Self> {
        if entries.is_empty() {
            return Err(CycleAnalysisError::CatalogLoad {
                reason: "catalog has no entries".to_string(),
            });
        }
        for (i, entry) in entries.iter().enumerate() {
            if entry.id != i + 1 {
                return Err(CycleAnalysisError::CatalogLoad {
                    reason: format!("row {}: expected id {}, found {}", i + 1, i + 1, entry.id),
                });
            }
            if entry.lag < 2 {
                return Err(CycleAnalysisError::CatalogLoad {
                    reason: format!("entry {}: lag {} is below 2 days", entry.id, entry.lag),
                });
            }
        }
        if let Some(pair) = entries.windows(2).find(|w| w[1].lag <= w[0].lag) {
            let reason = if pair[1].lag == pair[0].lag {
                format!("duplicate lag {} (entries {} and {})", pair[1].lag, pair[0].id, pair[1].id)
            } else {
                format!("lags not increasing at entry {}", pair[1].id)
            };
            return Err(CycleAnalysisError::CatalogLoad { reason });
        }
        Ok(Self {
            version: version.into(),
            entries,
        })
    }

    /// Load an `id,lag,rule` CSV table with a header row.
    pub fn from_reader<R: Read>(version: impl Into<String>, reader: R) -> CycleResult<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = csv_reader
            .headers()
            .map_err(|e| CycleAnalysisError::CatalogLoad {
                reason: format!("unreadable header: {}", e),
            })?
            .clone();
        let column = |name: &str| {
            headers
                .iter()
                .position(|h| h.eq_ignore_ascii_case(name))
                .ok_or_else(|| CycleAnalysisError::CatalogLoad {
                    reason: format!("missing column '{}'", name),
                })
        };
        let id_col = column("id")?;
        let lag_col = column("lag")?;
        let rule_col = column("rule").ok();

        let mut entries = Vec::new();
        for (row, record) in csv_reader.records().enumerate() {
            let record = record.map_err(|e| CycleAnalysisError::CatalogLoad {
                reason: format!("row {}: {}", row + 1, e),
            })?;
            let field = |col: usize, name: &str| -> CycleResult<usize> {
                let raw = record.get(col).unwrap_or("");
                raw.parse::<usize>().map_err(|_| CycleAnalysisError::CatalogLoad {
                    reason: format!("row {}: invalid {} '{}'", row + 1, name, raw),
                })
            };
            let id = field(id_col, "id")?;
            let lag = field(lag_col, "lag")?;
            let rule = rule_col
                .and_then(|c| record.get(c))
                .filter(|r| !r.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| plastic_power_rule(lag));
            entries.push(CatalogEntry { id, lag, rule });
        }

        Self::from_entries(version, entries)
    }

    /// Load a CSV table from disk, versioned by its file stem.
    pub fn from_path(path: impl AsRef<Path>) -> CycleResult<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|e| CycleAnalysisError::CatalogLoad {
            reason: format!("{}: {}", path.display(), e),
        })?;
        let version = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "external".to_string());
        let catalog = Self::from_reader(version, file)?;
        log::info!(
            "Loaded cycle catalog {} ({} entries) from {}",
            catalog.version,
            catalog.len(),
            path.display()
        );
        Ok(catalog)
    }

    /// Version tag.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// All entries in id order.
    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    /// Entries whose lag lies in `[min_lag, max_lag]`.
    pub fn within(&self, min_lag: usize, max_lag: usize) -> Vec<&CatalogEntry> {
        self.entries
            .iter()
            .filter(|e| e.lag >= min_lag && e.lag <= max_lag)
            .collect()
    }

    /// Entry by id.
    pub fn get(&self, id: usize) -> Option<&CatalogEntry> {
        id.checked_sub(1).and_then(|i| self.entries.get(i))
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false for a constructed catalog.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Closest entry to `lag` and its distance; ties go to the shorter lag.
    pub fn nearest(&self, lag: usize) -> Option<(&CatalogEntry, usize)> {
        self.entries
            .iter()
            .map(|e| (e, e.lag.abs_diff(lag)))
            .min_by(|a, b| a.1.cmp(&b.1).then(a.0.lag.cmp(&b.0.lag)))
    }
}

impl Default for CycleCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_plastic_number_root() {
        let r = PLASTIC_NUMBER;
        assert_approx_eq!(r * r * r, r + 1.0, 1e-12);
    }

    #[test]
    fn test_builtin_table() {
        let catalog = CycleCatalog::builtin();
        assert_eq!(catalog.len(), 53);
        assert_eq!(catalog.version(), BUILTIN_VERSION);
        assert_eq!(catalog.get(1).unwrap().lag, 179);
        assert_eq!(catalog.get(53).unwrap().lag, 747);
        assert!(catalog.get(0).is_none());
        assert!(catalog.get(54).is_none());
        assert_eq!(catalog.within(179, 676).len(), 47);
    }

    #[test]
    fn test_rule_tags_bracket_lag() {
        for entry in CycleCatalog::builtin().entries() {
            let n: i32 = entry.rule.trim_start_matches("rho^").parse().unwrap();
            let lag = entry.lag as f64;
            assert!(PLASTIC_NUMBER.powi(n) <= lag && lag < PLASTIC_NUMBER.powi(n + 1));
        }
        assert_eq!(plastic_power_rule(179), "rho^18");
        assert_eq!(plastic_power_rule(747), "rho^23");
    }

    #[test]
    fn test_shared_instance_is_reused() {
        let a = CycleCatalog::shared();
        let b = CycleCatalog::shared();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_nearest_ties_to_shorter_lag() {
        let catalog = CycleCatalog::builtin();
        let (entry, delta) = catalog.nearest(198).unwrap();
        assert_eq!((entry.lag, delta), (196, 2));
        // 199 is 3 from 196 and 3 from 202
        let (entry, delta) = catalog.nearest(199).unwrap();
        assert_eq!((entry.lag, delta), (196, 3));
    }

    #[test]
    fn test_from_reader_valid() {
        let csv = "id,lag,rule\n1,100,custom\n2,150,\n3,200,other\n";
        let catalog = CycleCatalog::from_reader("test", csv.as_bytes()).unwrap();
        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.get(1).unwrap().rule, "custom");
        assert_eq!(catalog.get(2).unwrap().rule, plastic_power_rule(150));
    }

    #[test]
    fn test_from_reader_rejects_bad_tables() {
        let cases = [
            "id,lag\n",
            "lag\n100\n",
            "id,lag\n1,abc\n",
            "id,lag\n1,100\n3,120\n",
            "id,lag\n1,100\n2,100\n",
            "id,lag\n1,100\n2,90\n",
        ];
        for csv in cases {
            let result = CycleCatalog::from_reader("bad", csv.as_bytes());
            assert!(
                matches!(result, Err(CycleAnalysisError::CatalogLoad { .. })),
                "accepted {:?}",
                csv
            );
        }
    }

    #[test]
    fn test_missing_file_is_catalog_error() {
        let result = CycleCatalog::from_path("/nonexistent/catalog.csv");
        assert!(matches!(result, Err(CycleAnalysisError::CatalogLoad { .. })));
    }
}
