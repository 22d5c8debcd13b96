//! Synthetic price series with known cycle structure.
//!
//! These generators give the estimators ground truth to be tested against:
//!
//! - **Cyclic log returns**: sinusoids at chosen periods plus Gaussian noise,
//!   compounded into prices. Spectral estimators should recover the periods.
//! - **Seasonal autoregression**: increments with autoregressive terms at
//!   chosen lags, cumulated into price levels. The partial autocorrelation
//!   of first differences peaks at those lags.
//! - **Random walk**: the no-cycle null case.
//!
//! Every generator is seeded and fully deterministic. Dates run over
//! consecutive weekdays.

use crate::errors::{validate_parameter, CycleAnalysisError, CycleResult};
use crate::series::{AssetClass, InstrumentSeries, PricePoint};
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use std::f64::consts::PI;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

fn default_start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2000, 1, 3).unwrap_or_default()
}

/// One sinusoidal component of the log returns.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CycleComponent {
    /// Period in trading days
    pub period: f64,
    /// Amplitude of the log-return oscillation
    pub amplitude: f64,
    /// Phase in radians
    pub phase: f64,
}

impl CycleComponent {
    /// Zero-phase component.
    pub fn new(period: f64, amplitude: f64) -> Self {
        Self {
            period,
            amplitude,
            phase: 0.0,
        }
    }
}

/// Configuration for [`generate_cyclic_prices`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CyclicSeriesConfig {
    /// Number of prices
    pub length: usize,
    /// Sinusoids in the log returns
    pub components: Vec<CycleComponent>,
    /// Standard deviation of the Gaussian return noise
    pub noise_std: f64,
    /// First close
    pub start_price: f64,
    /// First date (rolled forward to a weekday)
    pub start_date: NaiveDate,
    /// Random seed
    pub seed: u64,
}

impl Default for CyclicSeriesConfig {
    fn default() -> Self {
        Self {
            length: 1961,
            components: vec![CycleComponent::new(196.0, 0.01), CycleComponent::new(23.0, 0.01)],
            noise_std: 0.005,
            start_price: 100.0,
            start_date: default_start_date(),
            seed: 42,
        }
    }
}

/// Configuration for [`generate_seasonal_ar_prices`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SeasonalArConfig {
    /// Number of prices
    pub length: usize,
    /// `(lag, coefficient)` autoregressive terms of the increments
    pub coefficients: Vec<(usize, f64)>,
    /// Standard deviation of the innovations
    pub noise_std: f64,
    /// Level the increments are cumulated from
    pub start_price: f64,
    /// Increments simulated and discarded before the series starts
    pub warmup: usize,
    /// First date (rolled forward to a weekday)
    pub start_date: NaiveDate,
    /// Random seed
    pub seed: u64,
}

impl Default for SeasonalArConfig {
    fn default() -> Self {
        Self {
            length: 3000,
            coefficients: vec![(23, 0.3), (196, 0.5)],
            noise_std: 1.0,
            start_price: 10_000.0,
            warmup: 1000,
            start_date: default_start_date(),
            seed: 42,
        }
    }
}

/// Configuration for [`generate_random_walk_prices`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RandomWalkConfig {
    /// Number of prices
    pub length: usize,
    /// Daily log-return standard deviation
    pub volatility: f64,
    /// First close
    pub start_price: f64,
    /// First date (rolled forward to a weekday)
    pub start_date: NaiveDate,
    /// Random seed
    pub seed: u64,
}

impl Default for RandomWalkConfig {
    fn default() -> Self {
        Self {
            length: 2000,
            volatility: 0.01,
            start_price: 100.0,
            start_date: default_start_date(),
            seed: 42,
        }
    }
}

/// `n` consecutive weekdays starting at (or after) `start`.
pub fn weekday_dates(start: NaiveDate, n: usize) -> Vec<NaiveDate> {
    let mut dates = Vec::with_capacity(n);
    let mut date = start;
    while dates.len() < n {
        if !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
            dates.push(date);
        }
        date += Duration::days(1);
    }
    dates
}

fn gaussian(std: f64) -> CycleResult<Normal<f64>> {
    Normal::new(0.0, std).map_err(|e| CycleAnalysisError::InvalidParameter {
        parameter: "noise_std".to_string(),
        value: std,
        constraint: format!("valid normal standard deviation ({})", e),
    })
}

fn validate_common(length: usize, start_price: f64, noise: f64) -> CycleResult<()> {
    if length < 2 {
        return Err(CycleAnalysisError::InvalidParameter {
            parameter: "length".to_string(),
            value: length as f64,
            constraint: ">= 2".to_string(),
        });
    }
    validate_parameter(start_price, f64::MIN_POSITIVE, f64::MAX, "start_price")?;
    validate_parameter(noise, 0.0, f64::MAX, "noise_std")
}

/// Prices whose log returns are a sum of sinusoids plus Gaussian noise.
///
/// Return t (t = 0, 1, ...) is `Σ aᵢ sin(2πt/Pᵢ + φᵢ) + ε_t`; prices compound
/// from `start_price`.
pub fn generate_cyclic_prices(
    id: &str,
    asset_class: AssetClass,
    config: &CyclicSeriesConfig,
) -> CycleResult<InstrumentSeries> {
    validate_common(config.length, config.start_price, config.noise_std)?;
    for c in &config.components {
        validate_parameter(c.period, 2.0, f64::MAX, "period")?;
    }

    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let noise = gaussian(config.noise_std)?;
    let dates = weekday_dates(config.start_date, config.length);

    let mut log_price = config.start_price.ln();
    let mut points = Vec::with_capacity(config.length);
    points.push(PricePoint::new(dates[0], config.start_price));
    for (t, &date) in dates.iter().enumerate().skip(1) {
        let step = (t - 1) as f64;
        let cyclic: f64 = config
            .components
            .iter()
            .map(|c| c.amplitude * (2.0 * PI * step / c.period + c.phase).sin())
            .sum();
        log_price += cyclic + noise.sample(&mut rng);
        points.push(PricePoint::new(date, log_price.exp()));
    }

    InstrumentSeries::new(id, asset_class, points)
}

/// Price levels whose increments follow a seasonal autoregression.
///
/// `x_t = Σ φ_L x_{t-L} + ε_t`, with the first `warmup` increments dropped
/// and the rest cumulated from `start_price`. Fails with `InvalidSeries` if
/// the path ever reaches a non-positive level.
pub fn generate_seasonal_ar_prices(
    id: &str,
    asset_class: AssetClass,
    config: &SeasonalArConfig,
) -> CycleResult<InstrumentSeries> {
    validate_common(config.length, config.start_price, config.noise_std)?;
    let total: f64 = config.coefficients.iter().map(|(_, c)| c.abs()).sum();
    if total >= 1.0 || config.coefficients.iter().any(|&(lag, _)| lag == 0) {
        return Err(CycleAnalysisError::InvalidParameter {
            parameter: "coefficients".to_string(),
            value: total,
            constraint: "positive lags with Σ|φ| < 1".to_string(),
        });
    }

    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let noise = gaussian(config.noise_std)?;
    let steps = config.warmup + config.length - 1;
    let mut increments = vec![0.0; steps];
    for t in 0..steps {
        let ar: f64 = config
            .coefficients
            .iter()
            .filter(|&&(lag, _)| t >= lag)
            .map(|&(lag, phi)| phi * increments[t - lag])
            .sum();
        increments[t] = ar + noise.sample(&mut rng);
    }

    let dates = weekday_dates(config.start_date, config.length);
    let mut level = config.start_price;
    let mut points = Vec::with_capacity(config.length);
    points.push(PricePoint::new(dates[0], level));
    for (&date, &dx) in dates.iter().skip(1).zip(&increments[config.warmup..]) {
        level += dx;
        points.push(PricePoint::new(date, level));
    }

    InstrumentSeries::new(id, asset_class, points)
}

/// Geometric Gaussian random walk with no cycle structure.
pub fn generate_random_walk_prices(
    id: &str,
    asset_class: AssetClass,
    config: &RandomWalkConfig,
) -> CycleResult<InstrumentSeries> {
    validate_common(config.length, config.start_price, config.volatility)?;
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let noise = gaussian(config.volatility)?;
    let dates = weekday_dates(config.start_date, config.length);

    let mut log_price = config.start_price.ln();
    let points = dates
        .iter()
        .enumerate()
        .map(|(t, &date)| {
            if t > 0 {
                log_price += noise.sample(&mut rng);
            }
            PricePoint::new(date, log_price.exp())
        })
        .collect();

    InstrumentSeries::new(id, asset_class, points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_weekday_dates_skip_weekends() {
        // 2000-01-01 is a Saturday
        let start = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap();
        let dates = weekday_dates(start, 10);
        assert_eq!(dates[0], NaiveDate::from_ymd_opt(2000, 1, 3).unwrap());
        assert!(dates.iter().all(|d| !matches!(d.weekday(), Weekday::Sat | Weekday::Sun)));
        assert!(dates.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_cyclic_prices_deterministic() {
        let config = CyclicSeriesConfig::default();
        let a = generate_cyclic_prices("A", AssetClass::Equity, &config).unwrap();
        let b = generate_cyclic_prices("A", AssetClass::Equity, &config).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 1961);
        assert_approx_eq!(a.points()[0].close, 100.0);

        let other = generate_cyclic_prices("A", AssetClass::Equity, &CyclicSeriesConfig { seed: 7, ..config })
            .unwrap();
        assert_ne!(a, other);
    }

    #[test]
    fn test_noiseless_cycle_returns() {
        let config = CyclicSeriesConfig {
            length: 50,
            components: vec![CycleComponent::new(8.0, 0.02)],
            noise_std: 0.0,
            ..CyclicSeriesConfig::default()
        };
        let s = generate_cyclic_prices("C", AssetClass::Forex, &config).unwrap();
        let closes = s.closes();
        let r2 = (closes[3] / closes[2]).ln();
        assert_approx_eq!(r2, 0.02 * (2.0 * PI * 2.0 / 8.0).sin(), 1e-12);
    }

    #[test]
    fn test_seasonal_ar_prices_positive() {
        let s = generate_seasonal_ar_prices("AR", AssetClass::Index, &SeasonalArConfig::default()).unwrap();
        assert_eq!(s.len(), 3000);
        assert!(s.closes().iter().all(|&c| c > 0.0));
    }

    #[test]
    fn test_seasonal_ar_rejects_explosive_coefficients() {
        let config = SeasonalArConfig {
            coefficients: vec![(23, 0.6), (196, 0.5)],
            ..SeasonalArConfig::default()
        };
        assert!(generate_seasonal_ar_prices("X", AssetClass::Index, &config).is_err());
    }

    #[test]
    fn test_random_walk_length_and_start() {
        let s = generate_random_walk_prices("RW", AssetClass::Crypto, &RandomWalkConfig::default()).unwrap();
        assert_eq!(s.len(), 2000);
        assert_approx_eq!(s.points()[0].close, 100.0, 1e-9);
        assert!(generate_random_walk_prices(
            "RW",
            AssetClass::Crypto,
            &RandomWalkConfig {
                length: 1,
                ..RandomWalkConfig::default()
            }
        )
        .is_err());
    }
}
