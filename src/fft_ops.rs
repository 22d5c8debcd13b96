//! FFT operations for spectral cycle detection.
//!
//! Provides cached FFT planners, taper windows and the one-sided
//! windowed periodogram used by the spectral estimator. The wavelet estimator
//! uses the forward/inverse helpers for its Fourier-space convolution.

use crate::errors::{CycleAnalysisError, CycleResult};
use crate::math_utils::mean;
use lru::LruCache;
use num_complex::Complex64;
use rustfft::{num_complex::Complex, FftPlanner};
use std::f64::consts::PI;
use std::num::NonZeroUsize;
use std::sync::{Arc, LazyLock, Mutex};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Taper applied to the series before the periodogram FFT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TaperWindow {
    /// No taper (boxcar)
    Rectangular,
    /// Periodic Hann window `0.5 - 0.5 cos(2πt/N)`
    #[default]
    Hann,
}

impl TaperWindow {
    /// Window weights for a series of length `n`.
    pub fn weights(&self, n: usize) -> Vec<f64> {
        match self {
            TaperWindow::Rectangular => vec![1.0; n],
            TaperWindow::Hann => (0..n)
                .map(|t| 0.5 - 0.5 * (2.0 * PI * t as f64 / n as f64).cos())
                .collect(),
        }
    }
}

/// Cache key for FFT planners, distinguishing forward and inverse transforms
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
struct FftCacheKey {
    size: usize,
    is_forward: bool,
}

type FftPlanCache = LruCache<FftCacheKey, Arc<dyn rustfft::Fft<f64> + Send + Sync>>;

/// Maximum number of cached plans
const MAX_CACHE_ENTRIES: usize = 256;
/// Maximum FFT size (2^22 points)
const MAX_FFT_SIZE: usize = 1 << 22;
/// Minimum positive value for safe division
const MIN_POSITIVE: f64 = 1e-300;

static FFT_CACHE: LazyLock<Mutex<FftPlanCache>> = LazyLock::new(|| {
    Mutex::new(LruCache::new(
        NonZeroUsize::new(MAX_CACHE_ENTRIES).unwrap_or(NonZeroUsize::MIN),
    ))
});

/// Get cached FFT plan (forward or inverse) with LRU eviction.
///
/// Plans are pure functions of the size, so sharing them across threads does
/// not affect results.
fn get_cached_fft_plan(
    size: usize,
    is_forward: bool,
) -> CycleResult<Arc<dyn rustfft::Fft<f64> + Send + Sync>> {
    if size == 0 || size > MAX_FFT_SIZE {
        return Err(CycleAnalysisError::FftError { size });
    }

    let cache_key = FftCacheKey { size, is_forward };

    // A poisoned cache still holds valid plans
    let mut cache = match FFT_CACHE.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };

    if let Some(cached_fft) = cache.get(&cache_key) {
        return Ok(cached_fft.clone());
    }

    let mut planner = FftPlanner::new();
    let new_fft = if is_forward {
        planner.plan_fft_forward(size)
    } else {
        planner.plan_fft_inverse(size)
    };

    cache.put(cache_key, new_fft.clone());
    Ok(new_fft)
}

/// Get cached FFT plan for forward transform
pub fn get_cached_fft_forward(size: usize) -> CycleResult<Arc<dyn rustfft::Fft<f64> + Send + Sync>> {
    get_cached_fft_plan(size, true)
}

/// Get cached FFT plan for inverse transform
pub fn get_cached_fft_inverse(size: usize) -> CycleResult<Arc<dyn rustfft::Fft<f64> + Send + Sync>> {
    get_cached_fft_plan(size, false)
}

/// Forward FFT of a real series.
pub fn forward_fft_real(data: &[f64]) -> CycleResult<Vec<Complex64>> {
    let mut buffer: Vec<Complex64> = data.iter().map(|&x| Complex::new(x, 0.0)).collect();
    let fft = get_cached_fft_forward(buffer.len())?;
    fft.process(&mut buffer);
    Ok(buffer)
}

/// Inverse FFT, normalised by `1/n` so that it inverts [`forward_fft_real`].
pub fn inverse_fft_normalized(buffer: &mut [Complex64]) -> CycleResult<()> {
    let n = buffer.len();
    let fft = get_cached_fft_inverse(n)?;
    fft.process(buffer);
    let scale = 1.0 / n as f64;
    for value in buffer.iter_mut() {
        *value *= scale;
    }
    Ok(())
}

/// One-sided windowed periodogram.
#[derive(Debug, Clone)]
pub struct Periodogram {
    /// Power at bins k = 0..=n/2, `|X_k|² / Σw²`
    pub power: Vec<f64>,
    /// Length of the analysed series
    pub n: usize,
}

impl Periodogram {
    /// Period in samples of bin `k` (infinite for k = 0).
    pub fn period(&self, k: usize) -> f64 {
        if k == 0 {
            f64::INFINITY
        } else {
            self.n as f64 / k as f64
        }
    }

    /// Frequency in cycles per sample of bin `k`.
    pub fn frequency(&self, k: usize) -> f64 {
        k as f64 / self.n as f64
    }
}

/// Compute the one-sided windowed periodogram of a series.
///
/// The series is mean-centred, tapered and transformed. Power is normalised
/// by the window energy, so white noise of variance σ² has expected power σ²
/// in every bin regardless of taper.
pub fn windowed_periodogram(data: &[f64], taper: TaperWindow) -> CycleResult<Periodogram> {
    let n = data.len();
    if n < 4 {
        return Err(CycleAnalysisError::FftError { size: n });
    }

    if let Some((i, value)) = data.iter().enumerate().find(|(_, v)| !v.is_finite()) {
        return Err(CycleAnalysisError::NumericalError {
            reason: format!("Non-finite value {} at index {} in input data", value, i),
            operation: Some("windowed_periodogram".to_string()),
        });
    }

    let centre = mean(data);
    let weights = taper.weights(n);
    let window_energy: f64 = weights.iter().map(|w| w * w).sum();
    if window_energy < MIN_POSITIVE {
        return Err(CycleAnalysisError::FftError { size: n });
    }

    let tapered: Vec<f64> = data
        .iter()
        .zip(weights.iter())
        .map(|(x, w)| (x - centre) * w)
        .collect();
    let spectrum = forward_fft_real(&tapered)?;

    let power = spectrum[..=n / 2]
        .iter()
        .map(|c| c.norm_sqr() / window_energy)
        .collect();

    Ok(Periodogram { power, n })
}

/// Clear the FFT plan cache.
pub fn clear_fft_cache() {
    let mut cache = match FFT_CACHE.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    cache.clear();
}

/// Cached plan counts as `(forward, inverse)`.
pub fn get_fft_cache_stats() -> (usize, usize) {
    let cache = match FFT_CACHE.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    let forward = cache.iter().filter(|(key, _)| key.is_forward).count();
    (forward, cache.len() - forward)
}
