//! Carrier synthesis and Doppler rotation

use std::f64::consts::PI;

use num_complex::Complex64;

use crate::{require_finite, require_positive, Result, WaveformError, MAX_SAMPLES};

// Relative slack when deciding whether duration·fs is a whole sample count
const SAMPLE_COUNT_TOLERANCE: f64 = 1e-9;

/// Number of samples in `[0, duration)` at `fs`: `floor(duration·fs)`.
///
/// Products that land within rounding error of an integer (0.29 s at 100 Hz
/// evaluates to 28.999999999999996) count as that integer. Counts above
/// [`MAX_SAMPLES`] are an error.
fn sample_count(fs: f64, duration: f64) -> Result<usize> {
    let exact = duration * fs;
    let nearest = exact.round();
    let count = if (exact - nearest).abs() <= SAMPLE_COUNT_TOLERANCE * nearest.max(1.0) {
        nearest
    } else {
        exact.floor()
    };

    if !count.is_finite() || count > MAX_SAMPLES as f64 {
        return Err(WaveformError::TooManySamples {
            requested: exact,
            max: MAX_SAMPLES,
        });
    }
    Ok(count as usize)
}

/// Complex carrier `exp(j·2π·fc·t)` sampled at `t = n/fs` over `[0, duration)`
pub fn generate_carrier(fs: f64, fc: f64, duration: f64) -> Result<Vec<Complex64>> {
    let fs = require_positive("fs", fs)?;
    let duration = require_positive("duration", duration)?;
    let fc = require_finite("fc", fc)?;

    let omega = 2.0 * PI * fc / fs;
    let count = sample_count(fs, duration)?;
    Ok((0..count)
        .map(|n| Complex64::from_polar(1.0, omega * n as f64))
        .collect())
}

/// Rotate `signal` by `exp(j·2π·shift_hz·n/fs)`. The input is left untouched.
pub fn apply_doppler(signal: &[Complex64], fs: f64, shift_hz: f64) -> Result<Vec<Complex64>> {
    let fs = require_positive("fs", fs)?;
    let shift_hz = require_finite("shift_hz", shift_hz)?;

    if shift_hz == 0.0 {
        return Ok(signal.to_vec());
    }

    let omega = 2.0 * PI * shift_hz / fs;
    Ok(signal
        .iter()
        .enumerate()
        .map(|(n, &s)| s * Complex64::from_polar(1.0, omega * n as f64))
        .collect())
}


// ============================================================================
// Property-based Tests
// ============================================================================
