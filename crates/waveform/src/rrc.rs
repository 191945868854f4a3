//! Root Raised Cosine Filter Taps
//!
//! The square root of the raised cosine response. Used at both TX and RX the
//! cascade is a raised cosine, giving zero ISI at the symbol instants.
//!
//! Taps are indexed by integer offsets `n ∈ [-span·sps, span·sps]` with
//! `t = n/sps` in symbol periods:
//!
//! ```text
//! h(0)          = 1 − β + 4β/π
//! h(±1/(4β))    = (β/√2)·[(1 + 2/π)·sin(π/(4β)) + (1 − 2/π)·cos(π/(4β))]
//! h(t)          = [sin(πt(1−β)) + 4βt·cos(πt(1+β))] / [πt(1 − (4βt)²)]
//! ```
//!
//! and every tap is scaled by `1/√sps`.
//!
//! The `±1/(4β)` case is a removable singularity of the general expression.
//! It is selected with an absolute tolerance on `t` rather than exact float
//! equality: an exact comparison can miss by one ulp and fall through to the
//! general expression with a near-zero denominator.

use std::f64::consts::{PI, SQRT_2};

use num_complex::Complex64;
use tracing::trace;

use crate::{require_positive, Result, WaveformError, MAX_SAMPLES};

/// Distance in symbol periods within which `|t|` counts as `1/(4β)`
pub const RRC_SINGULARITY_TOLERANCE: f64 = 1e-9;

/// Immutable RRC impulse response of length `2·span·sps + 1`
#[derive(Debug, Clone, PartialEq)]
pub struct FilterTaps {
    coefficients: Vec<f64>,
    beta: f64,
    span: usize,
    sps: usize,
}

impl FilterTaps {
    pub fn len(&self) -> usize {
        self.coefficients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coefficients.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.coefficients
    }

    pub fn iter(&self) -> impl Iterator<Item = &f64> {
        self.coefficients.iter()
    }

    pub fn beta(&self) -> f64 {
        self.beta
    }

    pub fn span(&self) -> usize {
        self.span
    }

    pub fn sps(&self) -> usize {
        self.sps
    }

    /// Group delay in samples
    pub fn delay(&self) -> usize {
        self.len() / 2
    }

    /// Full linear convolution of complex `input` with the taps.
    ///
    /// Output length is `input.len() + taps.len() − 1`; empty input gives
    /// empty output.
    pub fn convolve(&self, input: &[Complex64]) -> Vec<Complex64> {
        let n = self.coefficients.len();

        if input.is_empty() || n == 0 {
            return vec![];
        }

        let mut output = vec![Complex64::new(0.0, 0.0); input.len() + n - 1];

        for (i, x) in input.iter().enumerate() {
            if x.re == 0.0 && x.im == 0.0 {
                continue;
            }
            for (j, &h) in self.coefficients.iter().enumerate() {
                output[i + j] += *x * h;
            }
        }

        output
    }
}

/// Design RRC taps for roll-off `beta` spanning `span` symbols each side
pub fn rrc_filter_taps(beta: f64, span: usize, sps: usize) -> Result<FilterTaps> {
    let beta = require_positive("beta", beta)?;
    if sps == 0 {
        return Err(WaveformError::InvalidSamplesPerSymbol(sps));
    }

    let too_long = WaveformError::FilterTooLong {
        span,
        sps,
        max: MAX_SAMPLES,
    };
    let half = span
        .checked_mul(sps)
        .filter(|&h| h.checked_mul(2).map_or(false, |n| n < MAX_SAMPLES))
        .ok_or_else(|| too_long.clone())?;
    i64::try_from(half).map_err(|_| too_long)?;

    Ok(design(beta, span, sps))
}

/// Unchecked design; `beta > 0`, `sps >= 1` and a representable tap count
/// are the caller's to uphold
pub(crate) fn design(beta: f64, span: usize, sps: usize) -> FilterTaps {
    let half = (span * sps) as i64;
    let scale = 1.0 / (sps as f64).sqrt();

    let coefficients: Vec<f64> = (-half..=half)
        .map(|n| rrc_impulse(n, sps, beta) * scale)
        .collect();

    trace!(beta, span, sps, taps = coefficients.len(), "designed RRC filter");

    FilterTaps {
        coefficients,
        beta,
        span,
        sps,
    }
}

/// Unscaled RRC response at sample offset `n`
fn rrc_impulse(n: i64, sps: usize, beta: f64) -> f64 {
    if n == 0 {
        return 1.0 - beta + 4.0 * beta / PI;
    }

    let t = n as f64 / sps as f64;
    let singular_t = 1.0 / (4.0 * beta);

    if (t.abs() - singular_t).abs() < RRC_SINGULARITY_TOLERANCE {
        let arg = PI / (4.0 * beta);
        (beta / SQRT_2) * ((1.0 + 2.0 / PI) * arg.sin() + (1.0 - 2.0 / PI) * arg.cos())
    } else {
        general_response(t, beta)
    }
}

fn general_response(t: f64, beta: f64) -> f64 {
    let numerator = (PI * t * (1.0 - beta)).sin() + 4.0 * beta * t * (PI * t * (1.0 + beta)).cos();
    let denominator = PI * t * (1.0 - (4.0 * beta * t).powi(2));
    numerator / denominator
}


// ============================================================================
// Property-based Tests
// ============================================================================

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(500))]

        #[test]
        fn fuzz_taps_length_and_symmetry(
            beta in 0.01f64..=1.0,
            span in 0usize..12,
            sps in 1usize..16,
        ) {
            let taps = rrc_filter_taps(beta, span, sps).unwrap();
            let h = taps.as_slice();
            prop_assert_eq!(h.len(), 2 * span * sps + 1);
            for i in 0..h.len() {
                prop_assert!((h[i] - h[h.len() - 1 - i]).abs() < 1e-9);
            }
        }
    }
}
