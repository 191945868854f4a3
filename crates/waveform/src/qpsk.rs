//! QPSK Modulator
//!
//! Maps bit pairs to QPSK symbols, upsamples by `sps` and pulse-shapes with
//! an RRC filter of fixed 10-symbol span.
//!
//! Bit mapping (even index → I, odd index → Q):
//!
//! ```text
//! (b0, b1) → ((2·b0 − 1) + j·(2·b1 − 1)) / √2
//! ```

use std::f64::consts::FRAC_1_SQRT_2;

use num_complex::Complex64;
use tracing::debug;

use crate::rrc::{self, rrc_filter_taps, FilterTaps};
use crate::{Result, WaveformError};

pub const DEFAULT_SPS: usize = 4;
pub const DEFAULT_BETA: f64 = 0.35;

/// RRC span in symbols on each side of the center tap
pub const SPAN: usize = 10;

#[derive(Debug, Clone)]
pub struct QpskModulator {
    sps: usize,
    beta: f64,
    taps: FilterTaps,
}

impl QpskModulator {
    pub fn new(sps: usize, beta: f64) -> Result<Self> {
        if !(beta > 0.0 && beta <= 1.0) {
            return Err(WaveformError::InvalidRolloff(beta));
        }
        let taps = rrc_filter_taps(beta, SPAN, sps)?;

        Ok(Self { sps, beta, taps })
    }

    pub fn sps(&self) -> usize {
        self.sps
    }

    pub fn beta(&self) -> f64 {
        self.beta
    }

    pub fn taps(&self) -> &FilterTaps {
        &self.taps
    }

    /// Unit-energy QPSK symbols, one per bit pair. A trailing unpaired bit is
    /// dropped.
    pub fn map_symbols(&self, bits: &[u8]) -> Result<Vec<Complex64>> {
        if let Some((index, &value)) = bits.iter().enumerate().find(|(_, b)| **b > 1) {
            return Err(WaveformError::InvalidBit { index, value });
        }

        Ok(bits
            .chunks_exact(2)
            .map(|pair| {
                Complex64::new(
                    (2.0 * pair[0] as f64 - 1.0) * FRAC_1_SQRT_2,
                    (2.0 * pair[1] as f64 - 1.0) * FRAC_1_SQRT_2,
                )
            })
            .collect())
    }

    /// Place each symbol at every `sps`-th position, zeros elsewhere
    pub fn upsample(&self, symbols: &[Complex64]) -> Vec<Complex64> {
        let mut out = vec![Complex64::new(0.0, 0.0); symbols.len() * self.sps];
        for (k, &s) in symbols.iter().enumerate() {
            out[k * self.sps] = s;
        }
        out
    }

    /// Pulse-shaped baseband samples for `bits`.
    ///
    /// Output length is `symbols·sps + taps − 1`. Fewer than two bits means no
    /// symbols and an empty output.
    pub fn modulate(&self, bits: &[u8]) -> Result<Vec<Complex64>> {
        let symbols = self.map_symbols(bits)?;
        let upsampled = self.upsample(&symbols);
        let samples = self.taps.convolve(&upsampled);

        debug!(
            bits = bits.len(),
            symbols = symbols.len(),
            samples = samples.len(),
            "modulated QPSK burst"
        );

        Ok(samples)
    }
}

impl Default for QpskModulator {
    fn default() -> Self {
        Self {
            sps: DEFAULT_SPS,
            beta: DEFAULT_BETA,
            taps: rrc::design(DEFAULT_BETA, SPAN, DEFAULT_SPS),
        }
    }
}
