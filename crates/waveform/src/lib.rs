//! Baseband Waveform Library
//!
//! Complex-baseband signal generation for SDR waveform prototyping:
//! - Complex carrier synthesis
//! - Doppler rotation
//! - Root-raised-cosine pulse shaping taps
//! - QPSK modulation (bit mapping, upsampling, RRC filtering)
//!
//! Samples are `num_complex::Complex64`. Frequencies are Hz, durations seconds.

use thiserror::Error;

pub mod carrier;
pub mod qpsk;
pub mod rrc;

pub use carrier::{apply_doppler, generate_carrier};
pub use num_complex::Complex64;
pub use qpsk::QpskModulator;
pub use rrc::{rrc_filter_taps, FilterTaps};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum WaveformError {
    #[error("Invalid {name}: {value} (must be finite and > 0)")]
    NonPositive { name: &'static str, value: f64 },
    #[error("Invalid {name}: {value} (must be finite)")]
    NonFinite { name: &'static str, value: f64 },
    #[error("Invalid roll-off factor: {0} (must be in (0, 1])")]
    InvalidRolloff(f64),
    #[error("Invalid samples per symbol: {0} (must be >= 1)")]
    InvalidSamplesPerSymbol(usize),
    #[error("Invalid bit value {value} at index {index} (must be 0 or 1)")]
    InvalidBit { index: usize, value: u8 },
    #[error("Requested {requested} samples, limit is {max}")]
    TooManySamples { requested: f64, max: usize },
    #[error("Filter span {span} at {sps} samples per symbol exceeds {max} taps")]
    FilterTooLong { span: usize, sps: usize, max: usize },
}

pub type Result<T> = std::result::Result<T, WaveformError>;

/// Largest sample buffer any operation will allocate
pub const MAX_SAMPLES: usize = isize::MAX as usize / std::mem::size_of::<Complex64>();

pub(crate) fn require_positive(name: &'static str, value: f64) -> Result<f64> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(WaveformError::NonPositive { name, value })
    }
}

pub(crate) fn require_finite(name: &'static str, value: f64) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(WaveformError::NonFinite { name, value })
    }
}
