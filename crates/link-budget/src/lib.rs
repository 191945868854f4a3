//! RF Link Budget Library
//!
//! Closed-form link budget terms for satellite RF links:
//! - Free space path loss
//! - Rain attenuation (simplified ITU-R P.838 power law)
//! - Atmospheric absorption and polarization mismatch
//! - EIRP, received power, SNR
//! - System noise temperature
//!
//! dB <-> linear conversions use base-10 logarithms. Angles are degrees,
//! frequencies Hz (unless the name says GHz), distances meters (unless km).

use std::f64::consts::PI;
use thiserror::Error;

pub mod session;

pub use session::{LinkBudgetSession, LinkReport};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LinkBudgetError {
    #[error("Invalid {name}: {value} (must be finite and > 0)")]
    NonPositive { name: &'static str, value: f64 },
    #[error("Invalid {name}: {value} (must be finite and >= 0)")]
    Negative { name: &'static str, value: f64 },
    #[error("Invalid {name}: {value} (must be finite)")]
    NonFinite { name: &'static str, value: f64 },
    #[error("Invalid {name}: {value} (must be within [{min}, {max}])")]
    OutOfRange {
        name: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
}

pub type Result<T> = std::result::Result<T, LinkBudgetError>;

/// Speed of light in m/s
pub const SPEED_OF_LIGHT_M_S: f64 = 299_792_458.0;

/// Boltzmann constant in dBW/K/Hz
pub const BOLTZMANN_DBW_K_HZ: f64 = -228.6;

/// Mean Earth radius used for slant range geometry
pub const EARTH_RADIUS_KM: f64 = 6371.0;

// Rough Ku-band power-law coefficients. Not frequency dependent.
const RAIN_K: f64 = 0.03;
const RAIN_ALPHA: f64 = 1.15;
const RAIN_HEIGHT_KM: f64 = 4.0;
const RAIN_MIN_ELEVATION_DEG: f64 = 5.0;

pub const RAIN_DEFAULT_POLARIZATION_DEG: f64 = 0.0;
pub const DEFAULT_CABLE_TEMPERATURE_K: f64 = 290.0;
pub const DEFAULT_CABLE_LOSS_DB: f64 = 0.5;

pub(crate) fn require_positive(name: &'static str, value: f64) -> Result<f64> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(LinkBudgetError::NonPositive { name, value })
    }
}

pub(crate) fn require_non_negative(name: &'static str, value: f64) -> Result<f64> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(LinkBudgetError::Negative { name, value })
    }
}

pub(crate) fn require_finite(name: &'static str, value: f64) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(LinkBudgetError::NonFinite { name, value })
    }
}

fn require_range(name: &'static str, value: f64, min: f64, max: f64) -> Result<f64> {
    if value.is_finite() && (min..=max).contains(&value) {
        Ok(value)
    } else {
        Err(LinkBudgetError::OutOfRange {
            name,
            value,
            min,
            max,
        })
    }
}

/// dB to linear power ratio
pub fn db_to_linear(db: f64) -> f64 {
    10f64.powf(db / 10.0)
}

/// Linear power ratio to dB
pub fn linear_to_db(ratio: f64) -> Result<f64> {
    Ok(10.0 * require_positive("ratio", ratio)?.log10())
}

/// Free space path loss in dB
///
/// FSPL = 20·log10(d) + 20·log10(f) + 20·log10(4π/c)
pub fn fspl(frequency_hz: f64, distance_m: f64) -> Result<f64> {
    let frequency_hz = require_positive("frequency_hz", frequency_hz)?;
    let distance_m = require_positive("distance_m", distance_m)?;

    Ok(20.0 * distance_m.log10()
        + 20.0 * frequency_hz.log10()
        + 20.0 * (4.0 * PI / SPEED_OF_LIGHT_M_S).log10())
}

/// Rain attenuation in dB along a slant path.
///
/// Specific attenuation `γ = k·R^α` with fixed Ku-band coefficients, times the
/// effective path `h_r / sin(θ)` through a 4 km rain layer. Elevations at or
/// below 5° use sin(5°) so the path length stays bounded near the horizon.
/// Elevations outside [-90, 90] are rejected.
///
/// `_frequency_ghz` and `_polarization_deg` are part of the interface but the
/// coefficients do not depend on them in this model.
pub fn rain_attenuation(
    _frequency_ghz: f64,
    rain_rate_mm_h: f64,
    elevation_deg: f64,
    _polarization_deg: f64,
) -> Result<f64> {
    let rain_rate_mm_h = require_non_negative("rain_rate_mm_h", rain_rate_mm_h)?;
    let elevation_deg = require_range("elevation_deg", elevation_deg, -90.0, 90.0)?;

    let gamma_db_km = RAIN_K * rain_rate_mm_h.powf(RAIN_ALPHA);
    let el_rad = elevation_deg.max(RAIN_MIN_ELEVATION_DEG).to_radians();
    let path_km = RAIN_HEIGHT_KM / el_rad.sin();

    Ok(gamma_db_km * path_km)
}

/// Gaseous absorption scaled by air mass (Kasten-Young)
///
/// `zenith_attenuation_db` is the one-way loss looking straight up.
pub fn atmospheric_loss(zenith_attenuation_db: f64, elevation_deg: f64) -> Result<f64> {
    let zenith_attenuation_db = require_non_negative("zenith_attenuation_db", zenith_attenuation_db)?;
    let elevation_deg = require_range("elevation_deg", elevation_deg, 0.0, 90.0)?;

    let zenith_deg = 90.0 - elevation_deg;
    let air_mass = 1.0
        / (zenith_deg.to_radians().cos() + 0.50572 * (96.07995 - zenith_deg).powf(-1.6364));

    Ok(zenith_attenuation_db * air_mass)
}

/// Polarization mismatch loss for linear polarizations offset by `mismatch_deg`
pub fn polarization_mismatch_loss(mismatch_deg: f64) -> Result<f64> {
    let mismatch_deg = require_range("mismatch_deg", mismatch_deg, -89.0, 89.0)?;
    Ok(-20.0 * mismatch_deg.to_radians().cos().log10())
}

/// Effective isotropic radiated power in dBW
pub fn eirp(tx_power_dbw: f64, antenna_gain_dbi: f64, cable_loss_db: f64) -> f64 {
    tx_power_dbw + antenna_gain_dbi - cable_loss_db
}

/// Received power in dBW
pub fn received_power(
    eirp_dbw: f64,
    path_loss_db: f64,
    rx_gain_dbi: f64,
    other_losses_db: f64,
) -> f64 {
    eirp_dbw - path_loss_db + rx_gain_dbi - other_losses_db
}

/// Signal-to-noise ratio in dB over `bandwidth_hz`
pub fn snr(received_power_dbw: f64, noise_density_dbw_per_hz: f64, bandwidth_hz: f64) -> Result<f64> {
    let bandwidth_hz = require_positive("bandwidth_hz", bandwidth_hz)?;
    let noise_power_dbw = noise_density_dbw_per_hz + 10.0 * bandwidth_hz.log10();
    Ok(received_power_dbw - noise_power_dbw)
}

/// Noise spectral density N0 = k·T in dBW/Hz
pub fn noise_density(system_temperature_k: f64) -> Result<f64> {
    let t = require_positive("system_temperature_k", system_temperature_k)?;
    Ok(BOLTZMANN_DBW_K_HZ + 10.0 * t.log10())
}

/// System noise temperature in Kelvin referred to the antenna terminals
///
/// The cable after the LNA contributes `T_cable·(L − 1)/G_lna`.
pub fn system_noise_temperature(
    t_ant_k: f64,
    t_lna_k: f64,
    gain_lna_db: f64,
    t_cable_k: f64,
    loss_cable_db: f64,
) -> f64 {
    let gain_lna = db_to_linear(gain_lna_db);
    let loss_cable = db_to_linear(loss_cable_db);
    t_ant_k + t_lna_k + t_cable_k * (loss_cable - 1.0) / gain_lna
}

/// Slant range in meters from a ground station to a satellite at
/// `altitude_km`, seen at `elevation_deg` (spherical Earth)
pub fn slant_range_m(elevation_deg: f64, altitude_km: f64) -> Result<f64> {
    let elevation_deg = require_range("elevation_deg", elevation_deg, 0.0, 90.0)?;
    let altitude_km = require_positive("altitude_km", altitude_km)?;

    let earth_r = EARTH_RADIUS_KM;
    let sat_r = earth_r + altitude_km;
    let sin_el = elevation_deg.to_radians().sin();

    // Law of cosines, solved for the positive root
    let range_km =
        -earth_r * sin_el + ((earth_r * sin_el).powi(2) + sat_r.powi(2) - earth_r.powi(2)).sqrt();

    Ok(range_km * 1000.0)
}


// ============================================================================
// Property-based Tests
// ============================================================================
