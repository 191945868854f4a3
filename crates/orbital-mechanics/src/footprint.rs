//! Sub-satellite point and coverage circle on a spherical Earth

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::transforms::{eci_to_ecef, gmst_rad};
use crate::{Ephemeris, OrbitalError, Result};

/// Mean Earth radius used for the footprint geometry
pub const EARTH_RADIUS_KM: f64 = 6371.0;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Footprint {
    pub latitude_deg: f64,
    /// [-180, 180)
    pub longitude_deg: f64,
    pub height_km: f64,
    /// Earth central half-angle of the horizon circle, `acos(R / (R + h))`
    pub max_coverage_angle_deg: f64,
}

pub fn calculate_footprint<E: Ephemeris + ?Sized>(
    ephemeris: &E,
    time: DateTime<Utc>,
) -> Result<Footprint> {
    let state = ephemeris.state_at(time)?;
    let r = eci_to_ecef(&state.position(), gmst_rad(time));
    let radius = r.norm();

    let height_km = radius - EARTH_RADIUS_KM;
    if height_km <= 0.0 {
        return Err(OrbitalError::InvalidInput(format!(
            "position {:.1} km from the geocenter is below the surface",
            radius
        )));
    }

    let latitude_deg = r.z.atan2((r.x * r.x + r.y * r.y).sqrt()).to_degrees();
    let longitude_deg = (r.y.atan2(r.x).to_degrees() + 180.0).rem_euclid(360.0) - 180.0;
    let max_coverage_angle_deg = (EARTH_RADIUS_KM / radius).acos().to_degrees();

    Ok(Footprint {
        latitude_deg,
        longitude_deg,
        height_km,
        max_coverage_angle_deg,
    })
}
