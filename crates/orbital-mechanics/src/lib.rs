//! Orbital Mechanics Library
//!
//! SGP4 propagation from two-line element sets, Earth-fixed transforms,
//! look angles, Doppler, visibility pass events and ground footprint for a
//! single satellite seen from a single ground station.
//!
//! Everything past propagation is written against the [`Ephemeris`] trait so
//! another propagator can stand in for SGP4.

use std::fmt;

use chrono::{DateTime, Utc};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub mod footprint;
pub mod passes;

pub use doppler::{calculate_doppler_shift, doppler_at};
pub use footprint::{calculate_footprint, Footprint};
pub use passes::{
    PassEvent, PassEventKind, PassPredictor, DEFAULT_MIN_ELEVATION_DEG, DEFAULT_PASS_WINDOW_DAYS,
    DEFAULT_STATION_ALTITUDE_M, MAX_PASS_WINDOW_DAYS,
};

#[derive(Error, Debug)]
pub enum OrbitalError {
    #[error("Invalid TLE format: {0}")]
    InvalidTle(String),
    #[error("Propagation failed: {0}")]
    PropagationFailed(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, OrbitalError>;

/// Speed of light in km/s
pub const SPEED_OF_LIGHT_KM_S: f64 = 299_792.458;

/// Built-in element set used when no TLE is supplied: ISS (ZARYA), epoch
/// 2020-07-12 21:16:01 UTC. SGP4 accuracy degrades within days of the epoch.
pub const DEFAULT_TLE_NAME: &str = "ISS (ZARYA)";
pub const DEFAULT_TLE_LINE1: &str =
    "1 25544U 98067A   20194.88612269 -.00002218  00000-0 -31515-4 0  9992";
pub const DEFAULT_TLE_LINE2: &str =
    "2 25544  51.6461 221.2784 0001413  89.1723 280.4612 15.49507896236008";

/// Inertial state in km and km/s (TEME for SGP4)
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StateVector {
    pub position_x: f64,
    pub position_y: f64,
    pub position_z: f64,
    pub velocity_x: f64,
    pub velocity_y: f64,
    pub velocity_z: f64,
    pub epoch: DateTime<Utc>,
}

impl StateVector {
    pub fn position(&self) -> Vector3<f64> {
        Vector3::new(self.position_x, self.position_y, self.position_z)
    }

    pub fn velocity(&self) -> Vector3<f64> {
        Vector3::new(self.velocity_x, self.velocity_y, self.velocity_z)
    }
}

/// Source of satellite state at arbitrary instants
pub trait Ephemeris {
    fn state_at(&self, time: DateTime<Utc>) -> Result<StateVector>;
}

/// Observer location on the WGS-84 ellipsoid
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GroundStation {
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    pub altitude_m: f64,
}

impl GroundStation {
    pub fn new(latitude_deg: f64, longitude_deg: f64, altitude_m: f64) -> Result<Self> {
        if !(-90.0..=90.0).contains(&latitude_deg) {
            return Err(OrbitalError::InvalidInput(format!(
                "latitude {} outside [-90, 90]",
                latitude_deg
            )));
        }
        if !longitude_deg.is_finite() || !altitude_m.is_finite() {
            return Err(OrbitalError::InvalidInput(format!(
                "non-finite station position ({}, {})",
                longitude_deg, altitude_m
            )));
        }

        Ok(Self {
            latitude_deg,
            longitude_deg,
            altitude_m,
        })
    }
}

/// Topocentric view of a satellite from a ground station
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LookAngles {
    /// 0-360° clockwise from North
    pub azimuth_deg: f64,
    /// Above the local horizon
    pub elevation_deg: f64,
    pub range_km: f64,
    /// Positive when the satellite is receding
    pub range_rate_km_s: f64,
}

/// SGP4-propagated satellite built from a two-line element set
pub struct Satellite {
    name: Option<String>,
    norad_id: u64,
    epoch: DateTime<Utc>,
    constants: sgp4::Constants,
}

impl Satellite {
    pub fn from_tle(name: Option<&str>, tle_line1: &str, tle_line2: &str) -> Result<Self> {
        let elements = sgp4::Elements::from_tle(
            name.map(str::to_string),
            tle_line1.trim().as_bytes(),
            tle_line2.trim().as_bytes(),
        )
        .map_err(|e| OrbitalError::InvalidTle(format!("{:?}", e)))?;

        let constants = sgp4::Constants::from_elements(&elements)
            .map_err(|e| OrbitalError::PropagationFailed(format!("{:?}", e)))?;

        let epoch = DateTime::<Utc>::from_naive_utc_and_offset(elements.datetime, Utc);
        debug!(norad_id = elements.norad_id, %epoch, "loaded element set");

        Ok(Self {
            name: elements.object_name.clone(),
            norad_id: elements.norad_id,
            epoch,
            constants,
        })
    }

    /// Built-in ISS element set
    pub fn default_iss() -> Result<Self> {
        Self::from_tle(Some(DEFAULT_TLE_NAME), DEFAULT_TLE_LINE1, DEFAULT_TLE_LINE2)
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn norad_id(&self) -> u64 {
        self.norad_id
    }

    /// Element set epoch
    pub fn epoch(&self) -> DateTime<Utc> {
        self.epoch
    }

    /// Inertial position in km
    pub fn get_position(&self, time: DateTime<Utc>) -> Result<[f64; 3]> {
        let state = self.state_at(time)?;
        Ok([state.position_x, state.position_y, state.position_z])
    }

    pub fn look_angles(&self, station: &GroundStation, time: DateTime<Utc>) -> Result<LookAngles> {
        look_angles(self, station, time)
    }

    /// Doppler shift in Hz on `center_freq_hz` seen by `station`
    pub fn doppler_shift(
        &self,
        station: &GroundStation,
        time: DateTime<Utc>,
        center_freq_hz: f64,
    ) -> Result<f64> {
        doppler_at(self, station, time, center_freq_hz)
    }

    /// AOS/MAX/LOS events over `[now, now + duration_days]`
    pub fn find_next_pass_from_now(
        &self,
        latitude_deg: f64,
        longitude_deg: f64,
        altitude_m: f64,
        duration_days: f64,
    ) -> Result<Vec<PassEvent>> {
        let station = GroundStation::new(latitude_deg, longitude_deg, altitude_m)?;
        PassPredictor::new(station).find_next_pass(self, Utc::now(), duration_days)
    }

    pub fn calculate_footprint(&self, time: DateTime<Utc>) -> Result<Footprint> {
        calculate_footprint(self, time)
    }
}

impl Ephemeris for Satellite {
    fn state_at(&self, time: DateTime<Utc>) -> Result<StateVector> {
        propagation::sgp4_propagate(&self.constants, self.epoch, time)
    }
}

impl fmt::Debug for Satellite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Satellite")
            .field("name", &self.name)
            .field("norad_id", &self.norad_id)
            .field("epoch", &self.epoch)
            .finish()
    }
}

/// Look angles from `station` to the satellite at `time`
pub fn look_angles<E: Ephemeris + ?Sized>(
    ephemeris: &E,
    station: &GroundStation,
    time: DateTime<Utc>,
) -> Result<LookAngles> {
    let state = ephemeris.state_at(time)?;
    Ok(transforms::look_angles(station, &state))
}

pub mod propagation {
    use super::*;

    pub fn sgp4_propagate(
        constants: &sgp4::Constants,
        epoch: DateTime<Utc>,
        time: DateTime<Utc>,
    ) -> Result<StateVector> {
        let minutes_since_epoch =
            time.signed_duration_since(epoch).num_milliseconds() as f64 / 60_000.0;

        let prediction = constants
            .propagate(minutes_since_epoch)
            .map_err(|e| OrbitalError::PropagationFailed(format!("{:?}", e)))?;

        Ok(StateVector {
            position_x: prediction.position[0],
            position_y: prediction.position[1],
            position_z: prediction.position[2],
            velocity_x: prediction.velocity[0],
            velocity_y: prediction.velocity[1],
            velocity_z: prediction.velocity[2],
            epoch: time,
        })
    }
}

pub mod transforms {
    use std::f64::consts::PI;

    use super::*;

    pub const WGS84_RADIUS_KM: f64 = 6378.137;
    pub const WGS84_FLATTENING: f64 = 1.0 / 298.257223563;
    pub const EARTH_ROTATION_RATE_RAD_S: f64 = 7.2921159e-5;

    /// Greenwich Mean Sidereal Time in radians, [0, 2π)
    pub fn gmst_rad(time: DateTime<Utc>) -> f64 {
        let unix_seconds = time.timestamp_millis() as f64 / 1000.0;
        let jd = unix_seconds / 86400.0 + 2440587.5;

        // Julian centuries from J2000.0
        let t = (jd - 2451545.0) / 36525.0;

        let gmst_sec = 67310.54841
            + (876600.0 * 3600.0 + 8640184.812866) * t
            + 0.093104 * t * t
            - 6.2e-6 * t * t * t;

        (gmst_sec / 240.0).to_radians().rem_euclid(2.0 * PI)
    }

    /// Rotate an inertial vector into the Earth-fixed frame
    pub fn eci_to_ecef(r_eci: &Vector3<f64>, gmst_rad: f64) -> Vector3<f64> {
        let (sin_g, cos_g) = gmst_rad.sin_cos();
        Vector3::new(
            cos_g * r_eci.x + sin_g * r_eci.y,
            -sin_g * r_eci.x + cos_g * r_eci.y,
            r_eci.z,
        )
    }

    /// Earth-fixed velocity, removing the frame rotation
    pub fn eci_velocity_to_ecef(
        r_eci: &Vector3<f64>,
        v_eci: &Vector3<f64>,
        gmst_rad: f64,
    ) -> Vector3<f64> {
        let omega = Vector3::new(0.0, 0.0, EARTH_ROTATION_RATE_RAD_S);
        let r_ecef = eci_to_ecef(r_eci, gmst_rad);
        eci_to_ecef(v_eci, gmst_rad) - omega.cross(&r_ecef)
    }

    /// Station position in Earth-fixed km
    pub fn geodetic_to_ecef(station: &GroundStation) -> Vector3<f64> {
        let lat = station.latitude_deg.to_radians();
        let lon = station.longitude_deg.to_radians();
        let alt = station.altitude_m / 1000.0;

        let e2 = 2.0 * WGS84_FLATTENING - WGS84_FLATTENING * WGS84_FLATTENING;
        let n = WGS84_RADIUS_KM / (1.0 - e2 * lat.sin().powi(2)).sqrt();

        Vector3::new(
            (n + alt) * lat.cos() * lon.cos(),
            (n + alt) * lat.cos() * lon.sin(),
            (n * (1.0 - e2) + alt) * lat.sin(),
        )
    }

    pub fn look_angles(station: &GroundStation, state: &StateVector) -> LookAngles {
        let gmst = gmst_rad(state.epoch);
        let sat_ecef = eci_to_ecef(&state.position(), gmst);
        let sat_vel_ecef = eci_velocity_to_ecef(&state.position(), &state.velocity(), gmst);
        let gs_ecef = geodetic_to_ecef(station);

        let rho = sat_ecef - gs_ecef;
        let range_km = rho.norm();
        let range_rate_km_s = rho.dot(&sat_vel_ecef) / range_km;

        let (sin_lat, cos_lat) = station.latitude_deg.to_radians().sin_cos();
        let (sin_lon, cos_lon) = station.longitude_deg.to_radians().sin_cos();

        // East-North-Up rotation
        let east = -sin_lon * rho.x + cos_lon * rho.y;
        let north = -sin_lat * cos_lon * rho.x - sin_lat * sin_lon * rho.y + cos_lat * rho.z;
        let up = cos_lat * cos_lon * rho.x + cos_lat * sin_lon * rho.y + sin_lat * rho.z;

        let azimuth_deg = east.atan2(north).to_degrees().rem_euclid(360.0);
        let elevation_deg = up.atan2((east * east + north * north).sqrt()).to_degrees();

        LookAngles {
            azimuth_deg,
            elevation_deg,
            range_km,
            range_rate_km_s,
        }
    }
}

pub mod doppler {
    use super::*;

    /// Doppler shift `f·(v/c)` for a radial velocity in km/s
    pub fn calculate_doppler_shift(center_freq_hz: f64, range_rate_km_s: f64) -> f64 {
        center_freq_hz * (range_rate_km_s / SPEED_OF_LIGHT_KM_S)
    }

    /// Shift seen by `station`; positive while the satellite approaches
    pub fn doppler_at<E: Ephemeris + ?Sized>(
        ephemeris: &E,
        station: &GroundStation,
        time: DateTime<Utc>,
        center_freq_hz: f64,
    ) -> Result<f64> {
        let angles = look_angles(ephemeris, station, time)?;
        Ok(calculate_doppler_shift(center_freq_hz, -angles.range_rate_km_s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::f64::consts::PI;

    fn iss() -> Satellite {
        Satellite::default_iss().unwrap()
    }

    #[test]
    fn test_default_tle_parses() {
        let sat = iss();
        assert_eq!(sat.norad_id(), 25544);
        assert_eq!(sat.name(), Some(DEFAULT_TLE_NAME));

        let expected = Utc.with_ymd_and_hms(2020, 7, 12, 21, 16, 1).unwrap();
        let drift = (sat.epoch() - expected).num_milliseconds().abs();
        assert!(drift < 1000, "epoch off by {} ms", drift);
    }

    #[test]
    fn test_invalid_tle() {
        let result = Satellite::from_tle(None, "1 garbage", "2 garbage");
        assert!(matches!(result, Err(OrbitalError::InvalidTle(_))));
    }

    #[test]
    fn test_position_at_epoch_is_leo() {
        let sat = iss();
        let pos = sat.get_position(sat.epoch()).unwrap();
        let r = (pos[0] * pos[0] + pos[1] * pos[1] + pos[2] * pos[2]).sqrt();
        assert!(r > 6700.0 && r < 6900.0, "ISS radius {} km", r);
    }

    #[test]
    fn test_position_moves() {
        let sat = iss();
        let a = sat.get_position(sat.epoch()).unwrap();
        let b = sat
            .get_position(sat.epoch() + chrono::Duration::seconds(60))
            .unwrap();
        let d = ((a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2) + (a[2] - b[2]).powi(2)).sqrt();
        // ~7.66 km/s
        assert!(d > 400.0 && d < 500.0, "moved {} km in 60 s", d);
    }

    #[test]
    fn test_doppler_shift_formula() {
        let shift = calculate_doppler_shift(435e6, 7.5);
        assert!((shift - 10_881.6).abs() < 1.0, "shift {} Hz", shift);
        assert_eq!(calculate_doppler_shift(435e6, 0.0), 0.0);
        assert!(calculate_doppler_shift(435e6, -7.5) < 0.0);
    }

    #[test]
    fn test_doppler_sign_over_a_pass() {
        let sat = iss();
        let station = GroundStation::new(41.0082, 28.9784, 0.0).unwrap();
        let events = PassPredictor::new(station)
            .find_next_pass(&sat, sat.epoch(), DEFAULT_PASS_WINDOW_DAYS)
            .unwrap();

        let freq = 435e6;
        let bound = freq * 7.7 / SPEED_OF_LIGHT_KM_S;
        let aos = events
            .iter()
            .position(|e| e.kind == PassEventKind::Aos)
            .unwrap();
        let los = events[aos..]
            .iter()
            .find(|e| e.kind == PassEventKind::Los)
            .unwrap();

        // Approaching at AOS, receding at LOS
        let rising = doppler_at(&sat, &station, events[aos].time, freq).unwrap();
        let setting = doppler_at(&sat, &station, los.time, freq).unwrap();
        assert!(rising > 0.0 && rising < bound, "AOS shift {} Hz", rising);
        assert!(setting < 0.0 && setting > -bound, "LOS shift {} Hz", setting);

        assert_eq!(
            sat.doppler_shift(&station, events[aos].time, freq).unwrap(),
            rising
        );
    }

    #[test]
    fn test_doppler_matches_range_rate() {
        let sat = iss();
        let station = GroundStation::new(41.0082, 28.9784, 0.0).unwrap();
        let t = sat.epoch() + chrono::Duration::minutes(17);

        let angles = sat.look_angles(&station, t).unwrap();
        let shift = doppler_at(&sat, &station, t, 2.2e9).unwrap();
        assert!((shift - calculate_doppler_shift(2.2e9, -angles.range_rate_km_s)).abs() < 1e-9);
        assert!(angles.range_rate_km_s.abs() < 7.7);
    }

    #[test]
    fn test_find_next_pass_from_now_validates_inputs() {
        let sat = iss();
        assert!(matches!(
            sat.find_next_pass_from_now(41.0, 29.0, DEFAULT_STATION_ALTITUDE_M, 0.0),
            Err(OrbitalError::InvalidInput(_))
        ));
        assert!(matches!(
            sat.find_next_pass_from_now(95.0, 29.0, 0.0, DEFAULT_PASS_WINDOW_DAYS),
            Err(OrbitalError::InvalidInput(_))
        ));
        assert!(matches!(
            sat.find_next_pass_from_now(41.0, 29.0, 0.0, 1e9),
            Err(OrbitalError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_gmst_at_j2000() {
        let j2000 = Utc.with_ymd_and_hms(2000, 1, 1, 12, 0, 0).unwrap();
        let gmst = transforms::gmst_rad(j2000);
        assert!((gmst.to_degrees() - 280.46061837).abs() < 1e-6);
    }

    #[test]
    fn test_gmst_range() {
        let t = Utc.with_ymd_and_hms(2024, 2, 13, 16, 0, 0).unwrap();
        let gmst = transforms::gmst_rad(t);
        assert!((0.0..2.0 * PI).contains(&gmst));
    }

    #[test]
    fn test_geodetic_to_ecef_equator() {
        let gs = GroundStation::new(0.0, 0.0, 0.0).unwrap();
        let ecef = transforms::geodetic_to_ecef(&gs);
        assert!((ecef.x - transforms::WGS84_RADIUS_KM).abs() < 1e-9);
        assert!(ecef.y.abs() < 1e-9);
        assert!(ecef.z.abs() < 1e-9);
    }

    #[test]
    fn test_ground_station_validation() {
        assert!(GroundStation::new(91.0, 0.0, 0.0).is_err());
        assert!(GroundStation::new(45.0, f64::NAN, 0.0).is_err());
        assert!(GroundStation::new(-90.0, 180.0, 2500.0).is_ok());
    }

    #[test]
    fn test_look_angles_from_sub_satellite_point() {
        let sat = iss();
        let t = sat.epoch();
        let fp = sat.calculate_footprint(t).unwrap();
        let gs = GroundStation::new(fp.latitude_deg, fp.longitude_deg, 0.0).unwrap();

        let angles = sat.look_angles(&gs, t).unwrap();
        assert!(angles.elevation_deg > 80.0, "elevation {}", angles.elevation_deg);
        assert!(angles.range_km > 380.0 && angles.range_km < 460.0);
        assert!((0.0..360.0).contains(&angles.azimuth_deg));
    }

    #[test]
    fn test_far_side_is_below_horizon() {
        let sat = iss();
        let t = sat.epoch();
        let fp = sat.calculate_footprint(t).unwrap();
        let gs = GroundStation::new(-fp.latitude_deg, fp.longitude_deg + 180.0, 0.0).unwrap();

        let angles = sat.look_angles(&gs, t).unwrap();
        assert!(angles.elevation_deg < -60.0);
    }

    #[test]
    fn test_look_angles_serialize() {
        let sat = iss();
        let gs = GroundStation::new(41.0082, 28.9784, 0.0).unwrap();
        let angles = sat.look_angles(&gs, sat.epoch()).unwrap();
        let json = serde_json::to_string(&angles).unwrap();
        assert!(json.contains("elevation_deg"));
    }
}
