//! Mission Simulation
//!
//! Configuration and the three mission steps run by the `mission-sim`
//! binary: pass analysis for one ground station, a rain-faded link budget
//! and a QPSK burst.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use chrono::{DateTime, Utc};
use link_budget::{LinkBudgetError, LinkBudgetSession};
use orbital_mechanics::{
    GroundStation, OrbitalError, PassEvent, PassPredictor, Satellite, DEFAULT_MIN_ELEVATION_DEG,
    DEFAULT_PASS_WINDOW_DAYS, DEFAULT_STATION_ALTITUDE_M,
};
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};
use waveform::{Complex64, QpskModulator, WaveformError};

#[derive(Error, Debug)]
pub enum MissionError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid value {value:?} for {var}")]
    InvalidOverride { var: String, value: String },
    #[error(transparent)]
    Orbital(#[from] OrbitalError),
    #[error(transparent)]
    LinkBudget(#[from] LinkBudgetError),
    #[error(transparent)]
    Waveform(#[from] WaveformError),
}

pub type Result<T> = std::result::Result<T, MissionError>;

pub const ENV_LATITUDE: &str = "GS_LAT";
pub const ENV_LONGITUDE: &str = "GS_LON";
pub const ENV_ALTITUDE: &str = "GS_ALT_M";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StationConfig {
    pub name: String,
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    pub altitude_m: f64,
    pub min_elevation_deg: f64,
}

impl Default for StationConfig {
    fn default() -> Self {
        Self {
            name: "Istanbul".to_string(),
            latitude_deg: 41.0082,
            longitude_deg: 28.9784,
            altitude_m: DEFAULT_STATION_ALTITUDE_M,
            min_elevation_deg: DEFAULT_MIN_ELEVATION_DEG,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TleConfig {
    pub name: Option<String>,
    pub line1: String,
    pub line2: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LinkConfig {
    pub frequency_hz: f64,
    pub distance_km: f64,
    pub rain_rate_mm_h: f64,
    pub elevation_deg: f64,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            frequency_hz: 12.5e9,
            distance_km: 420.0,
            rain_rate_mm_h: 25.0,
            elevation_deg: 45.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WaveformConfig {
    pub sps: usize,
    pub beta: f64,
    pub num_bits: usize,
}

impl Default for WaveformConfig {
    fn default() -> Self {
        Self {
            sps: 8,
            beta: waveform::qpsk::DEFAULT_BETA,
            num_bits: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MissionConfig {
    pub station: StationConfig,
    /// Built-in ISS element set when absent
    pub tle: Option<TleConfig>,
    /// Satellite epoch when absent
    pub start_time: Option<DateTime<Utc>>,
    pub pass_window_days: f64,
    pub max_events: usize,
    pub link: LinkConfig,
    pub waveform: WaveformConfig,
}

impl Default for MissionConfig {
    fn default() -> Self {
        Self {
            station: StationConfig::default(),
            tle: None,
            start_time: None,
            pass_window_days: DEFAULT_PASS_WINDOW_DAYS,
            max_events: 3,
            link: LinkConfig::default(),
            waveform: WaveformConfig::default(),
        }
    }
}

impl MissionConfig {
    /// Load from a JSON file; missing fields take their defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let config: Self = serde_json::from_reader(reader)?;
        info!("Loaded mission config from {}", path.display());
        Ok(config)
    }

    /// Apply `GS_LAT`, `GS_LON` and `GS_ALT_M` from the process environment
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|var| std::env::var(var).ok())
    }

    /// Apply station overrides from an arbitrary variable lookup
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let parse = |var: &str| -> Result<Option<f64>> {
            match lookup(var) {
                None => Ok(None),
                Some(value) => match value.trim().parse::<f64>() {
                    Ok(parsed) => Ok(Some(parsed)),
                    Err(_) => Err(MissionError::InvalidOverride {
                        var: var.to_string(),
                        value,
                    }),
                },
            }
        };

        if let Some(lat) = parse(ENV_LATITUDE)? {
            self.station.latitude_deg = lat;
        }
        if let Some(lon) = parse(ENV_LONGITUDE)? {
            self.station.longitude_deg = lon;
        }
        if let Some(alt) = parse(ENV_ALTITUDE)? {
            self.station.altitude_m = alt;
        }
        Ok(())
    }

    pub fn ground_station(&self) -> Result<GroundStation> {
        Ok(GroundStation::new(
            self.station.latitude_deg,
            self.station.longitude_deg,
            self.station.altitude_m,
        )?)
    }

    pub fn satellite(&self) -> Result<Satellite> {
        let satellite = match &self.tle {
            Some(tle) => Satellite::from_tle(tle.name.as_deref(), &tle.line1, &tle.line2)?,
            None => Satellite::default_iss()?,
        };
        Ok(satellite)
    }
}

/// Result of the pass analysis step
#[derive(Debug, Clone, Serialize)]
pub struct PassSummary {
    pub satellite: String,
    pub start: DateTime<Utc>,
    pub events: Vec<PassEvent>,
}

/// First `max_events` pass events from the configured start time
pub fn run_pass_analysis(config: &MissionConfig) -> Result<PassSummary> {
    let satellite = config.satellite()?;
    let start = config.start_time.unwrap_or_else(|| satellite.epoch());

    let mut events = PassPredictor::new(config.ground_station()?)
        .with_min_elevation(config.station.min_elevation_deg)
        .find_next_pass(&satellite, start, config.pass_window_days)?;
    events.truncate(config.max_events);

    let name = satellite
        .name()
        .map(str::to_string)
        .unwrap_or_else(|| format!("NORAD {}", satellite.norad_id()));
    debug!(satellite = %name, events = events.len(), "pass analysis done");

    Ok(PassSummary {
        satellite: name,
        start,
        events,
    })
}

/// Session with free space and rain terms for the configured link
pub fn run_link_budget(config: &LinkConfig) -> Result<LinkBudgetSession> {
    let mut session = LinkBudgetSession::new(config.frequency_hz, config.distance_km * 1000.0)?;
    session.add_rain_loss(config.rain_rate_mm_h, config.elevation_deg)?;
    Ok(session)
}

/// Random bits for the QPSK burst
pub fn random_bits<R: Rng + ?Sized>(rng: &mut R, count: usize) -> Vec<u8> {
    (0..count).map(|_| rng.gen_range(0..=1u8)).collect()
}

pub fn run_waveform<R: Rng + ?Sized>(config: &WaveformConfig, rng: &mut R) -> Result<Vec<Complex64>> {
    let modulator = QpskModulator::new(config.sps, config.beta)?;
    let bits = random_bits(rng, config.num_bits);
    Ok(modulator.modulate(&bits)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = MissionConfig::default();
        assert_eq!(config.station.latitude_deg, 41.0082);
        assert_eq!(config.station.longitude_deg, 28.9784);
        assert_eq!(config.max_events, 3);
        assert_eq!(config.link.frequency_hz, 12.5e9);
        assert_eq!(config.waveform.sps, 8);
        assert!(config.tle.is_none());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"station": {{"name": "Ankara", "latitude_deg": 39.93}}, "max_events": 5}}"#
        )
        .unwrap();

        let config = MissionConfig::from_file(file.path()).unwrap();
        assert_eq!(config.station.name, "Ankara");
        assert_eq!(config.station.latitude_deg, 39.93);
        assert_eq!(config.station.longitude_deg, 28.9784);
        assert_eq!(config.max_events, 5);
        assert_eq!(config.link, LinkConfig::default());
    }

    #[test]
    fn test_bad_json_is_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        assert!(matches!(
            MissionConfig::from_file(file.path()),
            Err(MissionError::Json(_))
        ));
        assert!(matches!(
            MissionConfig::from_file(Path::new("/nonexistent/mission.json")),
            Err(MissionError::Io(_))
        ));
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [(ENV_LATITUDE, "51.5"), (ENV_ALTITUDE, " 35 ")]
            .into_iter()
            .collect();
        let mut config = MissionConfig::default();
        config
            .apply_overrides(|v| vars.get(v).map(|s| s.to_string()))
            .unwrap();

        assert_eq!(config.station.latitude_deg, 51.5);
        assert_eq!(config.station.longitude_deg, 28.9784);
        assert_eq!(config.station.altitude_m, 35.0);
    }

    #[test]
    fn test_bad_override_is_error() {
        let mut config = MissionConfig::default();
        let err = config
            .apply_overrides(|v| (v == ENV_LONGITUDE).then(|| "east".to_string()))
            .unwrap_err();
        assert!(matches!(err, MissionError::InvalidOverride { ref var, .. } if var == ENV_LONGITUDE));
        assert_eq!(config.station, StationConfig::default());
    }

    #[test]
    fn test_pass_analysis_defaults() {
        let summary = run_pass_analysis(&MissionConfig::default()).unwrap();
        assert_eq!(summary.satellite, "ISS (ZARYA)");
        assert!(!summary.events.is_empty());
        assert!(summary.events.len() <= 3);
    }

    #[test]
    fn test_pass_analysis_invalid_station() {
        let mut config = MissionConfig::default();
        config.station.latitude_deg = 123.0;
        assert!(matches!(
            run_pass_analysis(&config),
            Err(MissionError::Orbital(OrbitalError::InvalidInput(_)))
        ));
    }

    #[test]
    fn test_link_budget_step() {
        let session = run_link_budget(&LinkConfig::default()).unwrap();
        let fspl = link_budget::fspl(12.5e9, 420e3).unwrap();
        let rain = link_budget::rain_attenuation(12.5, 25.0, 45.0, 0.0).unwrap();
        assert!((session.total_loss() - (fspl + rain)).abs() < 1e-9);
        assert!(session.total_loss() > 166.0);
    }

    #[test]
    fn test_waveform_step_is_seeded() {
        let config = WaveformConfig::default();
        let a = run_waveform(&config, &mut StdRng::seed_from_u64(7)).unwrap();
        let b = run_waveform(&config, &mut StdRng::seed_from_u64(7)).unwrap();
        assert_eq!(a, b);

        let taps = 2 * waveform::qpsk::SPAN * config.sps + 1;
        assert_eq!(a.len(), 50 * config.sps + taps - 1);
    }

    #[test]
    fn test_random_bits_are_binary() {
        let bits = random_bits(&mut StdRng::seed_from_u64(1), 1000);
        assert_eq!(bits.len(), 1000);
        assert!(bits.iter().all(|&b| b <= 1));
        assert!(bits.contains(&0) && bits.contains(&1));
    }
}
