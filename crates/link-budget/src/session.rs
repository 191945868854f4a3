//! Link Budget Session
//!
//! Accumulates named loss terms for one carrier/path pair. The free space
//! term is recorded on construction; further impairments are added with the
//! `add_*` methods, each writing exactly one named entry. Re-adding a name
//! overwrites it.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    atmospheric_loss, fspl, polarization_mismatch_loss, rain_attenuation, received_power,
    require_finite, require_non_negative, require_positive, snr, Result,
    RAIN_DEFAULT_POLARIZATION_DEG,
};

pub const FSPL_TERM: &str = "fspl";
pub const RAIN_TERM: &str = "rain";
pub const ATMOSPHERIC_TERM: &str = "atmospheric";
pub const POINTING_TERM: &str = "pointing";
pub const POLARIZATION_TERM: &str = "polarization";

/// Named loss accumulator for one link
#[derive(Debug, Clone)]
pub struct LinkBudgetSession {
    frequency_hz: f64,
    distance_m: f64,
    losses: HashMap<String, f64>,
}

/// Link summary derived from a session's current losses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkReport {
    pub frequency_hz: f64,
    pub distance_m: f64,
    pub losses_db: BTreeMap<String, f64>,
    pub total_loss_db: f64,
    pub eirp_dbw: f64,
    pub rx_gain_dbi: f64,
    pub received_power_dbw: f64,
    pub snr_db: f64,
}

impl LinkBudgetSession {
    pub fn new(frequency_hz: f64, distance_m: f64) -> Result<Self> {
        let fspl_db = fspl(frequency_hz, distance_m)?;

        let mut session = Self {
            frequency_hz,
            distance_m,
            losses: HashMap::new(),
        };
        session.record(FSPL_TERM, fspl_db);
        Ok(session)
    }

    pub fn frequency_hz(&self) -> f64 {
        self.frequency_hz
    }

    pub fn distance_m(&self) -> f64 {
        self.distance_m
    }

    /// Rain fade at the session carrier (converted to GHz)
    pub fn add_rain_loss(&mut self, rain_rate_mm_h: f64, elevation_deg: f64) -> Result<()> {
        let db = rain_attenuation(
            self.frequency_hz / 1e9,
            rain_rate_mm_h,
            elevation_deg,
            RAIN_DEFAULT_POLARIZATION_DEG,
        )?;
        self.record(RAIN_TERM, db);
        Ok(())
    }

    pub fn add_atmospheric_loss(
        &mut self,
        zenith_attenuation_db: f64,
        elevation_deg: f64,
    ) -> Result<()> {
        let db = atmospheric_loss(zenith_attenuation_db, elevation_deg)?;
        self.record(ATMOSPHERIC_TERM, db);
        Ok(())
    }

    pub fn add_pointing_loss(&mut self, pointing_loss_db: f64) -> Result<()> {
        let db = require_non_negative("pointing_loss_db", pointing_loss_db)?;
        self.record(POINTING_TERM, db);
        Ok(())
    }

    pub fn add_polarization_loss(&mut self, mismatch_deg: f64) -> Result<()> {
        let db = polarization_mismatch_loss(mismatch_deg)?;
        self.record(POLARIZATION_TERM, db);
        Ok(())
    }

    /// Record an arbitrary named term, e.g. a measured implementation loss
    pub fn add_loss(&mut self, name: &str, loss_db: f64) -> Result<()> {
        let db = require_finite("loss_db", loss_db)?;
        self.record(name, db);
        Ok(())
    }

    pub fn loss(&self, name: &str) -> Option<f64> {
        self.losses.get(name).copied()
    }

    pub fn terms(&self) -> impl Iterator<Item = (&str, f64)> {
        self.losses.iter().map(|(name, db)| (name.as_str(), *db))
    }

    /// Sum of every recorded term
    pub fn total_loss(&self) -> f64 {
        self.losses.values().sum()
    }

    /// Received power and SNR with the session total as the path loss
    pub fn report(
        &self,
        eirp_dbw: f64,
        rx_gain_dbi: f64,
        noise_density_dbw_per_hz: f64,
        bandwidth_hz: f64,
    ) -> Result<LinkReport> {
        require_positive("bandwidth_hz", bandwidth_hz)?;

        let total_loss_db = self.total_loss();
        let received_power_dbw = received_power(eirp_dbw, total_loss_db, rx_gain_dbi, 0.0);
        let snr_db = snr(received_power_dbw, noise_density_dbw_per_hz, bandwidth_hz)?;

        Ok(LinkReport {
            frequency_hz: self.frequency_hz,
            distance_m: self.distance_m,
            losses_db: self
                .losses
                .iter()
                .map(|(name, db)| (name.clone(), *db))
                .collect(),
            total_loss_db,
            eirp_dbw,
            rx_gain_dbi,
            received_power_dbw,
            snr_db,
        })
    }

    fn record(&mut self, name: &str, db: f64) {
        debug!(term = name, loss_db = db, "recording link loss term");
        self.losses.insert(name.to_string(), db);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{eirp, noise_density, LinkBudgetError};

    #[test]
    fn test_new_session_total_is_fspl() {
        let session = LinkBudgetSession::new(12.5e9, 420e3).unwrap();
        let expected = fspl(12.5e9, 420e3).unwrap();
        assert_eq!(session.total_loss(), expected);
        assert_eq!(session.loss(FSPL_TERM), Some(expected));
        assert_eq!(session.terms().count(), 1);
    }

    #[test]
    fn test_new_session_rejects_bad_geometry() {
        assert!(matches!(
            LinkBudgetSession::new(12.5e9, 0.0),
            Err(LinkBudgetError::NonPositive { name: "distance_m", .. })
        ));
        assert!(LinkBudgetSession::new(-1.0, 420e3).is_err());
    }

    #[test]
    fn test_add_rain_loss() {
        let mut session = LinkBudgetSession::new(12.5e9, 420e3).unwrap();
        session.add_rain_loss(25.0, 45.0).unwrap();

        let expected = fspl(12.5e9, 420e3).unwrap()
            + rain_attenuation(12.5, 25.0, 45.0, RAIN_DEFAULT_POLARIZATION_DEG).unwrap();
        assert!((session.total_loss() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_rain_loss_overwrites() {
        let mut session = LinkBudgetSession::new(12.5e9, 420e3).unwrap();
        session.add_rain_loss(25.0, 45.0).unwrap();
        let once = session.total_loss();

        session.add_rain_loss(25.0, 45.0).unwrap();
        assert_eq!(session.total_loss(), once);
        assert_eq!(session.terms().count(), 2);

        session.add_rain_loss(5.0, 45.0).unwrap();
        let expected = fspl(12.5e9, 420e3).unwrap()
            + rain_attenuation(12.5, 5.0, 45.0, 0.0).unwrap();
        assert!((session.total_loss() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_failed_add_leaves_terms_untouched() {
        let mut session = LinkBudgetSession::new(12.5e9, 420e3).unwrap();
        session.add_rain_loss(10.0, 30.0).unwrap();
        let before = session.total_loss();

        assert!(session.add_rain_loss(-4.0, 30.0).is_err());
        assert!(session.add_pointing_loss(f64::NAN).is_err());
        assert!(session.add_loss("implementation", f64::INFINITY).is_err());

        assert_eq!(session.total_loss(), before);
        assert_eq!(session.terms().count(), 2);
    }

    #[test]
    fn test_total_is_plain_sum_of_terms() {
        let mut session = LinkBudgetSession::new(8.4e9, 2_000e3).unwrap();
        session.add_rain_loss(12.0, 20.0).unwrap();
        session.add_atmospheric_loss(0.3, 20.0).unwrap();
        session.add_pointing_loss(0.5).unwrap();
        session.add_polarization_loss(10.0).unwrap();
        session.add_loss("implementation", 1.2).unwrap();

        let sum: f64 = session.terms().map(|(_, db)| db).sum();
        assert_eq!(session.terms().count(), 6);
        assert!((session.total_loss() - sum).abs() < 1e-12);
        assert_eq!(session.loss("implementation"), Some(1.2));
    }

    #[test]
    fn test_report() {
        let mut session = LinkBudgetSession::new(12.5e9, 420e3).unwrap();
        session.add_rain_loss(25.0, 45.0).unwrap();

        let eirp_dbw = eirp(10.0, 30.0, 1.0);
        let n0 = noise_density(150.0).unwrap();
        let report = session.report(eirp_dbw, 35.0, n0, 1e6).unwrap();

        assert_eq!(report.total_loss_db, session.total_loss());
        assert!(
            (report.received_power_dbw - (eirp_dbw - session.total_loss() + 35.0)).abs() < 1e-9
        );
        assert_eq!(report.losses_db.len(), 2);

        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"rain\""));
    }

    #[test]
    fn test_report_rejects_zero_bandwidth() {
        let session = LinkBudgetSession::new(12.5e9, 420e3).unwrap();
        assert!(session.report(40.0, 35.0, -200.0, 0.0).is_err());
    }
}
