//! Pass Event Finder
//!
//! Scans elevation on a coarse grid, then refines horizon crossings by
//! bisection and culminations by ternary search.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{look_angles, Ephemeris, GroundStation, OrbitalError, Result};

pub const DEFAULT_MIN_ELEVATION_DEG: f64 = 10.0;
pub const DEFAULT_PASS_WINDOW_DAYS: f64 = 1.0;
pub const DEFAULT_STATION_ALTITUDE_M: f64 = 0.0;

/// Longest search window accepted by [`PassPredictor::find_next_pass`]
pub const MAX_PASS_WINDOW_DAYS: f64 = 366.0;

const DEFAULT_STEP_SECONDS: i64 = 30;
const REFINE_TOLERANCE_MS: i64 = 1_000;
// Offset used to read the elevation slope at the window edges
const SLOPE_STEP_MS: i64 = 1_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PassEventKind {
    /// Acquisition of signal, rising through the mask
    Aos,
    /// Culmination
    Max,
    /// Loss of signal, setting through the mask
    Los,
}

impl fmt::Display for PassEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PassEventKind::Aos => write!(f, "AOS"),
            PassEventKind::Max => write!(f, "MAX"),
            PassEventKind::Los => write!(f, "LOS"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PassEvent {
    pub time: DateTime<Utc>,
    pub kind: PassEventKind,
    pub elevation_deg: f64,
}

/// Visibility events for one station above an elevation mask
#[derive(Debug, Clone)]
pub struct PassPredictor {
    station: GroundStation,
    min_elevation_deg: f64,
    step: Duration,
}

impl PassPredictor {
    pub fn new(station: GroundStation) -> Self {
        Self {
            station,
            min_elevation_deg: DEFAULT_MIN_ELEVATION_DEG,
            step: Duration::seconds(DEFAULT_STEP_SECONDS),
        }
    }

    pub fn with_min_elevation(mut self, min_elevation_deg: f64) -> Self {
        self.min_elevation_deg = min_elevation_deg;
        self
    }

    pub fn with_step(mut self, step: Duration) -> Self {
        self.step = step;
        self
    }

    pub fn station(&self) -> &GroundStation {
        &self.station
    }

    pub fn min_elevation_deg(&self) -> f64 {
        self.min_elevation_deg
    }

    /// AOS, MAX and LOS events in `[start, start + duration_days]`, in time
    /// order. A pass already in progress at `start` has no AOS.
    pub fn find_next_pass<E: Ephemeris + ?Sized>(
        &self,
        ephemeris: &E,
        start: DateTime<Utc>,
        duration_days: f64,
    ) -> Result<Vec<PassEvent>> {
        if !(duration_days.is_finite() && duration_days > 0.0) {
            return Err(OrbitalError::InvalidInput(format!(
                "duration_days must be positive, got {}",
                duration_days
            )));
        }
        if duration_days > MAX_PASS_WINDOW_DAYS {
            return Err(OrbitalError::InvalidInput(format!(
                "duration_days {} exceeds {} day limit",
                duration_days, MAX_PASS_WINDOW_DAYS
            )));
        }
        if self.step <= Duration::zero() {
            return Err(OrbitalError::InvalidInput("scan step must be positive".into()));
        }

        let end = Duration::try_milliseconds((duration_days * 86_400_000.0) as i64)
            .and_then(|window| start.checked_add_signed(window))
            .ok_or_else(|| {
                OrbitalError::InvalidInput(format!(
                    "window of {} days from {} is out of range",
                    duration_days, start
                ))
            })?;
        let samples = self.sample(ephemeris, start, end)?;
        let mask = self.min_elevation_deg;

        let mut events = Vec::new();
        for time in self.edge_culminations(ephemeris, &samples)? {
            events.push(self.event(ephemeris, time, PassEventKind::Max)?);
        }
        for i in 1..samples.len() {
            let (t0, e0) = samples[i - 1];
            let (t1, e1) = samples[i];

            if e0 < mask && e1 >= mask {
                let time = self.bisect(ephemeris, t0, t1)?;
                events.push(self.event(ephemeris, time, PassEventKind::Aos)?);
            } else if e0 >= mask && e1 < mask {
                let time = self.bisect(ephemeris, t1, t0)?;
                events.push(self.event(ephemeris, time, PassEventKind::Los)?);
            }

            if let Some(&(t2, e2)) = samples.get(i + 1) {
                if e1 >= mask && e1 >= e0 && e1 > e2 {
                    let time = self.culmination(ephemeris, t0, t2)?;
                    events.push(self.event(ephemeris, time, PassEventKind::Max)?);
                }
            }
        }

        events.sort_by_key(|e| e.time);
        debug!(
            events = events.len(),
            latitude = self.station.latitude_deg,
            longitude = self.station.longitude_deg,
            "pass search complete"
        );

        Ok(events)
    }

    fn elevation<E: Ephemeris + ?Sized>(&self, ephemeris: &E, time: DateTime<Utc>) -> Result<f64> {
        Ok(look_angles(ephemeris, &self.station, time)?.elevation_deg)
    }

    fn sample<E: Ephemeris + ?Sized>(
        &self,
        ephemeris: &E,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<(DateTime<Utc>, f64)>> {
        let mut samples = Vec::new();
        let mut t = start;
        while t < end {
            samples.push((t, self.elevation(ephemeris, t)?));
            match t.checked_add_signed(self.step) {
                Some(next) => t = next,
                None => break,
            }
        }
        samples.push((end, self.elevation(ephemeris, end)?));
        Ok(samples)
    }

    /// Culminations inside the first or last grid interval. Interior grid
    /// maxima miss these: the peak sample sits on the window edge, so the
    /// slope at that edge decides whether the peak lies inside.
    fn edge_culminations<E: Ephemeris + ?Sized>(
        &self,
        ephemeris: &E,
        samples: &[(DateTime<Utc>, f64)],
    ) -> Result<Vec<DateTime<Utc>>> {
        let n = samples.len();
        let mut peaks = Vec::new();
        if n < 2 {
            return Ok(peaks);
        }
        let mask = self.min_elevation_deg;
        let slope_step = Duration::milliseconds(SLOPE_STEP_MS);

        let (t0, e0) = samples[0];
        let (t1, e1) = samples[1];
        if e0 >= mask && e0 > e1 {
            if let Some(after) = t0.checked_add_signed(slope_step) {
                if self.elevation(ephemeris, after)? > e0 {
                    peaks.push(self.culmination(ephemeris, t0, t1)?);
                }
            }
        }

        let (ta, ea) = samples[n - 2];
        let (tb, eb) = samples[n - 1];
        if eb >= mask && eb > ea {
            if let Some(before) = tb.checked_sub_signed(slope_step) {
                if self.elevation(ephemeris, before)? > eb {
                    peaks.push(self.culmination(ephemeris, ta, tb)?);
                }
            }
        }

        Ok(peaks)
    }

    /// Mask crossing between `below` (under the mask) and `above`. Returns
    /// the above-mask side once the bracket is within tolerance.
    fn bisect<E: Ephemeris + ?Sized>(
        &self,
        ephemeris: &E,
        mut below: DateTime<Utc>,
        mut above: DateTime<Utc>,
    ) -> Result<DateTime<Utc>> {
        while (above - below).num_milliseconds().abs() > REFINE_TOLERANCE_MS {
            let mid = below + (above - below) / 2;
            if self.elevation(ephemeris, mid)? >= self.min_elevation_deg {
                above = mid;
            } else {
                below = mid;
            }
        }
        Ok(above)
    }

    /// Peak elevation time within `[lo, hi]`, assuming a single maximum
    fn culmination<E: Ephemeris + ?Sized>(
        &self,
        ephemeris: &E,
        mut lo: DateTime<Utc>,
        mut hi: DateTime<Utc>,
    ) -> Result<DateTime<Utc>> {
        while (hi - lo).num_milliseconds() > REFINE_TOLERANCE_MS {
            let third = (hi - lo) / 3;
            let m1 = lo + third;
            let m2 = hi - third;
            if self.elevation(ephemeris, m1)? < self.elevation(ephemeris, m2)? {
                lo = m1;
            } else {
                hi = m2;
            }
        }
        Ok(lo + (hi - lo) / 2)
    }

    fn event<E: Ephemeris + ?Sized>(
        &self,
        ephemeris: &E,
        time: DateTime<Utc>,
        kind: PassEventKind,
    ) -> Result<PassEvent> {
        let elevation_deg = self.elevation(ephemeris, time)?;
        debug!(%kind, %time, elevation_deg, "pass event");
        Ok(PassEvent {
            time,
            kind,
            elevation_deg,
        })
    }
}
