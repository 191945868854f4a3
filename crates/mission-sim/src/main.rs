//! Mission Simulation CLI
//!
//! Runs pass analysis, a rain-faded link budget and a QPSK burst for one
//! ground station.
//!
//! Usage:
//!   mission-sim --config mission.json --seed 42
//!   GS_LAT=39.93 GS_LON=32.86 mission-sim --verbose

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Parser;
use mission_sim::{run_link_budget, run_pass_analysis, run_waveform, MissionConfig};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "mission_sim=info";
const VERBOSE_LOG_FILTER: &str =
    "mission_sim=debug,orbital_mechanics=debug,link_budget=debug,waveform=debug";

#[derive(Parser, Debug)]
#[command(
    name = "mission-sim",
    about = "Pass prediction, link budget and QPSK waveform for a ground station"
)]
struct Args {
    /// Mission config JSON file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Ground station latitude in degrees
    #[arg(long, allow_hyphen_values = true)]
    lat: Option<f64>,

    /// Ground station longitude in degrees
    #[arg(long, allow_hyphen_values = true)]
    lon: Option<f64>,

    /// Ground station altitude in meters
    #[arg(long, allow_hyphen_values = true)]
    alt_m: Option<f64>,

    /// Pass search start (RFC 3339), defaults to the TLE epoch
    #[arg(long)]
    start: Option<DateTime<Utc>>,

    /// Pass search window in days
    #[arg(long)]
    days: Option<f64>,

    /// RNG seed for the QPSK bits
    #[arg(long)]
    seed: Option<u64>,

    /// Print the pass events as JSON
    #[arg(long)]
    json: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn apply(&self, config: &mut MissionConfig) {
        if let Some(lat) = self.lat {
            config.station.latitude_deg = lat;
        }
        if let Some(lon) = self.lon {
            config.station.longitude_deg = lon;
        }
        if let Some(alt) = self.alt_m {
            config.station.altitude_m = alt;
        }
        if self.start.is_some() {
            config.start_time = self.start;
        }
        if let Some(days) = self.days {
            config.pass_window_days = days;
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let filter = if args.verbose {
        EnvFilter::new(VERBOSE_LOG_FILTER)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut config = match &args.config {
        Some(path) => MissionConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => MissionConfig::default(),
    };
    config
        .apply_env_overrides()
        .context("applying ground station environment overrides")?;
    args.apply(&mut config);

    info!("{}", "=".repeat(60));
    info!("Mission Simulation");
    info!("{}", "=".repeat(60));

    // 1. Pass analysis
    info!(
        "Ground station {} ({:.4}, {:.4})",
        config.station.name, config.station.latitude_deg, config.station.longitude_deg
    );
    let summary = run_pass_analysis(&config).context("pass analysis")?;
    info!("Satellite {} from {}", summary.satellite, summary.start);
    if summary.events.is_empty() {
        info!("No passes above {}°", config.station.min_elevation_deg);
    }
    for event in &summary.events {
        info!(
            "  {} {}  el {:.1}°",
            event.kind,
            event.time.format("%Y-%m-%d %H:%M:%S UTC"),
            event.elevation_deg
        );
    }
    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }

    // 2. Link budget
    let session = run_link_budget(&config.link).context("link budget")?;
    info!(
        "Link {:.2} GHz over {:.0} km, rain {} mm/h at {}°",
        config.link.frequency_hz / 1e9,
        config.link.distance_km,
        config.link.rain_rate_mm_h,
        config.link.elevation_deg
    );
    info!("  Total path loss: {:.2} dB", session.total_loss());

    // 3. QPSK burst
    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let samples = run_waveform(&config.waveform, &mut rng).context("QPSK modulation")?;
    info!(
        "QPSK {} bits at {} sps: {} samples",
        config.waveform.num_bits,
        config.waveform.sps,
        samples.len()
    );

    Ok(())
}
