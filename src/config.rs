// Configuration - command line options with environment / .env fallbacks

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use crate::body_registry::{InitialAnomaly, RegistryOptions, RootMode};
use crate::clock::BASE_SIM_SPEED;
use crate::neo_feed::FeedSource;
use crate::orbit_trace::{DEFAULT_TRACE_STEP, DEFAULT_TRAIL_CAPACITY};
use crate::orbital_mechanics::{KeplerSolver, Vector3, KEPLER_MAX_ITERATIONS, KEPLER_TOLERANCE};

#[derive(Parser, Debug, Clone)]
#[command(name = "neo-navigator")]
#[command(about = "Headless Keplerian propagation of planets, the Moon and near-Earth objects")]
pub struct Config {
    /// NEO table: local path or http(s) URL
    #[arg(long, env = "NEO_FEED")]
    pub feed: Option<FeedSource>,

    /// Field delimiter of the NEO table
    #[arg(long, env = "NEO_FEED_DELIMITER", default_value_t = ';')]
    pub feed_delimiter: char,

    /// JSON array of element records replacing the built-in solar system
    #[arg(long, env = "NEO_CATALOG")]
    pub catalog: Option<PathBuf>,

    /// Initial sim speed in days per frame
    #[arg(long, env = "NEO_SIM_SPEED", default_value_t = BASE_SIM_SPEED, allow_negative_numbers = true)]
    pub sim_speed: f64,

    /// Frame period (ms)
    #[arg(long, env = "NEO_FRAME_MS", default_value_t = 16)]
    pub frame_ms: u64,

    /// How long the headless host runs (s)
    #[arg(long, env = "NEO_RUN_SECONDS", default_value_t = 5.0)]
    pub run_seconds: f64,

    /// Emit a JSON snapshot every N frames (0 disables)
    #[arg(long, env = "NEO_REPORT_EVERY", default_value_t = 60)]
    pub report_every: u64,

    #[arg(long, env = "NEO_TRAIL_CAPACITY", default_value_t = DEFAULT_TRAIL_CAPACITY)]
    pub trail_capacity: usize,

    /// Angular step of static traces (rad)
    #[arg(long, env = "NEO_TRACE_STEP", default_value_t = DEFAULT_TRACE_STEP)]
    pub trace_step: f64,

    /// Record live trails every frame
    #[arg(long, env = "NEO_RECORD_TRAILS")]
    pub record_trails: bool,

    /// Run the primary in linear-drift mode
    #[arg(long, env = "NEO_ROOT_DRIFT")]
    pub root_drift: bool,

    /// Drift speed of the primary (scene units per second per unit sim speed)
    #[arg(long, env = "NEO_DRIFT_SPEED", default_value_t = -0.000001, allow_negative_numbers = true)]
    pub drift_speed: f64,

    /// `perihelion` or `mean-longitude`
    #[arg(long, env = "NEO_INITIAL_ANOMALY", default_value_t = InitialAnomaly::Perihelion)]
    pub initial_anomaly: InitialAnomaly,

    #[arg(long, env = "NEO_KEPLER_TOLERANCE", default_value_t = KEPLER_TOLERANCE)]
    pub kepler_tolerance: f64,

    #[arg(long, env = "NEO_KEPLER_MAX_ITERATIONS", default_value_t = KEPLER_MAX_ITERATIONS)]
    pub kepler_max_iterations: usize,
}

impl Config {
    /// Load `.env` (if present) and parse the process arguments
    pub fn load() -> Self {
        dotenv::dotenv().ok();
        Self::parse()
    }

    pub fn registry_options(&self) -> RegistryOptions {
        RegistryOptions {
            origin: Vector3::zero(),
            drift_speed: self.drift_speed,
            trail_capacity: self.trail_capacity,
            solver: KeplerSolver::new(self.kepler_tolerance, self.kepler_max_iterations),
            initial_anomaly: self.initial_anomaly,
        }
    }

    pub fn root_mode(&self) -> RootMode {
        if self.root_drift {
            RootMode::LinearDrift
        } else {
            RootMode::Anchored
        }
    }

    /// Delimiter as a CSV byte; non-ASCII falls back to ';'
    pub fn delimiter(&self) -> u8 {
        if self.feed_delimiter.is_ascii() {
            self.feed_delimiter as u8
        } else {
            b';'
        }
    }

    /// How long the headless host runs; negative means zero, `None` when
    /// the value does not fit a `Duration`
    pub fn run_duration(&self) -> Option<Duration> {
        Duration::try_from_secs_f64(self.run_seconds.max(0.0)).ok()
    }
}
