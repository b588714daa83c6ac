// State Manager - Thread-safe simulation state handling
// Owns the registry and clock, runs the frame loop and serves host queries

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::body_registry::{BodyRegistry, FrameInput, FrameReport, RootMode};
use crate::catalog::BodyKind;
use crate::clock::{days_per_second, sim_speed_from_slider, SimulationClock};
use crate::error::RegistryError;
use crate::orbit_trace::DEFAULT_TRACE_STEP;

// =============================================================================
// SIMULATION
// =============================================================================

/// Registry plus the host-controlled knobs applied to every frame
#[derive(Debug, Clone)]
pub struct Simulation {
    pub registry: BodyRegistry,
    pub clock: SimulationClock,
    /// Days per frame
    pub sim_speed: f64,
    pub is_paused: bool,
    pub root_mode: RootMode,
    pub record_trails: bool,
    /// Angular step for static traces (rad)
    pub trace_step: f64,
    pub last_report: FrameReport,
}

impl Simulation {
    pub fn new(registry: BodyRegistry, clock: SimulationClock, sim_speed: f64) -> Self {
        Self {
            registry,
            clock,
            sim_speed,
            is_paused: false,
            root_mode: RootMode::Anchored,
            record_trails: false,
            trace_step: DEFAULT_TRACE_STEP,
            last_report: FrameReport::default(),
        }
    }

    /// One frame; `elapsed_seconds` is wall clock since the previous frame.
    /// Returns false when paused.
    pub fn tick(&mut self, elapsed_seconds: f64) -> bool {
        if self.is_paused {
            return false;
        }

        let input = FrameInput {
            sim_speed_days: self.sim_speed,
            elapsed_seconds,
            root_mode: self.root_mode,
            record_trails: self.record_trails,
        };
        self.last_report = self.registry.step(&input);
        self.clock.advance(self.sim_speed);
        true
    }

    pub fn to_frontend(&self) -> FrontendState {
        let registry = &self.registry;

        let bodies = registry
            .bodies()
            .map(|(_, body)| FrontendBody {
                name: body.name().to_string(),
                kind: body.kind(),
                parent: body.parent().map(|p| registry.body(p).name().to_string()),
                position: body.position().0.to_array(),
                radius_km: body.physical().radius_km,
                trail_len: body.trail().map(|t| t.len()).unwrap_or(0),
            })
            .collect();

        let failures = self
            .last_report
            .failures
            .iter()
            .map(|(id, err)| FrontendFailure {
                name: registry.body(*id).name().to_string(),
                error: err.to_string(),
            })
            .collect();

        FrontendState {
            frame: registry.frame(),
            date: self.clock.date().to_rfc3339(),
            sim_speed: self.sim_speed,
            days_per_second: days_per_second(self.sim_speed),
            is_paused: self.is_paused,
            root_mode: self.root_mode,
            bodies,
            failures,
        }
    }
}

// =============================================================================
// GLOBAL STATE
// =============================================================================

pub struct AppState {
    pub simulation: Arc<RwLock<Simulation>>,
    pub is_running: Arc<RwLock<bool>>,
}

impl AppState {
    pub fn new(simulation: Simulation) -> Self {
        Self {
            simulation: Arc::new(RwLock::new(simulation)),
            is_running: Arc::new(RwLock::new(false)),
        }
    }

    /// Spawn the frame loop; it runs until `stop` is called
    pub fn start(&self, frame_time: Duration) -> JoinHandle<()> {
        *self.is_running.write() = true;
        start_simulation_loop(self.simulation.clone(), self.is_running.clone(), frame_time)
    }

    pub fn stop(&self) {
        *self.is_running.write() = false;
    }

    pub fn set_paused(&self, paused: bool) {
        self.simulation.write().is_paused = paused;
    }

    pub fn set_sim_speed(&self, days_per_frame: f64) {
        if days_per_frame.is_finite() {
            self.simulation.write().sim_speed = days_per_frame;
        }
    }

    /// Time slider position, 0-100
    pub fn set_slider(&self, value: f64) {
        self.set_sim_speed(sim_speed_from_slider(value.clamp(0.0, 100.0)));
    }

    pub fn set_root_mode(&self, mode: RootMode) {
        self.simulation.write().root_mode = mode;
    }

    pub fn set_record_trails(&self, record: bool) {
        let mut sim = self.simulation.write();
        sim.record_trails = record;
        if !record {
            sim.registry.clear_trails();
        }
    }

    pub fn snapshot(&self) -> FrontendState {
        self.simulation.read().to_frontend()
    }

    /// Live trail of a body, oldest point first
    pub fn trail(&self, name: &str) -> Result<Vec<[f64; 3]>, RegistryError> {
        let sim = self.simulation.read();
        let id = sim.registry.id(name)?;
        Ok(sim.registry.trail(id).iter().map(|p| p.to_array()).collect())
    }

    /// Full orbit around the parent's current position; `None` for the primary
    pub fn static_trace(&self, name: &str) -> Result<Option<Vec<[f64; 3]>>, RegistryError> {
        let sim = self.simulation.read();
        let id = sim.registry.id(name)?;
        let trace = sim.registry.static_trace(id, sim.trace_step)?;
        Ok(trace.map(|points| points.iter().map(|p| p.to_array()).collect()))
    }
}

// =============================================================================
// SIMULATION LOOP (runs in background thread)
// =============================================================================

pub fn start_simulation_loop(
    state: Arc<RwLock<Simulation>>,
    is_running: Arc<RwLock<bool>>,
    frame_time: Duration,
) -> JoinHandle<()> {
    info!(frame_ms = frame_time.as_millis() as u64, "simulation loop started");

    thread::spawn(move || {
        let mut last_frame = Instant::now();

        loop {
            if !*is_running.read() {
                break;
            }

            let start = Instant::now();
            let elapsed_seconds = start.duration_since(last_frame).as_secs_f64();
            last_frame = start;

            {
                let mut sim = state.write();
                if sim.tick(elapsed_seconds) && !sim.last_report.is_clean() {
                    debug!(
                        frame = sim.last_report.frame,
                        failures = sim.last_report.failures.len(),
                        "frame had skipped bodies"
                    );
                }
            }

            // Sleep to maintain frame rate
            let elapsed = start.elapsed();
            if elapsed < frame_time {
                thread::sleep(frame_time - elapsed);
            }
        }

        info!(frame = state.read().registry.frame(), "simulation loop stopped");
    })
}

// =============================================================================
// SERIALIZABLE STATE FOR FRONTEND
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrontendBody {
    pub name: String,
    pub kind: BodyKind,
    pub parent: Option<String>,
    pub position: [f64; 3], // scene units
    pub radius_km: f64,
    pub trail_len: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrontendFailure {
    pub name: String,
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrontendState {
    pub frame: u64,
    /// RFC 3339
    pub date: String,
    pub sim_speed: f64,
    /// Rate label for the time slider
    pub days_per_second: f64,
    pub is_paused: bool,
    pub root_mode: RootMode,
    pub bodies: Vec<FrontendBody>,
    pub failures: Vec<FrontendFailure>,
}

// =============================================================================
// TESTS
// =============================================================================
