// NEO Navigator - Keplerian orbit engine for planets, the Moon and NEOs
// Library root and headless host entry point

pub mod body_registry;
pub mod catalog;
pub mod clock;
pub mod config;
pub mod error;
pub mod neo_feed;
pub mod orbit_trace;
pub mod orbital_mechanics;
pub mod state_manager;

use anyhow::{ensure, Context};
use std::collections::HashSet;
use std::time::{Duration, Instant};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

pub use body_registry::{BodyId, BodyRegistry, FrameInput, FrameReport, RegistryOptions, RootMode};
pub use catalog::{ElementRecord, PRIMARY};
pub use config::Config;
pub use error::{FeedError, OrbitError, RegistryError};
pub use orbital_mechanics::{advance, propagate, OrbitalElementSet, SimulationState, Vector3};
pub use state_manager::{AppState, FrontendState, Simulation};

use clock::SimulationClock;
use neo_feed::load_feed;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // Tracing goes to stderr; stdout carries the JSON snapshots
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Element records for the configured catalog plus any NEO feed
pub fn load_records(config: &Config) -> anyhow::Result<Vec<ElementRecord>> {
    let mut records = match &config.catalog {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("reading catalog {}", path.display()))?;
            catalog::from_json(&json)
                .with_context(|| format!("parsing catalog {}", path.display()))?
        }
        None => catalog::solar_system(),
    };

    if let Some(source) = &config.feed {
        let runtime = tokio::runtime::Runtime::new().context("starting tokio runtime")?;
        let feed = runtime
            .block_on(load_feed(source, config.delimiter()))
            .with_context(|| format!("loading NEO feed {}", source))?;
        if !feed.rejected.is_empty() {
            warn!(rejected = feed.rejected.len(), "some NEO rows were skipped");
        }

        // Feed rows may not shadow catalog bodies
        let catalog_names: HashSet<String> = records.iter().map(|r| r.name.clone()).collect();
        let (kept, clashing): (Vec<_>, Vec<_>) = feed
            .element_records()
            .partition(|r| !catalog_names.contains(&r.name));
        if !clashing.is_empty() {
            let names: Vec<&str> = clashing.iter().map(|r| r.name.as_str()).collect();
            warn!(
                rejected = clashing.len(),
                names = ?names,
                "NEO rows clash with catalog bodies and were skipped"
            );
        }
        records.extend(kept);
    }

    Ok(records)
}

pub fn build_simulation(config: &Config) -> anyhow::Result<Simulation> {
    ensure!(
        config.sim_speed.is_finite(),
        "sim speed must be finite, got {}",
        config.sim_speed
    );
    let records = load_records(config)?;

    let mut builder = BodyRegistry::builder(config.registry_options());
    builder.add_records(records)?;
    let registry = builder.build().context("building body registry")?;

    let mut simulation = Simulation::new(registry, SimulationClock::now(), config.sim_speed);
    simulation.root_mode = config.root_mode();
    simulation.record_trails = config.record_trails;
    simulation.trace_step = config.trace_step;
    Ok(simulation)
}

/// Headless host: run the frame loop for the configured time and print a
/// JSON snapshot every `report_every` frames
pub fn run() -> anyhow::Result<()> {
    let config = Config::load();
    init_tracing();

    let app_state = AppState::new(build_simulation(&config)?);
    let frame_time = Duration::from_millis(config.frame_ms.max(1));
    let run_for = config
        .run_duration()
        .with_context(|| format!("run seconds out of range: {}", config.run_seconds))?;

    // Start background simulation loop
    let handle = app_state.start(frame_time);

    let started = Instant::now();
    let mut last_reported = 0;
    while started.elapsed() < run_for {
        std::thread::sleep(frame_time);
        if config.report_every == 0 {
            continue;
        }
        let frame = app_state.simulation.read().registry.frame();
        if frame >= last_reported + config.report_every {
            last_reported = frame;
            println!("{}", serde_json::to_string(&app_state.snapshot())?);
        }
    }

    app_state.stop();
    handle
        .join()
        .map_err(|_| anyhow::anyhow!("simulation thread panicked"))?;

    let last = app_state.snapshot();
    println!("{}", serde_json::to_string(&last)?);
    info!(frames = last.frame, date = %last.date, "run finished");
    Ok(())
}
