//! Planets-and-ships gravity simulation
//!
//! Headless host loop: seeds a run, steps it at a fixed 60 Hz and mirrors the
//! snapshots into renderer proxies, logging ship statistics as it goes.

mod scene;

use glam::Vec3;
use gravity_physics::ShipStats;
use gravity_simulation::{
    EdgeMode, GpuContext, Simulation, SimulationConfig, SimulationError,
};
use scene::ProxyScene;

const PLANET_COUNT: u32 = 12;
const SHIP_COUNT: u32 = 16384;
const AREA_HALF_EXTENT: f32 = 60.0;
const FRAME_COUNT: u64 = 600;
const DELTA_TIME: f32 = 1.0 / 60.0;
const STATS_INTERVAL: u64 = 60;
const PROXY_SPACING: f32 = 1.5;

/// `GRAVITY_SEED` when set, a fresh random seed otherwise
fn seed() -> u32 {
    match std::env::var("GRAVITY_SEED") {
        Ok(value) => match value.trim().parse() {
            Ok(seed) => return seed,
            Err(err) => log::warn!("Ignoring GRAVITY_SEED={value:?}: {err}"),
        },
        Err(std::env::VarError::NotPresent) => {}
        Err(err) => log::warn!("Ignoring GRAVITY_SEED: {err}"),
    }
    rand::random()
}

fn log_stats(frame: u64, stats: &ShipStats) {
    log::info!(
        "frame {frame:>5}: {} ships, centroid ({:.2}, {:.2}, {:.2}), speed {:.2}..{:.2}, {} outside",
        stats.count,
        stats.centroid.x,
        stats.centroid.y,
        stats.centroid.z,
        stats.min_speed,
        stats.max_speed,
        stats.outside_area
    );
}

fn run() -> Result<(), SimulationError> {
    let context = GpuContext::new_blocking()?;

    let seed = seed();
    log::info!("Seed {seed} (set GRAVITY_SEED={seed} to reproduce)");

    let config = SimulationConfig {
        planet_count: PLANET_COUNT,
        ship_count: SHIP_COUNT,
        area_min: Vec3::splat(-AREA_HALF_EXTENT),
        area_max: Vec3::splat(AREA_HALF_EXTENT),
        radius_range: (1.0, 6.0),
        avoid_planets_on_spawn: true,
        edge_mode: EdgeMode::Wrap,
        seed,
        ..Default::default()
    };
    let (area_min, area_max) = (config.area_min, config.area_max);

    let mut scene = ProxyScene::with_grid(
        PLANET_COUNT as usize,
        SHIP_COUNT as usize,
        PROXY_SPACING,
    );

    let mut simulation = Simulation::from_context(context);
    simulation.initialize(config)?;

    scene.place_planets(simulation.planets());
    scene.sync_ships(simulation.ships());
    log_stats(0, &ShipStats::from_ships(simulation.ships(), area_min, area_max));

    for frame in 1..=FRAME_COUNT {
        simulation.step(DELTA_TIME)?;
        scene.sync_ships(simulation.ships());

        if frame % STATS_INTERVAL == 0 {
            log_stats(
                frame,
                &ShipStats::from_ships(simulation.ships(), area_min, area_max),
            );
        }
    }

    log::info!(
        "{} planet and {} ship proxies in the final scene",
        scene.planets.len(),
        scene.ships.len()
    );
    simulation.shutdown();
    Ok(())
}

fn main() {
    // Initialize logger (RUST_LOG=debug for verbose output)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Starting planets-and-ships gravity simulation...");

    if let Err(err) = run() {
        log::error!("{err}");
        std::process::exit(1);
    }
}
