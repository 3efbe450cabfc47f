//! WiFi roaming simulator.
//!
//! Simulates a row of mobile stations walking between two access points,
//! detects association handovers, samples per-link RSSI on a fixed period
//! and accounts per-flow traffic. Results land in three CSV files in the
//! configured output directory.
//!
//! Usage: `wifi-roaming-simulator [config.toml]`. Without an argument the
//! default scenario runs (5 stations, APs 60 m apart, 60 s).

use anyhow::{Context, Result};
use env_logger::Builder;
use log::{info, LevelFilter};
use std::path::PathBuf;

mod analytics;
mod config;
mod engine;

use analytics::event_log::{FLOW_STATS_FILE, HANDOVER_EVENTS_FILE, RSSI_MEASUREMENTS_FILE};
use config::RunConfig;
use engine::Simulation;

fn main() -> Result<()> {
    // Logging setup
    Builder::new()
        .filter_level(LevelFilter::Info)
        .filter(Some("wifi_roaming_simulator"), LevelFilter::Debug)
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => RunConfig::load(&PathBuf::from(path))?,
        None => RunConfig::default(),
    };
    info!(
        "Scenario: {} station(s), APs {} m apart, speed {} m/s, tx power {} dBm, run time {} s",
        config.stations, config.ap_distance_m, config.speed_mps, config.tx_power_dbm, config.sim_time_s
    );

    std::fs::create_dir_all(&config.output_dir)
        .with_context(|| format!("Failed to create output directory: {}", config.output_dir.display()))?;

    let mut sim = Simulation::new(&config)?;
    analytics::rssi_sampler::start(&mut sim);
    engine::association::start(&mut sim);
    engine::traffic::install(&mut sim);
    engine::schedule_turnaround(&mut sim);

    sim.run()?;

    let reports = analytics::flow_stats::write_reports(sim.flows.snapshot(), &mut sim.analytics.writer)?;
    sim.analytics.writer.flush()?;

    info!("=== Simulation statistics ===");
    info!("Total handovers detected: {}", sim.analytics.tracker.handover_count());
    info!("Flows reported: {}", reports.len());
    info!("Generated files:");
    for name in [HANDOVER_EVENTS_FILE, RSSI_MEASUREMENTS_FILE, FLOW_STATS_FILE] {
        info!("  - {}", config.output_dir.join(name).display());
    }
    Ok(())
}
