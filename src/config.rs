//! Run configuration.
//!
//! All scenario parameters live in one TOML file; every field is optional
//! and falls back to the default roaming scenario (five stations walking
//! between two APs 60 m apart). Loading validates the values before the
//! engine ever sees them, so the rest of the code can assume a sane world.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::analytics::signal_calculations::PathLossParameters;

/// Scenario parameters for one simulation run.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    /// Number of mobile stations.
    pub stations: u32,
    /// Spacing between the two access points, in meters.
    pub ap_distance_m: f64,
    /// Station walking speed along the x axis, in meters per second.
    pub speed_mps: f64,
    /// Transmit power shared by all radios, in dBm.
    pub tx_power_dbm: f64,
    /// Total virtual run time, in seconds.
    pub sim_time_s: f64,
    /// Application send rate per flow, in kilobits per second.
    pub data_rate_kbps: f64,
    /// Directory the CSV outputs are written to.
    pub output_dir: PathBuf,
    /// Propagation model constants.
    pub path_loss: PathLossParameters,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            stations: 5,
            ap_distance_m: 60.0,
            speed_mps: 2.0,
            tx_power_dbm: 16.0,
            sim_time_s: 60.0,
            data_rate_kbps: 400.0,
            output_dir: PathBuf::from("."),
            path_loss: PathLossParameters::default(),
        }
    }
}

impl RunConfig {
    /// Read and validate a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read configuration file: {}", path.display()))?;
        let config: RunConfig = toml::from_str(&text)
            .with_context(|| format!("failed to parse configuration file: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject parameter combinations the engine cannot run.
    pub fn validate(&self) -> Result<()> {
        if self.stations == 0 {
            bail!("configuration error: stations must be at least 1");
        }
        if self.ap_distance_m <= 0.0 {
            bail!("configuration error: ap_distance_m must be positive");
        }
        if self.speed_mps <= 0.0 {
            bail!("configuration error: speed_mps must be positive");
        }
        if self.sim_time_s <= 0.0 {
            bail!("configuration error: sim_time_s must be positive");
        }
        if self.data_rate_kbps <= 0.0 {
            bail!("configuration error: data_rate_kbps must be positive");
        }
        if !(0.0..=40.0).contains(&self.tx_power_dbm) {
            bail!("configuration error: tx_power_dbm must be between 0 and 40");
        }
        if self.path_loss.path_loss_exponent <= 0.0 {
            bail!("configuration error: path_loss.path_loss_exponent must be positive");
        }
        if self.path_loss.reference_distance <= 0.0 {
            bail!("configuration error: path_loss.reference_distance must be positive");
        }
        Ok(())
    }
}
