//! Radio signal strength calculations.
//!
//! Contains helpers for:
//! - Log-distance path loss without shadowing (deterministic)
//! - RSSI estimation from transmit power and modeled path loss
//! - Euclidean distance between node positions
//!
//! Units:
//! - Power: dBm
//! - Distance: meters
//! - Time plays no role here; the model is memoryless

use serde::Deserialize;

use super::types::Position;

/// Parameters defining the radio channel propagation model.
///
/// This struct encapsulates the constants used in the log-distance path loss
/// model. These parameters determine how signal strength decays over distance.
/// They are simulation-wide: every STA/AP link shares the same channel.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PathLossParameters {
    /// Path loss exponent (n).
    ///
    /// Determines how quickly the signal power decays with distance.
    /// - n = 2.0: Free space (vacuum)
    /// - n = 2.7 to 3.5: Urban areas
    /// - n = 3.0 to 5.0: Indoor obstructed environments
    pub path_loss_exponent: f64,

    /// Reference distance d₀ in meters (typically 1 meter).
    pub reference_distance: f64,

    /// Path loss at the reference distance d₀ in dB.
    ///
    /// This is the baseline loss measured or calculated at a short distance
    /// from the transmitter. 46.6777 dB corresponds to 1 m at 2.4 GHz.
    pub reference_loss: f64,
}

impl Default for PathLossParameters {
    fn default() -> Self {
        Self {
            path_loss_exponent: 3.0,
            reference_distance: 1.0,
            reference_loss: 46.6777,
        }
    }
}

/// Calculate the path loss (in dB) at a given distance using a log-distance
/// path loss model.
///
/// # Formula
///
/// ```text
/// PL(d) = PL(d₀) + 10 × n × log₁₀(d/d₀)
/// ```
///
/// Where:
/// - `PL(d₀)`: Path loss at the reference distance, from `params.reference_loss`
/// - `n`: Path loss exponent, from `params.path_loss_exponent`
/// - `d`: Distance in meters
///
/// # Returns
///
/// Path loss in decibels (dB). Deterministic: repeated calls with the same
/// distance yield the same result.
///
/// # Notes
///
/// For distances at or below the reference distance (including zero), returns
/// the reference path loss without evaluating the logarithm.
pub fn calculate_path_loss(distance: f64, params: &PathLossParameters) -> f64 {
    if distance <= params.reference_distance {
        return params.reference_loss;
    }
    params.reference_loss + 10.0 * params.path_loss_exponent * (distance / params.reference_distance).log10()
}

/// Calculate the RSSI (in dBm) at a given distance.
///
/// Formula: RSSI(dBm) = P_tx(dBm) - PL(dB)
/// - P_tx(dBm): transmit power at the antenna port
/// - PL(dB): path loss via `calculate_path_loss(distance, params)`
pub fn calculate_rssi(distance: f64, tx_power_dbm: f64, params: &PathLossParameters) -> f64 {
    tx_power_dbm - calculate_path_loss(distance, params)
}

/// RSSI between two positioned nodes (transmitter first).
pub fn calculate_rssi_between(tx: &Position, rx: &Position, tx_power_dbm: f64, params: &PathLossParameters) -> f64 {
    calculate_rssi(distance(tx, rx), tx_power_dbm, params)
}

/// Euclidean distance between two positions, in meters.
pub fn distance(a: &Position, b: &Position) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let dz = b.z - a.z;
    (dx * dx + dy * dy + dz * dz).sqrt()
}
