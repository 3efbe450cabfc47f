//! Association signal source driven by modeled signal strength.
//!
//! Stands in for the 802.11 association machinery: a periodic scan computes
//! the deterministic RSSI from every AP to every station and keeps each
//! station attached to the strongest usable AP. A hysteresis margin prevents
//! flapping around the midpoint between two APs, and an AP is only usable
//! above a sensitivity floor.
//!
//! The resulting Associate/Disassociate signals are delivered to the
//! association tracker as typed events, in virtual-time order.

use crate::analytics::signal_calculations::calculate_rssi_between;
use crate::analytics::types::{AssociationEvent, AssociationKind};
use super::Simulation;

/// Scan period in virtual seconds.
pub const SCAN_PERIOD_S: f64 = 0.1;

/// A candidate AP must beat the serving AP by this margin (dB) to trigger a
/// roam. Prevents flapping where the two signals are near-equal.
pub const HYSTERESIS_DB: f64 = 3.0;

/// Minimum usable RSSI (dBm); below this an AP is out of reach.
pub const SENSITIVITY_FLOOR_DBM: f64 = -82.0;

/// A link-state transition decided by one scan for one station.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkChange {
    /// Station was unattached and found a usable AP.
    Join { to: usize },
    /// Station switches from one AP to a stronger one.
    Roam { from: usize, to: usize },
    /// Serving AP fell below the sensitivity floor with no usable fallback.
    Drop { from: usize },
}

/// Per-station link state as seen by the engine.
///
/// This is the engine's own view of which AP serves each station; the
/// analytics tracker keeps its own map with different retention semantics.
pub struct AssociationScanner {
    serving: Vec<Option<usize>>,
    hysteresis_db: f64,
    sensitivity_floor_dbm: f64,
}

impl AssociationScanner {
    pub fn new(station_count: usize) -> Self {
        Self {
            serving: vec![None; station_count],
            hysteresis_db: HYSTERESIS_DB,
            sensitivity_floor_dbm: SENSITIVITY_FLOOR_DBM,
        }
    }

    /// AP index currently serving the station, if any.
    pub fn serving(&self, station_index: usize) -> Option<usize> {
        self.serving[station_index]
    }

    /// Decide a link change for one station given the RSSI toward each AP.
    /// Pure: does not mutate link state.
    pub fn evaluate(&self, station_index: usize, rssi_per_ap: &[f64]) -> Option<LinkChange> {
        let (best, best_rssi) = strongest(rssi_per_ap)?;
        let best_usable = best_rssi >= self.sensitivity_floor_dbm;

        match self.serving[station_index] {
            None => best_usable.then_some(LinkChange::Join { to: best }),
            Some(current) => {
                let current_rssi = rssi_per_ap[current];
                if current_rssi < self.sensitivity_floor_dbm {
                    if best != current && best_usable {
                        Some(LinkChange::Roam { from: current, to: best })
                    } else {
                        Some(LinkChange::Drop { from: current })
                    }
                } else if best != current && best_rssi >= current_rssi + self.hysteresis_db {
                    Some(LinkChange::Roam { from: current, to: best })
                } else {
                    None
                }
            }
        }
    }

    /// Commit a previously evaluated change to the link state.
    pub fn apply(&mut self, station_index: usize, change: LinkChange) {
        self.serving[station_index] = match change {
            LinkChange::Join { to } | LinkChange::Roam { to, .. } => Some(to),
            LinkChange::Drop { .. } => None,
        };
    }
}

fn strongest(rssi_per_ap: &[f64]) -> Option<(usize, f64)> {
    let mut best: Option<(usize, f64)> = None;
    for (index, &rssi) in rssi_per_ap.iter().enumerate() {
        if best.is_none_or(|(_, b)| rssi > b) {
            best = Some((index, rssi));
        }
    }
    best
}

/// Start the periodic association scan at the current virtual time.
pub fn start(sim: &mut Simulation) {
    sim.schedule(0.0, tick);
}

fn tick(sim: &mut Simulation) {
    let now = sim.now();
    let ap_positions = sim.world.ap_positions();

    for station_index in 0..sim.world.stations.len() {
        let sta_pos = sim.world.stations[station_index].mobility.position_at(now);
        let rssi_per_ap: Vec<f64> = ap_positions
            .iter()
            .map(|ap_pos| {
                calculate_rssi_between(ap_pos, &sta_pos, sim.world.propagation.tx_power_dbm, &sim.world.propagation.path_loss)
            })
            .collect();

        let Some(change) = sim.scanner.evaluate(station_index, &rssi_per_ap) else {
            continue;
        };

        let station_id = sim.world.stations[station_index].id;
        let signal = |ap_index: usize, kind: AssociationKind| AssociationEvent {
            time: now,
            station_id,
            ap_addr: sim.world.aps[ap_index].addr,
            kind,
        };
        let mut signals = Vec::with_capacity(2);
        match change {
            LinkChange::Join { to } => signals.push(signal(to, AssociationKind::Associate)),
            LinkChange::Roam { from, to } => {
                signals.push(signal(from, AssociationKind::Disassociate));
                signals.push(signal(to, AssociationKind::Associate));
            }
            LinkChange::Drop { from } => signals.push(signal(from, AssociationKind::Disassociate)),
        }

        for event in &signals {
            if let Err(err) = sim.analytics.tracker.handle(event, &mut sim.analytics.writer) {
                sim.fail(err);
                return;
            }
        }
        sim.scanner.apply(station_index, change);
    }

    sim.schedule(SCAN_PERIOD_S, tick);
}
