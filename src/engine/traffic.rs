//! Packet sources and per-flow accounting.
//!
//! Each station runs two constant-rate upstream sources, one per AP, started
//! at different points of the run so the second flow begins while the station
//! is already moving. A packet is delivered only when the station is currently
//! associated with the destination AP; otherwise it counts as sent and lost.
//!
//! The flow monitor mirrors the counters the post-run reducer needs: per-flow
//! packet and byte totals, delay and jitter sums, and the first-tx / last-rx
//! timestamps the duration is derived from.

use std::collections::{BTreeMap, HashMap};

use crate::analytics::signal_calculations::distance;
use crate::analytics::types::FlowRecord;
use super::Simulation;

/// Application payload size in bytes.
pub const PACKET_BYTES: u64 = 1024;

/// Link rate used for the serialization-delay term.
const LINK_RATE_BPS: f64 = 54.0e6;

/// Fixed per-packet processing delay at the receiver.
const PROCESSING_DELAY_S: f64 = 0.0005;

const SPEED_OF_LIGHT_MPS: f64 = 3.0e8;

/// First flow (toward the first AP) starts here.
const FIRST_FLOW_START_S: f64 = 1.0;

/// Second flow starts at this fraction of the total run time.
const SECOND_FLOW_START_FRACTION: f64 = 0.4;

/// Per-flow traffic counters, keyed by a dense 1-based flow id.
///
/// Ids are handed out lazily in first-seen order of the (source, destination)
/// address pair, so the final report is stable across runs.
pub struct FlowMonitor {
    flows: BTreeMap<u32, FlowRecord>,
    index: HashMap<(String, String), u32>,
}

impl FlowMonitor {
    pub fn new() -> Self {
        Self {
            flows: BTreeMap::new(),
            index: HashMap::new(),
        }
    }

    /// Flow id for an address pair, assigning the next id on first use.
    pub fn flow_id(&mut self, source_addr: &str, dest_addr: &str) -> u32 {
        let key = (source_addr.to_string(), dest_addr.to_string());
        if let Some(&id) = self.index.get(&key) {
            return id;
        }
        let id = self.index.len() as u32 + 1;
        self.index.insert(key, id);
        self.flows.insert(
            id,
            FlowRecord {
                source_addr: source_addr.to_string(),
                dest_addr: dest_addr.to_string(),
                ..FlowRecord::default()
            },
        );
        id
    }

    pub fn record_tx(&mut self, flow_id: u32, bytes: u64, now: f64) {
        if let Some(record) = self.flows.get_mut(&flow_id) {
            if record.tx_packets == 0 {
                record.first_tx_time = now;
            }
            record.tx_packets += 1;
            record.tx_bytes += bytes;
        }
    }

    /// Account a delivered packet. `arrival` is the virtual receive time,
    /// `delay` the end-to-end latency of this packet.
    pub fn record_rx(&mut self, flow_id: u32, bytes: u64, delay: f64, arrival: f64) {
        if let Some(record) = self.flows.get_mut(&flow_id) {
            if record.rx_packets > 0 {
                record.jitter_sum += (delay - record.last_delay).abs();
            }
            record.rx_packets += 1;
            record.rx_bytes += bytes;
            record.delay_sum += delay;
            record.last_delay = delay;
            record.last_rx_time = arrival;
        }
    }

    /// Fill in the lost-packet counters from the tx/rx difference. Called
    /// once, after the last event has run.
    pub fn finalize_losses(&mut self) {
        for record in self.flows.values_mut() {
            record.lost_packets = record.tx_packets.saturating_sub(record.rx_packets);
        }
    }

    pub fn snapshot(&self) -> &BTreeMap<u32, FlowRecord> {
        &self.flows
    }
}

impl Default for FlowMonitor {
    fn default() -> Self {
        Self::new()
    }
}

/// Install the packet sources: for every station, one flow to each AP.
pub fn install(sim: &mut Simulation) {
    let interval_s = PACKET_BYTES as f64 * 8.0 / (sim.world.data_rate_kbps * 1000.0);
    let second_start = SECOND_FLOW_START_FRACTION * sim.stop_time();

    for station_index in 0..sim.world.stations.len() {
        sim.schedule(FIRST_FLOW_START_S, move |sim| {
            send_packet(sim, station_index, 0, interval_s);
        });
        for ap_index in 1..sim.world.aps.len() {
            sim.schedule(second_start, move |sim| {
                send_packet(sim, station_index, ap_index, interval_s);
            });
        }
    }
}

fn send_packet(sim: &mut Simulation, station_index: usize, ap_index: usize, interval_s: f64) {
    let now = sim.now();
    let source = sim.world.stations[station_index].ipv4.clone();
    let dest = sim.world.aps[ap_index].ipv4.clone();
    let flow_id = sim.flows.flow_id(&source, &dest);
    sim.flows.record_tx(flow_id, PACKET_BYTES, now);

    // Delivery requires a live association with the destination AP.
    if sim.scanner.serving(station_index) == Some(ap_index) {
        let sta_pos = sim.world.stations[station_index].mobility.position_at(now);
        let ap_pos = sim.world.aps[ap_index].mobility.position_at(now);
        let delay = PACKET_BYTES as f64 * 8.0 / LINK_RATE_BPS
            + PROCESSING_DELAY_S
            + distance(&sta_pos, &ap_pos) / SPEED_OF_LIGHT_MPS;
        sim.flows.record_rx(flow_id, PACKET_BYTES, delay, now + delay);
    }

    sim.schedule(interval_s, move |sim| {
        send_packet(sim, station_index, ap_index, interval_s);
    });
}
