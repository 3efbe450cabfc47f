//! Type definitions for the telemetry subsystem.
//!
//! Contains the data structures shared across analytics components:
//! - Node positions and access point hardware addresses
//! - Association/handover events
//! - RSSI samples
//! - Per-flow traffic counters and derived reports

use std::fmt;
use std::str::FromStr;

/// Simple 3D position in meters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// 48-bit hardware address identifying an access point.
///
/// Displayed in the usual colon-separated hex form (`00:00:00:00:00:01`),
/// which is also the form written to `handover_events.csv`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MacAddress(pub [u8; 6]);

impl MacAddress {
    /// Sequentially allocated address for the n-th device (1-based octet).
    /// Only indices below 255 fit the single-octet scheme.
    pub fn from_index(index: usize) -> Self {
        debug_assert!(index < 255, "device index {index} exceeds the address range");
        Self([0, 0, 0, 0, 0, (index + 1) as u8])
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.0;
        write!(f, "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}", b[0], b[1], b[2], b[3], b[4], b[5])
    }
}

impl FromStr for MacAddress {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; 6];
        let mut parts = s.split(':');
        for byte in bytes.iter_mut() {
            let part = parts.next().ok_or_else(|| format!("too few octets in '{s}'"))?;
            *byte = u8::from_str_radix(part, 16).map_err(|_| format!("invalid octet '{part}' in '{s}'"))?;
        }
        if parts.next().is_some() {
            return Err(format!("too many octets in '{s}'"));
        }
        Ok(Self(bytes))
    }
}

/// Kind of an association signal delivered by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssociationKind {
    Associate,
    Disassociate,
}

/// Typed association signal payload.
///
/// The station id is carried as a direct field rather than recovered from a
/// formatted callback context string, so no delimiter parsing is involved.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AssociationEvent {
    pub time: f64,
    pub station_id: u32,
    pub ap_addr: MacAddress,
    pub kind: AssociationKind,
}

/// A detected AP-to-AP transition for one station.
///
/// `sequence` is the process-wide handover counter value assigned to this
/// event; it increases by exactly one per handover.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandoverEvent {
    pub time: f64,
    pub station_id: u32,
    pub from_ap: MacAddress,
    pub to_ap: MacAddress,
    pub sequence: u64,
}

/// One periodic RSSI measurement for a (station, AP) pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RssiSample {
    pub time: f64,
    pub station_id: u32,
    /// AP index as written to the APID column (not the hardware address).
    pub ap_index: usize,
    pub pos_x: f64,
    pub pos_y: f64,
    pub rssi_dbm: f64,
}

/// Raw per-flow counters as accumulated by the engine's flow classifier.
#[derive(Debug, Clone, Default)]
pub struct FlowRecord {
    pub source_addr: String,
    pub dest_addr: String,
    pub tx_packets: u64,
    pub rx_packets: u64,
    pub lost_packets: u64,
    /// Sum of per-packet one-way delays, in seconds.
    pub delay_sum: f64,
    /// Sum of absolute delay differences between consecutive receptions, in seconds.
    pub jitter_sum: f64,
    pub last_delay: f64,
    pub tx_bytes: u64,
    pub rx_bytes: u64,
    /// Virtual time of the first transmitted packet, in seconds.
    pub first_tx_time: f64,
    /// Virtual time of the last received packet, in seconds.
    pub last_rx_time: f64,
}

/// Derived per-flow report, immutable once computed.
#[derive(Debug, Clone)]
pub struct FlowReport {
    pub flow_id: u32,
    pub record: FlowRecord,
    pub duration_seconds: f64,
    pub mean_delay_seconds: f64,
    pub throughput_kbps: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mac_address_display_roundtrip() {
        let mac = MacAddress([0, 0, 0, 0, 0, 2]);
        let text = mac.to_string();
        assert_eq!(text, "00:00:00:00:00:02");
        assert_eq!(text.parse::<MacAddress>().unwrap(), mac);
    }

    #[test]
    fn mac_address_parse_accepts_uppercase() {
        let mac: MacAddress = "AA:BB:CC:00:11:22".parse().unwrap();
        assert_eq!(mac, MacAddress([0xaa, 0xbb, 0xcc, 0x00, 0x11, 0x22]));
    }

    #[test]
    fn mac_address_parse_rejects_malformed_input() {
        assert!("00:00:00".parse::<MacAddress>().is_err());
        assert!("00:00:00:00:00:01:02".parse::<MacAddress>().is_err());
        assert!("zz:00:00:00:00:01".parse::<MacAddress>().is_err());
    }

    #[test]
    fn from_index_allocates_sequential_addresses() {
        assert_eq!(MacAddress::from_index(0).to_string(), "00:00:00:00:00:01");
        assert_eq!(MacAddress::from_index(1).to_string(), "00:00:00:00:00:02");
    }

    #[test]
    #[should_panic(expected = "exceeds the address range")]
    fn from_index_rejects_indices_beyond_one_octet() {
        let _ = MacAddress::from_index(255);
    }
}
