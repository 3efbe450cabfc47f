//! Append-only CSV sinks shared by the analytics components.
//!
//! Three files are produced per run:
//! - `handover_events.csv`: ASSOC/DEASSOC/HANDOVER rows from the tracker
//! - `rssi_measurements.csv`: periodic samples from the RSSI sampler
//! - `flow_stats.csv`: one derived row per flow, written after the run
//!
//! All sinks are single-writer and opened up front; failure to create any of
//! them aborts the run since the CSV output is the run's only durable result.
//!
//! The module also parses `handover_events.csv` lines back into structured
//! entries, so a written event log can be re-read for downstream analysis.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use super::types::{FlowReport, MacAddress, RssiSample};

pub const HANDOVER_EVENTS_FILE: &str = "handover_events.csv";
pub const RSSI_MEASUREMENTS_FILE: &str = "rssi_measurements.csv";
pub const FLOW_STATS_FILE: &str = "flow_stats.csv";

const HANDOVER_HEADER: &str = "Time,EventType,StationID,AccessPoint1,AccessPoint2";
const RSSI_HEADER: &str = "Time,StationID,APID,PosX,PosY,RSSI";
const FLOW_HEADER: &str = "FlowID,Source,Destination,TxPackets,RxPackets,LostPackets,DelaySum,JitterSum,LastDelay,TxBytes,RxBytes,Duration,Throughput(Kbps)";

/// Event type column of a handover log row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogEventType {
    Assoc,
    Deassoc,
    Handover,
}

impl LogEventType {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "ASSOC" => Some(LogEventType::Assoc),
            "DEASSOC" => Some(LogEventType::Deassoc),
            "HANDOVER" => Some(LogEventType::Handover),
            _ => None,
        }
    }
}

/// One parsed row of `handover_events.csv`.
///
/// ASSOC and DEASSOC rows carry a single address; HANDOVER rows carry the
/// previous AP in `ap1` and the new AP in `ap2`. Both shapes share the
/// five-column header.
#[derive(Debug, Clone, PartialEq)]
pub struct HandoverLogEntry {
    pub time: f64,
    pub event_type: LogEventType,
    pub station_id: u32,
    pub ap1: MacAddress,
    pub ap2: Option<MacAddress>,
}

/// Structured CSV sinks for one simulation run.
pub struct EventLogWriter {
    handover: BufWriter<File>,
    rssi: BufWriter<File>,
    flow: BufWriter<File>,
}

impl EventLogWriter {
    /// Create the three output files in `output_dir` and write header rows.
    ///
    /// Fatal on failure: there is no degraded mode without the sinks.
    pub fn create(output_dir: &Path) -> Result<Self> {
        let mut writer = Self {
            handover: open_sink(output_dir, HANDOVER_EVENTS_FILE)?,
            rssi: open_sink(output_dir, RSSI_MEASUREMENTS_FILE)?,
            flow: open_sink(output_dir, FLOW_STATS_FILE)?,
        };
        writeln!(writer.handover, "{HANDOVER_HEADER}").context("writing handover header")?;
        writeln!(writer.rssi, "{RSSI_HEADER}").context("writing rssi header")?;
        writeln!(writer.flow, "{FLOW_HEADER}").context("writing flow header")?;
        Ok(writer)
    }

    pub fn write_assoc(&mut self, time: f64, station_id: u32, ap: MacAddress) -> Result<()> {
        writeln!(self.handover, "{time},ASSOC,{station_id},{ap}").context("writing ASSOC row")
    }

    pub fn write_deassoc(&mut self, time: f64, station_id: u32, ap: MacAddress) -> Result<()> {
        writeln!(self.handover, "{time},DEASSOC,{station_id},{ap}").context("writing DEASSOC row")
    }

    pub fn write_handover(&mut self, time: f64, station_id: u32, from_ap: MacAddress, to_ap: MacAddress) -> Result<()> {
        writeln!(self.handover, "{time},HANDOVER,{station_id},{from_ap},{to_ap}").context("writing HANDOVER row")
    }

    pub fn write_rssi_sample(&mut self, sample: &RssiSample) -> Result<()> {
        writeln!(
            self.rssi,
            "{},{},{},{},{},{}",
            sample.time, sample.station_id, sample.ap_index, sample.pos_x, sample.pos_y, sample.rssi_dbm
        )
        .context("writing RSSI row")
    }

    pub fn write_flow_report(&mut self, report: &FlowReport) -> Result<()> {
        let r = &report.record;
        writeln!(
            self.flow,
            "{},{},{},{},{},{},{},{},{},{},{},{},{}",
            report.flow_id,
            r.source_addr,
            r.dest_addr,
            r.tx_packets,
            r.rx_packets,
            r.lost_packets,
            r.delay_sum,
            r.jitter_sum,
            r.last_delay,
            r.tx_bytes,
            r.rx_bytes,
            report.duration_seconds,
            report.throughput_kbps
        )
        .context("writing flow row")
    }

    /// Flush all sinks. Called once at the end of the run.
    pub fn flush(&mut self) -> Result<()> {
        self.handover.flush().context("flushing handover sink")?;
        self.rssi.flush().context("flushing rssi sink")?;
        self.flow.flush().context("flushing flow sink")?;
        Ok(())
    }
}

fn open_sink(dir: &Path, name: &str) -> Result<BufWriter<File>> {
    let path = dir.join(name);
    let file = File::create(&path).with_context(|| format!("Failed to create output file: {}", path.display()))?;
    Ok(BufWriter::new(file))
}

/// Parse a single `handover_events.csv` data line.
///
/// Returns `None` for the header row and for lines that do not match any of
/// the known row shapes. ASSOC/DEASSOC rows have four fields; HANDOVER rows
/// have five.
pub fn parse_handover_line(line: &str) -> Option<HandoverLogEntry> {
    let mut fields = line.trim_end().split(',');
    let time: f64 = fields.next()?.parse().ok()?;
    let event_type = LogEventType::parse(fields.next()?)?;
    let station_id: u32 = fields.next()?.parse().ok()?;
    let ap1: MacAddress = fields.next()?.parse().ok()?;
    let ap2 = match event_type {
        LogEventType::Handover => Some(fields.next()?.parse().ok()?),
        _ => None,
    };
    if fields.next().is_some() {
        return None;
    }
    Some(HandoverLogEntry {
        time,
        event_type,
        station_id,
        ap1,
        ap2,
    })
}

/// Parse the full contents of a handover event log, skipping the header.
pub fn parse_handover_log(contents: &str) -> Vec<HandoverLogEntry> {
    contents.lines().filter_map(parse_handover_line).collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::path::PathBuf;

    pub(crate) fn temp_output_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("wifi-roaming-test-{}-{}", std::process::id(), tag));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn parse_assoc_row() {
        let entry = parse_handover_line("1.5,ASSOC,0,00:00:00:00:00:01").unwrap();
        assert_eq!(entry.time, 1.5);
        assert_eq!(entry.event_type, LogEventType::Assoc);
        assert_eq!(entry.station_id, 0);
        assert_eq!(entry.ap1.to_string(), "00:00:00:00:00:01");
        assert_eq!(entry.ap2, None);
    }

    #[test]
    fn parse_handover_row_carries_both_addresses() {
        let entry = parse_handover_line("5,HANDOVER,2,00:00:00:00:00:01,00:00:00:00:00:02").unwrap();
        assert_eq!(entry.event_type, LogEventType::Handover);
        assert_eq!(entry.ap1.to_string(), "00:00:00:00:00:01");
        assert_eq!(entry.ap2.unwrap().to_string(), "00:00:00:00:00:02");
    }

    #[test]
    fn parse_rejects_header_and_garbage() {
        assert!(parse_handover_line("Time,EventType,StationID,AccessPoint1,AccessPoint2").is_none());
        assert!(parse_handover_line("not a csv line").is_none());
        assert!(parse_handover_line("1.0,UNKNOWN,0,00:00:00:00:00:01").is_none());
        // ASSOC with a trailing fifth field is not a known shape
        assert!(parse_handover_line("1.0,ASSOC,0,00:00:00:00:00:01,00:00:00:00:00:02").is_none());
    }

    #[test]
    fn written_events_roundtrip_through_the_parser() {
        let dir = temp_output_dir("event-log-roundtrip");
        let ap1 = MacAddress::from_index(0);
        let ap2 = MacAddress::from_index(1);
        {
            let mut writer = EventLogWriter::create(&dir).unwrap();
            writer.write_assoc(1.0, 0, ap1).unwrap();
            writer.write_handover(5.0, 0, ap1, ap2).unwrap();
            writer.write_assoc(5.0, 0, ap2).unwrap();
            writer.write_deassoc(9.0, 0, ap2).unwrap();
            writer.flush().unwrap();
        }
        let contents = std::fs::read_to_string(dir.join(HANDOVER_EVENTS_FILE)).unwrap();
        let entries = parse_handover_log(&contents);
        assert_eq!(entries.len(), 4);
        assert_eq!(entries[0].event_type, LogEventType::Assoc);
        assert_eq!(entries[1].event_type, LogEventType::Handover);
        assert_eq!(entries[1].ap1, ap1);
        assert_eq!(entries[1].ap2, Some(ap2));
        assert_eq!(entries[2].event_type, LogEventType::Assoc);
        assert_eq!(entries[2].ap1, ap2);
        assert_eq!(entries[3].event_type, LogEventType::Deassoc);
        assert_eq!(entries[3].time, 9.0);
    }

    #[test]
    fn header_rows_are_written_to_all_sinks() {
        let dir = temp_output_dir("event-log-headers");
        let mut writer = EventLogWriter::create(&dir).unwrap();
        writer.flush().unwrap();
        let handover = std::fs::read_to_string(dir.join(HANDOVER_EVENTS_FILE)).unwrap();
        let rssi = std::fs::read_to_string(dir.join(RSSI_MEASUREMENTS_FILE)).unwrap();
        let flow = std::fs::read_to_string(dir.join(FLOW_STATS_FILE)).unwrap();
        assert!(handover.starts_with(HANDOVER_HEADER));
        assert!(rssi.starts_with(RSSI_HEADER));
        assert!(flow.starts_with("FlowID,Source,Destination"));
    }
}
