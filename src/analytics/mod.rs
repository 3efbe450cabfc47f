//! Roaming telemetry subsystem.
//!
//! This module contains the analytic core of the simulator:
//! - `signal_calculations`: deterministic log-distance path loss / RSSI model
//! - `association_tracker`: handover state machine over association signals
//! - `rssi_sampler`: periodic per-(station, AP) signal strength sampling
//! - `flow_stats`: post-run reducer over per-flow traffic counters
//! - `event_log`: append-only CSV sinks shared by the components
//! - `types`: data model (events, samples, flow records and reports)
//!
//! All mutable run state (log handles, handover counter, per-station AP map)
//! lives in an explicit [`AnalyticsContext`] constructed at run start and
//! carried by the engine, so there are no process-wide globals and teardown
//! is deterministic.

pub mod association_tracker;
pub mod event_log;
pub mod flow_stats;
pub mod rssi_sampler;
pub mod signal_calculations;
pub mod types;

use anyhow::Result;
use std::path::Path;

use association_tracker::AssociationTracker;
use event_log::EventLogWriter;
use rssi_sampler::RssiSampler;

/// All analytics state for one simulation run.
pub struct AnalyticsContext {
    pub writer: EventLogWriter,
    pub tracker: AssociationTracker,
    pub sampler: RssiSampler,
}

impl AnalyticsContext {
    /// Open the CSV sinks and initialize empty tracking state.
    ///
    /// Sink creation failure is fatal; the error propagates out of `main`.
    pub fn create(output_dir: &Path) -> Result<Self> {
        Ok(Self {
            writer: EventLogWriter::create(output_dir)?,
            tracker: AssociationTracker::new(),
            sampler: RssiSampler::new(),
        })
    }
}
