//! Periodic RSSI sampling over every (station, AP) pair.
//!
//! Every 100 ms of virtual time the sampler reads each endpoint's current
//! position, computes the modeled RSSI with the simulation-wide propagation
//! parameters, and appends one row per pair to `rssi_measurements.csv`.
//!
//! The sampling task re-arms itself through the engine scheduler. A
//! cancellation flag is checked before each re-arm so the task never
//! outlives the logical run, independent of the engine's stop time.

use anyhow::Result;
use log::info;

use super::event_log::EventLogWriter;
use super::signal_calculations::{calculate_rssi_between, PathLossParameters};
use super::types::{Position, RssiSample};
use crate::engine::Simulation;

/// Sampling period in virtual seconds.
pub const SAMPLE_PERIOD_S: f64 = 0.1;

/// Console summaries are emitted roughly every this many simulated seconds.
/// The gate is a modulo check against the sample time, not an exact tick
/// boundary; it is a best-effort debug aid only.
const NARRATION_PERIOD_S: f64 = 5.0;

/// Configuration and run state of the periodic sampler.
pub struct RssiSampler {
    period: f64,
    cancelled: bool,
}

impl RssiSampler {
    pub fn new() -> Self {
        Self {
            period: SAMPLE_PERIOD_S,
            cancelled: false,
        }
    }

    pub fn period(&self) -> f64 {
        self.period
    }

    /// Request that the task stops at its next re-arm check.
    pub fn cancel(&mut self) {
        self.cancelled = true;
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Produce one sample per (station, AP) pair at the given instant.
    ///
    /// `stations` carries `(station_id, position)` pairs; `aps` is indexed by
    /// the AP id written to the APID column. Returns the emitted samples.
    pub fn sample_all(
        &self,
        now: f64,
        stations: &[(u32, Position)],
        aps: &[Position],
        tx_power_dbm: f64,
        params: &PathLossParameters,
        writer: &mut EventLogWriter,
    ) -> Result<Vec<RssiSample>> {
        let narrate = now % NARRATION_PERIOD_S < SAMPLE_PERIOD_S;
        let mut samples = Vec::with_capacity(stations.len() * aps.len());

        for &(station_id, sta_pos) in stations {
            for (ap_index, ap_pos) in aps.iter().enumerate() {
                let rssi_dbm = calculate_rssi_between(ap_pos, &sta_pos, tx_power_dbm, params);
                let sample = RssiSample {
                    time: now,
                    station_id,
                    ap_index,
                    pos_x: sta_pos.x,
                    pos_y: sta_pos.y,
                    rssi_dbm,
                };
                writer.write_rssi_sample(&sample)?;
                if narrate {
                    info!(
                        "T={now}s - STA{station_id} Position: ({},{}) - RSSI to AP{ap_index}: {rssi_dbm} dBm",
                        sta_pos.x, sta_pos.y
                    );
                }
                samples.push(sample);
            }
        }
        Ok(samples)
    }
}

impl Default for RssiSampler {
    fn default() -> Self {
        Self::new()
    }
}

/// Kick off the self-re-arming sampling task at the current virtual time.
pub fn start(sim: &mut Simulation) {
    sim.schedule(0.0, tick);
}

fn tick(sim: &mut Simulation) {
    if sim.analytics.sampler.is_cancelled() {
        return;
    }
    let now = sim.now();
    let stations = sim.world.station_positions(now);
    let aps = sim.world.ap_positions();

    let result = sim.analytics.sampler.sample_all(
        now,
        &stations,
        &aps,
        sim.world.propagation.tx_power_dbm,
        &sim.world.propagation.path_loss,
        &mut sim.analytics.writer,
    );
    if let Err(err) = result {
        sim.fail(err);
        return;
    }

    let period = sim.analytics.sampler.period();
    sim.schedule(period, tick);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::event_log::tests::temp_output_dir;

    #[test]
    fn emits_one_sample_per_station_ap_pair() {
        let mut writer = EventLogWriter::create(&temp_output_dir("sampler-pairs")).unwrap();
        let sampler = RssiSampler::new();
        let params = PathLossParameters::default();
        let stations = [
            (0u32, Position::new(10.0, 1.5, 0.0)),
            (1u32, Position::new(20.0, 1.6, 0.0)),
        ];
        let aps = [Position::new(0.0, 0.0, 0.0), Position::new(60.0, 0.0, 0.0)];

        let samples = sampler.sample_all(0.1, &stations, &aps, 16.0, &params, &mut writer).unwrap();
        assert_eq!(samples.len(), 4);
        assert_eq!(samples[0].station_id, 0);
        assert_eq!(samples[0].ap_index, 0);
        assert_eq!(samples[1].ap_index, 1);
        assert_eq!(samples[2].station_id, 1);
    }

    #[test]
    fn closer_ap_yields_stronger_sample() {
        let mut writer = EventLogWriter::create(&temp_output_dir("sampler-strength")).unwrap();
        let sampler = RssiSampler::new();
        let params = PathLossParameters::default();
        let stations = [(0u32, Position::new(10.0, 0.0, 0.0))];
        let aps = [Position::new(0.0, 0.0, 0.0), Position::new(60.0, 0.0, 0.0)];

        let samples = sampler.sample_all(0.0, &stations, &aps, 16.0, &params, &mut writer).unwrap();
        assert!(samples[0].rssi_dbm > samples[1].rssi_dbm);
    }

    #[test]
    fn cancellation_flag_is_sticky() {
        let mut sampler = RssiSampler::new();
        assert!(!sampler.is_cancelled());
        sampler.cancel();
        assert!(sampler.is_cancelled());
        sampler.cancel();
        assert!(sampler.is_cancelled());
    }

    #[test]
    fn cancelled_task_stops_rearming() {
        use crate::analytics::event_log::RSSI_MEASUREMENTS_FILE;
        use crate::config::RunConfig;

        let mut config = RunConfig::default();
        config.stations = 1;
        config.sim_time_s = 10.0;
        config.output_dir = temp_output_dir("sampler-cancel-rearm");

        let mut sim = Simulation::new(&config).unwrap();
        start(&mut sim);
        sim.schedule(1.0, |sim| sim.analytics.sampler.cancel());
        sim.run().unwrap();
        sim.analytics.writer.flush().unwrap();

        let contents =
            std::fs::read_to_string(config.output_dir.join(RSSI_MEASUREMENTS_FILE)).unwrap();
        let times: Vec<f64> = contents
            .lines()
            .skip(1)
            .map(|line| line.split(',').next().unwrap().parse().unwrap())
            .collect();
        // Samples up to the cancellation point, none after it.
        assert!(!times.is_empty());
        assert!(times.iter().all(|&t| t <= 1.0), "sampled past cancellation: {times:?}");
    }
}
