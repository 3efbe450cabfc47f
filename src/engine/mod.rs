//! Discrete-event simulation engine.
//!
//! The engine owns virtual time: events are closures over the whole
//! simulation state, kept in a time-ordered queue and executed one at a
//! time. An event may schedule further events (relative to the current
//! virtual instant) but never blocks, so a run is a plain loop that drains
//! the queue until the stop time.
//!
//! The world model is intentionally small: two fixed APs, a row of mobile
//! stations, one shared propagation channel. Everything observable about a
//! run (handovers, RSSI rows, flow counters) is produced by the periodic
//! tasks in the submodules and collected through the analytics context.

pub mod association;
pub mod mobility;
pub mod scheduler;
pub mod traffic;

use anyhow::Result;
use log::{info, warn};

use crate::analytics::signal_calculations::PathLossParameters;
use crate::analytics::types::{MacAddress, Position};
use crate::analytics::AnalyticsContext;
use crate::config::RunConfig;
use association::AssociationScanner;
use mobility::{Mobility, Velocity};
use scheduler::EventQueue;
use traffic::FlowMonitor;

/// Number of access points in the scenario.
const AP_COUNT: usize = 2;

/// Lateral offset of the first station from the AP axis, in meters.
const STATION_ROW_OFFSET_M: f64 = 1.5;

/// Spacing between neighboring stations in the row, in meters.
const STATION_ROW_SPACING_M: f64 = 0.1;

type EventFn = Box<dyn FnOnce(&mut Simulation)>;

/// Simulation-wide radio channel parameters.
pub struct Propagation {
    pub tx_power_dbm: f64,
    pub path_loss: PathLossParameters,
}

pub struct AccessPoint {
    pub addr: MacAddress,
    pub ipv4: String,
    pub mobility: Mobility,
}

pub struct Station {
    pub id: u32,
    pub ipv4: String,
    pub mobility: Mobility,
}

/// Static topology plus the mobility state of every node.
pub struct World {
    pub aps: Vec<AccessPoint>,
    pub stations: Vec<Station>,
    pub propagation: Propagation,
    pub data_rate_kbps: f64,
}

impl World {
    /// Build the roaming scenario: APs on the x axis `ap_distance_m` apart,
    /// stations in a row next to the first AP, all walking toward the second.
    fn from_config(config: &RunConfig) -> Self {
        let aps = (0..AP_COUNT)
            .map(|index| AccessPoint {
                addr: MacAddress::from_index(index),
                ipv4: format!("10.1.1.{}", index + 1),
                mobility: Mobility::ConstantPosition(Position::new(
                    index as f64 * config.ap_distance_m,
                    0.0,
                    0.0,
                )),
            })
            .collect();

        let stations = (0..config.stations)
            .map(|id| Station {
                id,
                ipv4: format!("10.1.1.{}", AP_COUNT + 1 + id as usize),
                mobility: Mobility::ConstantVelocity {
                    reference: Position::new(
                        0.0,
                        STATION_ROW_OFFSET_M + STATION_ROW_SPACING_M * id as f64,
                        0.0,
                    ),
                    velocity: Velocity::new(config.speed_mps, 0.0, 0.0),
                    since: 0.0,
                },
            })
            .collect();

        Self {
            aps,
            stations,
            propagation: Propagation {
                tx_power_dbm: config.tx_power_dbm,
                path_loss: config.path_loss.clone(),
            },
            data_rate_kbps: config.data_rate_kbps,
        }
    }

    pub fn ap_positions(&self) -> Vec<Position> {
        self.aps.iter().map(|ap| ap.mobility.position_at(0.0)).collect()
    }

    pub fn station_positions(&self, now: f64) -> Vec<(u32, Position)> {
        self.stations
            .iter()
            .map(|station| (station.id, station.mobility.position_at(now)))
            .collect()
    }
}

/// One simulation run: virtual clock, event queue and all mutable state.
pub struct Simulation {
    queue: EventQueue<EventFn>,
    now: f64,
    stop_time: f64,
    pub world: World,
    pub scanner: AssociationScanner,
    pub flows: FlowMonitor,
    pub analytics: AnalyticsContext,
    failure: Option<anyhow::Error>,
}

impl Simulation {
    pub fn new(config: &RunConfig) -> Result<Self> {
        let world = World::from_config(config);
        let scanner = AssociationScanner::new(world.stations.len());
        Ok(Self {
            queue: EventQueue::new(),
            now: 0.0,
            stop_time: config.sim_time_s,
            world,
            scanner,
            flows: FlowMonitor::new(),
            analytics: AnalyticsContext::create(&config.output_dir)?,
            failure: None,
        })
    }

    /// Current virtual time in seconds.
    pub fn now(&self) -> f64 {
        self.now
    }

    pub fn stop_time(&self) -> f64 {
        self.stop_time
    }

    /// Schedule an event `delay` virtual seconds from now.
    pub fn schedule<F>(&mut self, delay: f64, event: F)
    where
        F: FnOnce(&mut Simulation) + 'static,
    {
        self.queue.push(self.now + delay.max(0.0), Box::new(event));
    }

    /// Record a failure; the run loop stops after the current event. Only
    /// the first failure is kept.
    pub fn fail(&mut self, err: anyhow::Error) {
        if self.failure.is_none() {
            self.failure = Some(err);
        }
    }

    /// Drain the event queue until the stop time or the first failure.
    ///
    /// On return the clock sits at the stop time, the sampler is cancelled
    /// and the per-flow loss counters are final.
    pub fn run(&mut self) -> Result<()> {
        info!("Starting simulation for {} seconds...", self.stop_time);
        while let Some((at, event)) = self.queue.pop() {
            if at > self.stop_time {
                break;
            }
            self.now = at;
            event(self);
            if let Some(err) = self.failure.take() {
                self.analytics.sampler.cancel();
                // Rows logged before the abort stay durable; the original
                // failure is what gets reported.
                if let Err(flush_err) = self.analytics.writer.flush() {
                    warn!("could not flush event logs after abort: {flush_err:#}");
                }
                return Err(err);
            }
        }
        self.now = self.stop_time;
        self.analytics.sampler.cancel();
        self.flows.finalize_losses();
        info!("Simulation finished at t={}s", self.now);
        Ok(())
    }
}

/// Reverse every station's direction of travel halfway through the run.
pub fn schedule_turnaround(sim: &mut Simulation) {
    let half = sim.stop_time / 2.0;
    sim.schedule(half, |sim| {
        let now = sim.now();
        info!("T={now}s - Reversing station direction");
        for station in &mut sim.world.stations {
            let reversed = station.mobility.velocity().reversed();
            station.mobility.set_velocity(now, reversed);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::event_log::tests::temp_output_dir;
    use anyhow::anyhow;

    fn small_config(tag: &str) -> RunConfig {
        let mut config = RunConfig::default();
        config.stations = 1;
        config.sim_time_s = 60.0;
        config.output_dir = temp_output_dir(tag);
        config
    }

    #[test]
    fn events_past_the_stop_time_never_run() {
        let mut sim = Simulation::new(&small_config("engine-stop")).unwrap();
        sim.schedule(sim.stop_time() + 1.0, |sim| {
            sim.fail(anyhow!("ran past the stop time"));
        });
        assert!(sim.run().is_ok());
        assert!((sim.now() - 60.0).abs() < 1e-12);
    }

    #[test]
    fn a_failing_event_aborts_the_run() {
        let mut sim = Simulation::new(&small_config("engine-fail")).unwrap();
        sim.schedule(1.0, |sim| sim.fail(anyhow!("sink write failed")));
        sim.schedule(2.0, |sim| sim.fail(anyhow!("should not be reached")));

        let err = sim.run().unwrap_err();
        assert!(err.to_string().contains("sink write failed"));
        assert!(sim.analytics.sampler.is_cancelled());
    }

    #[test]
    fn rows_written_before_an_abort_are_flushed() {
        use crate::analytics::event_log::{parse_handover_log, HANDOVER_EVENTS_FILE};

        let config = small_config("engine-abort-flush");
        let mut sim = Simulation::new(&config).unwrap();
        sim.schedule(0.5, |sim| {
            let now = sim.now();
            sim.analytics
                .tracker
                .on_associate(now, 0, MacAddress::from_index(0), &mut sim.analytics.writer)
                .unwrap();
        });
        sim.schedule(1.0, |sim| sim.fail(anyhow!("sink write failed")));

        assert!(sim.run().is_err());

        let contents = std::fs::read_to_string(config.output_dir.join(HANDOVER_EVENTS_FILE)).unwrap();
        let entries = parse_handover_log(&contents);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].time, 0.5);
        assert_eq!(entries[0].station_id, 0);
    }

    #[test]
    fn world_places_nodes_per_configuration() {
        let mut config = RunConfig::default();
        config.stations = 3;
        let world = World::from_config(&config);

        let aps = world.ap_positions();
        assert_eq!(aps.len(), 2);
        assert_eq!(aps[0], Position::new(0.0, 0.0, 0.0));
        assert_eq!(aps[1], Position::new(60.0, 0.0, 0.0));

        let stations = world.station_positions(0.0);
        assert_eq!(stations.len(), 3);
        assert_eq!(stations[0].1, Position::new(0.0, 1.5, 0.0));
        assert!((stations[2].1.y - 1.7).abs() < 1e-12);

        // After 10 s at 2 m/s every station moved 20 m along x.
        let moved = world.station_positions(10.0);
        assert!((moved[1].1.x - 20.0).abs() < 1e-12);
    }

    #[test]
    fn full_run_produces_handovers_and_delivered_traffic() {
        let config = small_config("engine-full-run");
        let mut sim = Simulation::new(&config).unwrap();

        crate::analytics::rssi_sampler::start(&mut sim);
        association::start(&mut sim);
        traffic::install(&mut sim);
        schedule_turnaround(&mut sim);

        sim.run().unwrap();

        // The station walks past the midpoint and back, so it must roam to
        // the far AP and back at least once each way.
        assert!(sim.analytics.tracker.handover_count() >= 2);

        let snapshot = sim.flows.snapshot();
        assert!(!snapshot.is_empty());
        let first_flow = &snapshot[&1];
        assert!(first_flow.tx_packets > 0);
        assert!(first_flow.rx_packets > 0);
        assert_eq!(
            first_flow.lost_packets,
            first_flow.tx_packets - first_flow.rx_packets
        );
    }
}
