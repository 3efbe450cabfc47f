//! Handover detection over the engine's association signal stream.
//!
//! The tracker consumes Associate/Disassociate signals in virtual-time order
//! and maintains the last AP each station associated with. An Associate that
//! names a different AP than the station's recorded one is a handover; the
//! process-wide handover counter is bumped and a HANDOVER row is written
//! before the regular ASSOC row.
//!
//! Disassociate deliberately does not clear the recorded AP: a later
//! Associate is classified against the last *associated* AP even if the
//! station was disassociated in between.

use anyhow::Result;
use log::info;
use std::collections::HashMap;

use super::event_log::EventLogWriter;
use super::types::{AssociationEvent, AssociationKind, HandoverEvent, MacAddress};

/// Classification of an Associate signal against the station's current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssociationOutcome {
    /// Station had no recorded AP yet.
    FirstAssociation,
    /// Station re-associated with its recorded AP.
    Reassociation,
    /// Station moved to a different AP.
    Handover,
}

/// Per-run association state and handover counter.
pub struct AssociationTracker {
    /// Last AP each known station associated with. Never cleared during the run.
    current_ap: HashMap<u32, MacAddress>,
    handover_count: u64,
    handovers: Vec<HandoverEvent>,
}

impl AssociationTracker {
    pub fn new() -> Self {
        Self {
            current_ap: HashMap::new(),
            handover_count: 0,
            handovers: Vec::new(),
        }
    }

    /// Classify an Associate signal without mutating any state.
    pub fn classify(&self, station_id: u32, ap_addr: MacAddress) -> AssociationOutcome {
        match self.current_ap.get(&station_id) {
            None => AssociationOutcome::FirstAssociation,
            Some(current) if *current == ap_addr => AssociationOutcome::Reassociation,
            Some(_) => AssociationOutcome::Handover,
        }
    }

    /// Handle an Associate signal: log it, detect handovers, update state.
    ///
    /// Signals must arrive in non-decreasing time order per station; the
    /// engine guarantees this and it is not re-verified here.
    pub fn on_associate(&mut self, time: f64, station_id: u32, ap_addr: MacAddress, writer: &mut EventLogWriter) -> Result<AssociationOutcome> {
        let outcome = self.classify(station_id, ap_addr);
        info!("ASSOCIATION at t={time}s: STA{station_id} associated with AP {ap_addr}");

        if outcome == AssociationOutcome::Handover {
            let from_ap = self.current_ap[&station_id];
            self.handover_count += 1;
            info!(
                "  --> HANDOVER #{}: STA{} from {} to {}",
                self.handover_count, station_id, from_ap, ap_addr
            );
            writer.write_handover(time, station_id, from_ap, ap_addr)?;
            self.handovers.push(HandoverEvent {
                time,
                station_id,
                from_ap,
                to_ap: ap_addr,
                sequence: self.handover_count,
            });
        }

        // Recorded AP is updated unconditionally, whatever the classification.
        self.current_ap.insert(station_id, ap_addr);
        writer.write_assoc(time, station_id, ap_addr)?;
        Ok(outcome)
    }

    /// Dispatch a typed association signal to the matching handler.
    pub fn handle(&mut self, event: &AssociationEvent, writer: &mut EventLogWriter) -> Result<()> {
        match event.kind {
            AssociationKind::Associate => self
                .on_associate(event.time, event.station_id, event.ap_addr, writer)
                .map(|_| ()),
            AssociationKind::Disassociate => {
                self.on_disassociate(event.time, event.station_id, event.ap_addr, writer)
            }
        }
    }

    /// Handle a Disassociate signal. The recorded AP is retained.
    pub fn on_disassociate(&mut self, time: f64, station_id: u32, ap_addr: MacAddress, writer: &mut EventLogWriter) -> Result<()> {
        info!("DISASSOCIATION at t={time}s: STA{station_id} disassociated from AP {ap_addr}");
        writer.write_deassoc(time, station_id, ap_addr)
    }

    /// Total handovers detected so far.
    pub fn handover_count(&self) -> u64 {
        self.handover_count
    }

    /// Last AP a station associated with, if any.
    pub fn current_ap(&self, station_id: u32) -> Option<MacAddress> {
        self.current_ap.get(&station_id).copied()
    }

    /// All handover events in detection order.
    pub fn handovers(&self) -> &[HandoverEvent] {
        &self.handovers
    }
}

impl Default for AssociationTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::event_log::tests::temp_output_dir;

    fn writer(tag: &str) -> EventLogWriter {
        EventLogWriter::create(&temp_output_dir(tag)).unwrap()
    }

    #[test]
    fn first_association_never_counts_as_handover() {
        let mut tracker = AssociationTracker::new();
        let mut w = writer("tracker-first");
        let ap = MacAddress::from_index(0);
        let outcome = tracker.on_associate(1.0, 0, ap, &mut w).unwrap();
        assert_eq!(outcome, AssociationOutcome::FirstAssociation);
        assert_eq!(tracker.handover_count(), 0);
        assert_eq!(tracker.current_ap(0), Some(ap));
    }

    #[test]
    fn ap_change_increments_counter_by_exactly_one() {
        let mut tracker = AssociationTracker::new();
        let mut w = writer("tracker-change");
        let ap1 = MacAddress::from_index(0);
        let ap2 = MacAddress::from_index(1);

        tracker.on_associate(1.0, 0, ap1, &mut w).unwrap();
        let outcome = tracker.on_associate(5.0, 0, ap2, &mut w).unwrap();
        assert_eq!(outcome, AssociationOutcome::Handover);
        assert_eq!(tracker.handover_count(), 1);

        let events = tracker.handovers();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].from_ap, ap1);
        assert_eq!(events[0].to_ap, ap2);
        assert_eq!(events[0].sequence, 1);
    }

    #[test]
    fn reassociation_with_same_ap_does_not_count() {
        let mut tracker = AssociationTracker::new();
        let mut w = writer("tracker-reassoc");
        let ap1 = MacAddress::from_index(0);
        let ap2 = MacAddress::from_index(1);

        tracker.on_associate(1.0, 0, ap1, &mut w).unwrap();
        tracker.on_associate(5.0, 0, ap2, &mut w).unwrap();
        let outcome = tracker.on_associate(8.0, 0, ap2, &mut w).unwrap();
        assert_eq!(outcome, AssociationOutcome::Reassociation);
        assert_eq!(tracker.handover_count(), 1);
    }

    #[test]
    fn disassociate_retains_recorded_ap() {
        let mut tracker = AssociationTracker::new();
        let mut w = writer("tracker-deassoc");
        let ap1 = MacAddress::from_index(0);
        let ap2 = MacAddress::from_index(1);

        tracker.on_associate(1.0, 0, ap1, &mut w).unwrap();
        tracker.on_disassociate(3.0, 0, ap1, &mut w).unwrap();
        assert_eq!(tracker.current_ap(0), Some(ap1));

        // Re-associating with a different AP after a disassociation still
        // classifies against the last associated AP.
        let outcome = tracker.on_associate(4.0, 0, ap2, &mut w).unwrap();
        assert_eq!(outcome, AssociationOutcome::Handover);
        assert_eq!(tracker.handover_count(), 1);
    }

    #[test]
    fn typed_signals_dispatch_to_the_matching_handler() {
        let mut tracker = AssociationTracker::new();
        let mut w = writer("tracker-dispatch");
        let ap1 = MacAddress::from_index(0);
        let ap2 = MacAddress::from_index(1);

        let assoc = AssociationEvent {
            time: 1.0,
            station_id: 0,
            ap_addr: ap1,
            kind: AssociationKind::Associate,
        };
        tracker.handle(&assoc, &mut w).unwrap();
        assert_eq!(tracker.current_ap(0), Some(ap1));

        let deassoc = AssociationEvent {
            kind: AssociationKind::Disassociate,
            time: 3.0,
            ..assoc
        };
        tracker.handle(&deassoc, &mut w).unwrap();
        assert_eq!(tracker.current_ap(0), Some(ap1));

        let roam = AssociationEvent {
            time: 4.0,
            ap_addr: ap2,
            ..assoc
        };
        tracker.handle(&roam, &mut w).unwrap();
        assert_eq!(tracker.handover_count(), 1);
    }

    #[test]
    fn stations_are_tracked_independently() {
        let mut tracker = AssociationTracker::new();
        let mut w = writer("tracker-multi");
        let ap1 = MacAddress::from_index(0);
        let ap2 = MacAddress::from_index(1);

        tracker.on_associate(1.0, 0, ap1, &mut w).unwrap();
        tracker.on_associate(1.0, 1, ap2, &mut w).unwrap();
        assert_eq!(tracker.handover_count(), 0);

        tracker.on_associate(5.0, 0, ap2, &mut w).unwrap();
        tracker.on_associate(5.0, 1, ap1, &mut w).unwrap();
        assert_eq!(tracker.handover_count(), 2);
        assert_eq!(tracker.current_ap(0), Some(ap2));
        assert_eq!(tracker.current_ap(1), Some(ap1));
    }
}
