//! Arrival, service and departure times along a route.
//!
//! Every visit's timing depends on its predecessor's departure, so a change at
//! index `i` can shift every visit behind it. [`TimingPropagator::propagate`]
//! walks a [`DirtySuffix`] and, in early-termination mode, stops at the first
//! visit past the relinked range whose arrival did not move: waiting at an
//! earlier time window absorbed the shift and nothing downstream changes.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::model::{VehicleId, Visit};
use crate::route::{DirtySuffix, RouteChains};
use crate::store::EntityStore;
use crate::traits::TravelTimeOracle;

/// Derived timing of an assigned visit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitTiming {
    pub arrival_time: i64,
    pub start_service_time: i64,
    pub departure_time: i64,
    /// Travel time from the previous standstill (visit or vehicle home).
    pub driving_seconds: i64,
}

impl VisitTiming {
    pub fn compute(visit: &Visit, previous_departure: i64, driving_seconds: i64) -> Self {
        let arrival_time = previous_departure + driving_seconds;
        let start_service_time = arrival_time.max(visit.min_start_time);
        Self {
            arrival_time,
            start_service_time,
            departure_time: start_service_time + visit.service_duration,
            driving_seconds,
        }
    }

    pub fn waiting_seconds(&self) -> i64 {
        self.start_service_time - self.arrival_time
    }

    /// Seconds by which service finishes after the visit's max end time.
    pub fn late_seconds(&self, visit: &Visit) -> i64 {
        (self.departure_time - visit.max_end_time).max(0)
    }
}

/// Aggregates of one vehicle's route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleSummary {
    pub visit_count: usize,
    pub total_demand: i64,
    /// All legs including the return to home; 0 for an empty route.
    pub total_driving_seconds: i64,
    /// Time the vehicle is back home (its departure time when idle).
    pub arrival_back_home: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropagationMode {
    /// Always recompute to the end of the route.
    Full,
    /// Stop once a visit's arrival is unchanged past the relinked range.
    #[default]
    EarlyTermination,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PropagationReport {
    pub recomputed: usize,
    pub stopped_early: bool,
}

pub struct TimingPropagator<'a, O: ?Sized> {
    store: &'a EntityStore,
    oracle: &'a O,
    mode: PropagationMode,
}

impl<'a, O> TimingPropagator<'a, O>
where
    O: TravelTimeOracle + ?Sized,
{
    pub fn new(store: &'a EntityStore, oracle: &'a O, mode: PropagationMode) -> Self {
        Self {
            store,
            oracle,
            mode,
        }
    }

    /// Recomputes timing for `suffix` of its vehicle's route.
    ///
    /// `timings` is indexed by visit id; entries before `suffix.start` must be
    /// current.
    pub fn propagate(
        &self,
        chains: &RouteChains,
        timings: &mut [Option<VisitTiming>],
        suffix: DirtySuffix,
    ) -> PropagationReport {
        let vehicle = &self.store.vehicles()[suffix.vehicle];
        let route = chains.route(suffix.vehicle);
        let mut report = PropagationReport::default();

        for index in suffix.start..route.len() {
            let visit_id = route[index];
            let visit = &self.store.visits()[visit_id];

            let (from, previous_departure) = match index.checked_sub(1).map(|i| route[i]) {
                Some(previous_id) => {
                    let previous = &self.store.visits()[previous_id];
                    let departure = timings[previous_id.get()]
                        .map(|timing| timing.departure_time);
                    debug_assert!(departure.is_some(), "visit #{previous_id} has no timing");
                    (
                        previous.location,
                        departure.unwrap_or(vehicle.departure_time),
                    )
                }
                None => (vehicle.home_location, vehicle.departure_time),
            };

            let driving = self.oracle.travel_seconds(&from, &visit.location);
            let timing = VisitTiming::compute(visit, previous_departure, driving);
            let stored = timings[visit_id.get()].replace(timing);
            report.recomputed += 1;

            if self.mode == PropagationMode::EarlyTermination
                && index >= suffix.relinked_end
                && stored.map(|stored| stored.arrival_time) == Some(timing.arrival_time)
            {
                report.stopped_early = index + 1 < route.len();
                break;
            }
        }

        trace!(
            vehicle = %suffix.vehicle,
            start = suffix.start,
            recomputed = report.recomputed,
            stopped_early = report.stopped_early,
            "timing propagated"
        );
        report
    }

    /// From-scratch pass over a whole route, ignoring stored values.
    pub fn recompute_route(
        &self,
        chains: &RouteChains,
        timings: &mut [Option<VisitTiming>],
        vehicle: VehicleId,
    ) -> PropagationReport {
        let full = TimingPropagator::new(self.store, self.oracle, PropagationMode::Full);
        let len = chains.len(vehicle);
        full.propagate(
            chains,
            timings,
            DirtySuffix {
                vehicle,
                start: 0,
                relinked_end: len,
            },
        )
    }

    /// Derives the vehicle aggregates from stored timings.
    ///
    /// Only the return leg needs an oracle call.
    pub fn summarize(
        &self,
        chains: &RouteChains,
        timings: &[Option<VisitTiming>],
        vehicle_id: VehicleId,
    ) -> VehicleSummary {
        let vehicle = &self.store.vehicles()[vehicle_id];
        let route = chains.route(vehicle_id);

        let mut summary = VehicleSummary {
            visit_count: route.len(),
            arrival_back_home: vehicle.departure_time,
            ..VehicleSummary::default()
        };

        for &visit_id in route {
            summary.total_demand += self.store.visits()[visit_id].demand;
            if let Some(timing) = timings[visit_id.get()] {
                summary.total_driving_seconds += timing.driving_seconds;
            }
        }

        if let Some(&last_id) = route.last() {
            let last = &self.store.visits()[last_id];
            let back = self
                .oracle
                .travel_seconds(&last.location, &vehicle.home_location);
            let departure = timings[last_id.get()]
                .map_or(vehicle.departure_time, |timing| timing.departure_time);
            summary.total_driving_seconds += back;
            summary.arrival_back_home = departure + back;
        }

        summary
    }
}

/// Timing of every visit computed from scratch, indexed by visit id.
pub fn recompute_all<O>(
    store: &EntityStore,
    oracle: &O,
    chains: &RouteChains,
) -> Vec<Option<VisitTiming>>
where
    O: TravelTimeOracle + ?Sized,
{
    let propagator = TimingPropagator::new(store, oracle, PropagationMode::Full);
    let mut timings = vec![None; store.num_visits()];
    for vehicle in store.vehicle_ids() {
        propagator.recompute_route(chains, &mut timings, vehicle);
    }
    timings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Location, Vehicle, VisitId};

    /// One latitude unit is one minute of driving.
    struct LatitudeMinutes;

    impl TravelTimeOracle for LatitudeMinutes {
        fn travel_seconds(&self, from: &Location, to: &Location) -> i64 {
            ((to.latitude - from.latitude).abs() * 60.0).round() as i64
        }
    }

    const TRUCK: VehicleId = VehicleId::new(0);

    fn store() -> EntityStore {
        EntityStore::builder()
            // 10 minutes out, must wait until 09:00
            .visit(
                Visit::new("a", "A", Location::new(10.0, 0.0))
                    .with_time_window(9 * 3600, 10 * 3600)
                    .with_service_duration(600),
            )
            .visit(
                Visit::new("b", "B", Location::new(20.0, 0.0))
                    .with_time_window(0, 11 * 3600)
                    .with_service_duration(600),
            )
            .visit(
                Visit::new("c", "C", Location::new(15.0, 0.0))
                    .with_time_window(0, 11 * 3600)
                    .with_service_duration(300),
            )
            .vehicle(Vehicle::new("truck", Location::new(0.0, 0.0)))
            .build()
            .unwrap()
    }

    fn v(i: usize) -> VisitId {
        VisitId::new(i)
    }

    #[test]
    fn test_compute_waits_for_window() {
        let store = store();
        let timing = VisitTiming::compute(&store.visits()[0], 8 * 3600, 600);
        assert_eq!(timing.arrival_time, 8 * 3600 + 600);
        assert_eq!(timing.start_service_time, 9 * 3600);
        assert_eq!(timing.departure_time, 9 * 3600 + 600);
        assert_eq!(timing.waiting_seconds(), 3000);
    }

    #[test]
    fn test_propagate_chain() {
        let store = store();
        let mut chains = RouteChains::new(1, 3);
        let mut timings = vec![None; 3];
        let propagator = TimingPropagator::new(&store, &LatitudeMinutes, PropagationMode::Full);

        chains.insert(TRUCK, v(0), 0);
        let dirty = chains.insert(TRUCK, v(1), 1);
        propagator.propagate(&chains, &mut timings, DirtySuffix { start: 0, ..dirty });

        let b = timings[1].unwrap();
        assert_eq!(b.arrival_time, 9 * 3600 + 600 + 600);
        assert_eq!(b.driving_seconds, 600);

        let summary = propagator.summarize(&chains, &timings, TRUCK);
        assert_eq!(summary.total_driving_seconds, 600 + 600 + 1200);
        assert_eq!(summary.arrival_back_home, b.departure_time + 1200);
        assert_eq!(summary.total_demand, 2);
    }

    /// X, then W waiting for its 09:00 window, then B and D behind it.
    fn waiting_store() -> EntityStore {
        let open = |id: &str, lat: f64| {
            Visit::new(id, id, Location::new(lat, 0.0))
                .with_time_window(0, 11 * 3600)
                .with_service_duration(600)
        };
        EntityStore::builder()
            .visit(open("x", 5.0).with_service_duration(60))
            .visit(
                Visit::new("w", "W", Location::new(10.0, 0.0))
                    .with_time_window(9 * 3600, 10 * 3600)
                    .with_service_duration(600),
            )
            .visit(open("b", 20.0))
            .visit(open("d", 25.0))
            .vehicle(Vehicle::new("truck", Location::new(0.0, 0.0)))
            .build()
            .unwrap()
    }

    #[test]
    fn test_early_termination_when_wait_absorbs_shift() {
        let store = waiting_store();
        let (x, w, b, d) = (v(0), v(1), v(2), v(3));
        let mut chains = RouteChains::new(1, 4);
        let mut timings = vec![None; 4];
        let early = TimingPropagator::new(&store, &LatitudeMinutes, PropagationMode::EarlyTermination);

        for (position, visit) in [w, b, d].into_iter().enumerate() {
            chains.insert(TRUCK, visit, position);
        }
        early.recompute_route(&chains, &mut timings, TRUCK);
        let before_b = timings[b.get()].unwrap();
        let before_d = timings[d.get()].unwrap();
        assert_eq!(timings[w.get()].unwrap().arrival_time, 8 * 3600 + 600);

        // X delays W's arrival to 08:11, but W still starts at 09:00
        let dirty = chains.insert(TRUCK, x, 0);
        assert_eq!(dirty.relinked_end, 2);
        let report = early.propagate(&chains, &mut timings, dirty);

        let waited = timings[w.get()].unwrap();
        assert_eq!(waited.arrival_time, 8 * 3600 + 660);
        assert_eq!(waited.start_service_time, 9 * 3600);
        assert!(report.stopped_early);
        assert_eq!(report.recomputed, 3);
        assert!(report.recomputed < chains.len(TRUCK));
        assert_eq!(timings[b.get()], Some(before_b));
        assert_eq!(timings[d.get()], Some(before_d));

        let full = recompute_all(&store, &LatitudeMinutes, &chains);
        assert_eq!(full, timings);

        // the same insert in full mode walks the whole route
        let mut full_timings = vec![None; 4];
        let full_mode = TimingPropagator::new(&store, &LatitudeMinutes, PropagationMode::Full);
        full_mode.recompute_route(&chains, &mut full_timings, TRUCK);
        let report = full_mode.propagate(&chains, &mut full_timings, dirty);
        assert!(!report.stopped_early);
        assert_eq!(report.recomputed, 4);
        assert_eq!(full_timings, timings);
    }

    #[test]
    fn test_empty_route_summary() {
        let store = store();
        let chains = RouteChains::new(1, 3);
        let propagator = TimingPropagator::new(&store, &LatitudeMinutes, PropagationMode::Full);
        let summary = propagator.summarize(&chains, &[None, None, None], TRUCK);
        assert_eq!(summary.total_driving_seconds, 0);
        assert_eq!(summary.arrival_back_home, 8 * 3600);
        assert_eq!(summary.visit_count, 0);
    }

    #[test]
    fn test_late_service_is_recorded() {
        let store = store();
        let timing = VisitTiming::compute(&store.visits()[0], 10 * 3600, 0);
        assert_eq!(timing.late_seconds(&store.visits()[0]), 600);
    }
}
