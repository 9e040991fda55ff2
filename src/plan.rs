//! The mutable routing plan.
//!
//! [`Plan`] is the single entry point for a search driver. Every mutation
//! validates its arguments first, then splices the route chains, propagates
//! timing over the dirty suffixes and replaces the touched vehicles' score
//! contributions, so the returned score is always current. Mutable state is
//! plain indexed data, which makes [`Plan::snapshot`] a straight copy.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::constraints::{ConstraintScorer, ScoreExplanation, ScoreState, ScoreWeights};
use crate::error::{EntityRef, PlanError};
use crate::model::{VehicleId, VisitId};
use crate::route::{DirtySuffix, RouteChains, VisitLink};
use crate::score::Score;
use crate::store::EntityStore;
use crate::timing::{
    recompute_all, PropagationMode, TimingPropagator, VehicleSummary, VisitTiming,
};
use crate::traits::TravelTimeOracle;
use crate::wire::PlanView;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanOptions {
    pub weights: ScoreWeights,
    pub propagation: PropagationMode,
}

/// Everything a mutation can change.
#[derive(Debug, Clone, PartialEq, Eq)]
struct PlanState {
    chains: RouteChains,
    timings: Vec<Option<VisitTiming>>,
    summaries: Vec<VehicleSummary>,
    score: ScoreState,
}

impl PlanState {
    fn refresh<O>(
        &mut self,
        store: &EntityStore,
        oracle: &O,
        scorer: &ConstraintScorer,
        mode: PropagationMode,
        suffix: DirtySuffix,
    ) where
        O: TravelTimeOracle + ?Sized,
    {
        let propagator = TimingPropagator::new(store, oracle, mode);
        propagator.propagate(&self.chains, &mut self.timings, suffix);

        let vehicle = suffix.vehicle;
        let summary = propagator.summarize(&self.chains, &self.timings, vehicle);
        self.summaries[vehicle.get()] = summary;

        let contribution =
            scorer.vehicle_contribution(store, &self.chains, &self.timings, vehicle, &summary);
        self.score.replace_vehicle(vehicle, contribution);
    }
}

/// Copy of a plan's mutable state, restorable with [`Plan::restore`].
///
/// Only plans sharing the same store, oracle and options accept it, which
/// covers clones of the plan it was taken from.
#[derive(Debug, Clone)]
pub struct PlanSnapshot {
    store: Arc<EntityStore>,
    /// Address of the oracle the timings were computed with.
    oracle: usize,
    options: PlanOptions,
    state: PlanState,
}

impl PlanSnapshot {
    pub fn score(&self) -> Score {
        self.state.score.total()
    }
}

impl PartialEq for PlanSnapshot {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.store, &other.store) && self.state == other.state
    }
}

impl Eq for PlanSnapshot {}

pub struct Plan<O: ?Sized> {
    name: String,
    store: Arc<EntityStore>,
    oracle: Arc<O>,
    options: PlanOptions,
    scorer: ConstraintScorer,
    state: PlanState,
}

impl<O: ?Sized> Clone for Plan<O> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            store: Arc::clone(&self.store),
            oracle: Arc::clone(&self.oracle),
            options: self.options,
            scorer: self.scorer,
            state: self.state.clone(),
        }
    }
}

impl<O: ?Sized> fmt::Debug for Plan<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Plan")
            .field("name", &self.name)
            .field("visits", &self.store.num_visits())
            .field("vehicles", &self.store.num_vehicles())
            .field("options", &self.options)
            .field("score", &self.state.score.total())
            .finish_non_exhaustive()
    }
}

impl<O> Plan<O>
where
    O: TravelTimeOracle + ?Sized,
{
    /// Creates a plan with every visit unassigned.
    pub fn new(store: Arc<EntityStore>, oracle: Arc<O>, options: PlanOptions) -> Self {
        let scorer = ConstraintScorer::new(options.weights);
        let chains = RouteChains::new(store.num_vehicles(), store.num_visits());
        let timings = vec![None; store.num_visits()];

        let propagator = TimingPropagator::new(&store, &*oracle, options.propagation);
        let summaries: Vec<VehicleSummary> = store
            .vehicle_ids()
            .map(|vehicle| propagator.summarize(&chains, &timings, vehicle))
            .collect();
        let score = ScoreState::evaluate(&scorer, &store, &chains, &timings, &summaries);

        Self {
            name: String::new(),
            store,
            oracle,
            options,
            scorer,
            state: PlanState {
                chains,
                timings,
                summaries,
                score,
            },
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Puts `visit` at `position` of `vehicle`'s route.
    ///
    /// An assigned visit is moved. For a move inside the same route,
    /// `position` is the index the visit ends up at, so the valid range is one
    /// shorter than for a fresh insert.
    pub fn assign(
        &mut self,
        visit: VisitId,
        vehicle: VehicleId,
        position: usize,
    ) -> Result<Score, PlanError> {
        self.check_visit(visit)?;
        self.check_vehicle(vehicle)?;

        let current = self.state.chains.vehicle_of(visit);
        let len = self.state.chains.len(vehicle);
        let max = if current == Some(vehicle) { len - 1 } else { len };
        if position > max {
            return Err(PlanError::InvalidPosition {
                vehicle,
                position,
                max,
            });
        }

        match current {
            None => {
                let dirty = self.state.chains.insert(vehicle, visit, position);
                self.refresh(dirty);
                self.set_unassigned(self.state.score.unassigned_count() - 1);
            }
            Some(from) if from == vehicle => {
                let dirty = self.state.chains.move_within_vehicle(vehicle, visit, position);
                self.refresh(dirty);
            }
            Some(from) => {
                let [removed, inserted] =
                    self.state
                        .chains
                        .move_between_vehicles(from, vehicle, visit, position);
                self.state.timings[visit.get()] = None;
                self.refresh(removed);
                self.refresh(inserted);
            }
        }

        let score = self.state.score.total();
        trace!(%visit, %vehicle, position, from = ?current, %score, "assigned");
        Ok(score)
    }

    /// Takes `visit` off its route. Does nothing if it is already unassigned.
    pub fn unassign(&mut self, visit: VisitId) -> Result<Score, PlanError> {
        self.check_visit(visit)?;

        if let Some(vehicle) = self.state.chains.vehicle_of(visit) {
            let dirty = self.state.chains.remove(vehicle, visit);
            self.state.timings[visit.get()] = None;
            self.refresh(dirty);
            self.set_unassigned(self.state.score.unassigned_count() + 1);
            trace!(%visit, %vehicle, score = %self.state.score.total(), "unassigned");
        }

        Ok(self.state.score.total())
    }

    pub fn snapshot(&self) -> PlanSnapshot {
        PlanSnapshot {
            store: Arc::clone(&self.store),
            oracle: self.oracle_address(),
            options: self.options,
            state: self.state.clone(),
        }
    }

    /// Returns the plan to the state captured by `snapshot`.
    ///
    /// Timings and scores in the snapshot depend on the oracle and weights,
    /// so a snapshot from a plan with a different store, oracle or options
    /// is rejected with [`PlanError::ForeignSnapshot`].
    pub fn restore(&mut self, snapshot: &PlanSnapshot) -> Result<(), PlanError> {
        let same_plan = Arc::ptr_eq(&self.store, &snapshot.store)
            && snapshot.oracle == self.oracle_address()
            && snapshot.options == self.options;
        if !same_plan {
            return Err(PlanError::ForeignSnapshot);
        }
        self.state.clone_from(&snapshot.state);
        trace!(score = %self.state.score.total(), "restored snapshot");
        Ok(())
    }

    fn oracle_address(&self) -> usize {
        Arc::as_ptr(&self.oracle) as *const () as usize
    }

    /// Score recomputed from the current routes without using any cached
    /// timing or contribution.
    pub fn full_score(&self) -> Score {
        let timings = recompute_all(&self.store, &*self.oracle, &self.state.chains);
        let propagator = TimingPropagator::new(&self.store, &*self.oracle, PropagationMode::Full);
        let summaries: Vec<VehicleSummary> = self
            .store
            .vehicle_ids()
            .map(|vehicle| propagator.summarize(&self.state.chains, &timings, vehicle))
            .collect();
        ScoreState::evaluate(
            &self.scorer,
            &self.store,
            &self.state.chains,
            &timings,
            &summaries,
        )
        .total()
    }

    /// Compares the incrementally maintained state against a from-scratch
    /// evaluation of the same routes.
    pub fn verify(&self) -> Result<(), String> {
        self.state.chains.check_consistency()?;

        let timings = recompute_all(&self.store, &*self.oracle, &self.state.chains);
        for visit in self.store.visit_ids() {
            if timings[visit.get()] != self.state.timings[visit.get()] {
                return Err(format!(
                    "visit #{visit}: timing {:?}, recomputed {:?}",
                    self.state.timings[visit.get()],
                    timings[visit.get()]
                ));
            }
        }

        let propagator = TimingPropagator::new(&self.store, &*self.oracle, PropagationMode::Full);
        let summaries: Vec<VehicleSummary> = self
            .store
            .vehicle_ids()
            .map(|vehicle| propagator.summarize(&self.state.chains, &timings, vehicle))
            .collect();
        if summaries != self.state.summaries {
            return Err(format!(
                "vehicle summaries {:?}, recomputed {:?}",
                self.state.summaries, summaries
            ));
        }

        let score = ScoreState::evaluate(
            &self.scorer,
            &self.store,
            &self.state.chains,
            &timings,
            &summaries,
        );
        if score != self.state.score {
            return Err(format!(
                "score {}, recomputed {}",
                self.state.score.total(),
                score.total()
            ));
        }

        Ok(())
    }

    fn refresh(&mut self, suffix: DirtySuffix) {
        self.state.refresh(
            &self.store,
            &*self.oracle,
            &self.scorer,
            self.options.propagation,
            suffix,
        );
    }
}

impl<O: ?Sized> Plan<O> {
    /// Score after the last mutation.
    pub fn current_score(&self) -> Score {
        self.state.score.total()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn store(&self) -> &Arc<EntityStore> {
        &self.store
    }

    pub fn oracle(&self) -> &Arc<O> {
        &self.oracle
    }

    pub fn options(&self) -> &PlanOptions {
        &self.options
    }

    pub fn chains(&self) -> &RouteChains {
        &self.state.chains
    }

    pub fn route(&self, vehicle: VehicleId) -> Result<&[VisitId], PlanError> {
        self.check_vehicle(vehicle)?;
        Ok(self.state.chains.route(vehicle))
    }

    pub fn link(&self, visit: VisitId) -> Result<&VisitLink, PlanError> {
        self.check_visit(visit)?;
        Ok(self.state.chains.link(visit))
    }

    pub fn visit_vehicle(&self, visit: VisitId) -> Result<Option<VehicleId>, PlanError> {
        self.check_visit(visit)?;
        Ok(self.state.chains.vehicle_of(visit))
    }

    /// Timing of an assigned visit, `None` while unassigned.
    pub fn timing(&self, visit: VisitId) -> Result<Option<&VisitTiming>, PlanError> {
        self.check_visit(visit)?;
        Ok(self.state.timings[visit.get()].as_ref())
    }

    pub fn vehicle_summary(&self, vehicle: VehicleId) -> Result<&VehicleSummary, PlanError> {
        self.check_vehicle(vehicle)?;
        Ok(&self.state.summaries[vehicle.get()])
    }

    pub fn unassigned_count(&self) -> usize {
        self.state.score.unassigned_count()
    }

    pub fn unassigned_visits(&self) -> impl Iterator<Item = VisitId> + '_ {
        self.store
            .visit_ids()
            .filter(|&visit| self.state.chains.vehicle_of(visit).is_none())
    }

    pub fn total_driving_seconds(&self) -> i64 {
        self.state
            .summaries
            .iter()
            .map(|summary| summary.total_driving_seconds)
            .sum()
    }

    pub fn explain_score(&self) -> ScoreExplanation {
        self.state.score.explain()
    }

    pub fn statistics(&self) -> PlanStatistics {
        let vehicles = self.store.vehicles();
        let utilization_sum: f64 = vehicles
            .iter()
            .zip(&self.state.summaries)
            .map(|(vehicle, summary)| summary.total_demand as f64 / vehicle.capacity as f64)
            .sum();
        let average_utilization = if vehicles.is_empty() {
            0.0
        } else {
            utilization_sum / vehicles.len() as f64
        };

        let unassigned_visits = self.unassigned_count();
        PlanStatistics {
            score: self.current_score(),
            assigned_visits: self.store.num_visits() - unassigned_visits,
            unassigned_visits,
            vehicles_used: self
                .state
                .summaries
                .iter()
                .filter(|summary| summary.visit_count > 0)
                .count(),
            total_driving_seconds: self.total_driving_seconds(),
            average_utilization,
        }
    }

    /// Serializable view of the plan for presentation layers.
    pub fn view(&self) -> PlanView {
        PlanView::from_plan(self)
    }

    fn set_unassigned(&mut self, unassigned: usize) {
        self.state.score.set_unassigned(&self.scorer, unassigned);
    }

    fn check_visit(&self, visit: VisitId) -> Result<(), PlanError> {
        if visit.get() < self.store.num_visits() {
            Ok(())
        } else {
            Err(PlanError::UnknownEntity(EntityRef::Visit(visit)))
        }
    }

    fn check_vehicle(&self, vehicle: VehicleId) -> Result<(), PlanError> {
        if vehicle.get() < self.store.num_vehicles() {
            Ok(())
        } else {
            Err(PlanError::UnknownEntity(EntityRef::Vehicle(vehicle)))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanStatistics {
    pub score: Score,
    pub assigned_visits: usize,
    pub unassigned_visits: usize,
    pub vehicles_used: usize,
    pub total_driving_seconds: i64,
    /// Mean of total demand over capacity across all vehicles.
    pub average_utilization: f64,
}

impl fmt::Display for PlanStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "score {}, {} assigned / {} unassigned, {} vehicles used, {}s driving, {:.1}% utilization",
            self.score,
            self.assigned_visits,
            self.unassigned_visits,
            self.vehicles_used,
            self.total_driving_seconds,
            self.average_utilization * 100.0
        )
    }
}
