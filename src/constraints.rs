//! Constraint definitions for the delivery routing plan.
//!
//! # Constraints
//!
//! - **Vehicle capacity** (hard): total demand must not exceed capacity
//! - **Time windows** (hard): service must finish by the visit's max end time
//! - **Unassigned visits** (soft): every visit should be on a route
//! - **Travel time** (soft): minimize total driving time
//! - **Vehicles used** (soft, off by default): prefer fewer vehicles
//!
//! Everything except the unassigned count is attributed to a vehicle, so the
//! score can be kept current by re-evaluating only the vehicles a mutation
//! touched.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::{VehicleId, Visit};
use crate::route::RouteChains;
use crate::score::Score;
use crate::store::EntityStore;
use crate::timing::{VehicleSummary, VisitTiming};

pub const VEHICLE_CAPACITY: &str = "vehicleCapacity";
pub const SERVICE_FINISHED_AFTER_MAX_END_TIME: &str = "serviceFinishedAfterMaxEndTime";
pub const MINIMIZE_UNASSIGNED_VISITS: &str = "minimizeUnassignedVisits";
pub const MINIMIZE_TRAVEL_TIME: &str = "minimizeTravelTime";
pub const MINIMIZE_VEHICLES_USED: &str = "minimizeVehiclesUsed";

/// Penalty weights. All constraints penalize, so weights are magnitudes.
///
/// Products saturate at `i64::MAX`, so an oversized weight caps a penalty
/// instead of overflowing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    /// Hard penalty per unit of demand above capacity.
    pub capacity_weight: i64,
    /// Hard penalty per started minute of service past the max end time.
    pub time_window_weight: i64,
    /// Soft penalty per unassigned visit.
    pub unassigned_visit_penalty: i64,
    /// Soft penalty per second of driving.
    pub travel_time_weight: i64,
    /// Soft penalty per vehicle with at least one visit.
    pub vehicle_usage_penalty: i64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            capacity_weight: 1,
            time_window_weight: 1,
            unassigned_visit_penalty: 1_000_000,
            travel_time_weight: 1,
            vehicle_usage_penalty: 0,
        }
    }
}

/// Minutes by which service finishes late, any partial minute counting as one.
///
/// Finishing exactly on the max end time is not late.
pub fn late_minutes(visit: &Visit, timing: &VisitTiming) -> i64 {
    let late = timing.late_seconds(visit);
    (late + 59) / 60
}

/// Score contributions attributable to one vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VehicleContribution {
    pub capacity: Score,
    pub time_window: Score,
    pub travel_time: Score,
    pub vehicle_usage: Score,
    pub late_visits: usize,
}

impl VehicleContribution {
    pub fn total(&self) -> Score {
        self.capacity + self.time_window + self.travel_time + self.vehicle_usage
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConstraintScorer {
    weights: ScoreWeights,
}

impl ConstraintScorer {
    pub fn new(weights: ScoreWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &ScoreWeights {
        &self.weights
    }

    pub fn vehicle_contribution(
        &self,
        store: &EntityStore,
        chains: &RouteChains,
        timings: &[Option<VisitTiming>],
        vehicle_id: VehicleId,
        summary: &VehicleSummary,
    ) -> VehicleContribution {
        let vehicle = &store.vehicles()[vehicle_id];
        let mut contribution = VehicleContribution::default();

        let excess = summary.total_demand - vehicle.capacity;
        if excess > 0 {
            contribution.capacity =
                Score::of_hard(-excess.saturating_mul(self.weights.capacity_weight));
        }

        let mut late = 0;
        for &visit_id in chains.route(vehicle_id) {
            let visit = &store.visits()[visit_id];
            if let Some(timing) = &timings[visit_id.get()] {
                let minutes = late_minutes(visit, timing);
                if minutes > 0 {
                    late += minutes;
                    contribution.late_visits += 1;
                }
            }
        }
        contribution.time_window =
            Score::of_hard(-late.saturating_mul(self.weights.time_window_weight));

        contribution.travel_time =
            Score::of_soft(
                -summary
                    .total_driving_seconds
                    .saturating_mul(self.weights.travel_time_weight),
            );

        if summary.visit_count > 0 {
            contribution.vehicle_usage = Score::of_soft(-self.weights.vehicle_usage_penalty);
        }

        contribution
    }

    pub fn unassigned_contribution(&self, unassigned: usize) -> Score {
        let unassigned = unassigned as i64;
        Score::of_soft(-unassigned.saturating_mul(self.weights.unassigned_visit_penalty))
    }
}

/// Running score kept consistent with the plan by per-vehicle replacement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreState {
    contributions: Vec<VehicleContribution>,
    unassigned: usize,
    unassigned_score: Score,
    total: Score,
}

impl ScoreState {
    /// Score state for a plan whose visits are all unassigned.
    pub fn unassigned(scorer: &ConstraintScorer, num_vehicles: usize, num_visits: usize) -> Self {
        let unassigned_score = scorer.unassigned_contribution(num_visits);
        Self {
            contributions: vec![VehicleContribution::default(); num_vehicles],
            unassigned: num_visits,
            unassigned_score,
            total: unassigned_score,
        }
    }

    /// Evaluates every vehicle from the given state.
    pub fn evaluate(
        scorer: &ConstraintScorer,
        store: &EntityStore,
        chains: &RouteChains,
        timings: &[Option<VisitTiming>],
        summaries: &[VehicleSummary],
    ) -> Self {
        let contributions: Vec<VehicleContribution> = store
            .vehicle_ids()
            .map(|vehicle| {
                scorer.vehicle_contribution(store, chains, timings, vehicle, &summaries[vehicle.get()])
            })
            .collect();
        let unassigned = store
            .visit_ids()
            .filter(|&visit| chains.vehicle_of(visit).is_none())
            .count();
        let unassigned_score = scorer.unassigned_contribution(unassigned);
        let total = contributions.iter().map(VehicleContribution::total).sum::<Score>() + unassigned_score;

        Self {
            contributions,
            unassigned,
            unassigned_score,
            total,
        }
    }

    pub fn total(&self) -> Score {
        self.total
    }

    pub fn unassigned_count(&self) -> usize {
        self.unassigned
    }

    pub fn contribution(&self, vehicle: VehicleId) -> &VehicleContribution {
        &self.contributions[vehicle.get()]
    }

    pub fn replace_vehicle(&mut self, vehicle: VehicleId, contribution: VehicleContribution) {
        let slot = &mut self.contributions[vehicle.get()];
        self.total -= slot.total();
        self.total += contribution.total();
        *slot = contribution;
    }

    pub fn set_unassigned(&mut self, scorer: &ConstraintScorer, unassigned: usize) {
        let score = scorer.unassigned_contribution(unassigned);
        self.total -= self.unassigned_score;
        self.total += score;
        self.unassigned = unassigned;
        self.unassigned_score = score;
    }

    /// Per-constraint breakdown of the current total.
    pub fn explain(&self) -> ScoreExplanation {
        let mut capacity = ConstraintTotal::new(VEHICLE_CAPACITY);
        let mut time_window = ConstraintTotal::new(SERVICE_FINISHED_AFTER_MAX_END_TIME);
        let mut travel = ConstraintTotal::new(MINIMIZE_TRAVEL_TIME);
        let mut usage = ConstraintTotal::new(MINIMIZE_VEHICLES_USED);

        for contribution in &self.contributions {
            capacity.add(contribution.capacity, usize::from(contribution.capacity != Score::ZERO));
            time_window.add(contribution.time_window, contribution.late_visits);
            travel.add(
                contribution.travel_time,
                usize::from(contribution.travel_time != Score::ZERO),
            );
            usage.add(
                contribution.vehicle_usage,
                usize::from(contribution.vehicle_usage != Score::ZERO),
            );
        }

        let unassigned = ConstraintTotal {
            name: MINIMIZE_UNASSIGNED_VISITS,
            score: self.unassigned_score,
            match_count: self.unassigned,
        };

        ScoreExplanation {
            score: self.total,
            constraints: vec![capacity, time_window, unassigned, travel, usage],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstraintTotal {
    pub name: &'static str,
    pub score: Score,
    pub match_count: usize,
}

impl ConstraintTotal {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            score: Score::ZERO,
            match_count: 0,
        }
    }

    fn add(&mut self, score: Score, matches: usize) {
        self.score += score;
        self.match_count += matches;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoreExplanation {
    pub score: Score,
    pub constraints: Vec<ConstraintTotal>,
}

impl ScoreExplanation {
    pub fn constraint(&self, name: &str) -> Option<&ConstraintTotal> {
        self.constraints.iter().find(|total| total.name == name)
    }

    pub fn total_score(&self) -> Score {
        self.constraints.iter().map(|total| total.score).sum()
    }
}

impl fmt::Display for ScoreExplanation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Score: {}", self.score)?;
        for total in &self.constraints {
            writeln!(
                f,
                "  {:<32} {:>24} ({} matches)",
                total.name,
                total.score.to_string(),
                total.match_count
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Location;

    fn visit_ending_at(max_end_time: i64) -> Visit {
        Visit::new("a", "A", Location::new(0.0, 0.0))
            .with_time_window(0, max_end_time)
            .with_service_duration(0)
    }

    fn departing_at(departure_time: i64) -> VisitTiming {
        VisitTiming {
            arrival_time: departure_time,
            start_service_time: departure_time,
            departure_time,
            driving_seconds: 0,
        }
    }

    #[test]
    fn test_late_minutes_rounds_up() {
        let visit = visit_ending_at(10 * 3600);
        assert_eq!(late_minutes(&visit, &departing_at(10 * 3600)), 0);
        assert_eq!(late_minutes(&visit, &departing_at(10 * 3600 + 30)), 1);
        assert_eq!(late_minutes(&visit, &departing_at(10 * 3600 + 60)), 1);
        assert_eq!(late_minutes(&visit, &departing_at(10 * 3600 + 61)), 2);
        assert_eq!(late_minutes(&visit, &departing_at(9 * 3600)), 0);
    }

    #[test]
    fn test_unassigned_penalty_scales() {
        let scorer = ConstraintScorer::default();
        assert_eq!(scorer.unassigned_contribution(0), Score::ZERO);
        assert_eq!(scorer.unassigned_contribution(3), Score::of_soft(-3_000_000));
    }

    #[test]
    fn test_state_replacement_keeps_total() {
        let scorer = ConstraintScorer::default();
        let mut state = ScoreState::unassigned(&scorer, 2, 2);
        assert_eq!(state.total(), Score::of_soft(-2_000_000));

        let contribution = VehicleContribution {
            capacity: Score::of_hard(-2),
            travel_time: Score::of_soft(-4800),
            ..VehicleContribution::default()
        };
        state.replace_vehicle(VehicleId::new(1), contribution);
        state.set_unassigned(&scorer, 0);
        assert_eq!(state.total(), Score::new(-2, -4800));

        state.replace_vehicle(VehicleId::new(1), VehicleContribution::default());
        state.set_unassigned(&scorer, 2);
        assert_eq!(state, ScoreState::unassigned(&scorer, 2, 2));
    }

    #[test]
    fn test_explanation_sums_to_total() {
        let scorer = ConstraintScorer::default();
        let mut state = ScoreState::unassigned(&scorer, 1, 3);
        state.replace_vehicle(
            VehicleId::new(0),
            VehicleContribution {
                capacity: Score::of_hard(-1),
                time_window: Score::of_hard(-7),
                late_visits: 2,
                travel_time: Score::of_soft(-900),
                vehicle_usage: Score::ZERO,
            },
        );
        state.set_unassigned(&scorer, 1);

        let explanation = state.explain();
        assert_eq!(explanation.total_score(), state.total());
        assert_eq!(
            explanation.constraint(SERVICE_FINISHED_AFTER_MAX_END_TIME).unwrap().match_count,
            2
        );
        assert_eq!(
            explanation.constraint(MINIMIZE_UNASSIGNED_VISITS).unwrap().score,
            Score::of_soft(-1_000_000)
        );
        assert!(explanation.to_string().contains("vehicleCapacity"));
    }

    #[test]
    fn test_huge_weights_saturate() {
        let scorer = ConstraintScorer::new(ScoreWeights {
            unassigned_visit_penalty: i64::MAX,
            ..ScoreWeights::default()
        });
        assert_eq!(scorer.unassigned_contribution(3), Score::of_soft(-i64::MAX));
        assert_eq!(scorer.unassigned_contribution(0), Score::ZERO);
    }

    #[test]
    fn test_weights_from_partial_config() {
        let weights: ScoreWeights =
            serde_json::from_str(r#"{"vehicle_usage_penalty": 3600}"#).unwrap();
        assert_eq!(weights.vehicle_usage_penalty, 3600);
        assert_eq!(weights.unassigned_visit_penalty, 1_000_000);
    }
}
