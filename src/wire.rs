//! JSON-facing view of a plan.
//!
//! Ids are the external string identifiers from the entity store, not arena
//! indices.

use serde::Serialize;

use crate::model::{Location, VehicleStyle};
use crate::plan::Plan;
use crate::score::Score;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanView {
    pub name: String,
    pub vehicles: Vec<VehicleView>,
    pub visits: Vec<VisitView>,
    pub score: Score,
    pub score_text: String,
    pub total_driving_time_seconds: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleView {
    pub id: String,
    pub style: VehicleStyle,
    pub home_location: Location,
    pub capacity: i64,
    pub departure_time: i64,
    pub visits: Vec<String>,
    pub total_demand: i64,
    pub total_driving_time_seconds: i64,
    /// Time the vehicle is back home.
    pub arrival_time: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitView {
    pub id: String,
    pub name: String,
    pub location: Location,
    pub demand: i64,
    pub min_start_time: i64,
    pub max_end_time: i64,
    pub service_duration_seconds: i64,
    pub arrival_time: Option<i64>,
    pub start_service_time: Option<i64>,
    pub departure_time: Option<i64>,
    pub driving_time_seconds_from_previous_standstill: Option<i64>,
    pub vehicle_id: Option<String>,
}

impl PlanView {
    pub fn from_plan<O: ?Sized>(plan: &Plan<O>) -> Self {
        let store = plan.store();
        let chains = plan.chains();

        let vehicles = store
            .vehicle_ids()
            .zip(store.vehicles())
            .map(|(id, vehicle)| {
                let summary = plan.vehicle_summary(id).copied().unwrap_or_default();
                VehicleView {
                    id: vehicle.id.clone(),
                    style: vehicle.style,
                    home_location: vehicle.home_location,
                    capacity: vehicle.capacity,
                    departure_time: vehicle.departure_time,
                    visits: chains
                        .route(id)
                        .iter()
                        .map(|&visit| store.visits()[visit].id.clone())
                        .collect(),
                    total_demand: summary.total_demand,
                    total_driving_time_seconds: summary.total_driving_seconds,
                    arrival_time: summary.arrival_back_home,
                }
            })
            .collect();

        let visits = store
            .visit_ids()
            .zip(store.visits())
            .map(|(id, visit)| {
                let timing = plan.timing(id).ok().flatten();
                VisitView {
                    id: visit.id.clone(),
                    name: visit.name.clone(),
                    location: visit.location,
                    demand: visit.demand,
                    min_start_time: visit.min_start_time,
                    max_end_time: visit.max_end_time,
                    service_duration_seconds: visit.service_duration,
                    arrival_time: timing.map(|t| t.arrival_time),
                    start_service_time: timing.map(|t| t.start_service_time),
                    departure_time: timing.map(|t| t.departure_time),
                    driving_time_seconds_from_previous_standstill: timing
                        .map(|t| t.driving_seconds),
                    vehicle_id: chains
                        .vehicle_of(id)
                        .map(|vehicle| store.vehicles()[vehicle].id.clone()),
                }
            })
            .collect();

        let score = plan.current_score();
        PlanView {
            name: plan.name().to_string(),
            vehicles,
            visits,
            score,
            score_text: score.to_string(),
            total_driving_time_seconds: plan.total_driving_seconds(),
        }
    }
}
