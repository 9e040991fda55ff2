//! Test fixtures for route-engine.
//!
//! Provides a predictable grid oracle and small builders for stores and plans.

#![allow(dead_code)]

use std::sync::Arc;

use route_engine::model::{Location, Vehicle, Visit};
use route_engine::plan::{Plan, PlanOptions};
use route_engine::store::EntityStore;
use route_engine::traits::TravelTimeOracle;

/// Manhattan distance on raw coordinates, one unit = one minute of driving.
#[derive(Debug, Clone, Copy, Default)]
pub struct GridOracle;

impl TravelTimeOracle for GridOracle {
    fn travel_seconds(&self, from: &Location, to: &Location) -> i64 {
        let dist = (from.latitude - to.latitude).abs() + (from.longitude - to.longitude).abs();
        (dist * 60.0).round() as i64
    }
}

/// Directed variant: driving "north" (increasing latitude) takes twice as long.
#[derive(Debug, Clone, Copy, Default)]
pub struct UphillOracle;

impl TravelTimeOracle for UphillOracle {
    fn travel_seconds(&self, from: &Location, to: &Location) -> i64 {
        let base = GridOracle.travel_seconds(from, to);
        if to.latitude > from.latitude {
            base * 2
        } else {
            base
        }
    }
}

pub fn hours(h: i64) -> i64 {
    h * 3600
}

pub fn minutes(m: i64) -> i64 {
    m * 60
}

pub fn at(lat: f64, lng: f64) -> Location {
    Location::new(lat, lng)
}

pub fn visit(id: &str, lat: f64, lng: f64) -> Visit {
    Visit::new(id, id.to_uppercase(), at(lat, lng))
}

pub fn vehicle(id: &str, lat: f64, lng: f64) -> Vehicle {
    Vehicle::new(id, at(lat, lng))
}

pub fn store(visits: Vec<Visit>, vehicles: Vec<Vehicle>) -> Arc<EntityStore> {
    Arc::new(
        EntityStore::builder()
            .visits(visits)
            .vehicles(vehicles)
            .build()
            .expect("valid fixture"),
    )
}

pub fn grid_plan(store: Arc<EntityStore>) -> Plan<GridOracle> {
    Plan::new(store, Arc::new(GridOracle), PlanOptions::default())
}

/// Two visits that overload a capacity-10 vehicle:
/// A (demand 6, 09:00-10:00, 10 min, 30 min out) and
/// B (demand 6, 09:00-11:00, 10 min, 10 min past A).
pub fn overloaded_pair() -> Arc<EntityStore> {
    store(
        vec![
            visit("a", 30.0, 0.0)
                .with_demand(6)
                .with_time_window(hours(9), hours(10))
                .with_service_duration(minutes(10)),
            visit("b", 30.0, 10.0)
                .with_demand(6)
                .with_time_window(hours(9), hours(11))
                .with_service_duration(minutes(10)),
        ],
        vec![vehicle("truck", 0.0, 0.0).with_capacity(10)],
    )
}

/// A seeded scatter of visits with mixed windows over a few vehicles.
pub fn scattered(num_visits: usize, num_vehicles: usize, seed: u64) -> Arc<EntityStore> {
    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};

    let mut rng = SmallRng::seed_from_u64(seed);
    let visits = (0..num_visits)
        .map(|i| {
            let lat = rng.random_range(-20..=20) as f64;
            let lng = rng.random_range(-20..=20) as f64;
            let open = hours(8) + minutes(rng.random_range(0..=240));
            let close = open + minutes(rng.random_range(30..=240));
            visit(&format!("v{i}"), lat, lng)
                .with_demand(rng.random_range(0..=4))
                .with_time_window(open, close)
                .with_service_duration(minutes(rng.random_range(0..=20)))
        })
        .collect();
    let vehicles = (0..num_vehicles)
        .map(|i| {
            vehicle(&format!("car{i}"), 0.0, 0.0)
                .with_capacity(rng.random_range(5..=15))
                .with_departure_time(hours(7) + minutes(rng.random_range(0..=120)))
        })
        .collect();
    store(visits, vehicles)
}
