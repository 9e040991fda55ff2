//! Arena storage for the static problem entities.
//!
//! Visits and vehicles are addressed by [`VisitId`]/[`VehicleId`] indices, so
//! the mutable route state never holds references into the store and a plan
//! can be cloned by copying plain data. A store is immutable once built and is
//! shared between plans through `Arc`.

use fxhash::FxHashMap;

use crate::error::StoreError;
use crate::model::{Location, Vehicle, VehicleId, Visit, VisitId};

#[derive(Debug, Clone, Default)]
pub struct EntityStore {
    visits: Vec<Visit>,
    vehicles: Vec<Vehicle>,
    visit_index: FxHashMap<String, VisitId>,
    vehicle_index: FxHashMap<String, VehicleId>,
}

impl EntityStore {
    pub fn builder() -> EntityStoreBuilder {
        EntityStoreBuilder::default()
    }

    pub fn visit(&self, id: VisitId) -> Option<&Visit> {
        self.visits.get(id.get())
    }

    pub fn vehicle(&self, id: VehicleId) -> Option<&Vehicle> {
        self.vehicles.get(id.get())
    }

    /// Looks up a visit by its external identifier.
    pub fn visit_id(&self, id: &str) -> Option<VisitId> {
        self.visit_index.get(id).copied()
    }

    /// Looks up a vehicle by its external identifier.
    pub fn vehicle_id(&self, id: &str) -> Option<VehicleId> {
        self.vehicle_index.get(id).copied()
    }

    pub fn visits(&self) -> &[Visit] {
        &self.visits
    }

    pub fn vehicles(&self) -> &[Vehicle] {
        &self.vehicles
    }

    pub fn visit_ids(&self) -> impl Iterator<Item = VisitId> + '_ {
        (0..self.visits.len()).map(VisitId::new)
    }

    pub fn vehicle_ids(&self) -> impl Iterator<Item = VehicleId> + '_ {
        (0..self.vehicles.len()).map(VehicleId::new)
    }

    pub fn num_visits(&self) -> usize {
        self.visits.len()
    }

    pub fn num_vehicles(&self) -> usize {
        self.vehicles.len()
    }

    /// Distinct locations of all vehicle homes and visits, homes first.
    pub fn locations(&self) -> Vec<Location> {
        let mut seen = fxhash::FxHashSet::default();
        self.vehicles
            .iter()
            .map(|vehicle| vehicle.home_location)
            .chain(self.visits.iter().map(|visit| visit.location))
            .filter(|location| seen.insert(location.key()))
            .collect()
    }
}

/// Collects entities and validates them into an [`EntityStore`].
#[derive(Debug, Clone, Default)]
pub struct EntityStoreBuilder {
    visits: Vec<Visit>,
    vehicles: Vec<Vehicle>,
}

impl EntityStoreBuilder {
    pub fn visit(mut self, visit: Visit) -> Self {
        self.visits.push(visit);
        self
    }

    pub fn vehicle(mut self, vehicle: Vehicle) -> Self {
        self.vehicles.push(vehicle);
        self
    }

    pub fn visits(mut self, visits: impl IntoIterator<Item = Visit>) -> Self {
        self.visits.extend(visits);
        self
    }

    pub fn vehicles(mut self, vehicles: impl IntoIterator<Item = Vehicle>) -> Self {
        self.vehicles.extend(vehicles);
        self
    }

    pub fn build(self) -> Result<EntityStore, StoreError> {
        let mut visit_index = FxHashMap::default();
        for (index, visit) in self.visits.iter().enumerate() {
            validate_visit(visit)?;
            if visit_index
                .insert(visit.id.clone(), VisitId::new(index))
                .is_some()
            {
                return Err(StoreError::DuplicateVisit(visit.id.clone()));
            }
        }

        let mut vehicle_index = FxHashMap::default();
        for (index, vehicle) in self.vehicles.iter().enumerate() {
            validate_vehicle(vehicle)?;
            if vehicle_index
                .insert(vehicle.id.clone(), VehicleId::new(index))
                .is_some()
            {
                return Err(StoreError::DuplicateVehicle(vehicle.id.clone()));
            }
        }

        Ok(EntityStore {
            visits: self.visits,
            vehicles: self.vehicles,
            visit_index,
            vehicle_index,
        })
    }
}

fn validate_visit(visit: &Visit) -> Result<(), StoreError> {
    if !visit.location.is_finite() {
        return Err(StoreError::NonFiniteLocation {
            id: visit.id.clone(),
        });
    }
    if visit.min_start_time > visit.max_end_time {
        return Err(StoreError::InvalidTimeWindow {
            id: visit.id.clone(),
            min_start_time: visit.min_start_time,
            max_end_time: visit.max_end_time,
        });
    }
    if visit.demand < 0 {
        return Err(StoreError::NegativeDemand {
            id: visit.id.clone(),
            demand: visit.demand,
        });
    }
    if visit.service_duration < 0 {
        return Err(StoreError::NegativeServiceDuration {
            id: visit.id.clone(),
            seconds: visit.service_duration,
        });
    }
    Ok(())
}

fn validate_vehicle(vehicle: &Vehicle) -> Result<(), StoreError> {
    if !vehicle.home_location.is_finite() {
        return Err(StoreError::NonFiniteLocation {
            id: vehicle.id.clone(),
        });
    }
    if vehicle.capacity <= 0 {
        return Err(StoreError::NonPositiveCapacity {
            id: vehicle.id.clone(),
            capacity: vehicle.capacity,
        });
    }
    Ok(())
}
