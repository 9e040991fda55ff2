//! Error types.

use std::fmt;

use thiserror::Error;

use crate::model::{VehicleId, VisitId};

/// Entity addressed by a plan operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityRef {
    Visit(VisitId),
    Vehicle(VehicleId),
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityRef::Visit(id) => write!(f, "visit #{id}"),
            EntityRef::Vehicle(id) => write!(f, "vehicle #{id}"),
        }
    }
}

/// A rejected plan mutation. The plan is left unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    #[error("unknown {0}")]
    UnknownEntity(EntityRef),

    #[error("position {position} out of range 0..={max} for vehicle #{vehicle}")]
    InvalidPosition {
        vehicle: VehicleId,
        position: usize,
        max: usize,
    },

    #[error("snapshot was taken from a plan with a different store, oracle or options")]
    ForeignSnapshot,
}

/// Invalid problem data, reported while building an entity store.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    #[error("duplicate visit id '{0}'")]
    DuplicateVisit(String),

    #[error("duplicate vehicle id '{0}'")]
    DuplicateVehicle(String),

    #[error("visit '{id}' has min start {min_start_time} after max end {max_end_time}")]
    InvalidTimeWindow {
        id: String,
        min_start_time: i64,
        max_end_time: i64,
    },

    #[error("visit '{id}' has negative demand {demand}")]
    NegativeDemand { id: String, demand: i64 },

    #[error("visit '{id}' has negative service duration {seconds}s")]
    NegativeServiceDuration { id: String, seconds: i64 },

    #[error("vehicle '{id}' has non-positive capacity {capacity}")]
    NonPositiveCapacity { id: String, capacity: i64 },

    #[error("'{id}' has non-finite coordinates")]
    NonFiniteLocation { id: String },
}

/// Failure to obtain travel durations from a matrix provider.
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("provider returned no durations ({0})")]
    MissingDurations(String),

    #[error("no route from location #{from} to location #{to}")]
    Unroutable { from: usize, to: usize },

    #[error("matrix has {actual} rows or columns, expected {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
}
