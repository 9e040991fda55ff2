//! Seams between the engine and its travel-time collaborators.
//!
//! The engine only needs a directed travel duration between two locations.
//! Concrete oracles may compute it on the fly (haversine), look it up in a
//! precomputed matrix, or delegate to a routing service.

use std::sync::Arc;

use crate::error::OracleError;
use crate::model::Location;

/// Directed travel duration between two locations.
///
/// Implementations must be deterministic and side-effect free, return a
/// non-negative number of seconds, and return 0 for identical locations.
/// Symmetry and the triangle inequality are not required.
pub trait TravelTimeOracle {
    fn travel_seconds(&self, from: &Location, to: &Location) -> i64;
}

impl<T: TravelTimeOracle + ?Sized> TravelTimeOracle for &T {
    fn travel_seconds(&self, from: &Location, to: &Location) -> i64 {
        (**self).travel_seconds(from, to)
    }
}

impl<T: TravelTimeOracle + ?Sized> TravelTimeOracle for Box<T> {
    fn travel_seconds(&self, from: &Location, to: &Location) -> i64 {
        (**self).travel_seconds(from, to)
    }
}

impl<T: TravelTimeOracle + ?Sized> TravelTimeOracle for Arc<T> {
    fn travel_seconds(&self, from: &Location, to: &Location) -> i64 {
        (**self).travel_seconds(from, to)
    }
}

/// Provides a dense travel-time matrix (seconds) for a set of locations.
///
/// The matrix is indexed by the provided location order, rows are origins.
pub trait DistanceMatrixProvider {
    fn matrix_for(&self, locations: &[Location]) -> Result<Vec<Vec<i64>>, OracleError>;
}
