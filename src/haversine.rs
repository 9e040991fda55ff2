//! Haversine travel-time oracle (fallback when no road network is available).
//!
//! Uses great-circle distance to estimate travel time.
//! Less accurate than OSRM (ignores roads) but always available.

use serde::{Deserialize, Serialize};

use crate::error::OracleError;
use crate::model::Location;
use crate::traits::{DistanceMatrixProvider, TravelTimeOracle};

/// Average driving speed assumption for time estimation.
const DEFAULT_SPEED_KMH: f64 = 40.0;

/// Earth radius in kilometers.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine-based travel-time oracle.
///
/// Estimates travel time using straight-line distance and an assumed speed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HaversineOracle {
    /// Assumed average driving speed in km/h.
    pub speed_kmh: f64,
}

impl Default for HaversineOracle {
    fn default() -> Self {
        Self {
            speed_kmh: DEFAULT_SPEED_KMH,
        }
    }
}

impl HaversineOracle {
    pub fn new(speed_kmh: f64) -> Self {
        Self { speed_kmh }
    }

    /// Great-circle distance between two points in kilometers.
    pub fn haversine_km(from: &Location, to: &Location) -> f64 {
        let lat1_rad = from.latitude.to_radians();
        let lat2_rad = to.latitude.to_radians();
        let delta_lat = (to.latitude - from.latitude).to_radians();
        let delta_lng = (to.longitude - from.longitude).to_radians();

        let a = (delta_lat / 2.0).sin().powi(2)
            + lat1_rad.cos() * lat2_rad.cos() * (delta_lng / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().asin();

        EARTH_RADIUS_KM * c
    }

    /// Convert distance in km to travel time in seconds.
    fn km_to_seconds(&self, km: f64) -> i64 {
        let hours = km / self.speed_kmh;
        (hours * 3600.0).round() as i64
    }
}

impl TravelTimeOracle for HaversineOracle {
    fn travel_seconds(&self, from: &Location, to: &Location) -> i64 {
        if from.key() == to.key() {
            return 0;
        }
        self.km_to_seconds(Self::haversine_km(from, to))
    }
}

impl DistanceMatrixProvider for HaversineOracle {
    fn matrix_for(&self, locations: &[Location]) -> Result<Vec<Vec<i64>>, OracleError> {
        Ok(locations
            .iter()
            .map(|from| {
                locations
                    .iter()
                    .map(|to| self.travel_seconds(from, to))
                    .collect()
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_haversine_same_point() {
        let point = Location::new(36.1, -115.1);
        let dist = HaversineOracle::haversine_km(&point, &point);
        assert!(dist < 0.001, "Same point should have ~0 distance");
        assert_eq!(HaversineOracle::default().travel_seconds(&point, &point), 0);
    }

    #[test]
    fn test_haversine_known_distance() {
        // Las Vegas to Los Angeles, actual distance ~370 km
        let dist = HaversineOracle::haversine_km(
            &Location::new(36.17, -115.14),
            &Location::new(34.05, -118.24),
        );
        assert!(dist > 350.0 && dist < 400.0, "LV to LA should be ~370km, got {}", dist);
    }

    #[test]
    fn test_matrix_diagonal_is_zero() {
        let oracle = HaversineOracle::default();
        let locations = vec![
            Location::new(36.1, -115.1),
            Location::new(36.2, -115.2),
            Location::new(36.3, -115.3),
        ];
        let matrix = oracle.matrix_for(&locations).unwrap();

        for i in 0..locations.len() {
            assert_eq!(matrix[i][i], 0, "Diagonal should be zero");
        }
        assert!(matrix[0][2] > matrix[0][1]);
    }

    #[test]
    fn test_reasonable_travel_time() {
        let oracle = HaversineOracle::new(40.0);
        // 10 km at 40 km/h = 0.25 hours = 900 seconds
        assert_eq!(oracle.km_to_seconds(10.0), 900);
    }

    #[test]
    fn test_speed_from_config() {
        let oracle: HaversineOracle = serde_json::from_str(r#"{"speed_kmh": 60.0}"#).unwrap();
        assert_eq!(oracle.km_to_seconds(30.0), 1800);
        let defaulted: HaversineOracle = serde_json::from_str("{}").unwrap();
        assert_eq!(defaulted, HaversineOracle::default());
    }
}
