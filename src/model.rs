//! Static problem entities: locations, visits and vehicles.
//!
//! These values are created once by the problem loader and never change while a
//! plan is being optimized. Route membership and timing live in the plan.

use serde::{Deserialize, Serialize};

use crate::define_index_newtype;

/// Seconds in one day, the default visit window.
pub const SECONDS_PER_DAY: i64 = 24 * 3600;

/// Default service duration (30 minutes).
pub const DEFAULT_SERVICE_DURATION: i64 = 30 * 60;

/// Default vehicle departure time (08:00).
pub const DEFAULT_DEPARTURE_TIME: i64 = 8 * 3600;

define_index_newtype!(VisitId, Visit);
define_index_newtype!(VehicleId, Vehicle);

/// A latitude/longitude pair.
///
/// Serialized as `[lat, lon]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.latitude.is_finite() && self.longitude.is_finite()
    }

    /// Fixed-point key with 6 decimal places, used to deduplicate and index locations.
    pub(crate) fn key(&self) -> LocationKey {
        LocationKey(
            (self.latitude * 1e6).round() as i64,
            (self.longitude * 1e6).round() as i64,
        )
    }
}

impl From<[f64; 2]> for Location {
    fn from([latitude, longitude]: [f64; 2]) -> Self {
        Self::new(latitude, longitude)
    }
}

impl From<Location> for [f64; 2] {
    fn from(location: Location) -> Self {
        [location.latitude, location.longitude]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct LocationKey(i64, i64);

/// A delivery stop with a demand and a time window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Visit {
    pub id: String,
    pub name: String,
    pub location: Location,
    pub demand: i64,
    /// Service duration in seconds.
    #[serde(rename = "serviceDurationSeconds")]
    pub service_duration: i64,
    /// Earliest service start. Arriving earlier means waiting.
    pub min_start_time: i64,
    /// Latest time service must be finished.
    pub max_end_time: i64,
}

impl Visit {
    /// Creates a visit with demand 1, a 30 minute service and an all-day window.
    pub fn new(id: impl Into<String>, name: impl Into<String>, location: Location) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            location,
            demand: 1,
            service_duration: DEFAULT_SERVICE_DURATION,
            min_start_time: 0,
            max_end_time: SECONDS_PER_DAY,
        }
    }

    pub fn with_demand(mut self, demand: i64) -> Self {
        self.demand = demand;
        self
    }

    pub fn with_time_window(mut self, min_start_time: i64, max_end_time: i64) -> Self {
        self.min_start_time = min_start_time;
        self.max_end_time = max_end_time;
        self
    }

    pub fn with_service_duration(mut self, seconds: i64) -> Self {
        self.service_duration = seconds;
        self
    }
}

/// Kind of vehicle, which determines its default capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VehicleStyle {
    Van,
    Motorcycle,
    Scooter,
    #[default]
    Standard,
}

impl VehicleStyle {
    pub fn default_capacity(&self) -> i64 {
        match self {
            VehicleStyle::Van => 20,
            VehicleStyle::Motorcycle => 8,
            VehicleStyle::Scooter => 4,
            VehicleStyle::Standard => 10,
        }
    }
}

impl From<&str> for VehicleStyle {
    fn from(style: &str) -> Self {
        match style.trim().to_ascii_lowercase().as_str() {
            "van" => VehicleStyle::Van,
            "motorcycle" => VehicleStyle::Motorcycle,
            "scooter" => VehicleStyle::Scooter,
            _ => VehicleStyle::Standard,
        }
    }
}

/// A capacity-bound carrier that starts and ends its route at home.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    pub id: String,
    pub style: VehicleStyle,
    pub capacity: i64,
    pub home_location: Location,
    pub departure_time: i64,
}

impl Vehicle {
    /// Creates a standard vehicle leaving home at 08:00.
    pub fn new(id: impl Into<String>, home_location: Location) -> Self {
        let style = VehicleStyle::default();
        Self {
            id: id.into(),
            style,
            capacity: style.default_capacity(),
            home_location,
            departure_time: DEFAULT_DEPARTURE_TIME,
        }
    }

    /// Sets the style and resets the capacity to the style's default.
    pub fn with_style(mut self, style: VehicleStyle) -> Self {
        self.style = style;
        self.capacity = style.default_capacity();
        self
    }

    pub fn with_capacity(mut self, capacity: i64) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_departure_time(mut self, departure_time: i64) -> Self {
        self.departure_time = departure_time;
        self
    }
}
