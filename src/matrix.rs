//! Precomputed travel-time matrix.
//!
//! Scoring a plan calls the oracle for every recomputed leg, so production
//! setups precompute all pairs once per problem and answer lookups from memory.

use fxhash::FxHashMap;
use rayon::prelude::*;
use tracing::{debug, trace};

use crate::error::OracleError;
use crate::haversine::HaversineOracle;
use crate::model::{Location, LocationKey};
use crate::store::EntityStore;
use crate::traits::{DistanceMatrixProvider, TravelTimeOracle};

/// Dense, directed travel durations between a fixed set of locations.
///
/// Pairs involving a location outside the matrix are answered by the
/// haversine fallback.
#[derive(Debug, Clone)]
pub struct TravelMatrix {
    index: FxHashMap<LocationKey, usize>,
    size: usize,
    durations: Vec<i64>,
    fallback: HaversineOracle,
}

impl TravelMatrix {
    /// Asks `provider` for the durations between `locations`.
    pub fn from_provider<P>(provider: &P, locations: &[Location]) -> Result<Self, OracleError>
    where
        P: DistanceMatrixProvider + ?Sized,
    {
        let rows = provider.matrix_for(locations)?;
        let size = locations.len();
        if rows.len() != size {
            return Err(OracleError::DimensionMismatch {
                expected: size,
                actual: rows.len(),
            });
        }

        let mut durations = Vec::with_capacity(size * size);
        for row in rows {
            if row.len() != size {
                return Err(OracleError::DimensionMismatch {
                    expected: size,
                    actual: row.len(),
                });
            }
            durations.extend(row.into_iter().map(|seconds| seconds.max(0)));
        }

        debug!(locations = size, "travel matrix built from provider");
        Ok(Self::assemble(locations, durations))
    }

    /// Evaluates `oracle` for every ordered pair, rows in parallel.
    pub fn from_oracle<O>(oracle: &O, locations: &[Location]) -> Self
    where
        O: TravelTimeOracle + Sync + ?Sized,
    {
        let durations: Vec<i64> = locations
            .par_iter()
            .flat_map_iter(|from| locations.iter().map(move |to| oracle.travel_seconds(from, to)))
            .collect();

        debug!(locations = locations.len(), "travel matrix built from oracle");
        Self::assemble(locations, durations)
    }

    /// Matrix over every home and visit location of `store`.
    pub fn for_store<O>(oracle: &O, store: &EntityStore) -> Self
    where
        O: TravelTimeOracle + Sync + ?Sized,
    {
        Self::from_oracle(oracle, &store.locations())
    }

    pub fn with_fallback(mut self, fallback: HaversineOracle) -> Self {
        self.fallback = fallback;
        self
    }

    fn assemble(locations: &[Location], durations: Vec<i64>) -> Self {
        let mut index = FxHashMap::default();
        for (i, location) in locations.iter().enumerate() {
            index.entry(location.key()).or_insert(i);
        }

        Self {
            index,
            size: locations.len(),
            durations,
            fallback: HaversineOracle::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn contains(&self, location: &Location) -> bool {
        self.index.contains_key(&location.key())
    }

    /// Duration between two matrix rows.
    pub fn duration(&self, from: usize, to: usize) -> Option<i64> {
        if from < self.size && to < self.size {
            Some(self.durations[from * self.size + to])
        } else {
            None
        }
    }
}

impl TravelTimeOracle for TravelMatrix {
    fn travel_seconds(&self, from: &Location, to: &Location) -> i64 {
        let (from_key, to_key) = (from.key(), to.key());
        if from_key == to_key {
            return 0;
        }
        match (self.index.get(&from_key), self.index.get(&to_key)) {
            (Some(&i), Some(&j)) => self.durations[i * self.size + j],
            _ => {
                trace!(?from, ?to, "location outside travel matrix, using fallback");
                self.fallback.travel_seconds(from, to)
            }
        }
    }
}
