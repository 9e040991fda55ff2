//! route-engine
//!
//! Route state engine for capacitated vehicle routing with time windows:
//! per-vehicle visit chains, incremental arrival/departure propagation and a
//! hard/soft constraint score that stays current after every mutation. A
//! search driver explores the move space through [`Plan`].

mod index;

pub mod constraints;
pub mod error;
pub mod haversine;
pub mod matrix;
pub mod model;
pub mod osrm;
pub mod plan;
pub mod route;
pub mod score;
pub mod store;
pub mod timing;
pub mod traits;
pub mod wire;

pub use constraints::{ScoreExplanation, ScoreWeights};
pub use error::{EntityRef, OracleError, PlanError, StoreError};
pub use haversine::HaversineOracle;
pub use matrix::TravelMatrix;
pub use model::{Location, Vehicle, VehicleId, VehicleStyle, Visit, VisitId};
pub use osrm::{OsrmClient, OsrmConfig};
pub use plan::{Plan, PlanOptions, PlanSnapshot, PlanStatistics};
pub use score::Score;
pub use store::{EntityStore, EntityStoreBuilder};
pub use timing::{PropagationMode, VehicleSummary, VisitTiming};
pub use traits::{DistanceMatrixProvider, TravelTimeOracle};
pub use wire::PlanView;
