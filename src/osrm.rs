//! OSRM HTTP adapter for travel-time matrices.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::OracleError;
use crate::model::Location;
use crate::traits::DistanceMatrixProvider;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OsrmConfig {
    pub base_url: String,
    pub profile: String,
    pub timeout_secs: u64,
}

impl Default for OsrmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            profile: "car".to_string(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OsrmClient {
    config: OsrmConfig,
    client: reqwest::blocking::Client,
}

impl OsrmClient {
    pub fn new(config: OsrmConfig) -> Result<Self, OracleError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }

    fn table_url(&self, locations: &[Location]) -> String {
        // OSRM expects lng,lat
        let coords = locations
            .iter()
            .map(|location| format!("{:.6},{:.6}", location.longitude, location.latitude))
            .collect::<Vec<_>>()
            .join(";");

        format!(
            "{}/table/v1/{}/{}?annotations=duration",
            self.config.base_url.trim_end_matches('/'),
            self.config.profile,
            coords
        )
    }
}

impl DistanceMatrixProvider for OsrmClient {
    fn matrix_for(&self, locations: &[Location]) -> Result<Vec<Vec<i64>>, OracleError> {
        if locations.is_empty() {
            return Ok(Vec::new());
        }

        debug!(locations = locations.len(), "requesting OSRM table");
        let body = self
            .client
            .get(self.table_url(locations))
            .send()
            .and_then(|resp| resp.error_for_status())
            .and_then(|resp| resp.json::<OsrmTableResponse>())
            .inspect_err(|err| warn!(%err, "OSRM table request failed"))?;

        durations_from_response(body)
    }
}

#[derive(Debug, Deserialize)]
struct OsrmTableResponse {
    code: String,
    message: Option<String>,
    durations: Option<Vec<Vec<Option<f64>>>>,
}

fn durations_from_response(body: OsrmTableResponse) -> Result<Vec<Vec<i64>>, OracleError> {
    if body.code != "Ok" {
        return Err(OracleError::MissingDurations(
            body.message.unwrap_or(body.code),
        ));
    }
    let durations = body
        .durations
        .ok_or_else(|| OracleError::MissingDurations("no durations field".to_string()))?;

    durations
        .into_iter()
        .enumerate()
        .map(|(from, row)| {
            row.into_iter()
                .enumerate()
                .map(|(to, value)| {
                    value
                        .map(|seconds| seconds.round() as i64)
                        .ok_or(OracleError::Unroutable { from, to })
                })
                .collect()
        })
        .collect()
}
