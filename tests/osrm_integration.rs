//! OSRM-backed travel matrix against a real routing container.
//!
//! Needs a directory of preprocessed OSRM (MLD) data in `OSRM_DATA_DIR`;
//! `OSRM_DATASET` names the `.osrm` base file (default `nevada-latest.osrm`).
//! Skipped when `OSRM_DATA_DIR` is unset.

use std::env;
use std::sync::Arc;
use std::time::{Duration, Instant};

use testcontainers::core::{IntoContainerPort, Mount};
use testcontainers::runners::SyncRunner;
use testcontainers::ReuseDirective;
use testcontainers::{Container, GenericImage, ImageExt, TestcontainersError};

use route_engine::matrix::TravelMatrix;
use route_engine::model::{Location, Vehicle, VehicleId, Visit, VisitId};
use route_engine::osrm::{OsrmClient, OsrmConfig};
use route_engine::plan::{Plan, PlanOptions};
use route_engine::store::EntityStore;
use route_engine::traits::TravelTimeOracle;
use route_engine::OracleError;

fn osrm_container(data_dir: String) -> Result<(Container<GenericImage>, String), TestcontainersError> {
    let dataset = env::var("OSRM_DATASET").unwrap_or_else(|_| "nevada-latest.osrm".to_string());

    let image = GenericImage::new("osrm/osrm-backend", "latest")
        .with_exposed_port(5000.tcp())
        .with_mount(Mount::bind_mount(data_dir, "/data"))
        .with_cmd(vec![
            "osrm-routed".to_string(),
            "--algorithm".to_string(),
            "mld".to_string(),
            format!("/data/{dataset}"),
        ])
        .with_container_name("route-engine-osrm")
        .with_startup_timeout(Duration::from_secs(30))
        .with_reuse(ReuseDirective::Always);

    let container = image.start()?;
    let port = container.get_host_port_ipv4(5000.tcp())?;
    Ok((container, format!("http://127.0.0.1:{port}")))
}

fn las_vegas_store() -> EntityStore {
    EntityStore::builder()
        .visit(Visit::new("bellagio", "Bellagio", Location::new(36.1126, -115.1767)))
        .visit(Visit::new("caesars", "Caesars Palace", Location::new(36.1162, -115.1745)))
        .visit(Visit::new("mgm", "MGM Grand", Location::new(36.1023654, -115.1688720)))
        .vehicle(Vehicle::new(
            "wynn",
            Location::new(36.1263781, -115.1658180),
        ))
        .build()
        .expect("valid store")
}

#[test]
fn osrm_matrix_drives_plan() {
    let Ok(data_dir) = env::var("OSRM_DATA_DIR") else {
        eprintln!("OSRM_DATA_DIR not set, skipping");
        return;
    };
    let (container, base_url) = osrm_container(data_dir).expect("start OSRM container");

    let client = OsrmClient::new(OsrmConfig {
        base_url,
        ..OsrmConfig::default()
    })
    .expect("build OSRM client");
    let store = las_vegas_store();
    let locations = store.locations();

    // the server may still be loading data after the port opens
    let start = Instant::now();
    let matrix = loop {
        match TravelMatrix::from_provider(&client, &locations) {
            Ok(matrix) => break matrix,
            Err(err @ OracleError::Http(_)) if start.elapsed() < Duration::from_secs(15) => {
                eprintln!("OSRM not ready: {err}");
                std::thread::sleep(Duration::from_millis(500));
            }
            Err(err) => {
                if let Ok(stderr) = container.stderr_to_vec() {
                    eprintln!("OSRM stderr:\n{}", String::from_utf8_lossy(&stderr));
                }
                panic!("OSRM matrix failed: {err}");
            }
        }
    };

    assert_eq!(matrix.len(), 4);
    let bellagio = store.visits()[VisitId::new(0)].location;
    let mgm = store.visits()[VisitId::new(2)].location;
    assert_eq!(matrix.travel_seconds(&bellagio, &bellagio), 0);
    assert!(matrix.travel_seconds(&bellagio, &mgm) > 0);

    let mut plan = Plan::new(Arc::new(store), Arc::new(matrix), PlanOptions::default());
    let truck = VehicleId::new(0);
    for (position, visit) in [0, 1, 2].into_iter().enumerate() {
        plan.assign(VisitId::new(visit), truck, position).expect("assign");
    }
    assert_eq!(plan.unassigned_count(), 0);
    assert!(plan.vehicle_summary(truck).unwrap().total_driving_seconds > 0);
    plan.verify().unwrap();

    drop(container);
}
