use crate::parking::clock::{Clock, SystemClock};
use crate::parking::config::{resolve_path, write_config, Config, ConfigError};
use crate::parking::events::{
    CheckInEvent, CheckInRejectedEvent, CheckOutEvent, CheckOutFailedEvent, EventsManager,
};
use crate::parking::fee::FeeCalculator;
use crate::parking::logging;
use crate::parking::registry::{CheckOutReceipt, Earnings, ParkingError, VehicleRegistry};
use crate::parking::scenario::Scenario;
use derive_builder::Builder;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

pub const SUMMARY_FILE_NAME: &str = "summary.json";

#[derive(Error, Debug)]
pub enum ControllerError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Parking(#[from] ParkingError),
    #[error("failed to write {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize {path:?}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RejectedCheckIn {
    pub plate: String,
    pub reason: String,
}

/// Everything that happened during one run.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct RunSummary {
    pub admitted: Vec<String>,
    pub rejected: Vec<RejectedCheckIn>,
    pub receipts: Vec<CheckOutReceipt>,
    pub not_found: Vec<String>,
    pub earnings: Earnings,
    pub remaining: Vec<String>,
}

/// Runs a [`Scenario`] against a fresh registry configured from [`Config`].
#[derive(Builder, Debug)]
#[builder(pattern = "owned")]
pub struct LocalController<C: Clock> {
    config: Arc<Config>,
    #[builder(default)]
    scenario: Scenario,
    clock: C,
}

impl LocalController<SystemClock> {
    /// Reads the scenario referenced by the config, if any, and runs on wall clock time.
    pub fn from_config(config: Arc<Config>) -> Result<Self, ControllerError> {
        let scenario = match config.scenario() {
            Some(files) => Scenario::from_file(resolve_path(config.context(), &files.vehicles))?,
            None => Scenario::default(),
        };
        Ok(LocalController {
            config,
            scenario,
            clock: SystemClock,
        })
    }
}

impl<C: Clock> LocalController<C> {
    pub fn run(self) -> Result<RunSummary, ControllerError> {
        let output_dir = self.config.output_dir();
        std::fs::create_dir_all(&output_dir).map_err(|source| ControllerError::Io {
            path: output_dir.clone(),
            source,
        })?;
        let _guards = logging::init_logging(&self.config);

        let facility = self.config.facility();
        let fees = FeeCalculator::new(self.config.pricing());
        info!(
            capacity = facility.capacity,
            arrivals = self.scenario.vehicles.len(),
            departures = self.scenario.check_outs.len(),
            "Starting parking run"
        );

        let mut registry = VehicleRegistry::new(facility.capacity, fees, self.clock);
        subscribe_messages(registry.events_mut());

        let mut summary = RunSummary::default();
        for arriving in &self.scenario.vehicles {
            let vehicle = arriving.to_vehicle(registry.clock())?;
            match registry.check_in(vehicle) {
                Ok(()) => summary.admitted.push(arriving.plate.clone()),
                Err(e) => summary.rejected.push(RejectedCheckIn {
                    plate: arriving.plate.clone(),
                    reason: e.to_string(),
                }),
            }
        }

        for plate in &self.scenario.check_outs {
            match registry.check_out(plate) {
                Ok(receipt) => summary.receipts.push(receipt),
                Err(ParkingError::VehicleNotFound(_)) => summary.not_found.push(plate.clone()),
                Err(e) => return Err(e.into()),
            }
        }

        summary.earnings = registry.earnings();
        info!(
            "{} vehicles have checked out and have earnings of {}",
            summary.earnings.vehicles_checked_out, summary.earnings.total_charged
        );

        for vehicle in registry.vehicles() {
            info!("{vehicle}");
        }
        summary.remaining = registry
            .vehicles()
            .map(|v| v.plate().to_string())
            .collect_vec();
        info!("Vehicles still parked: {}", summary.remaining.iter().join(", "));

        write_config(&self.config, &output_dir)?;
        write_summary(&summary, &output_dir)?;
        Ok(summary)
    }
}

/// Turns registry events into the messages a driver at the gate would see.
fn subscribe_messages(events: &mut EventsManager) {
    events.on::<CheckInEvent, _>(|e| {
        info!(plate = %e.plate, occupancy = e.occupancy, "Welcome to the parking!")
    });
    events.on::<CheckInRejectedEvent, _>(|e| {
        info!(plate = %e.plate, reason = %e.reason, "Sorry, the check-in failed")
    });
    events.on::<CheckOutEvent, _>(|e| {
        info!(
            plate = %e.plate,
            parked_minutes = e.parked_minutes,
            "Your fee is {}. Come back soon", e.fee
        )
    });
    events.on::<CheckOutFailedEvent, _>(|e| {
        info!(plate = %e.plate, "Sorry, the check-out failed")
    });
}

fn write_summary(summary: &RunSummary, output_dir: &std::path::Path) -> Result<(), ControllerError> {
    let path = output_dir.join(SUMMARY_FILE_NAME);
    let file = File::create(&path).map_err(|source| ControllerError::Io {
        path: path.clone(),
        source,
    })?;
    serde_json::to_writer_pretty(BufWriter::new(file), summary)
        .map_err(|source| ControllerError::Json { path, source })
}
