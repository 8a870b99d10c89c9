use crate::parking::clock::{minutes_ago, Clock};
use crate::parking::config::ConfigError;
use crate::parking::vehicle::{Vehicle, VehicleClass};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// A day at the facility: vehicles arriving in order, then plates asking to leave in order.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Scenario {
    #[serde(default)]
    pub vehicles: Vec<ScenarioVehicle>,
    #[serde(default)]
    pub check_outs: Vec<String>,
}

/// An arriving vehicle. Its check in time is given relative to the moment the scenario is run.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ScenarioVehicle {
    pub plate: String,
    pub class: VehicleClass,
    /// Minutes the vehicle has already been parked when the scenario starts.
    #[serde(default)]
    pub parked_minutes: u64,
    #[serde(default)]
    pub discount_card: Option<String>,
}

impl ScenarioVehicle {
    /// Fails if `parked_minutes` reaches back further than a `SystemTime` can go.
    pub fn to_vehicle(&self, clock: &impl Clock) -> Result<Vehicle, ConfigError> {
        let check_in_time =
            minutes_ago(clock, self.parked_minutes).ok_or_else(|| ConfigError::InvalidValue {
                key: format!("{}.parked_minutes", self.plate),
                value: self.parked_minutes.to_string(),
            })?;
        Ok(Vehicle::new(
            self.plate.clone(),
            self.class,
            check_in_time,
            self.discount_card.clone(),
        ))
    }
}

impl Scenario {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_reader(BufReader::new(file)).map_err(|source| ConfigError::Yaml {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }
}
