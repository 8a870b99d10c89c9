use crate::parking::fee::{FeePolicy, RoundingMode};
use crate::parking::registry::DEFAULT_CAPACITY;
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// Registers an override handler for a specific config key, so that `--set key=value` can change it.
macro_rules! register_override {
    ($key:literal, $func:expr) => {
        inventory::submit! {
            OverrideHandler {
                key: $key,
                apply: $func,
            }
        }
    };
}

struct OverrideHandler {
    key: &'static str,
    apply: fn(config: &mut Config, value: &str) -> Result<(), ConfigError>,
}

// Collect all OverrideHandler submitted from anywhere in the crate
inventory::collect!(OverrideHandler);

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to access {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path:?}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("invalid value `{value}` for `{key}`")]
    InvalidValue { key: String, value: String },
    #[error("invalid KEY=VALUE: no `=` found in `{0}`")]
    MalformedOverride(String),
}

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct CommandLineArgs {
    #[arg(long, short)]
    pub config: Option<PathBuf>,
    #[arg(long = "set", value_parser = parse_key_val)]
    pub overrides: Vec<(String, String)>,
}

impl CommandLineArgs {
    pub fn new_with_path(path: impl Into<PathBuf>) -> Self {
        CommandLineArgs {
            config: Some(path.into()),
            overrides: Vec::new(),
        }
    }
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) => Ok((key.to_string(), value.to_string())),
        None => Err(ConfigError::MalformedOverride(s.to_string()).to_string()),
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Config {
    #[serde(default)]
    pub modules: Modules,
    /// Path of the file this config was read from. Relative paths inside the config are resolved against it.
    #[serde(skip)]
    context: Option<PathBuf>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Modules {
    #[serde(default)]
    pub facility: Option<Facility>,
    #[serde(default)]
    pub pricing: Option<FeePolicy>,
    #[serde(default)]
    pub output: Option<Output>,
    #[serde(default)]
    pub scenario: Option<ScenarioFiles>,
}

impl TryFrom<CommandLineArgs> for Config {
    type Error = ConfigError;

    fn try_from(args: CommandLineArgs) -> Result<Self, Self::Error> {
        let mut config = match &args.config {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };
        config.apply_overrides(&args.overrides)?;
        Ok(config)
    }
}

impl Config {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: Config =
            serde_yaml::from_reader(BufReader::new(file)).map_err(|source| ConfigError::Yaml {
                path: path.to_path_buf(),
                source,
            })?;
        config.set_context(Some(path.to_path_buf()));
        Ok(config)
    }

    pub fn set_context(&mut self, context: Option<PathBuf>) {
        self.context = context;
    }

    pub fn context(&self) -> &Option<PathBuf> {
        &self.context
    }

    /// Apply generic key-value overrides to the config, e.g. facility.capacity=30
    pub fn apply_overrides(&mut self, overrides: &[(String, String)]) -> Result<(), ConfigError> {
        if !overrides.is_empty() {
            info!("Applying overrides: {:?}", overrides);
        }

        for (key, value) in overrides {
            let key_str = key.as_str();

            if let Some(handler) = inventory::iter::<OverrideHandler>().find(|h| h.key == key_str) {
                (handler.apply)(self, value)?;
            } else {
                warn!("No override handler found for key: {}", key);
            }
        }
        Ok(())
    }

    pub fn facility(&self) -> Facility {
        self.modules.facility.clone().unwrap_or_default()
    }

    pub fn set_facility(&mut self, facility: Facility) {
        self.modules.facility = Some(facility);
    }

    pub fn pricing(&self) -> FeePolicy {
        self.modules.pricing.unwrap_or_default()
    }

    pub fn set_pricing(&mut self, pricing: FeePolicy) {
        self.modules.pricing = Some(pricing);
    }

    pub fn output(&self) -> Output {
        self.modules.output.clone().unwrap_or_default()
    }

    pub fn set_output(&mut self, output: Output) {
        self.modules.output = Some(output);
    }

    pub fn scenario(&self) -> Option<ScenarioFiles> {
        self.modules.scenario.clone()
    }

    pub fn set_scenario(&mut self, scenario: ScenarioFiles) {
        self.modules.scenario = Some(scenario);
    }

    /// Absolute or config-relative location of the output directory.
    pub fn output_dir(&self) -> PathBuf {
        resolve_path(&self.context, &self.output().output_dir)
    }
}

pub fn resolve_path(config_path: &Option<PathBuf>, file_path: &PathBuf) -> PathBuf {
    // paths starting with ./ are meant relative to the working directory, tests rely on that
    if file_path.is_absolute() || file_path.starts_with("./") {
        return file_path.clone();
    }

    if let Some(path) = config_path.as_ref().and_then(|c| c.parent()) {
        path.join(file_path)
    } else {
        file_path.clone()
    }
}

pub fn write_config(config: &Config, output_path: &Path) -> Result<PathBuf, ConfigError> {
    let output_config = output_path.join("output_config.yml");
    let io_err = |source| ConfigError::Io {
        path: output_config.clone(),
        source,
    };
    std::fs::create_dir_all(output_path).map_err(io_err)?;
    let file = File::create(&output_config).map_err(io_err)?;
    serde_yaml::to_writer(BufWriter::new(file), config).map_err(|source| ConfigError::Yaml {
        path: output_config.clone(),
        source,
    })?;
    Ok(output_config)
}

fn invalid(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Facility {
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

fn default_capacity() -> usize {
    DEFAULT_CAPACITY
}

impl Default for Facility {
    fn default() -> Self {
        Facility {
            capacity: default_capacity(),
        }
    }
}

register_override!("facility.capacity", |config, value| {
    let mut facility = config.facility();
    facility.capacity = value
        .parse()
        .map_err(|_| invalid("facility.capacity", value))?;
    config.set_facility(facility);
    Ok(())
});

register_override!("pricing.discount_percent", |config, value| {
    let mut pricing = config.pricing();
    pricing.discount_percent = value
        .parse()
        .map_err(|_| invalid("pricing.discount_percent", value))?;
    config.set_pricing(pricing);
    Ok(())
});

register_override!("pricing.rounding", |config, value| {
    let mut pricing = config.pricing();
    pricing.rounding = match value.to_lowercase().replace('_', "-").as_str() {
        "half-away-from-zero" | "halfawayfromzero" => RoundingMode::HalfAwayFromZero,
        "half-even" | "halfeven" | "bankers" => RoundingMode::HalfEven,
        _ => return Err(invalid("pricing.rounding", value)),
    };
    config.set_pricing(pricing);
    Ok(())
});

register_override!("pricing.clamp_negative", |config, value| {
    let mut pricing = config.pricing();
    pricing.clamp_negative = value
        .parse()
        .map_err(|_| invalid("pricing.clamp_negative", value))?;
    config.set_pricing(pricing);
    Ok(())
});

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Output {
    pub output_dir: PathBuf,
    #[serde(default)]
    pub logging: Logging,
}

impl Default for Output {
    fn default() -> Self {
        Output {
            output_dir: PathBuf::from("./"),
            logging: Logging::None,
        }
    }
}

register_override!("output.output_dir", |config, value| {
    let mut output = config.output();
    output.output_dir = PathBuf::from(value);
    config.set_output(output);
    Ok(())
});

register_override!("output.logging", |config, value| {
    let mut output = config.output();
    output.logging = match value.to_lowercase().as_str() {
        "info" => Logging::Info,
        "none" => Logging::None,
        _ => return Err(invalid("output.logging", value)),
    };
    config.set_output(output);
    Ok(())
});

/// Whether the json log file is written. `tracing` levels cannot express "off" in a config file.
#[derive(PartialEq, Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub enum Logging {
    #[default]
    None,
    Info,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ScenarioFiles {
    pub vehicles: PathBuf,
}

register_override!("scenario.vehicles", |config, value| {
    config.set_scenario(ScenarioFiles {
        vehicles: PathBuf::from(value),
    });
    Ok(())
});
