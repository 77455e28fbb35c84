//! Configuration management for `starbench`.
//!
//! Configuration sources, lowest to highest precedence:
//! 1. Built-in defaults
//! 2. User config (`~/.config/starbench/config.yaml`)
//! 3. Project config (`./starbench.yaml`, or the file given with `--config`)
//! 4. Environment variables (`STARBENCH_NUM_CORES=4` sets `num-cores`)
//! 5. Command line flags
//!
//! Every layer is a flat map of kebab-case keys to strings; nested YAML keys
//! are joined with dots and sequences with commas. Typed values are only
//! produced at the end, by [`BenchSettings::from_layer`].

use crate::error::{Result, ResultExt, StarbenchError};
use crate::estimator::{DEFAULT_MAX_ERROR, StopPolicy};
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use tracing::debug;

/// Prefix of the environment variables read as configuration.
pub const ENV_PREFIX: &str = "STARBENCH_";

/// Project config file looked up in the current directory.
pub const PROJECT_CONFIG_FILE: &str = "starbench.yaml";

pub const KEY_NUM_CORES: &str = "num-cores";
pub const KEY_CORES_PER_RUN: &str = "cores-per-run";
pub const KEY_STOP: &str = "stop";
pub const KEY_MAX_ERROR: &str = "max-error";
pub const KEY_STOP_ON_ERROR: &str = "stop-on-error";
pub const KEY_CMAKE_PATH: &str = "cmake-path";
pub const KEY_OUTPUT_DIR: &str = "output-dir";

/// One source of configuration values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigLayer {
    pub values: BTreeMap<String, String>,
}

impl ConfigLayer {
    /// Merge another layer on top of this one (higher precedence wins).
    pub fn merge_from(&mut self, other: &Self) {
        for (key, value) in &other.values {
            self.values.insert(key.clone(), value.clone());
        }
    }

    /// Merge multiple layers in precedence order (lowest to highest).
    #[must_use]
    pub fn merge_layers(layers: &[Self]) -> Self {
        let mut merged = Self::default();
        for layer in layers {
            merged.merge_from(layer);
        }
        merged
    }

    pub fn insert(&mut self, key: &str, value: impl Into<String>) {
        self.values.insert(normalize_key(key), value.into());
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(&normalize_key(key)).map(String::as_str)
    }

    /// Build a layer from a YAML file path. Missing files return empty config.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn from_yaml(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_yaml_str(&contents)
    }

    /// Build a layer from YAML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid YAML.
    pub fn from_yaml_str(contents: &str) -> Result<Self> {
        let value: serde_yaml::Value = serde_yaml::from_str(contents)?;
        let mut flat = BTreeMap::new();
        flatten_yaml(&value, "", &mut flat);

        let mut layer = Self::default();
        for (key, value) in flat {
            layer.insert(&key, value);
        }
        Ok(layer)
    }

    /// Build a layer from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_env_vars(env::vars())
    }

    /// Build a layer from `(name, value)` pairs; only `STARBENCH_*` names count.
    #[must_use]
    pub fn from_env_vars<I>(vars: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut layer = Self::default();
        for (key, value) in vars {
            if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
                layer.insert(stripped, value);
            }
        }
        layer
    }
}

/// Values given on the command line.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub num_cores: Option<usize>,
    pub cores_per_run: Option<usize>,
    pub stop: Option<StopPolicy>,
    pub max_error: Option<f64>,
    pub stop_on_error: Option<bool>,
    pub cmake_path: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
}

impl CliOverrides {
    #[must_use]
    pub fn as_layer(&self) -> ConfigLayer {
        let mut layer = ConfigLayer::default();

        if let Some(num_cores) = self.num_cores {
            layer.insert(KEY_NUM_CORES, num_cores.to_string());
        }
        if let Some(cores_per_run) = self.cores_per_run {
            layer.insert(KEY_CORES_PER_RUN, cores_per_run.to_string());
        }
        if let Some(stop) = self.stop {
            layer.insert(KEY_STOP, stop.as_str());
        }
        if let Some(max_error) = self.max_error {
            layer.insert(KEY_MAX_ERROR, max_error.to_string());
        }
        if let Some(stop_on_error) = self.stop_on_error {
            layer.insert(KEY_STOP_ON_ERROR, stop_on_error.to_string());
        }
        if let Some(path) = &self.cmake_path {
            layer.insert(KEY_CMAKE_PATH, path.to_string_lossy());
        }
        if let Some(path) = &self.output_dir {
            layer.insert(KEY_OUTPUT_DIR, path.to_string_lossy());
        }

        layer
    }
}

/// Default config layer (lowest precedence).
#[must_use]
pub fn default_config_layer() -> ConfigLayer {
    let mut layer = ConfigLayer::default();
    let num_cores = thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get);
    layer.insert(KEY_NUM_CORES, num_cores.to_string());
    layer.insert(KEY_CORES_PER_RUN, "1");
    layer.insert(KEY_STOP, StopPolicy::default().as_str());
    layer.insert(KEY_MAX_ERROR, DEFAULT_MAX_ERROR.to_string());
    layer.insert(KEY_STOP_ON_ERROR, "true");
    layer.insert(KEY_CMAKE_PATH, "cmake");
    layer
}

/// Load user config (`~/.config/starbench/config.yaml`).
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_user_config() -> Result<ConfigLayer> {
    let Ok(home) = env::var("HOME") else {
        return Ok(ConfigLayer::default());
    };
    let path = Path::new(&home)
        .join(".config")
        .join("starbench")
        .join("config.yaml");
    ConfigLayer::from_yaml(&path)
}

/// Load the project config: `explicit` if given (it must exist), otherwise
/// `./starbench.yaml` when present.
///
/// # Errors
///
/// Returns an error if an explicit file is missing, or if a file cannot be
/// read or parsed.
pub fn load_project_config(explicit: Option<&Path>) -> Result<ConfigLayer> {
    match explicit {
        Some(path) if !path.is_file() => Err(StarbenchError::config(format!(
            "config file {} does not exist",
            path.display()
        ))),
        Some(path) => ConfigLayer::from_yaml(path),
        None => ConfigLayer::from_yaml(Path::new(PROJECT_CONFIG_FILE)),
    }
}

/// Load configuration with the full precedence order.
///
/// # Errors
///
/// Returns an error if any config file cannot be read or parsed.
pub fn load_config(explicit: Option<&Path>, cli: &CliOverrides) -> Result<ConfigLayer> {
    let layer = ConfigLayer::merge_layers(&[
        default_config_layer(),
        load_user_config()?,
        load_project_config(explicit)?,
        ConfigLayer::from_env(),
        cli.as_layer(),
    ]);
    debug!(values = ?layer.values, "Configuration loaded");
    Ok(layer)
}

/// Typed settings shared by the benchmarking commands.
#[derive(Debug, Clone, PartialEq)]
pub struct BenchSettings {
    pub num_cores: usize,
    pub cores_per_run: usize,
    pub stop: StopPolicy,
    pub max_error: f64,
    pub stop_on_error: bool,
    pub cmake_path: PathBuf,
    pub output_dir: Option<PathBuf>,
}

impl BenchSettings {
    /// Read typed settings from a merged layer; absent keys take defaults.
    ///
    /// # Errors
    ///
    /// Returns `StarbenchError::Config` if a value cannot be parsed.
    pub fn from_layer(layer: &ConfigLayer) -> Result<Self> {
        let defaults = default_config_layer();
        let get = |key: &str| layer.get(key).or_else(|| defaults.get(key)).unwrap_or_default();

        let max_error = parse_value::<f64>(KEY_MAX_ERROR, get(KEY_MAX_ERROR))?;
        if !max_error.is_finite() || max_error < 0.0 {
            return Err(StarbenchError::config(format!(
                "{KEY_MAX_ERROR} must be a non-negative number, got {max_error}"
            )));
        }

        let stop_on_error = parse_bool(get(KEY_STOP_ON_ERROR)).ok_or_else(|| {
            StarbenchError::config(format!(
                "{KEY_STOP_ON_ERROR} must be a boolean, got '{}'",
                get(KEY_STOP_ON_ERROR)
            ))
        })?;

        let output_dir = layer
            .get(KEY_OUTPUT_DIR)
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(PathBuf::from);

        Ok(Self {
            num_cores: parse_value(KEY_NUM_CORES, get(KEY_NUM_CORES))?,
            cores_per_run: parse_value(KEY_CORES_PER_RUN, get(KEY_CORES_PER_RUN))?,
            stop: get(KEY_STOP).parse()?,
            max_error,
            stop_on_error,
            cmake_path: PathBuf::from(get(KEY_CMAKE_PATH).trim()),
            output_dir,
        })
    }
}

fn parse_value<T>(key: &str, value: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| StarbenchError::config(format!("invalid {key} '{value}': {e}")))
}

fn normalize_key(key: &str) -> String {
    key.trim().to_lowercase().replace('_', "-")
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}

fn flatten_yaml(value: &serde_yaml::Value, prefix: &str, out: &mut BTreeMap<String, String>) {
    match value {
        serde_yaml::Value::Mapping(map) => {
            for (key, value) in map {
                let Some(key_str) = key.as_str() else {
                    continue;
                };
                let next_prefix = if prefix.is_empty() {
                    key_str.to_string()
                } else {
                    format!("{prefix}.{key_str}")
                };
                flatten_yaml(value, &next_prefix, out);
            }
        }
        serde_yaml::Value::Sequence(values) => {
            let joined = values
                .iter()
                .filter_map(yaml_scalar_to_string)
                .collect::<Vec<_>>()
                .join(",");
            out.insert(prefix.to_string(), joined);
        }
        _ => {
            if let Some(value) = yaml_scalar_to_string(value) {
                out.insert(prefix.to_string(), value);
            }
        }
    }
}

fn yaml_scalar_to_string(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::Bool(v) => Some(v.to_string()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Null
        | serde_yaml::Value::Sequence(_)
        | serde_yaml::Value::Mapping(_) => None,
        serde_yaml::Value::Tagged(tagged) => yaml_scalar_to_string(&tagged.value),
    }
}
