/// Service configuration loader - parses geoquake.toml
///
/// Keeps data locations and correlation defaults out of the code so a
/// different station network or catalog can be pointed at without
/// recompiling. Every field has a default; a missing file means defaults.

use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::analysis::proximity::RadiusRule;
use crate::error::GeoError;

/// Default configuration file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "geoquake.toml";

/// Environment variable overriding `data.root`.
pub const DATA_ROOT_ENV: &str = "GEOQUAKE_DATA_ROOT";

/// Upper bound for every day-count setting (about a century).
pub const MAX_WINDOW_DAYS: i64 = 36_600;

/// Root configuration structure for TOML parsing
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub data: DataConfig,
    pub correlation: CorrelationConfig,
    pub aggregation: AggregationConfig,
    pub server: ServerConfig,
    pub loader: LoaderConfig,
}

/// Where the flat files live.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub root: PathBuf,
    /// Directory of `<STATION>.tenv` files, relative to `root`.
    pub tenv_dir: PathBuf,
    /// Station position table, relative to `root`.
    pub station_positions: PathBuf,
    /// Event catalog CSV, relative to `root`.
    pub event_catalog: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("geodesy_data"),
            tenv_dir: PathBuf::from("IGS14"),
            station_positions: PathBuf::from("stations.txt"),
            event_catalog: PathBuf::from("earthquakes.csv"),
        }
    }
}

impl DataConfig {
    pub fn tenv_path(&self) -> PathBuf {
        self.root.join(&self.tenv_dir)
    }

    pub fn positions_path(&self) -> PathBuf {
        self.root.join(&self.station_positions)
    }

    pub fn catalog_path(&self) -> PathBuf {
        self.root.join(&self.event_catalog)
    }
}

/// How a station is associated with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RadiusMode {
    /// Use `radius_km` for every event.
    Fixed,
    /// Scale the radius with magnitude (UNR step-catalog threshold).
    MagnitudeScaled,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CorrelationConfig {
    pub radius_mode: RadiusMode,
    pub radius_km: f64,
    /// Optional time window around the origin; both must be set to apply.
    pub window_before_days: Option<i64>,
    pub window_after_days: Option<i64>,
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        Self {
            radius_mode: RadiusMode::Fixed,
            radius_km: 100.0,
            window_before_days: None,
            window_after_days: None,
        }
    }
}

impl CorrelationConfig {
    /// The radius rule requests fall back to when they give no `radius_km`.
    pub fn default_radius_rule(&self) -> RadiusRule {
        match self.radius_mode {
            RadiusMode::Fixed => RadiusRule::Fixed(self.radius_km),
            RadiusMode::MagnitudeScaled => RadiusRule::MagnitudeScaled,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AggregationConfig {
    /// Max days between the origin and the before/after samples of a step.
    pub step_window_days: i64,
    /// Days after the origin searched for the peak offset.
    pub peak_window_days: i64,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            step_window_days: 30,
            peak_window_days: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Worker threads used to parse station files at load time.
    pub threads: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self { threads: 4 }
    }
}

impl AppConfig {
    /// Rejects values that parse but would break correlation at request time.
    pub fn validate(&self, path: &Path) -> Result<(), GeoError> {
        let bad = |name: &'static str, reason: String| GeoError::ConfigValue {
            path: path.to_path_buf(),
            name,
            reason,
        };

        let radius = self.correlation.radius_km;
        if !(radius.is_finite() && radius > 0.0) {
            return Err(bad("correlation.radius_km", format!("must be positive, got {}", radius)));
        }

        let windows = [
            ("correlation.window_before_days", self.correlation.window_before_days),
            ("correlation.window_after_days", self.correlation.window_after_days),
            ("aggregation.step_window_days", Some(self.aggregation.step_window_days)),
            ("aggregation.peak_window_days", Some(self.aggregation.peak_window_days)),
        ];
        for (name, days) in windows {
            if let Some(days) = days {
                if !(0..=MAX_WINDOW_DAYS).contains(&days) {
                    return Err(bad(name, format!("must be within 0..={}, got {}", MAX_WINDOW_DAYS, days)));
                }
            }
        }

        if self.loader.threads == 0 {
            return Err(bad("loader.threads", "must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// Parses and validates configuration text.
pub fn parse_config(path: &Path, contents: &str) -> Result<AppConfig, GeoError> {
    let config: AppConfig = toml::from_str(contents).map_err(|e| GeoError::Config {
        path: path.to_path_buf(),
        source: e,
    })?;
    config.validate(path)?;
    Ok(config)
}

/// Loads configuration from `path`.
///
/// An explicitly given path must exist. With `None`, `geoquake.toml` in the
/// working directory is used if present, defaults otherwise. `.env` is read
/// first so `GEOQUAKE_DATA_ROOT` can override the data root.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, GeoError> {
    dotenv::dotenv().ok();

    let mut config = match path {
        Some(p) => read_config_file(p)?,
        None => {
            let default_path = Path::new(DEFAULT_CONFIG_PATH);
            if default_path.exists() {
                read_config_file(default_path)?
            } else {
                log::info!("no {} found, using defaults", DEFAULT_CONFIG_PATH);
                AppConfig::default()
            }
        }
    };

    if let Ok(root) = env::var(DATA_ROOT_ENV) {
        if !root.trim().is_empty() {
            config.data.root = PathBuf::from(root);
        }
    }

    Ok(config)
}

fn read_config_file(path: &Path) -> Result<AppConfig, GeoError> {
    let contents = fs::read_to_string(path).map_err(|e| GeoError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    parse_config(path, &contents)
}
