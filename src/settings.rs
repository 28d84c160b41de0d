//! Layered runtime settings.
//!
//! Sources, lowest precedence first: built-in defaults, an optional TOML
//! file, `URBANFLOW_*` environment variables. Command-line flags are applied
//! on top by the binary.
//!
//! ```toml
//! mode = "live"
//! traffic_interval_ms = 5000
//! fallback = "synthetic"
//!
//! [api]
//! base_url = "http://localhost:4566/restapis"
//! api_id = "iianki73yo"
//! stage = "dev"
//! ```
//!
//! Nested keys use a double underscore in the environment, e.g.
//! `URBANFLOW_API__API_ID=iianki73yo`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use urbanflow_adapters::endpoints::{
    DEFAULT_ALERTS_ENDPOINT, DEFAULT_BASE_URL, DEFAULT_STAGE, DEFAULT_TRAFFIC_ENDPOINT,
};
use urbanflow_adapters::ApiEndpoints;
use urbanflow_core::notifier::DEFAULT_ALERT_INTERVAL;
use urbanflow_core::{AggregatorConfig, FallbackPolicy, Mode, NotifierConfig};
use urbanflow_types::{vienna_sensors, SensorSet};

const ENV_PREFIX: &str = "URBANFLOW";

/// Where the REST API lives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    pub base_url: String,
    pub api_id: String,
    pub stage: String,
    pub traffic_endpoint: String,
    pub alerts_endpoint: String,
    pub timeout_ms: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_id: String::new(),
            stage: DEFAULT_STAGE.to_string(),
            traffic_endpoint: DEFAULT_TRAFFIC_ENDPOINT.to_string(),
            alerts_endpoint: DEFAULT_ALERTS_ENDPOINT.to_string(),
            timeout_ms: 10_000,
        }
    }
}

impl ApiSettings {
    pub fn endpoints(&self) -> ApiEndpoints {
        ApiEndpoints::new(&self.base_url, &self.api_id, &self.stage)
            .with_traffic_endpoint(&self.traffic_endpoint)
            .with_alerts_endpoint(&self.alerts_endpoint)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Everything the monitor needs to run.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub mode: Mode,
    pub api: ApiSettings,
    /// Traffic poll period; the mode's default when unset.
    pub traffic_interval_ms: Option<u64>,
    /// Alert poll period; 5 s when unset.
    pub alert_interval_ms: Option<u64>,
    pub fallback: FallbackPolicy,
    /// JSON file with the sensor set; the Vienna reference set when unset.
    pub sensors_file: Option<PathBuf>,
}

impl Settings {
    /// Load settings from the environment and an optional config file.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_env(path, Environment::with_prefix(ENV_PREFIX))
    }

    fn load_with_env(path: Option<&Path>, env: Environment) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }
        let config = builder
            .add_source(
                env.prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| match path {
                Some(path) => format!("failed to load settings from {}", path.display()),
                None => "failed to load settings from the environment".to_string(),
            })?;

        config
            .try_deserialize()
            .context("invalid settings")
    }

    pub fn traffic_interval(&self) -> Duration {
        self.traffic_interval_ms
            .map(Duration::from_millis)
            .unwrap_or_else(|| self.mode.default_traffic_interval())
    }

    pub fn alert_interval(&self) -> Duration {
        self.alert_interval_ms
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_ALERT_INTERVAL)
    }

    pub fn aggregator_config(&self) -> AggregatorConfig {
        AggregatorConfig {
            interval: self.traffic_interval(),
            fallback: self.fallback,
            ..AggregatorConfig::for_mode(self.mode)
        }
    }

    pub fn notifier_config(&self) -> NotifierConfig {
        NotifierConfig {
            interval: self.alert_interval(),
            ..NotifierConfig::default()
        }
    }

    /// The sensor set to monitor.
    pub fn load_sensors(&self) -> Result<SensorSet> {
        let Some(path) = &self.sensors_file else {
            return Ok(vienna_sensors());
        };
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read sensors from {}", path.display()))?;
        let sensors = SensorSet::from_json(&json)
            .with_context(|| format!("invalid sensor file {}", path.display()))?;
        anyhow::ensure!(!sensors.is_empty(), "sensor file {} is empty", path.display());
        Ok(sensors)
    }
}
