//! Configuration loading from TOML files
//!
//! Config file is selected via:
//! 1. --config <path> command line argument
//! 2. CONFIG_FILE environment variable
//! 3. Default: config/node.toml

use anyhow::Context;
use serde::{Deserialize, Deserializer};
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone, Deserialize)]
pub struct NodeConfig {
    /// Identifier for this node in logs and exporter output
    #[serde(default = "default_node_id")]
    pub id: String,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self { id: default_node_id() }
    }
}

fn default_node_id() -> String {
    "storenode".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    /// Push cadence used by the owning process's scheduler
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Extended-period length in seconds; 0 disables extended resets.
    /// Accepts an integer or a numeric string.
    #[serde(default, deserialize_with = "deserialize_extended_period")]
    pub extended_period_secs: u64,
    /// Management exporter HTTP port (0 to disable)
    #[serde(default = "default_exporter_port")]
    pub exporter_port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            extended_period_secs: 0,
            exporter_port: default_exporter_port(),
        }
    }
}

fn default_interval_secs() -> u64 {
    10
}

fn default_exporter_port() -> u16 {
    9600
}

/// Lenient extended-period field: integer, or a string holding one. An
/// unparsable string logs a warning and disables extended resets rather
/// than failing the whole config load.
fn deserialize_extended_period<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::{self, Visitor};

    struct PeriodVisitor;

    impl<'de> Visitor<'de> for PeriodVisitor {
        type Value = u64;

        fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
            formatter.write_str("a non-negative integer or numeric string")
        }

        fn visit_u64<E>(self, value: u64) -> Result<u64, E>
        where
            E: de::Error,
        {
            Ok(value)
        }

        fn visit_i64<E>(self, value: i64) -> Result<u64, E>
        where
            E: de::Error,
        {
            Ok(u64::try_from(value).unwrap_or(0))
        }

        fn visit_str<E>(self, value: &str) -> Result<u64, E>
        where
            E: de::Error,
        {
            match value.trim().parse::<u64>() {
                Ok(secs) => Ok(secs),
                Err(_) => {
                    warn!(value = %value, "unparsable extended period, extended resets disabled");
                    Ok(0)
                }
            }
        }
    }

    deserializer.deserialize_any(PeriodVisitor)
}

#[derive(Debug, Clone, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub node: NodeConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Main configuration struct used throughout the engine
#[derive(Debug, Clone)]
pub struct Config {
    node_id: String,
    metrics_interval_secs: u64,
    extended_period_secs: u64,
    exporter_port: u16,
    config_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            node_id: default_node_id(),
            metrics_interval_secs: default_interval_secs(),
            extended_period_secs: 0,
            exporter_port: default_exporter_port(),
            config_file: "default".to_string(),
        }
    }
}

impl Config {
    /// Determine config file path from args or environment
    pub fn resolve_config_path(args: &[String]) -> String {
        // Check for --config argument
        for (i, arg) in args.iter().enumerate() {
            if arg == "--config" {
                if let Some(path) = args.get(i + 1) {
                    return path.clone();
                }
            }
            if let Some(path) = arg.strip_prefix("--config=") {
                return path.to_string();
            }
        }

        // Check CONFIG_FILE environment variable
        if let Ok(path) = env::var("CONFIG_FILE") {
            return path;
        }

        "config/node.toml".to_string()
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let toml_config: TomlConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        Ok(Self {
            node_id: toml_config.node.id,
            metrics_interval_secs: toml_config.metrics.interval_secs,
            extended_period_secs: toml_config.metrics.extended_period_secs,
            exporter_port: toml_config.metrics.exporter_port,
            config_file: path.display().to_string(),
        })
    }

    /// Load configuration - tries the TOML file first, falls back to
    /// defaults on any error
    pub fn load_from_path(path: &str) -> Self {
        match Self::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(error = %e, "using default configuration");
                Self::default()
            }
        }
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    pub fn metrics_interval_secs(&self) -> u64 {
        self.metrics_interval_secs
    }

    pub fn extended_period_secs(&self) -> u64 {
        self.extended_period_secs
    }

    pub fn extended_period(&self) -> Duration {
        Duration::from_secs(self.extended_period_secs)
    }

    pub fn exporter_port(&self) -> u16 {
        self.exporter_port
    }

    pub fn config_file(&self) -> &str {
        &self.config_file
    }

    /// Builder method for tests to set the extended period
    #[cfg(test)]
    pub fn with_extended_period_secs(mut self, secs: u64) -> Self {
        self.extended_period_secs = secs;
        self
    }
}
