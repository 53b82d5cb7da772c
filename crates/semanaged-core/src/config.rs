//! Configuration file parsing and merging
//!
//! This module handles parsing of `semanaged.toml` and `semanaged.local.toml`
//! files. The local file is optional and overrides the base file key by key.

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::level_filters::LevelFilter;

use crate::deploy::Endpoint;
use crate::{Error, Result};

/// Name of the base configuration file
pub const CONFIG_FILE: &str = "semanaged.toml";

/// Name of the optional local override file
pub const LOCAL_CONFIG_FILE: &str = "semanaged.local.toml";

/// Environment variable consulted when `java_home` is not configured
pub const JAVA_HOME_ENV: &str = "JAVA_HOME";

/// Container configuration, fixed for the lifetime of a container instance
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Start the worker suspended with a debug agent on port 8787
    pub debug: bool,

    /// Keep materialized files after undeploy
    pub keep_deployment_archives: bool,

    /// Host the worker's management endpoint is reached on
    pub host: String,

    /// Port the worker's management endpoint binds to
    pub port: u16,

    /// Directory scanned for additional `.jar` dependencies
    pub libraries_path: Option<Utf8PathBuf>,

    /// Extra JVM options, separated by whitespace
    pub additional_java_opts: Option<String>,

    /// Log verbosity
    pub log_level: LogLevel,

    /// Runtime home; falls back to `$JAVA_HOME`
    pub java_home: Option<Utf8PathBuf>,

    /// Root directory deployments are materialized under (default: "target")
    pub output_dir: Utf8PathBuf,

    /// Readiness budget for normal deployments
    pub startup_timeout_secs: u64,

    /// Readiness budget when `debug` is enabled
    pub debug_startup_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            debug: false,
            keep_deployment_archives: false,
            host: "localhost".to_string(),
            port: 9999,
            libraries_path: None,
            additional_java_opts: None,
            log_level: LogLevel::default(),
            java_home: None,
            output_dir: Utf8PathBuf::from("target"),
            startup_timeout_secs: 5,
            debug_startup_timeout_secs: 15,
        }
    }
}

/// Log verbosity levels
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Equivalent tracing filter
    pub fn level_filter(self) -> LevelFilter {
        match self {
            LogLevel::Off => LevelFilter::OFF,
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

impl Config {
    /// Load configuration from a directory.
    ///
    /// This loads `semanaged.toml` and merges `semanaged.local.toml` on top
    /// of it if it exists. Missing files yield the defaults.
    pub fn load(dir: &Utf8Path) -> Result<Self> {
        let config_path = dir.join(CONFIG_FILE);
        let local_config_path = dir.join(LOCAL_CONFIG_FILE);

        let base_config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str::<toml::Value>(&content)?
        } else {
            toml::Value::Table(toml::map::Map::new())
        };

        let local_config = if local_config_path.exists() {
            let content = std::fs::read_to_string(&local_config_path)?;
            Some(toml::from_str::<toml::Value>(&content)?)
        } else {
            None
        };

        let merged = match local_config {
            Some(local) => merge_toml_values(base_config, local),
            None => base_config,
        };

        let config: Config = merged.try_into()?;
        tracing::debug!(dir = %dir, "Loaded configuration");
        Ok(config)
    }

    /// Load configuration from a string
    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    /// Additional JVM options split on runs of whitespace
    pub fn java_opts(&self) -> Vec<String> {
        split_java_opts(self.additional_java_opts.as_deref().unwrap_or_default())
    }

    /// Readiness budget for the current mode
    pub fn startup_timeout(&self) -> Duration {
        if self.debug {
            Duration::from_secs(self.debug_startup_timeout_secs)
        } else {
            Duration::from_secs(self.startup_timeout_secs)
        }
    }

    /// Management endpoint of the worker
    pub fn endpoint(&self) -> Endpoint {
        Endpoint::new(self.host.clone(), self.port)
    }

    /// Runtime home from the configuration or `$JAVA_HOME`
    pub fn resolve_java_home(&self) -> Result<Utf8PathBuf> {
        if let Some(ref home) = self.java_home {
            return Ok(home.clone());
        }

        match std::env::var(JAVA_HOME_ENV) {
            Ok(home) if !home.trim().is_empty() => Ok(Utf8PathBuf::from(home)),
            _ => Err(Error::config(
                "Runtime home is not set",
                "Set `java_home` in semanaged.toml or export JAVA_HOME",
            )),
        }
    }
}

/// Split a raw option string on runs of whitespace.
///
/// Blank input yields no options rather than a single empty token.
pub fn split_java_opts(raw: &str) -> Vec<String> {
    raw.split_whitespace().map(str::to_string).collect()
}

/// Merge two TOML values:
/// - Tables: recursively merged
/// - Arrays: local replaces base (not merged)
/// - Primitives: local overrides base
fn merge_toml_values(base: toml::Value, local: toml::Value) -> toml::Value {
    match (base, local) {
        (toml::Value::Table(mut base_table), toml::Value::Table(local_table)) => {
            for (key, local_value) in local_table {
                if let Some(base_value) = base_table.remove(&key) {
                    base_table.insert(key, merge_toml_values(base_value, local_value));
                } else {
                    base_table.insert(key, local_value);
                }
            }
            toml::Value::Table(base_table)
        }
        (_, local) => local,
    }
}
