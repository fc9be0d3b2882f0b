//! Solver configuration
//!
//! Values come from built-in defaults, an optional JSON file and `SATSOLVER_*`
//! environment variables, in increasing priority. Every key is optional in
//! the file; missing keys keep their defaults.
//!
//! ```json
//! {
//!     "obsoletes-mode": "hard",
//!     "allow-uninstall": false,
//!     "multiversion": ["kernel"],
//!     "max-steps": 100000
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while loading configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse solver configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid value \"{value}\" for {key}")]
    InvalidValue { key: String, value: String },
}

/// How `obsoletes` relations take part in solving
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObsoletesMode {
    /// Obsoletes only rank candidates and pair transaction steps; a
    /// `conflicts` between the same pair is still enforced.
    #[default]
    Soft,
    /// Obsoletes are additionally enforced like a conflict.
    Hard,
}

/// Where a configuration value came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    Default,
    File,
    Environment(String),
}

/// Engine configuration shared by all solves of a [`crate::Solver`]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct SolverConfig {
    pub obsoletes_mode: ObsoletesMode,
    pub allow_uninstall: bool,
    /// Lock keeps installed matches installed instead of forcing them out
    pub lock_installed: bool,
    pub install_recommends: bool,
    pub multiversion: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_steps: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    pub max_problems: usize,
    pub minimize_cores: bool,
    pub debug_level: u8,

    #[serde(skip)]
    sources: HashMap<String, ConfigSource>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            obsoletes_mode: ObsoletesMode::Soft,
            allow_uninstall: false,
            lock_installed: false,
            install_recommends: true,
            multiversion: Vec::new(),
            max_steps: None,
            timeout_ms: None,
            max_problems: 8,
            minimize_cores: true,
            debug_level: 0,
            sources: HashMap::new(),
        }
    }
}

impl SolverConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        let mut config: SolverConfig = serde_json::from_str(content)?;

        if let Ok(serde_json::Value::Object(map)) = serde_json::from_str::<serde_json::Value>(content) {
            for key in map.keys() {
                config.sources.insert(key.clone(), ConfigSource::File);
            }
        }

        Ok(config)
    }

    /// Load from a JSON file; a missing file yields the defaults
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;

        Self::from_json_str(&content)
    }

    /// Apply `SATSOLVER_*` environment overrides
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_env_from(|var| std::env::var(var).ok())
    }

    pub(crate) fn apply_env_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).filter(|v| !v.is_empty());

        if let Some(value) = get("SATSOLVER_MAX_STEPS") {
            self.max_steps = Some(parse_value("max-steps", &value)?);
            self.mark_env("max-steps", "SATSOLVER_MAX_STEPS");
        }

        if let Some(value) = get("SATSOLVER_TIMEOUT_MS") {
            self.timeout_ms = Some(parse_value("timeout-ms", &value)?);
            self.mark_env("timeout-ms", "SATSOLVER_TIMEOUT_MS");
        }

        if let Some(value) = get("SATSOLVER_ALLOW_UNINSTALL") {
            self.allow_uninstall = parse_bool("allow-uninstall", &value)?;
            self.mark_env("allow-uninstall", "SATSOLVER_ALLOW_UNINSTALL");
        }

        if let Some(value) = get("SATSOLVER_DEBUG_LEVEL") {
            self.debug_level = parse_value("debug-level", &value)?;
            self.mark_env("debug-level", "SATSOLVER_DEBUG_LEVEL");
        }

        Ok(())
    }

    fn mark_env(&mut self, key: &str, var: &str) {
        self.sources
            .insert(key.to_string(), ConfigSource::Environment(var.to_string()));
    }

    /// Where the value of `key` came from
    pub fn source_of(&self, key: &str) -> ConfigSource {
        self.sources.get(key).cloned().unwrap_or(ConfigSource::Default)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    pub fn is_multiversion(&self, name: &str) -> bool {
        self.multiversion.iter().any(|n| n == name)
    }

    /// Log level matching `debug_level`
    pub fn log_filter(&self) -> log::LevelFilter {
        match self.debug_level {
            0 => log::LevelFilter::Info,
            1 | 2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    }

    /// Propagation tracing
    pub(crate) fn trace_propagation(&self) -> bool {
        self.debug_level > 2
    }

    /// Per-rule tracing during rule generation
    pub(crate) fn trace_rule_creation(&self) -> bool {
        self.debug_level > 3
    }

    /// Policy decisions and job expansion
    pub(crate) fn trace_policy(&self) -> bool {
        self.debug_level > 1
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}
