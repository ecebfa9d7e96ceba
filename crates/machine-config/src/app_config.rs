//! Application configuration
//!
//! Configuration loaded from `.machine-playground.toml`.

use anyhow::{Context, Result};
use machine::MachineOptions;
use serde::{Deserialize, Serialize};

/// Application configuration loaded from .machine-playground.toml
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct AppConfig {
    /// Options passed to every machine the playground creates
    #[serde(default)]
    pub machine: MachineOptions,

    /// Parameters of the scripted playground run
    #[serde(default)]
    pub playground: ScenarioConfig,
}

/// Parameters of the scripted playground run
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ScenarioConfig {
    /// Name the state starts with
    #[serde(default = "default_initial_name")]
    pub initial_name: String,

    /// Top-level counter the state starts with
    #[serde(default = "default_initial_count")]
    pub initial_count: i64,

    /// Counter of the nested state
    #[serde(default = "default_nested_count")]
    pub nested_count: i64,

    /// Number of threads dispatching concurrently
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Dispatches performed by each worker thread
    #[serde(default = "default_dispatches_per_worker")]
    pub dispatches_per_worker: usize,
}

fn default_initial_name() -> String {
    "s".to_string()
}

fn default_initial_count() -> i64 {
    1
}

fn default_nested_count() -> i64 {
    42
}

fn default_workers() -> usize {
    8
}

fn default_dispatches_per_worker() -> usize {
    125
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            initial_name: default_initial_name(),
            initial_count: default_initial_count(),
            nested_count: default_nested_count(),
            workers: default_workers(),
            dispatches_per_worker: default_dispatches_per_worker(),
        }
    }
}

impl ScenarioConfig {
    /// Total number of concurrent increments the scenario performs
    pub fn total_dispatches(&self) -> usize {
        self.workers * self.dispatches_per_worker
    }
}

impl AppConfig {
    /// Load config from the first config file found, or use defaults
    pub fn load() -> Self {
        if let Some(content) = crate::load_config_file() {
            match Self::from_toml_str(&content) {
                Ok(config) => {
                    log::info!("Loaded app config from file");
                    return config;
                }
                Err(e) => {
                    log::warn!("Failed to parse config file: {:#}", e);
                }
            }
        }

        log::debug!("Using default app config");
        Self::default()
    }

    /// Parse a config from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Invalid machine-playground config")
    }
}
