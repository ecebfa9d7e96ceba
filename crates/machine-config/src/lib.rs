//! Configuration and file management for machine-playground
//!
//! This crate provides:
//! - Cache directory utilities
//! - Configuration file discovery (TOML)
//! - Application configuration (AppConfig)

pub mod app_config;
pub mod config_file;
pub mod paths;

pub use app_config::{AppConfig, ScenarioConfig};
pub use config_file::load_config_file;
pub use paths::cache_dir;
