//! Data directory paths
//!
//! Uses XDG directories via `dirs` crate.
//!
//! Platform-specific locations:
//! - Linux: `~/.cache/machine-playground/`
//! - macOS: `~/Library/Caches/machine-playground/`
//! - Windows: `%LOCALAPPDATA%\machine-playground\`

use anyhow::{Context, Result};
use std::path::PathBuf;

const APP_NAME: &str = "machine-playground";

/// Get the application cache directory, creating it if needed
pub fn cache_dir() -> Result<PathBuf> {
    let base = dirs::cache_dir().context("Could not determine cache directory")?;
    let dir = base.join(APP_NAME);
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create cache directory {:?}", dir))?;
    Ok(dir)
}
