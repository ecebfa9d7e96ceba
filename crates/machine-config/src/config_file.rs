use std::{env, path::PathBuf};

const CONFIG_FILE: &str = ".machine-playground.toml";

/// Load config file content
///
/// Searches, in order:
/// 1. `.machine-playground.toml` in the current working directory
/// 2. `~/.machine-playground.toml`
///
/// Returns the file content if found, None otherwise.
pub fn load_config_file() -> Option<String> {
    candidate_paths().into_iter().find_map(|path| {
        let content = std::fs::read_to_string(&path).ok()?;
        log::debug!("Loaded config from {}", path.display());
        Some(content)
    })
}

fn candidate_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(CONFIG_FILE)];

    if let Some(home) = env::var_os("HOME") {
        paths.push(PathBuf::from(home).join(CONFIG_FILE));
    }

    paths
}
