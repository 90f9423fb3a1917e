//! Configuration module for esquery-rs
//!
//! Handles loading and validating settings from YAML files and environment variables.

mod settings;

pub use settings::*;

use crate::error::Result;
use std::path::PathBuf;
use tracing::info;

/// Load settings from the first file found, then apply the environment
///
/// `ESQUERY_SETTINGS_PATH` wins, then `settings.yml`, `config/settings.yml`
/// and the user config directory. Defaults are used when none exists.
pub fn load() -> Result<Settings> {
    let mut candidates = Vec::new();
    if let Ok(path) = std::env::var("ESQUERY_SETTINGS_PATH") {
        candidates.push(PathBuf::from(path));
    }
    candidates.push(PathBuf::from("settings.yml"));
    candidates.push(PathBuf::from("config/settings.yml"));
    if let Some(dir) = dirs::config_dir() {
        candidates.push(dir.join("esquery-rs/settings.yml"));
    }

    let mut settings = match candidates.iter().find(|p| p.exists()) {
        Some(path) => {
            info!("Loading settings from: {}", path.display());
            Settings::from_file(path)?
        }
        None => {
            info!("No settings file found, using defaults");
            Settings::default()
        }
    };
    settings.merge_env();
    Ok(settings)
}
