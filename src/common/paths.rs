use anyhow::{Context, Result};
use std::path::PathBuf;

/// Centralized path management for uadm
/// This module provides a single source of truth for all application paths

/// Get the uadm config directory
pub fn uadm_config_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .context("Unable to determine user config directory")?
        .join("uadm");

    std::fs::create_dir_all(&config_dir)
        .with_context(|| format!("creating config directory at {}", config_dir.display()))?;

    Ok(config_dir)
}

/// Get the uadm data directory
pub fn uadm_data_dir() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("~/.local/share"))
        .join("uadm");

    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("creating data directory at {}", data_dir.display()))?;

    Ok(data_dir)
}

/// Path of the main configuration file
pub fn config_file() -> Result<PathBuf> {
    Ok(uadm_config_dir()?.join("config.toml"))
}

/// Path of the persisted session snapshot (token and cached directory state)
pub fn session_file() -> Result<PathBuf> {
    Ok(uadm_data_dir()?.join("session.json"))
}
