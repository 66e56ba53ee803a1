//! Unified path management for relay configuration files.
//!
//! All relay configuration and secret material lives under one config
//! directory so storage stays consistent across platforms.

use std::path::PathBuf;

/// Errors that can occur during path resolution.
#[derive(Debug)]
pub enum PathError {
    /// Home directory could not be determined.
    HomeDirNotFound,
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathError::HomeDirNotFound => write!(f, "Cannot find home directory"),
        }
    }
}

impl std::error::Error for PathError {}

/// Unified path management for relay.
///
/// # Directory Structure
///
/// ```text
/// ~/.config/relay/             # Config directory
/// ├── providers.toml           # Generative-AI provider configurations
/// └── logs/                    # Application logs
/// ```
pub struct RelayPaths;

impl RelayPaths {
    /// Returns the relay configuration directory.
    ///
    /// # Returns
    ///
    /// - `Ok(PathBuf)`: Path to config directory (e.g., `~/.config/relay/`)
    /// - `Err(PathError::HomeDirNotFound)`: Could not determine directory
    pub fn config_dir() -> Result<PathBuf, PathError> {
        dirs::config_dir()
            .map(|dir| dir.join("relay"))
            .ok_or(PathError::HomeDirNotFound)
    }

    /// Returns the path to the provider configuration file.
    ///
    /// # Security Note
    ///
    /// This file carries encrypted API keys; ensure it has appropriate
    /// permissions (e.g., 600) to prevent unauthorized access.
    pub fn providers_file() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("providers.toml"))
    }
}
