//! TOML-based ProviderConfigRepository implementation.

use crate::paths::RelayPaths;
use async_trait::async_trait;
use relay_core::error::{RelayError, Result};
use relay_core::provider::{ProviderConfig, ProviderConfigRepository};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// On-disk shape of `providers.toml`.
///
/// ```text
/// [[provider]]
/// provider = "gemini"
/// is_default = true
/// encrypted_api_key = "..."
/// model = "gemini-2.5-flash"
/// is_active = true
/// ```
#[derive(Debug, Default, Deserialize)]
struct ProvidersFile {
    #[serde(default, rename = "provider")]
    providers: Vec<ProviderConfig>,
}

/// A repository reading provider configurations from a TOML file.
///
/// The file is re-read on every call so operators can reprioritize providers
/// without a restart; the selector tolerates the extra read because selection
/// is infrequent relative to message traffic.
pub struct TomlProviderRepository {
    path: PathBuf,
}

impl TomlProviderRepository {
    /// Creates a repository reading from the given file.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Creates a repository at the default location
    /// (`~/.config/relay/providers.toml`).
    ///
    /// # Errors
    ///
    /// Returns an error if the config directory cannot be determined.
    pub fn default_location() -> Result<Self> {
        let path = RelayPaths::providers_file()
            .map_err(|e| RelayError::config(format!("Failed to resolve providers path: {e}")))?;
        Ok(Self::new(path))
    }

    async fn read_file(&self) -> Result<ProvidersFile> {
        if !self.path.exists() {
            // Missing file means no providers configured; the selector
            // degrades to the offline stand-in.
            return Ok(ProvidersFile::default());
        }
        let raw = tokio::fs::read_to_string(&self.path).await?;
        let parsed: ProvidersFile = toml::from_str(&raw)?;
        Ok(parsed)
    }
}

#[async_trait]
impl ProviderConfigRepository for TomlProviderRepository {
    async fn list_active(&self) -> Result<Vec<ProviderConfig>> {
        let file = self.read_file().await?;
        Ok(file
            .providers
            .into_iter()
            .filter(|p| p.is_active)
            .collect())
    }
}
