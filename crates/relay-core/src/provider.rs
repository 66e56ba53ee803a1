//! Provider configuration model and repository trait.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Supported generative-AI backends.
///
/// `Offline` is the deterministic stand-in and never appears in stored
/// configurations; it exists so fallback statistics can name it as a target.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ProviderKind {
    Gemini,
    OpenAi,
    Offline,
}

/// One configured backend, as stored by operators.
///
/// This subsystem only reads configurations; it never mutates them. API keys
/// are stored encrypted and pass through [`crate::secret::SecretService`]
/// before use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Which backend this row configures
    pub provider: ProviderKind,
    /// Preferred provider; selection orders `is_default` first
    #[serde(default)]
    pub is_default: bool,
    /// Encrypted API key (never logged)
    pub encrypted_api_key: String,
    /// Optional model override for this provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Inactive rows are skipped entirely
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

/// An abstract repository for provider configurations.
#[async_trait]
pub trait ProviderConfigRepository: Send + Sync {
    /// Lists active provider configurations.
    ///
    /// Order is repository-defined; the selector re-sorts by `is_default`
    /// descending before probing.
    async fn list_active(&self) -> Result<Vec<ProviderConfig>>;
}
