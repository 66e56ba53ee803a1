//! Secret service implementation.
//!
//! API keys in `providers.toml` are stored base64-encoded at rest and rely on
//! file permissions (600) for confidentiality; real key management belongs to
//! an external system. `decrypt` decodes and validates the stored value
//! without ever logging or echoing key material.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use relay_core::secret::SecretService;

/// Service decoding at-rest API keys.
#[derive(Debug, Clone, Default)]
pub struct SecretServiceImpl;

impl SecretServiceImpl {
    pub fn new() -> Self {
        Self
    }

    /// Encodes a plaintext key for storage (operator tooling and tests).
    pub fn seal(plaintext: &str) -> String {
        BASE64_STANDARD.encode(plaintext)
    }
}

#[async_trait]
impl SecretService for SecretServiceImpl {
    async fn decrypt(&self, encrypted: &str) -> Result<String, String> {
        let bytes = BASE64_STANDARD
            .decode(encrypted.trim())
            .map_err(|_| "Stored key is not valid base64".to_string())?;
        let plaintext = String::from_utf8(bytes)
            .map_err(|_| "Stored key decodes to invalid UTF-8".to_string())?;
        if plaintext.is_empty() {
            return Err("Stored key decodes to an empty value".to_string());
        }
        Ok(plaintext)
    }
}
