//! Secret management service trait.
//!
//! Defines the interface for turning encrypted API keys back into usable
//! plaintext.

/// Service for decrypting stored secrets.
///
/// # Security Note
///
/// Implementations should ensure that:
/// - Secret material is stored with appropriate permissions (e.g., 600 on Unix)
/// - Secrets are never logged or exposed in error messages
/// - A decrypt failure is reported without echoing any part of the input
#[async_trait::async_trait]
pub trait SecretService: Send + Sync {
    /// Decrypts an encrypted API key.
    ///
    /// # Returns
    ///
    /// - `Ok(String)`: Plaintext key
    /// - `Err(String)`: Failed to decrypt (error message must not contain
    ///   secret material)
    async fn decrypt(&self, encrypted: &str) -> Result<String, String>;
}
