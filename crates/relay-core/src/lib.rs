pub mod agent;
pub mod error;
pub mod incident;
pub mod message;
pub mod provider;
pub mod reference;
pub mod secret;
pub mod session;
pub mod transport;
pub mod window;

// Re-export common error type
pub use error::{RelayError, Result};
