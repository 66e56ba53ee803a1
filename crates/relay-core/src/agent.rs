//! Generative-AI backend contract.
//!
//! Every provider adapter (and the offline stand-in) exposes the same single
//! method, so the selector and its callers never special-case a backend. The
//! error taxonomy carries the fallback-eligibility classification used during
//! provider selection.

use crate::provider::ProviderKind;
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Options for a single generation call.
#[derive(Debug, Clone, Default)]
pub struct GenerationOptions {
    /// Upper bound on generated tokens, when the backend supports one
    pub max_output_tokens: Option<u32>,
    /// Sampling temperature, when the backend supports one
    pub temperature: Option<f32>,
}

impl GenerationOptions {
    /// Minimal options used when probing a backend for liveness.
    pub fn probe() -> Self {
        Self {
            max_output_tokens: Some(8),
            temperature: Some(0.0),
        }
    }
}

/// Token accounting reported by a backend, when available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// A successful generation.
#[derive(Debug, Clone, PartialEq)]
pub struct Generation {
    pub text: String,
    pub usage: Option<TokenUsage>,
}

impl Generation {
    pub fn text_only(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            usage: None,
        }
    }
}

/// Why a fallback to another provider happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    RateLimit,
    Timeout,
    Auth,
    Upstream,
    Network,
}

impl std::fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::RateLimit => "rate_limit",
            Self::Timeout => "timeout",
            Self::Auth => "auth",
            Self::Upstream => "upstream",
            Self::Network => "network",
        };
        write!(f, "{label}")
    }
}

/// Errors raised by generative backends.
#[derive(Error, Debug, Clone)]
pub enum AgentError {
    /// Provider rejected the request for quota reasons (HTTP 429)
    #[error("rate limited by provider")]
    RateLimited { retry_after: Option<Duration> },

    /// The request did not complete within the allotted time
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// Credentials rejected (HTTP 401/403)
    #[error("authentication rejected (status {status})")]
    Auth { status: u16 },

    /// Provider-side failure (HTTP 5xx)
    #[error("upstream error (status {status}): {message}")]
    Upstream { status: u16, message: String },

    /// Connection-level failure before any HTTP status
    #[error("network error: {0}")]
    Network(String),

    /// The request itself was malformed for this provider
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The provider answered but produced no usable text
    #[error("provider returned an empty response")]
    EmptyResponse,

    /// Anything else, provider-specific and request-specific
    #[error("{0}")]
    Other(String),
}

impl AgentError {
    /// Whether trying an alternate provider is an appropriate response to
    /// this error.
    ///
    /// Rate limits, timeouts, auth failures, 5xx, and network errors are
    /// fallback-eligible; request-specific errors are not.
    pub fn is_fallback_eligible(&self) -> bool {
        self.fallback_reason().is_some()
    }

    /// The statistics bucket this error falls into, if fallback-eligible.
    pub fn fallback_reason(&self) -> Option<FallbackReason> {
        match self {
            Self::RateLimited { .. } => Some(FallbackReason::RateLimit),
            Self::Timeout(_) => Some(FallbackReason::Timeout),
            Self::Auth { .. } => Some(FallbackReason::Auth),
            Self::Upstream { .. } => Some(FallbackReason::Upstream),
            Self::Network(_) => Some(FallbackReason::Network),
            Self::InvalidRequest(_) | Self::EmptyResponse | Self::Other(_) => None,
        }
    }
}

/// A verified-usable generative-content backend.
#[async_trait]
pub trait GenerativeAgent: Send + Sync {
    /// Which provider this agent fronts.
    fn provider(&self) -> ProviderKind;

    /// Generates text for the prompt.
    async fn generate_content(
        &self,
        prompt: &str,
        opts: &GenerationOptions,
    ) -> std::result::Result<Generation, AgentError>;
}
