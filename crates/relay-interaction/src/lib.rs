pub mod gemini_api_agent;
pub mod offline_agent;
pub mod openai_api_agent;
pub mod selector;

pub use gemini_api_agent::GeminiApiAgent;
pub use offline_agent::OfflineAgent;
pub use openai_api_agent::OpenAiApiAgent;
pub use selector::{
    AgentFactory, FallbackEvent, FallbackSnapshot, FallbackStats, HttpAgentFactory,
    ProbeTimeouts, ProviderSelector,
};
