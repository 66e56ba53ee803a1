//! OpenAIApiAgent - Direct REST API implementation for OpenAI GPT.
//!
//! This agent calls the OpenAI Chat Completions API directly with text-only
//! payloads.

use async_trait::async_trait;
use relay_core::agent::{AgentError, Generation, GenerationOptions, GenerativeAgent, TokenUsage};
use relay_core::provider::ProviderKind;
use reqwest::header::HeaderValue;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
const BASE_URL: &str = "https://api.openai.com/v1/chat/completions";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Agent implementation that talks to the OpenAI HTTP API.
#[derive(Clone)]
pub struct OpenAiApiAgent {
    client: Client,
    api_key: String,
    model: String,
}

impl OpenAiApiAgent {
    /// Creates a new agent with the provided API key and model.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_default(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    /// Creates an agent with the default model.
    pub fn with_default_model(api_key: impl Into<String>) -> Self {
        Self::new(api_key, DEFAULT_OPENAI_MODEL)
    }

    async fn send_request(&self, body: &ChatCompletionRequest) -> Result<Generation, AgentError> {
        let response = self
            .client
            .post(BASE_URL)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    AgentError::Timeout(REQUEST_TIMEOUT)
                } else {
                    AgentError::Network(format!("OpenAI API request failed: {err}"))
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let retry_after = parse_retry_after(response.headers().get("retry-after"));
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read OpenAI error body".to_string());
            return Err(map_http_error(status, body_text, retry_after));
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|err| AgentError::Other(format!("Failed to parse OpenAI response: {err}")))?;

        extract_generation(parsed)
    }
}

#[async_trait]
impl GenerativeAgent for OpenAiApiAgent {
    fn provider(&self) -> ProviderKind {
        ProviderKind::OpenAi
    }

    async fn generate_content(
        &self,
        prompt: &str,
        opts: &GenerationOptions,
    ) -> Result<Generation, AgentError> {
        if prompt.trim().is_empty() {
            return Err(AgentError::InvalidRequest(
                "OpenAI prompt must not be empty".into(),
            ));
        }

        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            max_tokens: opts.max_output_tokens,
            temperature: opts.temperature,
        };
        self.send_request(&request).await
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Option<Vec<Choice>>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    prompt_tokens: Option<u32>,
    completion_tokens: Option<u32>,
}

#[derive(Deserialize)]
struct ErrorWrapper {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

fn extract_generation(response: ChatCompletionResponse) -> Result<Generation, AgentError> {
    let usage = response.usage.map(|u| TokenUsage {
        input_tokens: u.prompt_tokens.unwrap_or(0),
        output_tokens: u.completion_tokens.unwrap_or(0),
    });

    let text = response
        .choices
        .and_then(|mut choices| choices.pop())
        .and_then(|choice| choice.message)
        .and_then(|message| message.content)
        .filter(|text| !text.trim().is_empty())
        .ok_or(AgentError::EmptyResponse)?;

    Ok(Generation { text, usage })
}

fn map_http_error(status: StatusCode, body: String, retry_after: Option<Duration>) -> AgentError {
    let message = serde_json::from_str::<ErrorWrapper>(&body)
        .ok()
        .and_then(|wrapper| wrapper.error.message)
        .unwrap_or_else(|| body.clone());

    match status {
        StatusCode::TOO_MANY_REQUESTS => AgentError::RateLimited { retry_after },
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AgentError::Auth {
            status: status.as_u16(),
        },
        s if s.is_server_error() => AgentError::Upstream {
            status: s.as_u16(),
            message,
        },
        _ => AgentError::InvalidRequest(message),
    }
}

fn parse_retry_after(header: Option<&HeaderValue>) -> Option<Duration> {
    let value = header?.to_str().ok()?;
    value.parse::<u64>().ok().map(Duration::from_secs)
}
