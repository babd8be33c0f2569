//! Chat Completions wire types and the integration error.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use skilltrail_domain::SkillTrailError;

use crate::errors::InfraError;

#[derive(Debug, thiserror::Error)]
pub enum OpenAIError {
    /// Rejected credentials (401/403).
    #[error("authentication failed with status {0}")]
    Authentication(u16),

    #[error("rate limit exceeded")]
    RateLimited,

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// Body did not match the requested schema.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("transport error: {0}")]
    Http(SkillTrailError),
}

impl From<OpenAIError> for InfraError {
    fn from(err: OpenAIError) -> Self {
        let mapped = match err {
            OpenAIError::Authentication(_) => {
                SkillTrailError::Config(format!("{err}: check llm.api_key"))
            }
            OpenAIError::RateLimited => SkillTrailError::Network(err.to_string()),
            OpenAIError::Api { status, .. } if status >= 500 => {
                SkillTrailError::Network(err.to_string())
            }
            OpenAIError::Api { .. } => SkillTrailError::InvalidInput(err.to_string()),
            OpenAIError::InvalidResponse(_) => SkillTrailError::Internal(err.to_string()),
            OpenAIError::Http(inner) => inner,
        };
        InfraError(mapped)
    }
}

impl From<OpenAIError> for SkillTrailError {
    fn from(err: OpenAIError) -> Self {
        InfraError::from(err).into()
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
    pub response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
pub(crate) struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct ResponseFormat {
    #[serde(rename = "type")]
    pub format_type: &'static str,
    pub json_schema: JsonSchema,
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonSchema {
    pub name: &'static str,
    pub schema: Value,
    pub strict: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatCompletionResponse {
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Choice {
    pub message: Message,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Message {
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}
