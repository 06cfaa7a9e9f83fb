//! Completion service integrations

mod openai_compat;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::config::RequestProfile;
use crate::conversation::Turn;

pub use openai_compat::{OpenAICompatConfig, OpenAICompatProvider};

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl ProviderError {
    /// Whether the transport gave up waiting, as opposed to failing outright
    pub fn is_timeout(&self) -> bool {
        matches!(self, ProviderError::RequestFailed(e) if e.is_timeout())
    }
}

/// One non-streaming completion call
#[derive(Debug, Clone, Serialize)]
pub struct CompletionRequest {
    pub messages: Vec<Turn>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub presence_penalty: f32,
    pub frequency_penalty: f32,
}

impl CompletionRequest {
    pub fn new(messages: Vec<Turn>, profile: &RequestProfile) -> Self {
        Self {
            messages,
            model: profile.model.clone(),
            temperature: profile.temperature,
            max_tokens: profile.max_tokens,
            presence_penalty: profile.presence_penalty,
            frequency_penalty: profile.frequency_penalty,
        }
    }
}

/// Anything that can turn a list of role-tagged turns into one reply
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError>;
}
