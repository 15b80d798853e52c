use std::sync::Arc;

use edu_core::config::{GenerationProviderKind, PipelineConfig};
use edu_core::domain::Role;
use edu_core::error::AppError;
use serde::{Deserialize, Serialize};

use crate::ollama::OllamaClient;

pub mod ollama_llm;
pub mod openai_llm;

pub use ollama_llm::OllamaChat;
pub use openai_llm::OpenAiChat;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

impl From<Role> for ChatRole {
    fn from(role: Role) -> Self {
        match role {
            Role::User => Self::User,
            Role::Assistant => Self::Assistant,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// System policy, prior turns, then the current instruction, in that order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct GenerationRequest {
    pub messages: Vec<ChatMessage>,
}

impl GenerationRequest {
    pub fn system_text(&self) -> Option<&str> {
        self.messages
            .iter()
            .find(|m| m.role == ChatRole::System)
            .map(|m| m.content.as_str())
    }

    pub fn last_user_text(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == ChatRole::User)
            .map(|m| m.content.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Availability {
    Available,
    Unhealthy { status: u16 },
    Unreachable { detail: String },
}

impl Availability {
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available)
    }
}

/// Chat-completion collaborator. One request, one text response; no streaming.
pub trait GenerationBackend: Send + Sync {
    /// Human-readable `provider:model` used in logs and errors.
    fn descriptor(&self) -> String;

    fn health_check(&self) -> Availability;

    fn generate(&self, request: &GenerationRequest) -> Result<String, AppError>;
}

pub fn build_backend(cfg: &PipelineConfig) -> Result<Arc<dyn GenerationBackend>, AppError> {
    let g = &cfg.generation;
    match g.provider {
        GenerationProviderKind::Ollama => {
            let client = OllamaClient::new(&cfg.ollama_base_url)?;
            Ok(Arc::new(OllamaChat::new(client, g)))
        }
        GenerationProviderKind::Openai => {
            let api_key = std::env::var(&g.api_key_env).ok();
            Ok(Arc::new(OpenAiChat::new(g, api_key)))
        }
    }
}
