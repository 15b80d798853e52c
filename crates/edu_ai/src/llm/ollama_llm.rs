use std::time::Duration;

use edu_core::config::GenerationBackendDescriptor;
use edu_core::error::{codes, AppError};
use serde::{Deserialize, Serialize};

use super::{Availability, ChatMessage, GenerationBackend, GenerationRequest};
use crate::ollama::OllamaClient;

#[derive(Debug, Clone)]
pub struct OllamaChat {
    client: OllamaClient,
    model: String,
    temperature: f32,
    timeout: Duration,
}

impl OllamaChat {
    pub fn new(client: OllamaClient, descriptor: &GenerationBackendDescriptor) -> Self {
        Self {
            client,
            model: descriptor.model_name().to_string(),
            temperature: descriptor.temperature,
            timeout: Duration::from_secs(descriptor.timeout_secs),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct ChatOptions {
    temperature: f32,
}

#[derive(Debug, Clone, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    options: ChatOptions,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatResponse {
    message: ChatResponseMessage,
}

impl GenerationBackend for OllamaChat {
    fn descriptor(&self) -> String {
        format!("ollama:{}", self.model)
    }

    fn health_check(&self) -> Availability {
        self.client.health_check()
    }

    fn generate(&self, request: &GenerationRequest) -> Result<String, AppError> {
        let url = format!("{}/api/chat", self.client.base_url());
        let req = ChatRequest {
            model: &self.model,
            messages: &request.messages,
            stream: false,
            options: ChatOptions {
                temperature: self.temperature,
            },
        };
        let body = serde_json::to_value(&req).map_err(|e| {
            AppError::new(codes::GENERATION_FAILED, "Failed to encode chat request")
                .with_details(e.to_string())
        })?;

        let resp = ureq::post(&url).timeout(self.timeout).send_json(body);

        match resp {
            Ok(r) => {
                let v: ChatResponse = r.into_json().map_err(|e| {
                    AppError::new(codes::GENERATION_FAILED, "Failed to decode chat response")
                        .with_details(e.to_string())
                })?;
                Ok(v.message.content)
            }
            Err(ureq::Error::Status(status, _)) => Err(AppError::new(
                codes::GENERATION_FAILED,
                "Chat request failed",
            )
            .with_details(format!("status={status}; model={}", self.model))),
            Err(e) => Err(
                AppError::new(codes::GENERATION_FAILED, "Failed to call chat endpoint")
                    .with_details(e.to_string())
                    .with_retryable(true),
            ),
        }
    }
}
