use std::time::Duration;

use edu_core::config::GenerationBackendDescriptor;
use edu_core::error::{codes, AppError};
use serde::{Deserialize, Serialize};

use super::{Availability, ChatMessage, GenerationBackend, GenerationRequest};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI-compatible `/chat/completions` endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiChat {
    base_url: String,
    model: String,
    api_key: Option<String>,
    temperature: f32,
    timeout: Duration,
}

impl OpenAiChat {
    pub fn new(descriptor: &GenerationBackendDescriptor, api_key: Option<String>) -> Self {
        Self {
            base_url: descriptor
                .base_url
                .as_deref()
                .unwrap_or(DEFAULT_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            model: descriptor.model_name().to_string(),
            api_key,
            temperature: descriptor.temperature,
            timeout: Duration::from_secs(descriptor.timeout_secs),
        }
    }

    fn authorized(&self, req: ureq::Request) -> ureq::Request {
        match self.api_key.as_deref() {
            Some(key) => req.set("Authorization", &format!("Bearer {key}")),
            None => req,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
}

#[derive(Debug, Clone, Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Clone, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

impl GenerationBackend for OpenAiChat {
    fn descriptor(&self) -> String {
        format!("openai:{}", self.model)
    }

    fn health_check(&self) -> Availability {
        let url = format!("{}/models", self.base_url);
        let resp = self
            .authorized(ureq::get(&url).timeout(Duration::from_secs(3)))
            .call();
        match resp {
            Ok(r) if r.status() == 200 => Availability::Available,
            Ok(r) => Availability::Unhealthy { status: r.status() },
            Err(ureq::Error::Status(status, _)) => Availability::Unhealthy { status },
            Err(e) => Availability::Unreachable {
                detail: e.to_string(),
            },
        }
    }

    fn generate(&self, request: &GenerationRequest) -> Result<String, AppError> {
        if self.api_key.is_none() {
            return Err(AppError::new(
                codes::GENERATION_FAILED,
                "OpenAI-compatible backend has no API key configured",
            ));
        }
        let url = format!("{}/chat/completions", self.base_url);
        let req = CompletionRequest {
            model: &self.model,
            messages: &request.messages,
            temperature: self.temperature,
        };
        let body = serde_json::to_value(&req).map_err(|e| {
            AppError::new(codes::GENERATION_FAILED, "Failed to encode completion request")
                .with_details(e.to_string())
        })?;

        let resp = self
            .authorized(ureq::post(&url).timeout(self.timeout))
            .send_json(body);

        match resp {
            Ok(r) => {
                let v: CompletionResponse = r.into_json().map_err(|e| {
                    AppError::new(
                        codes::GENERATION_FAILED,
                        "Failed to decode completion response",
                    )
                    .with_details(e.to_string())
                })?;
                v.choices
                    .into_iter()
                    .next()
                    .and_then(|c| c.message.content)
                    .ok_or_else(|| {
                        AppError::new(
                            codes::GENERATION_FAILED,
                            "Completion response had no message content",
                        )
                    })
            }
            Err(ureq::Error::Status(status, _)) => Err(AppError::new(
                codes::GENERATION_FAILED,
                "Completion request failed",
            )
            .with_details(format!("status={status}; model={}", self.model))),
            Err(e) => Err(AppError::new(
                codes::GENERATION_FAILED,
                "Failed to call completion endpoint",
            )
            .with_details(e.to_string())
            .with_retryable(true)),
        }
    }
}
