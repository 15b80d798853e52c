use std::time::Duration;

use edu_core::error::{codes, AppError};
use serde::{Deserialize, Serialize};

use super::EmbeddingProvider;
use crate::ollama::OllamaClient;

// Keep requests bounded. Chunking enforces reasonable sizes, but guard anyway.
const MAX_INPUT_CHARS: usize = 12_000;

#[derive(Debug, Clone)]
pub struct OllamaEmbedder {
    client: OllamaClient,
    model: String,
}

impl OllamaEmbedder {
    pub fn new(client: OllamaClient, model: &str) -> Self {
        Self {
            client,
            model: model.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
}

#[derive(Debug, Clone, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

fn bounded(text: &str) -> &str {
    match text.char_indices().nth(MAX_INPUT_CHARS) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

impl EmbeddingProvider for OllamaEmbedder {
    fn model_id(&self) -> &str {
        &self.model
    }

    fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, AppError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/api/embed", self.client.base_url());
        let req = EmbedRequest {
            model: &self.model,
            input: texts.iter().map(|t| bounded(t)).collect(),
        };
        let body = serde_json::to_value(&req).map_err(|e| {
            AppError::new(codes::EMBEDDINGS_FAILED, "Failed to encode embeddings request")
                .with_details(e.to_string())
        })?;

        let resp = ureq::post(&url)
            .timeout(Duration::from_secs(60))
            .send_json(body);

        let v: EmbedResponse = match resp {
            Ok(r) => r.into_json().map_err(|e| {
                AppError::new(codes::EMBEDDINGS_FAILED, "Failed to decode embeddings response")
                    .with_details(e.to_string())
            })?,
            Err(ureq::Error::Status(status, _)) => {
                return Err(
                    AppError::new(codes::EMBEDDINGS_FAILED, "Embeddings request failed")
                        .with_details(format!("status={status}; model={}", self.model)),
                )
            }
            Err(e) => {
                return Err(AppError::new(
                    codes::EMBEDDINGS_FAILED,
                    "Failed to call embeddings endpoint",
                )
                .with_details(e.to_string())
                .with_retryable(true))
            }
        };

        if v.embeddings.len() != texts.len() {
            return Err(AppError::new(
                codes::EMBEDDINGS_FAILED,
                "Embeddings response count does not match request",
            )
            .with_details(format!(
                "requested={}; returned={}",
                texts.len(),
                v.embeddings.len()
            )));
        }
        let dims = v.embeddings.first().map(|e| e.len()).unwrap_or(0);
        if dims == 0 || v.embeddings.iter().any(|e| e.len() != dims) {
            return Err(AppError::new(
                codes::EMBEDDINGS_FAILED,
                "Embeddings response has empty or inconsistent vectors",
            ));
        }
        Ok(v.embeddings)
    }

    fn embed_query(&self, text: &str) -> Result<Vec<f32>, AppError> {
        let mut out = self.embed_documents(&[text.to_string()])?;
        out.pop().ok_or_else(|| {
            AppError::new(codes::EMBEDDINGS_FAILED, "Embeddings response was empty")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::bounded;

    #[test]
    fn bounding_respects_char_boundaries() {
        let long = "ж".repeat(super::MAX_INPUT_CHARS + 10);
        assert_eq!(bounded(&long).chars().count(), super::MAX_INPUT_CHARS);
        assert_eq!(bounded("short"), "short");
    }
}
