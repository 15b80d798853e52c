use std::sync::Arc;

use edu_core::config::{EmbeddingProviderKind, PipelineConfig};
use edu_core::error::AppError;

use crate::ollama::OllamaClient;

pub mod hashing;
pub mod ollama_embed;

pub use hashing::HashingEmbedder;
pub use ollama_embed::OllamaEmbedder;

/// Text → fixed-length vector capability.
///
/// Implementations must keep the dimensionality stable for a given `model_id`, return a
/// defined vector for the empty string, and give the same output for the same input.
pub trait EmbeddingProvider: Send + Sync {
    /// Identifier stamped into the index manifest; a mismatch at query time is rejected.
    fn model_id(&self) -> &str;

    fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, AppError>;

    fn embed_query(&self, text: &str) -> Result<Vec<f32>, AppError>;
}

pub fn build_embedder(cfg: &PipelineConfig) -> Result<Arc<dyn EmbeddingProvider>, AppError> {
    match cfg.embedding_provider {
        EmbeddingProviderKind::Ollama => {
            let client = OllamaClient::new(&cfg.ollama_base_url)?;
            Ok(Arc::new(OllamaEmbedder::new(client, &cfg.embedding_model)))
        }
        EmbeddingProviderKind::Hashing => Ok(Arc::new(HashingEmbedder::new(
            &cfg.embedding_model,
            hashing::DEFAULT_DIMS,
        ))),
    }
}
