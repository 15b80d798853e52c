use std::path::Path;
use std::sync::Arc;

use edu_core::error::{codes, AppError};
use tracing::debug;

use crate::embeddings::EmbeddingProvider;
use crate::index::{IndexHandle, VectorIndex};

pub use crate::index::{RetrievalResult, RetrievedPassage};

/// Query-time view over the live index. Cheap to clone; clones share the same handle.
#[derive(Clone)]
pub struct Retriever {
    handle: IndexHandle,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl Retriever {
    pub fn new(handle: IndexHandle, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self { handle, embedder }
    }

    /// Load the persisted index at `index_dir` and wrap it.
    pub fn open(index_dir: &Path, embedder: Arc<dyn EmbeddingProvider>) -> Result<Self, AppError> {
        let index = VectorIndex::load(index_dir)?;
        Ok(Self::new(IndexHandle::new(index), embedder))
    }

    pub fn handle(&self) -> &IndexHandle {
        &self.handle
    }

    /// Embed `query` with the same provider the index was built with and return the `k`
    /// nearest passages, best first.
    pub fn retrieve(&self, query: &str, k: usize) -> Result<RetrievalResult, AppError> {
        let q = query.trim();
        if q.is_empty() {
            return Err(AppError::new(codes::RETRIEVAL_INVALID, "Query must not be empty"));
        }
        if k == 0 {
            return Err(AppError::new(codes::RETRIEVAL_INVALID, "k must be at least 1"));
        }

        let index = self.handle.current();
        let built_with = index.manifest().embedding_model.as_str();
        if built_with != self.embedder.model_id() {
            return Err(AppError::new(
                codes::EMBEDDING_MISMATCH,
                "Index was built with a different embedding model; re-run ingestion",
            )
            .with_details(format!(
                "index_model={built_with}; query_model={}",
                self.embedder.model_id()
            )));
        }

        let qv = self.embedder.embed_query(q)?;
        let result = index.query(&qv, k)?;
        debug!(
            k,
            hits = result.len(),
            top_score = result.top_score().unwrap_or(0.0),
            "retrieved passages"
        );
        Ok(result)
    }
}
