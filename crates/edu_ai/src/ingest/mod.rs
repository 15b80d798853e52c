//! Offline ingestion: scan → load → chunk → embed → build → save.
//!
//! Every step depends on the previous one succeeding. A document that fails to load
//! aborts the run; a partial corpus would silently under-serve some topics.

use std::path::Path;
use std::sync::Arc;

use edu_core::config::PipelineConfig;
use edu_core::domain::SourceDocument;
use edu_core::error::{codes, AppError};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::chunking::{split_documents, validate_params};
use crate::corpus::{fingerprint_sources, load_source, scan_source_dir};
use crate::embeddings::EmbeddingProvider;
use crate::index::{IndexEntry, VectorIndex};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IngestReport {
    pub documents: u32,
    pub pages: u32,
    pub chunks: u32,
    pub dims: u32,
    pub embedding_model: String,
    pub index_dir: String,
    pub source_fingerprint: String,
}

pub struct Ingestor {
    embedder: Arc<dyn EmbeddingProvider>,
    batch_size: usize,
    chunk_size: usize,
    chunk_overlap: usize,
}

impl Ingestor {
    pub fn new(cfg: &PipelineConfig, embedder: Arc<dyn EmbeddingProvider>) -> Result<Self, AppError> {
        validate_params(cfg.chunk_size, cfg.chunk_overlap)?;
        if cfg.batch_size == 0 {
            return Err(AppError::new(
                codes::CONFIG_INVALID,
                "batch_size must be greater than 0",
            ));
        }
        Ok(Self {
            embedder,
            batch_size: cfg.batch_size,
            chunk_size: cfg.chunk_size,
            chunk_overlap: cfg.chunk_overlap,
        })
    }

    /// Build an in-memory index from every supported file in `source_dir`.
    pub fn build_index(&self, source_dir: &Path) -> Result<VectorIndex, AppError> {
        Ok(self.run(source_dir)?.0)
    }

    /// Build and persist, fully replacing any index at `index_dir`.
    pub fn build_and_save(&self, source_dir: &Path, index_dir: &Path) -> Result<IngestReport, AppError> {
        let (index, stats) = self.run(source_dir)?;
        index.save(index_dir)?;

        let m = index.manifest();
        Ok(IngestReport {
            documents: stats.documents,
            pages: stats.pages,
            chunks: m.entry_count,
            dims: m.dims,
            embedding_model: m.embedding_model.clone(),
            index_dir: index_dir.to_string_lossy().to_string(),
            source_fingerprint: m.source_fingerprint.clone().unwrap_or_default(),
        })
    }

    fn run(&self, source_dir: &Path) -> Result<(VectorIndex, RunStats), AppError> {
        let files = scan_source_dir(source_dir)?;
        info!(path = %source_dir.display(), files = files.len(), "scanned source directory");

        let mut documents: Vec<SourceDocument> = Vec::new();
        for f in &files {
            let loaded = load_source(f).map_err(|e| {
                error!(path = %f.path.display(), error = %e, "document load failed; aborting ingestion");
                e
            })?;
            debug!(
                path = %f.path.display(),
                format = f.format.as_str(),
                units = loaded.len(),
                "loaded document"
            );
            documents.extend(loaded);
        }

        let chunks = split_documents(&documents, self.chunk_size, self.chunk_overlap)?;
        info!(
            documents = files.len(),
            pages = documents.len(),
            chunks = chunks.len(),
            chunk_size = self.chunk_size,
            chunk_overlap = self.chunk_overlap,
            "chunked corpus"
        );
        if chunks.is_empty() {
            return Err(AppError::new(
                codes::EMPTY_CORPUS,
                "Source documents contain no extractable text",
            )
            .with_details(format!("path={}", source_dir.display())));
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let mut vectors: Vec<Vec<f32>> = Vec::with_capacity(texts.len());
        let batches = texts.len().div_ceil(self.batch_size);
        for (i, batch) in texts.chunks(self.batch_size).enumerate() {
            let embedded = self.embedder.embed_documents(batch).map_err(|e| {
                error!(batch = i + 1, batches, error = %e, "embedding failed");
                e
            })?;
            if embedded.len() != batch.len() {
                return Err(AppError::new(
                    codes::EMBEDDINGS_FAILED,
                    "Embedding provider returned a different number of vectors",
                )
                .with_details(format!("expected={}; got={}", batch.len(), embedded.len())));
            }
            vectors.extend(embedded);
            debug!(batch = i + 1, batches, "embedded batch");
        }

        let entries: Vec<IndexEntry> = chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, vector)| IndexEntry::from_chunk(chunk, vector))
            .collect();

        let fingerprint = fingerprint_sources(&files)?;
        let index = VectorIndex::build(entries, self.embedder.model_id())?
            .with_source_fingerprint(fingerprint);

        Ok((
            index,
            RunStats {
                documents: files.len() as u32,
                pages: documents.len() as u32,
            },
        ))
    }
}

struct RunStats {
    documents: u32,
    pages: u32,
}
