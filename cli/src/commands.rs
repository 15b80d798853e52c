use std::fs;
use std::path::{Path, PathBuf};

use edu_ai::embeddings::build_embedder;
use edu_ai::engines::QueryEngines;
use edu_ai::index::VectorIndex;
use edu_ai::ingest::{IngestReport, Ingestor};
use edu_ai::llm::{build_backend, Availability, GenerationBackend};
use edu_ai::ollama::OllamaClient;
use edu_ai::retrieve::Retriever;
use edu_core::config::{EmbeddingProviderKind, PipelineConfig};
use edu_core::domain::ConversationTurn;
use edu_core::error::{codes, AppError};
use serde::Serialize;
use tracing::info;

fn resolve(over: Option<&Path>, configured: &Path) -> PathBuf {
    over.unwrap_or(configured).to_path_buf()
}

pub fn ingest(cfg: &PipelineConfig, data: Option<&Path>, index: Option<&Path>) -> Result<IngestReport, AppError> {
    let data_dir = resolve(data, &cfg.paths.data_dir);
    let index_dir = resolve(index, &cfg.paths.index_dir);
    info!(data = %data_dir.display(), index = %index_dir.display(), "starting ingestion");

    let embedder = build_embedder(cfg)?;
    Ingestor::new(cfg, embedder)?.build_and_save(&data_dir, &index_dir)
}

/// Load the index once and wire it to the configured embedder and backend.
pub fn open_engines(cfg: &PipelineConfig, index: Option<&Path>) -> Result<QueryEngines, AppError> {
    let index_dir = resolve(index, &cfg.paths.index_dir);
    let embedder = build_embedder(cfg)?;
    let retriever = Retriever::open(&index_dir, embedder)?;
    let backend = build_backend(cfg)?;
    info!(backend = %backend.descriptor(), index = %index_dir.display(), "query engines ready");
    Ok(QueryEngines::new(retriever, backend, cfg.retrieval.clone()))
}

pub fn load_history(path: Option<&Path>) -> Result<Vec<ConversationTurn>, AppError> {
    let Some(path) = path else {
        return Ok(Vec::new());
    };
    let raw = fs::read(path).map_err(|e| {
        AppError::new(codes::CONFIG_INVALID, "Failed to read history file")
            .with_details(format!("path={}; err={}", path.display(), e))
    })?;
    serde_json::from_slice(&raw).map_err(|e| {
        AppError::new(codes::CONFIG_INVALID, "History file is not a list of turns")
            .with_details(format!("path={}; err={}", path.display(), e))
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct IndexStatus {
    pub path: String,
    pub ready: bool,
    pub entries: Option<u32>,
    pub dims: Option<u32>,
    pub embedding_model: Option<String>,
    pub built_at: Option<String>,
    pub error: Option<AppError>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComponentStatus {
    pub descriptor: String,
    pub availability: Availability,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub index: IndexStatus,
    pub embeddings: ComponentStatus,
    pub generation: ComponentStatus,
}

impl HealthReport {
    pub fn ok(&self) -> bool {
        self.index.ready && self.embeddings.availability.is_available() && self.generation.availability.is_available()
    }
}

pub fn health(cfg: &PipelineConfig, index: Option<&Path>) -> Result<HealthReport, AppError> {
    let backend = build_backend(cfg)?;
    health_with_backend(cfg, index, backend.as_ref())
}

fn health_with_backend(
    cfg: &PipelineConfig,
    index: Option<&Path>,
    backend: &dyn GenerationBackend,
) -> Result<HealthReport, AppError> {
    let index_dir = resolve(index, &cfg.paths.index_dir);
    let index = match VectorIndex::load(&index_dir) {
        Ok(idx) => {
            let m = idx.manifest();
            IndexStatus {
                path: index_dir.display().to_string(),
                ready: true,
                entries: Some(m.entry_count),
                dims: Some(m.dims),
                embedding_model: Some(m.embedding_model.clone()),
                built_at: Some(m.built_at.clone()),
                error: None,
            }
        }
        Err(e) => IndexStatus {
            path: index_dir.display().to_string(),
            ready: false,
            entries: None,
            dims: None,
            embedding_model: None,
            built_at: None,
            error: Some(e),
        },
    };

    let embeddings = match cfg.embedding_provider {
        EmbeddingProviderKind::Ollama => ComponentStatus {
            descriptor: format!("ollama:{}", cfg.embedding_model),
            availability: OllamaClient::new(&cfg.ollama_base_url)?.health_check(),
        },
        EmbeddingProviderKind::Hashing => ComponentStatus {
            descriptor: format!("hashing:{}", cfg.embedding_model),
            availability: Availability::Available,
        },
    };

    let generation = ComponentStatus {
        descriptor: backend.descriptor(),
        availability: backend.health_check(),
    };

    Ok(HealthReport {
        index,
        embeddings,
        generation,
    })
}
