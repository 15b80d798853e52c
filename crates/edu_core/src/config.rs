//! Pipeline configuration.
//!
//! One explicit value handed to the ingestion pipeline, the retriever and the query
//! engines at construction time. Sources, in order: built-in defaults, an optional
//! TOML file, then environment overrides.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{codes, AppError};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingProviderKind {
    Ollama,
    Hashing,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GenerationProviderKind {
    Ollama,
    Openai,
}

/// Which chat backend to call and how.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GenerationBackendDescriptor {
    pub provider: GenerationProviderKind,
    /// Unset means the provider's default, see [`GenerationBackendDescriptor::model_name`].
    pub model: Option<String>,
    /// Only used by the OpenAI-compatible provider; Ollama uses `ollama_base_url`.
    pub base_url: Option<String>,
    /// Name of the environment variable holding the API key (never the key itself).
    pub api_key_env: String,
    pub temperature: f32,
    pub timeout_secs: u64,
}

impl Default for GenerationBackendDescriptor {
    fn default() -> Self {
        Self {
            provider: GenerationProviderKind::Ollama,
            model: None,
            base_url: None,
            api_key_env: "OPENAI_API_KEY".to_string(),
            temperature: 0.2,
            timeout_secs: 120,
        }
    }
}

impl GenerationProviderKind {
    pub fn default_model(&self) -> &'static str {
        match self {
            Self::Ollama => "qwen2.5:7b",
            Self::Openai => "gpt-4o-mini",
        }
    }
}

impl GenerationBackendDescriptor {
    /// The configured model, or the active provider's default when none was given.
    pub fn model_name(&self) -> &str {
        self.model
            .as_deref()
            .unwrap_or_else(|| self.provider.default_model())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PathsConfig {
    pub data_dir: PathBuf,
    pub index_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            index_dir: PathBuf::from("vector_store"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetrievalConfig {
    pub ask_k: usize,
    pub quiz_k: usize,
    pub task_k: usize,
    pub quiz_questions: usize,
    /// Optional cosine floor. Hits below it never reach the prompt.
    pub min_similarity: Option<f32>,
    pub max_context_chars: usize,
    pub max_history_turns: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            ask_k: 5,
            quiz_k: 6,
            task_k: 8,
            quiz_questions: 5,
            min_similarity: None,
            max_context_chars: 12_000,
            max_history_turns: 20,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    pub embedding_model: String,
    pub embedding_provider: EmbeddingProviderKind,
    pub batch_size: usize,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub ollama_base_url: String,
    pub generation: GenerationBackendDescriptor,
    pub paths: PathsConfig,
    pub retrieval: RetrievalConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            embedding_model: "all-minilm".to_string(),
            embedding_provider: EmbeddingProviderKind::Ollama,
            batch_size: 32,
            chunk_size: 1200,
            chunk_overlap: 200,
            ollama_base_url: "http://127.0.0.1:11434".to_string(),
            generation: GenerationBackendDescriptor::default(),
            paths: PathsConfig::default(),
            retrieval: RetrievalConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Defaults, then `path` (if given), then process environment; validated.
    pub fn load(path: Option<&Path>) -> Result<Self, AppError> {
        let mut cfg = match path {
            Some(p) => Self::from_toml_file(p)?,
            None => Self::default(),
        };
        cfg.apply_env_overrides(|key| std::env::var(key).ok())?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_toml_file(path: &Path) -> Result<Self, AppError> {
        let raw = fs::read_to_string(path).map_err(|e| {
            AppError::new(codes::CONFIG_INVALID, "Failed to read config file")
                .with_details(format!("path={}; err={}", path.display(), e))
        })?;
        Self::from_toml_str(&raw).map_err(|e| {
            let err = e.details.clone().unwrap_or_default();
            e.with_details(format!("path={}; err={}", path.display(), err))
        })
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, AppError> {
        toml::from_str(raw).map_err(|e| {
            AppError::new(codes::CONFIG_INVALID, "Failed to parse config file")
                .with_details(e.to_string())
        })
    }

    /// Apply the deployment environment variables on top of file values.
    ///
    /// `lookup` is injected so tests can supply a fixed environment.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("EMBEDDINGS_MODEL") {
            self.embedding_model = v;
        }
        if let Some(v) = lookup("EMBEDDINGS_BATCH_SIZE") {
            self.batch_size = parse_usize("EMBEDDINGS_BATCH_SIZE", &v)?;
        }
        if let Some(v) = lookup("CHUNK_SIZE") {
            self.chunk_size = parse_usize("CHUNK_SIZE", &v)?;
        }
        if let Some(v) = lookup("CHUNK_OVERLAP") {
            self.chunk_overlap = parse_usize("CHUNK_OVERLAP", &v)?;
        }
        if let Some(v) = lookup("LLM_PROVIDER") {
            self.generation.provider = match v.trim().to_ascii_lowercase().as_str() {
                "ollama" => GenerationProviderKind::Ollama,
                "openai" => GenerationProviderKind::Openai,
                _ => {
                    return Err(AppError::new(
                        codes::CONFIG_INVALID,
                        "Unsupported LLM_PROVIDER; use 'openai' or 'ollama'",
                    )
                    .with_details(format!("LLM_PROVIDER={v}")))
                }
            };
        }
        // Model variables are provider-specific; only the active provider's one applies.
        let model_var = match self.generation.provider {
            GenerationProviderKind::Ollama => "OLLAMA_MODEL",
            GenerationProviderKind::Openai => "OPENAI_MODEL",
        };
        if let Some(v) = lookup(model_var) {
            self.generation.model = Some(v);
        }
        if let Some(v) = lookup("OPENAI_BASE_URL") {
            self.generation.base_url = Some(v);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), AppError> {
        let invalid = |msg: &str| AppError::new(codes::CONFIG_INVALID, msg.to_string());

        if self.embedding_model.trim().is_empty() {
            return Err(invalid("embedding_model must not be empty"));
        }
        if self.batch_size == 0 {
            return Err(invalid("batch_size must be greater than 0"));
        }
        if self.chunk_size == 0 {
            return Err(invalid("chunk_size must be greater than 0"));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(invalid("chunk_overlap must be less than chunk_size").with_details(
                format!(
                    "chunk_size={}; chunk_overlap={}",
                    self.chunk_size, self.chunk_overlap
                ),
            ));
        }
        let r = &self.retrieval;
        if r.ask_k == 0 || r.quiz_k == 0 || r.task_k == 0 {
            return Err(invalid("retrieval k values must be at least 1"));
        }
        if r.quiz_questions == 0 {
            return Err(invalid("quiz_questions must be at least 1"));
        }
        if r.max_context_chars == 0 {
            return Err(invalid("max_context_chars must be greater than 0"));
        }
        if let Some(floor) = r.min_similarity {
            if !(-1.0..=1.0).contains(&floor) {
                return Err(invalid("min_similarity must be within [-1, 1]")
                    .with_details(format!("min_similarity={floor}")));
            }
        }
        if self.generation.model_name().trim().is_empty() {
            return Err(invalid("generation.model must not be empty"));
        }
        if self.generation.timeout_secs == 0 {
            return Err(invalid("generation.timeout_secs must be greater than 0"));
        }
        Ok(())
    }
}

fn parse_usize(name: &str, raw: &str) -> Result<usize, AppError> {
    raw.trim().parse::<usize>().map_err(|e| {
        AppError::new(codes::CONFIG_INVALID, "Environment override is not a number")
            .with_details(format!("{name}={raw}; err={e}"))
    })
}
