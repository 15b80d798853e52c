use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable error codes. Callers branch on these to pick a remediation
/// (add documents, run ingestion, check the generation backend).
pub mod codes {
    pub const NO_DOCUMENTS: &str = "NO_DOCUMENTS";
    pub const EMPTY_CORPUS: &str = "EMPTY_CORPUS";
    pub const INDEX_NOT_FOUND: &str = "INDEX_NOT_FOUND";
    pub const INDEX_CORRUPT: &str = "INDEX_CORRUPT";
    pub const INDEX_SAVE_FAILED: &str = "INDEX_SAVE_FAILED";
    pub const GENERATION_FAILED: &str = "GENERATION_FAILED";
    pub const CONFIG_INVALID: &str = "CONFIG_INVALID";
    pub const DOCUMENT_LOAD_FAILED: &str = "DOCUMENT_LOAD_FAILED";
    pub const EMBEDDINGS_FAILED: &str = "EMBEDDINGS_FAILED";
    pub const EMBEDDING_MISMATCH: &str = "EMBEDDING_MISMATCH";
    pub const RETRIEVAL_INVALID: &str = "RETRIEVAL_INVALID";
    pub const BACKEND_NOT_ALLOWED: &str = "BACKEND_NOT_ALLOWED";
}

/// Single structured error shape used across the pipeline layers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppError {
    pub code: String,
    pub message: String,
    pub details: Option<String>,
    pub retryable: bool,
}

impl AppError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
            retryable: false,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }

    pub fn is(&self, code: &str) -> bool {
        self.code == code
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(details) = self.details.as_deref() {
            write!(f, " ({details})")?;
        }
        Ok(())
    }
}

impl std::error::Error for AppError {}
