use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Supported course-material formats. Anything else in the corpus directory is ignored.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum DocumentFormat {
    Pdf,
    Docx,
}

impl DocumentFormat {
    /// Case-insensitive extension match (`.PDF` and `.pdf` are the same format).
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::Docx),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
        }
    }
}

/// Raw text of one loaded source unit.
///
/// PDFs are loaded page-wise (one document per page, `page` is 1-based); DOCX files
/// produce a single document with `page = None`. Immutable, discarded after chunking.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceDocument {
    pub path: String,
    pub format: DocumentFormat,
    pub text: String,
    pub page: Option<u32>,
}

impl SourceDocument {
    pub fn file_name(&self) -> String {
        Path::new(&self.path)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.path.clone())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Provenance {
    pub source: String,
    pub path: String,
    pub page: Option<u32>,
    // Byte offset of the chunk start within the page/document text.
    pub offset: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Chunk {
    pub chunk_id: String,
    pub ordinal: u32,
    pub text: String,
    pub provenance: Provenance,
}

impl Chunk {
    /// Content-derived id: the same document, position and text always hash to the same id.
    pub fn new(ordinal: u32, text: String, provenance: Provenance) -> Self {
        let payload = format!(
            "path={}\npage={}\nordinal={}\ntext={}",
            provenance.path,
            provenance.page.map(|p| p.to_string()).unwrap_or_default(),
            ordinal,
            text
        );
        let chunk_id = hex::encode(Sha256::digest(payload.as_bytes()));
        Self {
            chunk_id,
            ordinal,
            text,
            provenance,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => f.write_str("user"),
            Self::Assistant => f.write_str("assistant"),
        }
    }
}

/// One prior turn supplied by the caller's conversation store. Read-only here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConversationTurn {
    pub role: Role,
    pub text: String,
}

impl ConversationTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
        }
    }
}
