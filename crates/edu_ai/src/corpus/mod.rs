//! Source corpus discovery and text extraction.

use std::fs;
use std::path::{Path, PathBuf};

use edu_core::domain::{DocumentFormat, SourceDocument};
use edu_core::error::{codes, AppError};
use sha2::{Digest, Sha256};

mod docx;
mod pdf;

pub use docx::extract_docx_text;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    pub format: DocumentFormat,
}

/// Supported files directly inside `dir` (not recursive), sorted by path.
///
/// Unsupported extensions are skipped silently. Finding nothing is `NO_DOCUMENTS`.
pub fn scan_source_dir(dir: &Path) -> Result<Vec<SourceFile>, AppError> {
    let entries = fs::read_dir(dir).map_err(|e| {
        AppError::new(codes::NO_DOCUMENTS, "Source directory is not readable")
            .with_details(format!("path={}; err={}", dir.display(), e))
    })?;

    let mut out = Vec::new();
    for ent in entries.flatten() {
        let path = ent.path();
        if !path.is_file() {
            continue;
        }
        if let Some(format) = DocumentFormat::from_path(&path) {
            out.push(SourceFile { path, format });
        }
    }
    out.sort_by(|a, b| a.path.cmp(&b.path));

    if out.is_empty() {
        return Err(AppError::new(
            codes::NO_DOCUMENTS,
            "No documents found; add .pdf or .docx files to the source directory",
        )
        .with_details(format!("path={}", dir.display())));
    }
    Ok(out)
}

/// Load one file into source documents (one per PDF page, one per DOCX file).
pub fn load_source(file: &SourceFile) -> Result<Vec<SourceDocument>, AppError> {
    let path_str = file.path.to_string_lossy().to_string();
    let texts: Vec<(Option<u32>, String)> = match file.format {
        DocumentFormat::Pdf => pdf::extract_pdf_pages(&file.path)?
            .into_iter()
            .enumerate()
            .map(|(i, t)| (Some(i as u32 + 1), t))
            .collect(),
        DocumentFormat::Docx => vec![(None, extract_docx_text(&file.path)?)],
    };

    Ok(texts
        .into_iter()
        .map(|(page, text)| SourceDocument {
            path: path_str.clone(),
            format: file.format,
            text,
            page,
        })
        .collect())
}

/// Stable digest over file names and contents, used to compare ingestion runs.
pub fn fingerprint_sources(files: &[SourceFile]) -> Result<String, AppError> {
    let mut hasher = Sha256::new();
    for f in files {
        let bytes = fs::read(&f.path).map_err(|e| {
            AppError::new(codes::DOCUMENT_LOAD_FAILED, "Failed to read source file")
                .with_details(format!("path={}; err={}", f.path.display(), e))
        })?;
        let name = f
            .path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        hasher.update(name.as_bytes());
        hasher.update([0u8]);
        hasher.update(Sha256::digest(&bytes));
    }
    Ok(hex::encode(hasher.finalize()))
}
