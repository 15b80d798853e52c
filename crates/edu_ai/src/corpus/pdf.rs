use std::path::Path;

use edu_core::error::{codes, AppError};

pub(crate) fn extract_pdf_pages(path: &Path) -> Result<Vec<String>, AppError> {
    pdf_extract::extract_text_by_pages(path).map_err(|e| {
        AppError::new(codes::DOCUMENT_LOAD_FAILED, "Failed to extract text from PDF")
            .with_details(format!("path={}; err={}", path.display(), e))
    })
}
