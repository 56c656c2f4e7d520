//! Per-format text extraction
//!
//! Plain text and markdown are read verbatim; PDF text is extracted
//! with pdf-extract, pages separated by newlines.

use std::path::Path;

use ragd_core::{RagdError, Result};

/// Extensions accepted by the loader. Everything else is skipped.
pub const SUPPORTED_EXTS: &[&str] = &["txt", "md", "pdf"];

/// Whether the loader will attempt to extract text from this path.
pub fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| SUPPORTED_EXTS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Extract the raw text of a single file.
pub fn extract_text(path: &Path) -> Result<String> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "pdf" => extract_pdf(path),
        "txt" | "md" => {
            std::fs::read_to_string(path).map_err(|e| RagdError::Extraction {
                path: path.display().to_string(),
                reason: e.to_string(),
            })
        }
        other => Err(RagdError::Extraction {
            path: path.display().to_string(),
            reason: format!("unsupported extension: {other}"),
        }),
    }
}

fn extract_pdf(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path).map_err(|e| RagdError::Extraction {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    pdf_extract::extract_text_from_mem(&bytes).map_err(|e| RagdError::Extraction {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}
