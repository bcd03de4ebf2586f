//! Load the source document from disk.
//!
//! `.txt` and `.md` files are read as UTF-8; `.pdf` files go through
//! `pdf-extract`. The file name becomes the document id.

use std::path::Path;

use ragdoc_core::models::Document;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} is not valid UTF-8")]
    NotUtf8 { path: String },

    #[error("PDF extraction failed for {path}: {message}")]
    Pdf { path: String, message: String },

    #[error("unsupported document type '{extension}' (expected .txt, .md or .pdf)")]
    Unsupported { extension: String },
}

/// Read `path` into a [`Document`].
pub fn load_document(path: &Path) -> Result<Document, LoadError> {
    let display = path.display().to_string();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    let text = match extension.as_str() {
        "txt" | "md" => {
            let bytes = read(path, &display)?;
            String::from_utf8(bytes).map_err(|_| LoadError::NotUtf8 {
                path: display.clone(),
            })?
        }
        "pdf" => {
            let bytes = read(path, &display)?;
            extract_pdf(&bytes).map_err(|message| LoadError::Pdf {
                path: display.clone(),
                message,
            })?
        }
        _ => return Err(LoadError::Unsupported { extension: extension.clone() }),
    };

    let id = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or(display);
    info!(document = %id, chars = text.chars().count(), "loaded document");
    Ok(Document::new(id, text))
}

fn read(path: &Path, display: &str) -> Result<Vec<u8>, LoadError> {
    std::fs::read(path).map_err(|source| LoadError::Io {
        path: display.to_string(),
        source,
    })
}

/// Extract plain text from PDF bytes.
pub fn extract_pdf(bytes: &[u8]) -> Result<String, String> {
    pdf_extract::extract_text_from_mem(bytes).map_err(|e| e.to_string())
}
