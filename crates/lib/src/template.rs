//! Loading the `.docx` template and writing the generated report.

use crate::errors::TemplateError;
use docx_rs::{read_docx, Docx};
use std::fs;
use std::io::Cursor;
use std::path::Path;
use tracing::info;

/// The MIME type of Word documents, used when the report is served for download.
pub const DOCX_MIME_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// Parses a template from raw `.docx` bytes.
pub fn parse_template(bytes: &[u8]) -> Result<Docx, TemplateError> {
    read_docx(bytes).map_err(|e| TemplateError::Read(e.to_string()))
}

/// Reads and parses the template at `path`.
pub fn load_template(path: impl AsRef<Path>) -> Result<Docx, TemplateError> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|e| {
        TemplateError::Read(format!("Failed to read '{}': {e}", path.display()))
    })?;
    parse_template(&bytes)
}

/// Serialises a document into `.docx` bytes.
pub fn document_bytes(doc: Docx) -> Result<Vec<u8>, TemplateError> {
    let mut buffer = Cursor::new(Vec::new());
    doc.build()
        .pack(&mut buffer)
        .map_err(|e| TemplateError::Write(e.to_string()))?;
    Ok(buffer.into_inner())
}

/// Writes a document to `path`, creating parent directories and replacing any
/// earlier file.
///
/// The bytes go to a sibling `.part` file first and are renamed into place, so
/// readers of `path` see either the old document or the new one.
pub fn save_document(doc: Docx, path: impl AsRef<Path>) -> Result<(), TemplateError> {
    let path = path.as_ref();
    let bytes = document_bytes(doc)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut partial = path.as_os_str().to_owned();
    partial.push(".part");
    fs::write(&partial, bytes)?;
    fs::rename(&partial, path)?;
    info!("Saved generated document to '{}'.", path.display());
    Ok(())
}
