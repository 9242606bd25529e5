//! Upload validation and document loading

use lopdf::Document;
use serde::Serialize;

use crate::error::FormFieldError;

/// How far into the file the `%PDF-` header may start
const HEADER_SEARCH_WINDOW: usize = 1024;

/// Basic information about an uploaded PDF
#[derive(Debug, Clone, Serialize, Default, PartialEq)]
pub struct PdfInfo {
    pub page_count: usize,
    /// PDF version string (e.g., "1.7")
    pub version: String,
    pub encrypted: bool,
    pub size_bytes: usize,
    /// Whether the catalog carries an AcroForm
    pub has_form: bool,
}

/// Cheap check that the bytes look like a PDF, without parsing.
pub fn quick_validate(bytes: &[u8]) -> Result<(), FormFieldError> {
    if bytes.is_empty() {
        return Err(FormFieldError::NotAPdf("file is empty".to_string()));
    }

    let window = &bytes[..bytes.len().min(HEADER_SEARCH_WINDOW)];
    if !window.windows(5).any(|w| w == b"%PDF-") {
        return Err(FormFieldError::NotAPdf(
            "missing %PDF- header".to_string(),
        ));
    }

    Ok(())
}

/// Validate and parse PDF bytes.
pub fn load_document(bytes: &[u8]) -> Result<Document, FormFieldError> {
    quick_validate(bytes)?;
    Document::load_mem(bytes).map_err(|e| FormFieldError::Load(e.to_string()))
}

/// Serialize a document to bytes.
pub fn save_document(doc: &mut Document) -> Result<Vec<u8>, FormFieldError> {
    let mut output = Vec::new();
    doc.save_to(&mut output)
        .map_err(|e| FormFieldError::Save(e.to_string()))?;
    Ok(output)
}

/// Parse the document and report page count, version and form presence.
pub fn pdf_info(bytes: &[u8]) -> Result<PdfInfo, FormFieldError> {
    let doc = load_document(bytes)?;

    Ok(PdfInfo {
        page_count: doc.get_pages().len(),
        version: doc.version.clone(),
        encrypted: doc.is_encrypted(),
        size_bytes: bytes.len(),
        has_form: crate::acroform::acroform(&doc).is_some(),
    })
}
