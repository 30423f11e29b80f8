//! Text extraction from official order documents

use lopdf::Document;
use std::path::Path;
use tracing::debug;

use crate::error::ExtractionError;

/// Source of raw text for an order document
pub trait DocumentReader {
    fn extract_text(&self, path: &Path) -> Result<String, ExtractionError>;
}

/// PDF text layer extraction via lopdf.
///
/// Pages are visited in order; pages without text are skipped and the rest
/// are joined with a newline. No layout reconstruction is attempted.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfTextReader;

impl DocumentReader for PdfTextReader {
    fn extract_text(&self, path: &Path) -> Result<String, ExtractionError> {
        let document = Document::load(path).map_err(|e| ExtractionError::Open {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let mut pages = Vec::new();
        for page_number in document.get_pages().keys() {
            match document.extract_text(&[*page_number]) {
                Ok(text) if !text.trim().is_empty() => pages.push(text),
                Ok(_) => debug!("Page {} of {} has no text", page_number, path.display()),
                Err(e) => debug!("Page {} of {} not extractable: {}", page_number, path.display(), e),
            }
        }

        Ok(pages.join("\n"))
    }
}
