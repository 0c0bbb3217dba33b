//! Page-wise PDF text extraction backed by `lopdf`.

use std::path::Path;

use super::{DocumentReader, title_from_path};
use crate::error::{Result, ScreenerError};
use crate::types::{Document, Page};

pub struct PdfReader;

impl DocumentReader for PdfReader {
    fn name(&self) -> &'static str {
        "pdf"
    }

    fn supports(&self, path: &Path) -> bool {
        path.extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
    }

    fn read(&self, path: &Path) -> Result<Document> {
        let pdf = lopdf::Document::load(path).map_err(|err| ScreenerError::SourceUnreadable {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })?;

        let mut pages = Vec::new();
        for (ordinal, _object_id) in pdf.get_pages() {
            // lopdf numbers pages from 1; the data model is zero-based.
            let number = ordinal.saturating_sub(1);
            // Extraction can fail on pages with no text operators (scanned
            // images, vector-only pages); those become empty pages and the
            // chunker skips them.
            let text = pdf.extract_text(&[ordinal]).unwrap_or_default();
            pages.push(Page::new(text, number));
        }

        Ok(Document {
            title: title_from_path(path),
            source: path.display().to_string(),
            pages,
        })
    }
}
