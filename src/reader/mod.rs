//! Document reader trait and registry for source ingestion.

mod passthrough;
mod pdf;

use std::path::Path;

pub use passthrough::PassthroughReader;
pub use pdf::PdfReader;

use crate::error::{Result, ScreenerError};
use crate::types::Document;

/// Trait implemented by readers that can turn a source file into pages.
pub trait DocumentReader: Send + Sync {
    /// Human-readable name used for diagnostics (e.g. "pdf", "passthrough").
    fn name(&self) -> &'static str;

    /// Return true if this reader is a good match for the given path.
    fn supports(&self, path: &Path) -> bool;

    /// Load the file and extract its ordered pages.
    fn read(&self, path: &Path) -> Result<Document>;
}

/// Ordered registry of readers; the first reader claiming a path wins.
pub struct ReaderRegistry {
    readers: Vec<Box<dyn DocumentReader>>,
}

impl ReaderRegistry {
    #[must_use]
    pub fn empty() -> Self {
        Self {
            readers: Vec::new(),
        }
    }

    pub fn register<R>(&mut self, reader: R)
    where
        R: DocumentReader + 'static,
    {
        self.readers.push(Box::new(reader));
    }

    pub fn find_reader(&self, path: &Path) -> Option<&dyn DocumentReader> {
        self.readers
            .iter()
            .map(std::convert::AsRef::as_ref)
            .find(|reader| reader.supports(path))
    }

    /// Resolve and load a source document. A missing file is reported before
    /// any reader is consulted, so callers can exit early without indexing.
    pub fn load(&self, path: &Path) -> Result<Document> {
        if !path.exists() {
            return Err(ScreenerError::SourceMissing {
                path: path.to_path_buf(),
            });
        }
        let reader = self
            .find_reader(path)
            .ok_or_else(|| ScreenerError::UnsupportedSource {
                path: path.to_path_buf(),
            })?;
        tracing::debug!(reader = reader.name(), path = %path.display(), "loading source");
        let document = reader.read(path)?;
        tracing::info!(
            reader = reader.name(),
            pages = document.page_count(),
            "loaded source document"
        );
        Ok(document)
    }
}

impl Default for ReaderRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(PdfReader);
        registry.register(PassthroughReader);
        registry
    }
}

pub(crate) fn title_from_path(path: &Path) -> Option<String> {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
}
