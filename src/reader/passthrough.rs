//! Catch-all reader treating UTF-8 files as a single-page document.

use std::path::Path;

use super::{DocumentReader, title_from_path};
use crate::error::{Result, ScreenerError};
use crate::types::{Document, Page};

pub struct PassthroughReader;

impl DocumentReader for PassthroughReader {
    fn name(&self) -> &'static str {
        "passthrough"
    }

    fn supports(&self, _path: &Path) -> bool {
        true
    }

    fn read(&self, path: &Path) -> Result<Document> {
        let text =
            fs_err::read_to_string(path).map_err(|err| ScreenerError::SourceUnreadable {
                path: path.to_path_buf(),
                reason: err.to_string(),
            })?;
        Ok(Document {
            title: title_from_path(path),
            source: path.display().to_string(),
            pages: vec![Page::new(text, 0)],
        })
    }
}
