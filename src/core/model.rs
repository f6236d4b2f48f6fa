use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::parser::PageSource;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Provenance {
    Native,
    Optical,
    OpticalTimeout,
    OpticalFailed,
}

impl Provenance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provenance::Native => "native",
            Provenance::Optical => "optical",
            Provenance::OpticalTimeout => "optical-timeout",
            Provenance::OpticalFailed => "optical-failed",
        }
    }
}

/// Document-level decision on whether native text can be trusted.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ScanVerdict {
    Digital,
    Scanned,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub index: usize,
    pub native_text: String,
}

impl Page {
    pub fn new(index: usize, native_text: impl Into<String>) -> Self {
        Self {
            index,
            native_text: native_text.into(),
        }
    }

    pub fn native_len(&self) -> usize {
        trimmed_len(&self.native_text)
    }
}

/// The pages of one input, restricted to the processing window. Rasters are
/// never held here; they are requested from the source per optical attempt.
pub struct Document {
    path: PathBuf,
    source: Arc<dyn PageSource>,
    page_count: usize,
    pages: Vec<Page>,
}

impl Document {
    /// Loads native text for the first `window` pages. A page whose text
    /// cannot be extracted is kept with empty text.
    pub fn load(path: impl Into<PathBuf>, source: Arc<dyn PageSource>, window: usize) -> Self {
        let page_count = source.page_count();
        let pages = (0..page_count.min(window))
            .map(|index| {
                let native_text = source.native_text(index).unwrap_or_else(|err| {
                    warn!(page = index + 1, error = %err, "native text extraction failed");
                    String::new()
                });
                Page { index, native_text }
            })
            .collect();
        Self {
            path: path.into(),
            source,
            page_count,
            pages,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn source(&self) -> &Arc<dyn PageSource> {
        &self.source
    }

    /// Total pages in the underlying file, including those outside the window.
    pub fn page_count(&self) -> usize {
        self.page_count
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("path", &self.path)
            .field("page_count", &self.page_count)
            .field("window", &self.pages.len())
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResolvedPage {
    pub index: usize,
    pub text: String,
    pub provenance: Provenance,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum KeepReason {
    LeadingPage,
    Substantive,
    PositiveEvidence,
    FloorReached,
    Boilerplate,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RelevancePage {
    pub page: ResolvedPage,
    pub kept: bool,
    pub reason: KeepReason,
}

pub fn trimmed_len(text: &str) -> usize {
    text.trim().chars().count()
}
