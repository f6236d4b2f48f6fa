pub mod pdf_reader;

pub use pdf_reader::PdfReader;

use std::path::Path;

use crate::error::FailureKind;
use crate::ocr::deadline::CancelToken;
use crate::ocr::renderer::RenderedPage;

/// Access to one document's pages: native text up front, rasters on demand.
pub trait PageSource: Send + Sync {
    fn page_count(&self) -> usize;

    fn native_text(&self, page_idx: usize) -> Result<String, FailureKind>;

    /// Rasterizes one page into `out_dir`. The caller owns the directory and
    /// removes it, along with the image, when the attempt is over.
    fn render(
        &self,
        page_idx: usize,
        dpi: u32,
        out_dir: &Path,
        cancel: &CancelToken,
    ) -> Result<RenderedPage, FailureKind>;
}
