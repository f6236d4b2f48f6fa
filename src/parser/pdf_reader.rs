use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result};

use crate::error::FailureKind;
use crate::ocr::deadline::CancelToken;
use crate::ocr::renderer::{PageRenderer, RenderedPage};
use crate::parser::PageSource;

/// Page access backed by the poppler command-line tools.
#[derive(Debug, Clone)]
pub struct PdfReader {
    path: PathBuf,
    page_count: usize,
    renderer: PageRenderer,
}

impl PdfReader {
    /// Opens `path`. Fails when the page count cannot be read, which the
    /// binary treats as an unreadable input.
    pub fn open(path: PathBuf) -> Result<Self> {
        let page_count = get_page_count(&path)?;
        Ok(Self {
            path,
            page_count,
            renderer: PageRenderer::new(),
        })
    }

    pub fn with_renderer(mut self, renderer: PageRenderer) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PageSource for PdfReader {
    fn page_count(&self) -> usize {
        self.page_count
    }

    fn native_text(&self, page_idx: usize) -> Result<String, FailureKind> {
        let page_number = (page_idx + 1).to_string();
        let output = Command::new("pdftotext")
            .arg("-f")
            .arg(&page_number)
            .arg("-l")
            .arg(&page_number)
            .arg("-layout")
            .arg(&self.path)
            .arg("-")
            .output()?;

        if !output.status.success() {
            return Err(FailureKind::engine(format!(
                "pdftotext failed with status: {}",
                output.status
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn render(
        &self,
        page_idx: usize,
        dpi: u32,
        out_dir: &Path,
        cancel: &CancelToken,
    ) -> Result<RenderedPage, FailureKind> {
        self.renderer.render_page(&self.path, page_idx, dpi, out_dir, cancel)
    }
}

fn get_page_count(pdf_path: &Path) -> Result<usize> {
    let output = Command::new("pdfinfo")
        .arg(pdf_path)
        .output()
        .with_context(|| format!("failed to invoke pdfinfo on {}", pdf_path.display()))?;

    if !output.status.success() {
        anyhow::bail!("pdfinfo failed with status: {}", output.status);
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    parse_page_count(&stdout).with_context(|| {
        format!(
            "pdfinfo output did not contain a usable 'Pages:' line for {}",
            pdf_path.display()
        )
    })
}

fn parse_page_count(info: &str) -> Result<usize> {
    for line in info.lines() {
        if let Some(rest) = line.strip_prefix("Pages:") {
            let num_str = rest.trim();
            let pages: usize = num_str.parse().with_context(|| {
                format!("failed to parse page count from 'Pages:' line: {num_str}")
            })?;
            return Ok(pages);
        }
    }
    anyhow::bail!("no 'Pages:' line")
}
