use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::error::FailureKind;
use crate::ocr::deadline::{wait_child, CancelToken};

/// A rasterized page. The file lives in a directory owned by whoever asked
/// for the render; this value only points at it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPage {
    pub path: PathBuf,
    pub page_idx: usize,
    pub dpi: u32,
}

impl RenderedPage {
    pub fn new(path: PathBuf, page_idx: usize, dpi: u32) -> Self {
        Self { path, page_idx, dpi }
    }
}

#[derive(Debug, Clone)]
pub struct PageRenderer {
    program: String,
}

impl Default for PageRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl PageRenderer {
    pub fn new() -> Self {
        Self {
            program: "pdftoppm".to_string(),
        }
    }

    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn render_page(
        &self,
        pdf_path: &Path,
        page_idx: usize,
        dpi: u32,
        out_dir: &Path,
        cancel: &CancelToken,
    ) -> Result<RenderedPage, FailureKind> {
        cancel.check()?;

        // pdftoppm uses 1-based page indices
        let page_number = (page_idx + 1).to_string();
        let prefix = out_dir.join(format!("page-{page_number}"));

        let mut child = Command::new(&self.program)
            .arg("-png")
            .arg("-singlefile")
            .arg("-r")
            .arg(dpi.to_string())
            .arg("-f")
            .arg(&page_number)
            .arg("-l")
            .arg(&page_number)
            .arg(pdf_path)
            .arg(&prefix)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|err| match err.kind() {
                std::io::ErrorKind::NotFound => {
                    FailureKind::unavailable(format!("{} is not installed", self.program))
                }
                _ => FailureKind::engine(format!("failed to invoke {}: {err}", self.program)),
            })?;

        let status = wait_child(&mut child, cancel)?;
        if !status.success() {
            return Err(FailureKind::engine(format!(
                "{} failed with status: {status}",
                self.program
            )));
        }

        // -singlefile writes `<prefix>.png`
        let path = prefix.with_extension("png");
        if !path.exists() {
            return Err(FailureKind::engine(format!(
                "expected rendered image not found: {}",
                path.display()
            )));
        }

        Ok(RenderedPage::new(path, page_idx, dpi))
    }
}
