use std::fs;
use std::process::{Command, Stdio};

use tracing::debug;

use crate::error::FailureKind;
use crate::ocr::deadline::{wait_child, CancelToken};
use crate::ocr::renderer::RenderedPage;
use crate::ocr::Recognizer;

/// Runs the `tesseract` CLI on a rendered page.
#[derive(Debug, Clone)]
pub struct TesseractBridge {
    program: String,
    lang: String,
}

impl Default for TesseractBridge {
    fn default() -> Self {
        Self::new()
    }
}

impl TesseractBridge {
    pub fn new() -> Self {
        Self {
            program: "tesseract".to_string(),
            lang: "eng".to_string(),
        }
    }

    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn with_lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = lang.into();
        self
    }
}

impl Recognizer for TesseractBridge {
    fn recognize(&self, image: &RenderedPage, cancel: &CancelToken) -> Result<String, FailureKind> {
        cancel.check()?;
        let scratch = tempfile::Builder::new().prefix("policy-ocr-").tempdir()?;
        let out_base = scratch.path().join("page");

        // Output goes to a file so a chatty engine cannot fill a pipe while we poll.
        let mut child = Command::new(&self.program)
            .arg(&image.path)
            .arg(&out_base)
            .arg("-l")
            .arg(&self.lang)
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

        let text = fs::read_to_string(out_base.with_extension("txt"))
            .map_err(|err| FailureKind::engine(format!("failed to read OCR output: {err}")))?;
        debug!(page = image.page_idx + 1, chars = text.len(), "tesseract finished");
        Ok(text)
    }
}
