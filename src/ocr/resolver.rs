use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::core::model::{trimmed_len, Page, Provenance, ResolvedPage, ScanVerdict};
use crate::error::FailureKind;
use crate::ocr::deadline::run_with_deadline;
use crate::ocr::Recognizer;
use crate::parser::PageSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OcrBudget {
    pub dpi: u32,
    pub timeout: Duration,
    pub sparse_threshold: usize,
    /// Only the first `optical_window` pages may be sent to the recognizer.
    pub optical_window: usize,
}

impl Default for OcrBudget {
    fn default() -> Self {
        Self {
            dpi: 150,
            timeout: Duration::from_secs(20),
            sparse_threshold: 50,
            optical_window: 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionPlan {
    Native,
    Optical,
}

pub fn plan(page: &Page, verdict: ScanVerdict, budget: &OcrBudget) -> ResolutionPlan {
    let in_window = page.index < budget.optical_window;
    match verdict {
        ScanVerdict::Scanned if in_window => ResolutionPlan::Optical,
        ScanVerdict::Scanned => ResolutionPlan::Native,
        ScanVerdict::Digital if page.native_len() >= budget.sparse_threshold => ResolutionPlan::Native,
        ScanVerdict::Digital if in_window => ResolutionPlan::Optical,
        ScanVerdict::Digital => ResolutionPlan::Native,
    }
}

/// Keeps the longer of the two texts; ties go to native.
pub fn choose_text(native: &str, optical: &str) -> Provenance {
    if trimmed_len(optical) > trimmed_len(native) {
        Provenance::Optical
    } else {
        Provenance::Native
    }
}

pub struct PageResolver {
    source: Arc<dyn PageSource>,
    recognizer: Arc<dyn Recognizer>,
    budget: OcrBudget,
}

impl PageResolver {
    pub fn new(source: Arc<dyn PageSource>, recognizer: Arc<dyn Recognizer>, budget: OcrBudget) -> Self {
        Self {
            source,
            recognizer,
            budget,
        }
    }

    pub fn budget(&self) -> &OcrBudget {
        &self.budget
    }

    pub fn resolve(&self, page: &Page, verdict: ScanVerdict) -> ResolvedPage {
        let native = ResolvedPage {
            index: page.index,
            text: page.native_text.clone(),
            provenance: Provenance::Native,
        };
        if plan(page, verdict, &self.budget) == ResolutionPlan::Native {
            return native;
        }

        let started = Instant::now();
        match self.attempt_optical(page.index) {
            Ok(optical) => {
                let provenance = choose_text(&page.native_text, &optical);
                debug!(
                    page = page.index + 1,
                    native_chars = page.native_len(),
                    optical_chars = trimmed_len(&optical),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    provenance = provenance.as_str(),
                    "optical attempt finished"
                );
                match provenance {
                    Provenance::Optical => ResolvedPage {
                        text: optical,
                        provenance,
                        ..native
                    },
                    _ => native,
                }
            }
            Err(FailureKind::Timeout) => {
                warn!(
                    page = page.index + 1,
                    timeout_secs = self.budget.timeout.as_secs_f32(),
                    "optical recognition timed out, keeping native text"
                );
                ResolvedPage {
                    provenance: Provenance::OpticalTimeout,
                    ..native
                }
            }
            Err(err) => {
                warn!(page = page.index + 1, error = %err, "optical recognition failed, keeping native text");
                ResolvedPage {
                    provenance: Provenance::OpticalFailed,
                    ..native
                }
            }
        }
    }

    /// Render and recognize under one deadline. The scratch directory holding
    /// the raster belongs to this call, not to the worker, so it is removed
    /// before the next page starts even when the worker was abandoned.
    fn attempt_optical(&self, page_idx: usize) -> Result<String, FailureKind> {
        let scratch = tempfile::Builder::new().prefix("policy-render-").tempdir()?;
        let out_dir = scratch.path().to_path_buf();
        let source = Arc::clone(&self.source);
        let recognizer = Arc::clone(&self.recognizer);
        let dpi = self.budget.dpi;
        let result = run_with_deadline(
            &format!("ocr-page-{}", page_idx + 1),
            self.budget.timeout,
            move |cancel| {
                let image = source.render(page_idx, dpi, &out_dir, &cancel)?;
                recognizer.recognize(&image, &cancel)
            },
        );
        if let Err(err) = scratch.close() {
            warn!(page = page_idx + 1, error = %err, "failed to remove render scratch directory");
        }
        result
    }
}

impl std::fmt::Debug for PageResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageResolver")
            .field("budget", &self.budget)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::deadline::CancelToken;
    use crate::ocr::renderer::RenderedPage;
    use pretty_assertions::assert_eq;
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::thread;

    struct BlankSource;

    impl PageSource for BlankSource {
        fn page_count(&self) -> usize {
            10
        }

        fn native_text(&self, _page_idx: usize) -> Result<String, FailureKind> {
            Ok(String::new())
        }

        fn render(
            &self,
            page_idx: usize,
            dpi: u32,
            _out_dir: &Path,
            _cancel: &CancelToken,
        ) -> Result<RenderedPage, FailureKind> {
            Ok(RenderedPage::new(PathBuf::from("page.png"), page_idx, dpi))
        }
    }

    /// Writes a real file into the scratch directory and remembers where.
    #[derive(Default)]
    struct FileSource {
        rendered: Mutex<Option<PathBuf>>,
    }

    impl PageSource for FileSource {
        fn page_count(&self) -> usize {
            1
        }

        fn native_text(&self, _page_idx: usize) -> Result<String, FailureKind> {
            Ok(String::new())
        }

        fn render(
            &self,
            page_idx: usize,
            dpi: u32,
            out_dir: &Path,
            _cancel: &CancelToken,
        ) -> Result<RenderedPage, FailureKind> {
            let path = out_dir.join("page.png");
            std::fs::write(&path, b"raster")?;
            *self.rendered.lock().unwrap() = Some(path.clone());
            Ok(RenderedPage::new(path, page_idx, dpi))
        }
    }

    struct BrokenRenderer;

    impl PageSource for BrokenRenderer {
        fn page_count(&self) -> usize {
            1
        }

        fn native_text(&self, _page_idx: usize) -> Result<String, FailureKind> {
            Ok(String::new())
        }

        fn render(
            &self,
            _page_idx: usize,
            _dpi: u32,
            _out_dir: &Path,
            _cancel: &CancelToken,
        ) -> Result<RenderedPage, FailureKind> {
            Err(FailureKind::engine("corrupt page"))
        }
    }

    struct FixedRecognizer {
        text: &'static str,
        delay: Duration,
        calls: AtomicUsize,
    }

    impl FixedRecognizer {
        fn new(text: &'static str, delay: Duration) -> Self {
            Self {
                text,
                delay,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl Recognizer for FixedRecognizer {
        fn recognize(&self, _image: &RenderedPage, _cancel: &CancelToken) -> Result<String, FailureKind> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            thread::sleep(self.delay);
            Ok(self.text.to_string())
        }
    }

    fn resolver(source: Arc<dyn PageSource>, recognizer: Arc<FixedRecognizer>, timeout: Duration) -> PageResolver {
        PageResolver::new(
            source,
            recognizer,
            OcrBudget {
                timeout,
                ..OcrBudget::default()
            },
        )
    }

    #[test]
    fn plan_follows_decision_table() {
        let budget = OcrBudget::default();
        let dense = Page::new(0, "x".repeat(80));
        let sparse = Page::new(1, "x");
        let sparse_late = Page::new(5, "x");
        let dense_late = Page::new(5, "x".repeat(5000));

        assert_eq!(plan(&dense, ScanVerdict::Digital, &budget), ResolutionPlan::Native);
        assert_eq!(plan(&sparse, ScanVerdict::Digital, &budget), ResolutionPlan::Optical);
        assert_eq!(plan(&sparse_late, ScanVerdict::Digital, &budget), ResolutionPlan::Native);
        assert_eq!(plan(&dense, ScanVerdict::Scanned, &budget), ResolutionPlan::Optical);
        assert_eq!(plan(&dense_late, ScanVerdict::Scanned, &budget), ResolutionPlan::Native);
    }

    #[test]
    fn ties_prefer_native() {
        assert_eq!(choose_text("abc", "xyz"), Provenance::Native);
        assert_eq!(choose_text("ab", "  xyz  "), Provenance::Optical);
        assert_eq!(choose_text("abcd", ""), Provenance::Native);
    }

    #[test]
    fn optical_text_replaces_shorter_native() {
        let recognizer = Arc::new(FixedRecognizer::new("POLICY SCHEDULE 1234567890", Duration::ZERO));
        let resolver = resolver(Arc::new(BlankSource), recognizer.clone(), Duration::from_secs(5));
        let page = resolver.resolve(&Page::new(0, "po"), ScanVerdict::Scanned);
        assert_eq!(page.provenance, Provenance::Optical);
        assert_eq!(page.text, "POLICY SCHEDULE 1234567890");
        assert_eq!(recognizer.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn timeout_keeps_native_text() {
        let recognizer = Arc::new(FixedRecognizer::new("late optical output", Duration::from_millis(500)));
        let resolver = resolver(Arc::new(BlankSource), recognizer, Duration::from_millis(30));
        let page = resolver.resolve(&Page::new(1, "native bits"), ScanVerdict::Scanned);
        assert_eq!(page.provenance, Provenance::OpticalTimeout);
        assert_eq!(page.text, "native bits");
    }

    #[test]
    fn render_failure_keeps_native_text() {
        let recognizer = Arc::new(FixedRecognizer::new("unused", Duration::ZERO));
        let resolver = resolver(Arc::new(BrokenRenderer), recognizer.clone(), Duration::from_secs(5));
        let page = resolver.resolve(&Page::new(0, ""), ScanVerdict::Scanned);
        assert_eq!(page.provenance, Provenance::OpticalFailed);
        assert_eq!(page.text, "");
        assert_eq!(recognizer.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn scanned_verdict_sticks_for_dense_pages() {
        let recognizer = Arc::new(FixedRecognizer::new("short", Duration::ZERO));
        let resolver = resolver(Arc::new(BlankSource), recognizer.clone(), Duration::from_secs(5));
        let dense = "y".repeat(5000);
        let page = resolver.resolve(&Page::new(2, dense.clone()), ScanVerdict::Scanned);
        assert_eq!(recognizer.calls.load(Ordering::SeqCst), 1);
        assert_eq!(page.provenance, Provenance::Native);
        assert_eq!(page.text, dense);
    }

    #[test]
    fn raster_is_removed_before_resolve_returns_after_timeout() {
        let source = Arc::new(FileSource::default());
        let recognizer = Arc::new(FixedRecognizer::new("late", Duration::from_millis(500)));
        let resolver = resolver(source.clone(), recognizer, Duration::from_millis(100));

        let page = resolver.resolve(&Page::new(0, ""), ScanVerdict::Scanned);

        assert_eq!(page.provenance, Provenance::OpticalTimeout);
        let rendered = source.rendered.lock().unwrap().clone().expect("page was rendered");
        assert!(!rendered.exists());
        assert!(!rendered.parent().unwrap().exists());
    }

    #[test]
    fn raster_is_removed_after_successful_recognition() {
        let source = Arc::new(FileSource::default());
        let recognizer = Arc::new(FixedRecognizer::new("POLICY SCHEDULE", Duration::ZERO));
        let resolver = resolver(source.clone(), recognizer, Duration::from_secs(5));

        let page = resolver.resolve(&Page::new(0, ""), ScanVerdict::Scanned);

        assert_eq!(page.provenance, Provenance::Optical);
        let rendered = source.rendered.lock().unwrap().clone().expect("page was rendered");
        assert!(!rendered.exists());
    }
}
