use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::core::model::{Document, KeepReason, Provenance, RelevancePage, ScanVerdict};
use crate::core::relevance::{RelevanceFilter, RelevanceRules};
use crate::core::scan_detector;
use crate::core::schema::{CanonicalRecord, FieldMap};
use crate::fusion::{FirstWinsFusion, FusionEngine};
use crate::ocr::{OcrBudget, PageResolver, Recognizer};
use crate::oracle::ExtractionOracle;
use crate::payload::{self, Payload};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum OracleMode {
    /// One request carrying every kept page.
    #[default]
    Single,
    /// One request per kept page inside the optical window, merged in page order.
    PerPage,
}

/// Every tunable heuristic of a run. Built once and passed down; nothing in
/// the pipeline reads global state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    pub scan_threshold: usize,
    pub scan_sample_pages: usize,
    pub sparse_threshold: usize,
    pub dpi: u32,
    pub ocr_timeout: Duration,
    pub page_window: usize,
    pub optical_window: usize,
    pub always_keep_leading: usize,
    pub relevance_floor: usize,
    pub min_boilerplate_markers: usize,
    pub word_budget: usize,
    pub oracle_mode: OracleMode,
    pub normalize_dates: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            scan_threshold: 100,
            scan_sample_pages: 2,
            sparse_threshold: 50,
            dpi: 150,
            ocr_timeout: Duration::from_secs(20),
            page_window: 8,
            optical_window: 3,
            always_keep_leading: 3,
            relevance_floor: 3,
            min_boilerplate_markers: 2,
            word_budget: 8000,
            oracle_mode: OracleMode::Single,
            normalize_dates: true,
        }
    }
}

impl PipelineConfig {
    pub fn ocr_budget(&self) -> OcrBudget {
        OcrBudget {
            dpi: self.dpi,
            timeout: self.ocr_timeout,
            sparse_threshold: self.sparse_threshold,
            optical_window: self.optical_window,
        }
    }

    pub fn relevance_rules(&self) -> RelevanceRules {
        RelevanceRules {
            min_markers: self.min_boilerplate_markers,
            always_keep_leading: self.always_keep_leading,
            floor: self.relevance_floor,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PageReport {
    pub page: usize,
    pub provenance: Provenance,
    pub kept: bool,
    pub reason: KeepReason,
    pub chars: usize,
}

impl From<&RelevancePage> for PageReport {
    fn from(p: &RelevancePage) -> Self {
        Self {
            page: p.page.index + 1,
            provenance: p.page.provenance,
            kept: p.kept,
            reason: p.reason,
            chars: p.page.text.chars().count(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub record: CanonicalRecord,
    pub verdict: ScanVerdict,
    pub pages: Vec<PageReport>,
    pub oracle_calls: usize,
    pub oracle_failures: usize,
}

/// Runs one document end to end. Every stage failure is absorbed here and
/// downgraded to missing data; the returned record always has every field.
pub fn run(
    config: &PipelineConfig,
    document: &Document,
    recognizer: Arc<dyn Recognizer>,
    oracle: &dyn ExtractionOracle,
) -> PipelineOutcome {
    let verdict = scan_detector::classify(document, config.scan_sample_pages, config.scan_threshold);
    info!(
        path = %document.path().display(),
        pages = document.page_count(),
        window = document.pages().len(),
        ?verdict,
        "document classified"
    );

    let resolver = PageResolver::new(document.source().clone(), recognizer, config.ocr_budget());
    let resolved = document
        .pages()
        .iter()
        .map(|page| resolver.resolve(page, verdict))
        .collect();

    let filter = RelevanceFilter::new(config.relevance_rules());
    let pages = filter.filter(resolved);
    for page in &pages {
        debug!(
            page = page.page.index + 1,
            provenance = page.page.provenance.as_str(),
            kept = page.kept,
            reason = ?page.reason,
            "page resolved"
        );
    }

    let payloads = build_payloads(config, &pages);
    let mut maps = Vec::with_capacity(payloads.len());
    let mut oracle_failures = 0;
    for payload in payloads.iter().filter(|p| !p.is_empty()) {
        if payload.truncated {
            info!(words = payload.words, "payload truncated to word budget");
        }
        match oracle.extract(&payload.text) {
            Ok(map) => maps.push(map),
            Err(err) => {
                warn!(error = %err, "extraction oracle failed, treating as empty");
                oracle_failures += 1;
                maps.push(FieldMap::new());
            }
        }
    }
    let oracle_calls = maps.len();
    if oracle_calls == 0 {
        warn!("no text to send to the extraction oracle");
    }

    let record = FirstWinsFusion::new(config.normalize_dates).fuse(&maps);
    info!(filled = record.filled(), oracle_calls, oracle_failures, "record reconciled");

    PipelineOutcome {
        record,
        verdict,
        pages: pages.iter().map(PageReport::from).collect(),
        oracle_calls,
        oracle_failures,
    }
}

fn build_payloads(config: &PipelineConfig, pages: &[RelevancePage]) -> Vec<Payload> {
    match config.oracle_mode {
        OracleMode::Single => vec![payload::assemble(pages, config.word_budget)],
        OracleMode::PerPage => pages
            .iter()
            .filter(|p| p.kept && p.page.index < config.optical_window)
            .map(|p| payload::assemble(std::iter::once(p), config.word_budget))
            .collect(),
    }
}
