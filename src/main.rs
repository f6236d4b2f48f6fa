use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use policy_extract::core::model::Document;
use policy_extract::core::schema::CanonicalRecord;
use policy_extract::export::{Exporter, JsonExporter};
use policy_extract::ocr::TesseractBridge;
use policy_extract::oracle::{ExtractionOracle, OpenAiOracle, OracleConfig};
use policy_extract::parser::PdfReader;
use policy_extract::pipeline::{self, OracleMode, PipelineConfig};
use policy_extract::FailureKind;

#[derive(Parser, Debug)]
#[command(name = "policy-extract")]
#[command(version, about = "Extract insurance policy fields from a PDF as a fixed-schema JSON record", long_about = None)]
struct Cli {
    /// Input PDF file path
    input: Option<PathBuf>,

    /// Rendering DPI for optical recognition
    #[arg(long, default_value_t = 150)]
    dpi: u32,

    /// Hard per-page deadline for render + recognition, in seconds
    #[arg(long, default_value_t = 20)]
    ocr_timeout_secs: u64,

    /// Number of leading pages considered at all
    #[arg(long, default_value_t = 8)]
    page_window: usize,

    /// Number of leading pages eligible for optical recognition
    #[arg(long, default_value_t = 3)]
    optical_window: usize,

    /// Native characters per page below which a digital page counts as sparse
    #[arg(long, default_value_t = 50)]
    sparse_threshold: usize,

    /// Combined native characters on the sampled pages below which the document counts as scanned
    #[arg(long, default_value_t = 100)]
    scan_threshold: usize,

    /// Number of leading pages sampled for the scanned/digital verdict
    #[arg(long, default_value_t = 2)]
    scan_sample_pages: usize,

    /// Leading pages the relevance filter never drops
    #[arg(long, default_value_t = 3)]
    always_keep_leading: usize,

    /// Minimum number of pages that must stay kept
    #[arg(long, default_value_t = 3)]
    relevance_floor: usize,

    /// Distinct boilerplate markers needed before a page may be dropped
    #[arg(long, default_value_t = 2)]
    min_boilerplate_markers: usize,

    /// Payload budget in words
    #[arg(long, default_value_t = 8000)]
    word_budget: usize,

    /// How many extraction requests to make
    #[arg(long, value_enum, default_value_t = OracleMode::Single)]
    oracle_mode: OracleMode,

    /// Extraction model name
    #[arg(long, default_value = "gpt-4o-mini")]
    model: String,

    /// Base URL of the chat-completions API
    #[arg(long, default_value = "https://api.openai.com/v1")]
    base_url: String,

    /// Request timeout for the extraction call, in seconds
    #[arg(long, default_value_t = 30)]
    oracle_timeout_secs: u64,

    /// Keep date fields exactly as extracted
    #[arg(long)]
    no_date_normalization: bool,

    /// Only log warnings and errors
    #[arg(short, long)]
    quiet: bool,

    /// Log per-page decisions
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,
}

impl Cli {
    fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            scan_threshold: self.scan_threshold,
            scan_sample_pages: self.scan_sample_pages,
            sparse_threshold: self.sparse_threshold,
            dpi: self.dpi,
            ocr_timeout: Duration::from_secs(self.ocr_timeout_secs),
            page_window: self.page_window,
            optical_window: self.optical_window,
            always_keep_leading: self.always_keep_leading,
            relevance_floor: self.relevance_floor,
            min_boilerplate_markers: self.min_boilerplate_markers,
            word_budget: self.word_budget,
            oracle_mode: self.oracle_mode,
            normalize_dates: !self.no_date_normalization,
        }
    }

    fn oracle_config(&self) -> OracleConfig {
        OracleConfig {
            base_url: self.base_url.clone(),
            model: self.model.clone(),
            timeout: Duration::from_secs(self.oracle_timeout_secs),
            ..OracleConfig::from_env()
        }
    }
}

fn init_logging(cli: &Cli) {
    let default = if cli.quiet {
        "warn"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli);

    match extract(&cli) {
        Ok(code) => code,
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

fn extract(cli: &Cli) -> Result<ExitCode> {
    let Some(input) = cli.input.clone() else {
        error!("no input document given");
        emit(&CanonicalRecord::empty())?;
        return Ok(ExitCode::FAILURE);
    };
    if !input.is_file() {
        error!("input file does not exist: {}", input.display());
        emit(&CanonicalRecord::empty())?;
        return Ok(ExitCode::FAILURE);
    }

    let reader = match PdfReader::open(input.clone()) {
        Ok(reader) => reader,
        Err(err) => {
            error!("failed to open {}: {err:#}", input.display());
            emit(&CanonicalRecord::empty())?;
            return Ok(ExitCode::FAILURE);
        }
    };

    let config = cli.pipeline_config();
    let document = Document::load(input, Arc::new(reader), config.page_window);
    let oracle: Box<dyn ExtractionOracle> = match OpenAiOracle::new(cli.oracle_config()) {
        Ok(oracle) => Box::new(oracle),
        Err(err) => Box::new(Unavailable(err)),
    };

    let outcome = pipeline::run(&config, &document, Arc::new(TesseractBridge::new()), oracle.as_ref());
    info!(
        verdict = ?outcome.verdict,
        kept = outcome.pages.iter().filter(|p| p.kept).count(),
        window = outcome.pages.len(),
        oracle_failures = outcome.oracle_failures,
        "extraction finished"
    );

    emit(&outcome.record)?;
    Ok(ExitCode::SUCCESS)
}

fn emit(record: &CanonicalRecord) -> Result<()> {
    JsonExporter::stdout()
        .export(record)
        .context("failed to write record to stdout")
}

/// Stands in when the HTTP client cannot be built, so the run still ends in a record.
struct Unavailable(FailureKind);

impl ExtractionOracle for Unavailable {
    fn extract(&self, _payload: &str) -> Result<policy_extract::FieldMap, FailureKind> {
        Err(self.0.clone())
    }
}
