pub mod core;
pub mod error;
pub mod export;
pub mod fusion;
pub mod ocr;
pub mod oracle;
pub mod parser;
pub mod payload;
pub mod pipeline;

pub use crate::core::model::{Document, Page, Provenance, ResolvedPage, ScanVerdict};
pub use crate::core::schema::{CanonicalRecord, Field, FieldMap};
pub use error::FailureKind;
pub use pipeline::{run, PipelineConfig, PipelineOutcome};
