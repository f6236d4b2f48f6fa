pub mod json_export;

use anyhow::Result;

use crate::core::schema::CanonicalRecord;

pub use json_export::JsonExporter;

pub trait Exporter {
    fn export(&mut self, record: &CanonicalRecord) -> Result<()>;
}
