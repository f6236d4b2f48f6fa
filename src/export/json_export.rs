use std::io::{self, Write};

use anyhow::{Context, Result};

use crate::core::schema::CanonicalRecord;
use crate::export::Exporter;

/// Writes the record as one pretty-printed JSON object followed by a newline.
#[derive(Debug)]
pub struct JsonExporter<W: Write> {
    out: W,
}

impl JsonExporter<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> JsonExporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Exporter for JsonExporter<W> {
    fn export(&mut self, record: &CanonicalRecord) -> Result<()> {
        let data = serde_json::to_string_pretty(record).context("failed to serialize record")?;
        writeln!(self.out, "{data}").context("failed to write record")?;
        self.out.flush().context("failed to flush record")?;
        Ok(())
    }
}
