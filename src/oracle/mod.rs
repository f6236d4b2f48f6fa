//! The remote extraction oracle: assembled text in, flat field map out.

pub mod openai;
pub mod prompt;
pub mod response;

pub use openai::{OpenAiOracle, OracleConfig};

use crate::core::schema::FieldMap;
use crate::error::FailureKind;

pub trait ExtractionOracle {
    fn extract(&self, payload: &str) -> Result<FieldMap, FailureKind>;
}

impl<T: ExtractionOracle + ?Sized> ExtractionOracle for Box<T> {
    fn extract(&self, payload: &str) -> Result<FieldMap, FailureKind> {
        (**self).extract(payload)
    }
}
