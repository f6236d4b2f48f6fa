pub mod bridge;
pub mod deadline;
pub mod renderer;
pub mod resolver;

pub use bridge::TesseractBridge;
pub use deadline::{run_with_deadline, CancelToken};
pub use renderer::{PageRenderer, RenderedPage};
pub use resolver::{OcrBudget, PageResolver};

use crate::error::FailureKind;

/// Black-box optical recognition: image in, text out. Implementations should
/// poll `cancel` and stop early once it fires.
pub trait Recognizer: Send + Sync {
    fn recognize(&self, image: &RenderedPage, cancel: &CancelToken) -> Result<String, FailureKind>;
}
