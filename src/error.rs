use thiserror::Error;

/// Failure at one of the pipeline's external boundaries (native text,
/// rendering, recognition, oracle). The orchestrator decides the fallback.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FailureKind {
    #[error("deadline elapsed")]
    Timeout,
    #[error("engine error: {0}")]
    EngineError(String),
    #[error("malformed response: {0}")]
    MalformedResponse(String),
    #[error("not available: {0}")]
    NotAvailable(String),
}

impl FailureKind {
    pub fn engine(msg: impl Into<String>) -> Self {
        Self::EngineError(msg.into())
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedResponse(msg.into())
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::NotAvailable(msg.into())
    }
}

impl From<std::io::Error> for FailureKind {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::NotAvailable(err.to_string()),
            std::io::ErrorKind::TimedOut => Self::Timeout,
            _ => Self::EngineError(err.to_string()),
        }
    }
}
