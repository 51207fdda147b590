use std::{fmt, io};

/// All errors that can abort an experiment before or outside the round loop.
/// Per-round worker failures are never represented here; they degrade the
/// round and are absorbed by the metrics.
#[derive(Debug)]
pub enum OrchestratorError {
    /// Misconfigured failure scenario, caught before the round loop starts.
    InvalidScenario(String),
    /// The experiment was already driven to completion once.
    AlreadyRan,
    /// An underlying I/O error, e.g. while exporting metrics.
    Io(io::Error),
}

impl fmt::Display for OrchestratorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidScenario(msg) => write!(f, "invalid scenario: {msg}"),
            Self::AlreadyRan => write!(f, "experiment already ran"),
            Self::Io(e) => write!(f, "io error: {e}"),
        }
    }
}

impl std::error::Error for OrchestratorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for OrchestratorError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

/// Boundary conversion for binaries / I/O APIs.
impl From<OrchestratorError> for io::Error {
    fn from(value: OrchestratorError) -> Self {
        match value {
            OrchestratorError::Io(e) => e,
            other => io::Error::new(io::ErrorKind::InvalidInput, other),
        }
    }
}
