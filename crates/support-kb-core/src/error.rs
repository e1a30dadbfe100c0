//! Error taxonomy shared by every store and front end.

use thiserror::Error;

/// Errors produced by knowledge base operations.
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `Validation` | A required field (title, problem, solution) is missing or blank |
/// | `NotFound` | No entry exists with the requested id |
/// | `Format` | An import file is unparsable or an entry in it is invalid |
/// | `Io` | A file cannot be read or written |
/// | `Storage` | The backing database rejected an operation |
#[derive(Debug, Error)]
pub enum KbError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("not found: entry {0}")]
    NotFound(i64),

    #[error("invalid import file: {0}")]
    Format(String),

    #[error("i/o error: {0}")]
    Io(String),

    #[error("storage error: {0}")]
    Storage(String),
}

impl KbError {
    /// Machine-readable error code, used in JSON error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            KbError::Validation(_) => "validation",
            KbError::NotFound(_) => "not_found",
            KbError::Format(_) => "format",
            KbError::Io(_) => "io",
            KbError::Storage(_) => "storage",
        }
    }
}

impl From<std::io::Error> for KbError {
    fn from(err: std::io::Error) -> Self {
        KbError::Io(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, KbError>;
