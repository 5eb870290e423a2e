//! Library error types

use thiserror::Error;

use crate::instance::ExceptionInstance;

/// Errors surfaced through `Result` rather than through a protected region
#[derive(Debug, Error)]
pub enum Error {
    /// An exception escaped a [`capture`](crate::capture) call
    #[error("{0}")]
    Thrown(ExceptionInstance),

    /// Protected regions were still active where none were expected
    #[error("{depth} protected region(s) still active on this thread")]
    Unbalanced {
        /// Number of active regions
        depth: usize,
    },
}

impl Error {
    /// The escaped instance, if this is [`Error::Thrown`]
    pub fn exception(&self) -> Option<&ExceptionInstance> {
        match self {
            Error::Thrown(e) => Some(e),
            Error::Unbalanced { .. } => None,
        }
    }
}

impl From<ExceptionInstance> for Error {
    fn from(e: ExceptionInstance) -> Self {
        Error::Thrown(e)
    }
}

/// Result type for fallible runtime operations
pub type Result<T> = std::result::Result<T, Error>;
