//! Error types for the opener layer.

use std::io;

use thiserror::Error;

/// Errors raised by openers and the streams they produce.
#[derive(Debug, Error)]
pub enum OpenerError {
    /// The path does not exist in the opener's namespace.
    #[error("not found: {path}")]
    NotFound { path: String },

    /// The opener does not support this operation.
    #[error("operation not supported: {op}")]
    Unsupported { op: &'static str },

    /// An I/O failure from the underlying stream or filesystem.
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// Any other opener-specific failure.
    #[error("{message}")]
    Other { message: String },
}

impl OpenerError {
    /// A `NotFound` error for `path`.
    pub fn not_found(path: impl Into<String>) -> Self {
        OpenerError::NotFound { path: path.into() }
    }

    /// A generic error with a message.
    pub fn other(message: impl Into<String>) -> Self {
        OpenerError::Other {
            message: message.into(),
        }
    }

    /// Whether this is a not-found outcome, either native or carried in an
    /// underlying `io::Error`.
    pub fn is_not_found(&self) -> bool {
        match self {
            OpenerError::NotFound { .. } => true,
            OpenerError::Io(e) => e.kind() == io::ErrorKind::NotFound,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_is_recognized() {
        assert!(OpenerError::not_found("x").is_not_found());

        let io_err = io::Error::new(io::ErrorKind::NotFound, "no such file");
        let err: OpenerError = io_err.into();
        assert!(err.is_not_found());
    }

    #[test]
    fn other_errors_are_not_not_found() {
        assert!(!OpenerError::other("boom").is_not_found());

        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "nope");
        let err: OpenerError = io_err.into();
        assert!(!err.is_not_found());
    }

    #[test]
    fn display_includes_path() {
        let err = OpenerError::not_found("data/a.tif");
        assert!(format!("{}", err).contains("data/a.tif"));
    }
}
