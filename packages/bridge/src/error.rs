//! Error types for the bridge layer.
//!
//! Everything here is raised synchronously to the collaborator or the
//! installer. Nothing crosses the callback boundary as an error value;
//! callbacks convert failures into the thread-local diagnostic channel plus
//! sentinel returns (see `dispatch`).

use thiserror::Error;

use gatefs_opener::OpenerError;

use crate::handles::HandleId;
use crate::key::RegistrationKey;

/// Errors raised while a collaborator registers an opener.
#[derive(Debug, Error)]
pub enum RegistrationError {
    /// A different opener is already bound to this key.
    #[error("opener registration conflict for {key}")]
    Conflict { key: RegistrationKey },

    /// The opener failed its validation probe.
    #[error("opener rejected: {source}")]
    Probe {
        #[source]
        source: OpenerError,
    },

    /// The access mode has no recognized mode class.
    #[error("unsupported access mode {mode:?}")]
    Mode { mode: String },
}

/// Errors from operations on tracked stream handles.
#[derive(Debug, Error)]
pub enum HandleError {
    /// The id was never issued, or its stream is already closed.
    #[error("unknown stream handle {id}")]
    Unknown { id: HandleId },

    /// The underlying stream failed.
    #[error("io error on handle {id}: {source}")]
    Io {
        id: HandleId,
        #[source]
        source: std::io::Error,
    },
}

/// Errors from the native runtime's registration surface.
#[derive(Debug, Error)]
pub enum HostError {
    /// The prefix already has a handler.
    #[error("prefix {prefix:?} already has a handler")]
    PrefixTaken { prefix: String },

    /// Any other runtime-side failure.
    #[error("{message}")]
    Other { message: String },
}

/// Errors from installing or removing the plugin.
#[derive(Debug, Error)]
pub enum InstallError {
    #[error(transparent)]
    Host(#[from] HostError),

    /// Uninstall without a prior install.
    #[error("plugin is not installed")]
    NotInstalled,
}
