//! Error types.
//!
//! Only resource failures are represented here. Misuse of the runtime
//! (nonlinear use of an environment, reading a result too early, ...) is a
//! defect in the driving code and panics instead.

use std::io;

use thiserror::Error;

/// Convenience alias used by task bodies and runtime operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// An error delivered through a task's result.
#[derive(Debug, Error)]
pub enum Error {
    /// The operating system refused to start an asynchronous operation.
    #[error("failed to initiate {op}: {source}")]
    Initiate {
        op: &'static str,
        #[source]
        source: io::Error,
    },

    /// An operation was started but reported a failure on completion.
    ///
    /// Cancelled operations land here with [`io::ErrorKind::Interrupted`].
    #[error("{op} failed: {source}")]
    Complete {
        op: &'static str,
        #[source]
        source: io::Error,
    },

    /// The stream ended before the requested amount of data arrived.
    #[error("end of stream reached prematurely ({received} of {expected} bytes)")]
    UnexpectedEof { expected: usize, received: usize },

    /// A failure of the signal layer itself (creating, setting, resetting or
    /// waiting on a completion signal).
    #[error(transparent)]
    Io(#[from] io::Error),

    /// An application-defined failure raised by a task body.
    #[error(transparent)]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
    /// Wraps an arbitrary error (or message) raised by a task body.
    pub fn other<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Error::Other(error.into())
    }

    /// Returns `true` if the error comes from a cancelled operation.
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            Error::Complete { source, .. } if source.kind() == io::ErrorKind::Interrupted
        )
    }
}
