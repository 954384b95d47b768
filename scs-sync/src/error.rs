//! Error types for scs-sync.

use std::path::PathBuf;

use thiserror::Error;

use scs_remote::RemoteError;

/// All errors that can arise from pull, push and monitor.
#[derive(Debug, Error)]
pub enum SyncError {
    /// An error from the place API that no batch absorbed.
    #[error("remote error: {0}")]
    Remote(#[from] RemoteError),

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A blocking worker panicked or was cancelled.
    #[error("worker task failed: {0}")]
    Join(String),
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}

impl From<tokio::task::JoinError> for SyncError {
    fn from(err: tokio::task::JoinError) -> Self {
        SyncError::Join(err.to_string())
    }
}
