//! Error types for scs-remote.

use thiserror::Error;

use scs_core::OperationHandle;

/// All errors that can arise from talking to the remote place API.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// Connection, DNS, TLS or body-read failure before a status was seen.
    #[error("transport error for {url}: {message}")]
    Transport { url: String, message: String },

    /// Non-2xx response other than 429.
    #[error("request to {url} failed with HTTP {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    /// 429 kept coming back after every cooldown.
    #[error("rate limited on {url} after {retries} cooldowns")]
    RateLimited { url: String, retries: u32 },

    /// The poll budget ran out before the operation reported `done`.
    #[error("operation {handle} not done after {attempts} polls")]
    Timeout {
        handle: OperationHandle,
        attempts: u32,
    },

    /// The operation finished with an embedded error.
    #[error("operation {handle} failed: {message}")]
    OperationFailed {
        handle: OperationHandle,
        message: String,
    },

    /// A 2xx body that does not have the expected shape.
    #[error("invalid response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    /// A pending listChildren response without an operation path to poll.
    #[error("response from {url} is neither done nor carries an operation path")]
    MissingOperationPath { url: String },

    /// JSON serialization error (request bodies).
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl RemoteError {
    /// HTTP status of the failed request, if one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            RemoteError::Status { status, .. } => Some(*status),
            RemoteError::RateLimited { .. } => Some(429),
            _ => None,
        }
    }
}
