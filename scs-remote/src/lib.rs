//! # scs-remote
//!
//! Blocking client for the place API.
//!
//! - [`RemoteClient::list_children`] — list a container, polling the
//!   long-running operation it returns
//! - [`RemoteClient::poll`] — the long-operation poller with doubling backoff
//! - [`RemoteClient::update_with_retry`] — push one script's source
//!
//! HTTP goes through the [`Transport`] trait; [`UreqTransport`] is the
//! production implementation.

pub mod backoff;
pub mod client;
pub mod error;
#[cfg(any(test, feature = "test-util"))]
pub mod fake;
pub mod transport;
pub mod wire;

pub use backoff::{Backoff, RetryPolicy};
pub use client::{RemoteClient, RemoteConfig, Sleeper, ThreadSleeper};
pub use error::RemoteError;
pub use transport::{ApiRequest, ApiResponse, Method, Transport, UreqTransport};
