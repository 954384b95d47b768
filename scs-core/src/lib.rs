//! scs core library — domain types, the metadata codec, mirror naming and
//! project configuration.
//!
//! - [`types`] — instance ids, kinds and remote nodes
//! - [`metadata`] — embed / extract the identity block in mirrored files
//! - [`naming`] — `{parent}_{child}-{kind}.{ext}` file names
//! - [`config`] — `scs.yaml`, `.env` and API key lookup
//! - [`error`] — [`ConfigError`]

pub mod config;
pub mod error;
pub mod metadata;
pub mod naming;
pub mod types;

pub use config::{ProjectConfig, TraversalPolicy};
pub use error::ConfigError;
pub use metadata::Metadata;
pub use types::{InstanceId, NodeKind, OperationHandle, RemoteNode, ScriptKind};
