//! # scs-sync
//!
//! Moves scripts between the remote place and the local mirror directory.
//!
//! - [`walker::pull`] mirrors every script under the place root
//! - [`push::push`] uploads every bound mirror file
//! - [`monitor::monitor`] pushes files as their mtime changes

pub mod error;
pub mod monitor;
pub mod push;
pub mod walker;
pub mod writer;

pub use error::SyncError;
pub use monitor::{monitor, Monitor, MonitorOptions, MonitorSummary, PassReport};
pub use push::{push, push_file, PushOptions, PushOutcome, PushReport};
pub use walker::{pull, PullOptions, PullReport, SubtreeFailure, WrittenScript};
pub use writer::write_mirror_file;
