//! Push: upload mirrored files back to the instances they are bound to.

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;

use scs_core::{metadata, InstanceId, ScriptKind};
use scs_remote::RemoteClient;

use crate::error::{io_err, SyncError};
use crate::writer::TMP_SUFFIX;

/// Inputs of one push.
#[derive(Debug, Clone)]
pub struct PushOptions {
    pub mirror_dir: PathBuf,
}

impl PushOptions {
    pub fn new(mirror_dir: impl Into<PathBuf>) -> Self {
        Self {
            mirror_dir: mirror_dir.into(),
        }
    }
}

/// What happened to one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PushOutcome {
    Pushed {
        path: PathBuf,
        id: InstanceId,
        kind: ScriptKind,
        /// Instance path echoed back by the API, when present.
        remote_path: Option<String>,
    },
    /// No metadata block; the file has no remote counterpart.
    MissingBinding { path: PathBuf },
    /// Every update attempt failed.
    Failed {
        path: PathBuf,
        id: InstanceId,
        error: String,
    },
    ReadFailed { path: PathBuf, error: String },
}

impl PushOutcome {
    pub fn path(&self) -> &Path {
        match self {
            PushOutcome::Pushed { path, .. }
            | PushOutcome::MissingBinding { path }
            | PushOutcome::Failed { path, .. }
            | PushOutcome::ReadFailed { path, .. } => path,
        }
    }

    pub fn is_pushed(&self) -> bool {
        matches!(self, PushOutcome::Pushed { .. })
    }

    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            PushOutcome::Failed { .. } | PushOutcome::ReadFailed { .. }
        )
    }
}

/// Outcomes of a push, in file name order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PushReport {
    pub outcomes: Vec<PushOutcome>,
}

impl PushReport {
    pub fn pushed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_pushed()).count()
    }

    pub fn skipped(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, PushOutcome::MissingBinding { .. }))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_failure()).count()
    }
}

/// Regular files directly inside `dir`, sorted by name. In-flight
/// `.scs.tmp` files are ignored.
pub fn mirror_files(dir: &Path) -> Result<Vec<PathBuf>, SyncError> {
    let entries = std::fs::read_dir(dir).map_err(|e| io_err(dir, e))?;
    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| io_err(dir, e))?;
        let file_type = entry.file_type().map_err(|e| io_err(entry.path(), e))?;
        if !file_type.is_file() {
            continue;
        }
        let path = entry.path();
        if path.to_string_lossy().ends_with(TMP_SUFFIX) {
            continue;
        }
        files.push(path);
    }
    files.sort();
    Ok(files)
}

/// Push one file. Never fails: every problem becomes an outcome.
pub fn push_file(client: &RemoteClient, path: &Path) -> PushOutcome {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "could not read file");
            return PushOutcome::ReadFailed {
                path: path.to_path_buf(),
                error: err.to_string(),
            };
        }
    };

    let Some((id, kind)) = metadata::extract(&content).binding() else {
        tracing::warn!(path = %path.display(), "no metadata block, skipping");
        return PushOutcome::MissingBinding {
            path: path.to_path_buf(),
        };
    };

    match client.update_with_retry(&id, kind, &content) {
        Ok(response) => {
            let remote_path = response
                .get("path")
                .and_then(Value::as_str)
                .map(str::to_owned);
            tracing::info!(
                path = %path.display(),
                instance = %id,
                kind = %kind,
                remote = remote_path.as_deref().unwrap_or("-"),
                "pushed",
            );
            PushOutcome::Pushed {
                path: path.to_path_buf(),
                id,
                kind,
                remote_path,
            }
        }
        Err(err) => {
            tracing::error!(path = %path.display(), instance = %id, error = %err, "push failed");
            PushOutcome::Failed {
                path: path.to_path_buf(),
                id,
                error: err.to_string(),
            }
        }
    }
}

/// Push every file in the mirror, one at a time.
///
/// Only a missing or unreadable mirror directory is an error; per-file
/// problems are recorded and the batch continues.
pub fn push(client: &RemoteClient, options: &PushOptions) -> Result<PushReport, SyncError> {
    let files = mirror_files(&options.mirror_dir)?;
    tracing::info!(mirror = %options.mirror_dir.display(), files = files.len(), "push started");

    let outcomes: Vec<PushOutcome> = files.iter().map(|path| push_file(client, path)).collect();
    let report = PushReport { outcomes };

    tracing::info!(
        pushed = report.pushed(),
        skipped = report.skipped(),
        failed = report.failed(),
        "push finished",
    );
    Ok(report)
}
