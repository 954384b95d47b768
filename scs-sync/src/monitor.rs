//! Change monitor: push mirror files whose modification time moved.
//!
//! [`Monitor`] holds the last recorded mtime per file. The async [`monitor`]
//! loop runs one blocking [`Monitor::pass`] at a time and checks the shutdown
//! channel only between passes, so a pass that started always completes.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use serde::Serialize;
use tokio::sync::broadcast;

use scs_remote::RemoteClient;

use crate::error::SyncError;
use crate::push::{mirror_files, push_file, PushOutcome};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorOptions {
    pub mirror_dir: PathBuf,
    pub interval: Duration,
    /// `false` runs exactly one pass.
    pub loop_forever: bool,
}

impl MonitorOptions {
    pub fn once(mirror_dir: impl Into<PathBuf>) -> Self {
        Self {
            mirror_dir: mirror_dir.into(),
            interval: Duration::ZERO,
            loop_forever: false,
        }
    }

    pub fn every(mirror_dir: impl Into<PathBuf>, interval: Duration) -> Self {
        Self {
            mirror_dir: mirror_dir.into(),
            interval,
            loop_forever: true,
        }
    }
}

/// Result of one scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PassReport {
    /// One entry per changed file, in file name order.
    pub outcomes: Vec<PushOutcome>,
    pub unchanged: usize,
    /// Recorded files that disappeared since the previous pass.
    pub forgotten: usize,
}

impl PassReport {
    pub fn pushed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_pushed()).count()
    }
}

/// Totals over every pass of a [`monitor`] run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MonitorSummary {
    pub passes: u64,
    pub pushed: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl MonitorSummary {
    fn record(&mut self, pass: &PassReport) {
        self.passes += 1;
        for outcome in &pass.outcomes {
            match outcome {
                PushOutcome::Pushed { .. } => self.pushed += 1,
                PushOutcome::MissingBinding { .. } => self.skipped += 1,
                PushOutcome::Failed { .. } | PushOutcome::ReadFailed { .. } => self.failed += 1,
            }
        }
    }
}

/// mtime bookkeeping for one mirror directory.
#[derive(Debug)]
pub struct Monitor {
    mirror_dir: PathBuf,
    seen: HashMap<PathBuf, SystemTime>,
}

impl Monitor {
    pub fn new(mirror_dir: impl Into<PathBuf>) -> Self {
        Self {
            mirror_dir: mirror_dir.into(),
            seen: HashMap::new(),
        }
    }

    pub fn mirror_dir(&self) -> &Path {
        &self.mirror_dir
    }

    /// Last mtime recorded for `path`, if any.
    pub fn recorded(&self, path: &Path) -> Option<SystemTime> {
        self.seen.get(path).copied()
    }

    /// Scan once and push every file that is new or newer than recorded.
    ///
    /// The mtime is recorded after a successful push and after a binding skip.
    /// Remote and read failures stay unrecorded so the next pass retries them.
    pub fn pass(&mut self, client: &RemoteClient) -> Result<PassReport, SyncError> {
        let files = mirror_files(&self.mirror_dir)?;
        let mut report = PassReport::default();

        let before = self.seen.len();
        self.seen.retain(|path, _| files.binary_search(path).is_ok());
        report.forgotten = before - self.seen.len();

        for path in files {
            let modified = match std::fs::metadata(&path).and_then(|m| m.modified()) {
                Ok(modified) => modified,
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "could not stat file");
                    report.outcomes.push(PushOutcome::ReadFailed {
                        path,
                        error: err.to_string(),
                    });
                    continue;
                }
            };

            if self.seen.get(&path).is_some_and(|last| modified <= *last) {
                report.unchanged += 1;
                continue;
            }

            tracing::debug!(path = %path.display(), "change detected");
            let outcome = push_file(client, &path);
            if matches!(
                outcome,
                PushOutcome::Pushed { .. } | PushOutcome::MissingBinding { .. }
            ) {
                self.seen.insert(path, modified);
            }
            report.outcomes.push(outcome);
        }

        Ok(report)
    }
}

/// Run passes until shutdown, or exactly one when `loop_forever` is off.
///
/// Any message on `shutdown`, or its sender going away, ends the loop at the
/// next pass boundary.
pub async fn monitor(
    client: Arc<RemoteClient>,
    options: &MonitorOptions,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<MonitorSummary, SyncError> {
    tracing::info!(
        mirror = %options.mirror_dir.display(),
        interval_secs = options.interval.as_secs_f64(),
        loop_forever = options.loop_forever,
        "monitoring",
    );

    let mut summary = MonitorSummary::default();
    let mut state = Monitor::new(&options.mirror_dir);
    loop {
        let client = client.clone();
        let (returned, result) = tokio::task::spawn_blocking(move || {
            let result = state.pass(&client);
            (state, result)
        })
        .await?;
        state = returned;

        let pass = result?;
        summary.record(&pass);
        if !pass.outcomes.is_empty() || pass.forgotten > 0 {
            tracing::info!(
                pass = summary.passes,
                changed = pass.outcomes.len(),
                pushed = pass.pushed(),
                forgotten = pass.forgotten,
                "pass complete",
            );
        }

        if !options.loop_forever {
            break;
        }

        tokio::select! {
            _ = shutdown.recv() => break,
            _ = tokio::time::sleep(options.interval) => {}
        }
    }

    tracing::info!(
        passes = summary.passes,
        pushed = summary.pushed,
        failed = summary.failed,
        "monitor stopped",
    );
    Ok(summary)
}
