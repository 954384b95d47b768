//! Remote tree walker: mirrors every script under the place root.
//!
//! Containers are queued in a `VecDeque` and listed by blocking workers in a
//! `JoinSet`, at most `workers` at a time. Each worker owns one container:
//! it lists the children, writes the scripts it finds and hands back the
//! sub-containers to enqueue. Workers share nothing except the client and
//! the mirror directory, and no two of them write the same parent's files.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tokio::task::JoinSet;

use scs_core::{
    metadata, naming, InstanceId, ProjectConfig, RemoteNode, ScriptKind, TraversalPolicy,
};
use scs_remote::RemoteClient;

use crate::error::{io_err, SyncError};
use crate::writer::write_mirror_file;

/// Name used as the parent part of file names for direct children of the root.
pub const ROOT_NAME: &str = "root";

/// Inputs of one pull.
#[derive(Debug, Clone)]
pub struct PullOptions {
    pub mirror_dir: PathBuf,
    pub extension: String,
    pub allow_list: Vec<String>,
    pub traversal: TraversalPolicy,
    pub workers: usize,
}

impl PullOptions {
    /// Defaults: `lua` files, folders-only traversal, one worker per core.
    pub fn new(mirror_dir: impl Into<PathBuf>) -> Self {
        Self {
            mirror_dir: mirror_dir.into(),
            extension: naming::DEFAULT_EXTENSION.to_owned(),
            allow_list: Vec::new(),
            traversal: TraversalPolicy::default(),
            workers: std::thread::available_parallelism().map_or(1, |n| n.get()),
        }
    }

    pub fn from_project(config: &ProjectConfig, mirror_dir: impl Into<PathBuf>) -> Self {
        Self {
            mirror_dir: mirror_dir.into(),
            extension: config.file_extension.clone(),
            allow_list: config.allow_list.clone(),
            traversal: config.traversal,
            workers: config.worker_count(),
        }
    }

    /// Whether the walker lists the children of `node`.
    pub fn descends_into(&self, node: &RemoteNode) -> bool {
        if !node.has_children {
            return false;
        }
        match self.traversal {
            TraversalPolicy::AllContainers => true,
            TraversalPolicy::FoldersAndAllowList => {
                node.is_folder() || self.allow_list.iter().any(|name| *name == node.name)
            }
        }
    }
}

/// One script written to the mirror.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WrittenScript {
    pub path: PathBuf,
    pub id: InstanceId,
    pub kind: ScriptKind,
}

/// A container whose listing failed; its subtree is missing from the mirror.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubtreeFailure {
    pub container: InstanceId,
    pub name: String,
    pub error: String,
}

/// Result of a pull, sorted by path and container id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PullReport {
    pub written: Vec<WrittenScript>,
    pub failures: Vec<SubtreeFailure>,
    pub containers_visited: usize,
}

impl PullReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    fn absorb(&mut self, visit: Visit, pending: &mut VecDeque<Container>) {
        self.containers_visited += 1;
        self.written.extend(visit.written);
        pending.extend(visit.containers);
    }
}

#[derive(Debug, Clone)]
struct Container {
    id: InstanceId,
    name: String,
}

impl Container {
    fn root() -> Self {
        Self {
            id: InstanceId::root(),
            name: ROOT_NAME.to_owned(),
        }
    }
}

#[derive(Debug, Default)]
struct Visit {
    written: Vec<WrittenScript>,
    containers: Vec<Container>,
}

/// Mirror the place into `options.mirror_dir`.
///
/// A failure listing the root aborts the pull. Failures deeper in the tree are
/// recorded in [`PullReport::failures`] and the remaining subtrees continue.
/// Local write errors always abort.
pub async fn pull(
    client: Arc<RemoteClient>,
    options: &PullOptions,
) -> Result<PullReport, SyncError> {
    std::fs::create_dir_all(&options.mirror_dir).map_err(|e| io_err(&options.mirror_dir, e))?;

    let options = Arc::new(options.clone());
    let workers = options.workers.max(1);
    tracing::info!(
        mirror = %options.mirror_dir.display(),
        workers,
        traversal = %options.traversal,
        "pull started",
    );

    let mut report = PullReport::default();
    let mut pending = VecDeque::new();

    let root = {
        let client = client.clone();
        let options = options.clone();
        tokio::task::spawn_blocking(move || visit(&client, &options, &Container::root())).await??
    };
    report.absorb(root, &mut pending);

    let mut in_flight: JoinSet<(Container, Result<Visit, SyncError>)> = JoinSet::new();
    loop {
        while in_flight.len() < workers {
            let Some(container) = pending.pop_front() else {
                break;
            };
            let client = client.clone();
            let options = options.clone();
            in_flight.spawn_blocking(move || {
                let result = visit(&client, &options, &container);
                (container, result)
            });
        }

        let Some(joined) = in_flight.join_next().await else {
            break;
        };
        let (container, result) = joined?;
        match result {
            Ok(visit) => report.absorb(visit, &mut pending),
            Err(SyncError::Remote(err)) => {
                tracing::warn!(
                    container = %container.id,
                    name = %container.name,
                    error = %err,
                    "subtree skipped",
                );
                report.failures.push(SubtreeFailure {
                    container: container.id,
                    name: container.name,
                    error: err.to_string(),
                });
            }
            Err(err) => return Err(err),
        }
    }

    report.written.sort_by(|a, b| a.path.cmp(&b.path));
    report.failures.sort_by(|a, b| a.container.cmp(&b.container));
    tracing::info!(
        written = report.written.len(),
        containers = report.containers_visited,
        failures = report.failures.len(),
        "pull finished",
    );
    Ok(report)
}

fn visit(
    client: &RemoteClient,
    options: &PullOptions,
    container: &Container,
) -> Result<Visit, SyncError> {
    let children = client.list_children(&container.id)?;
    tracing::debug!(container = %container.id, children = children.len(), "listed");

    let mut out = Visit::default();
    for child in children {
        if let (Some(kind), Some(source)) = (child.kind.script_kind(), child.source.as_deref()) {
            let written = mirror_script(
                &options.mirror_dir,
                &options.extension,
                &container.name,
                &child,
                kind,
                source,
            )?;
            out.written.push(written);
        }
        if options.descends_into(&child) {
            out.containers.push(Container {
                id: child.id,
                name: child.name,
            });
        }
    }
    Ok(out)
}

fn mirror_script(
    dir: &Path,
    extension: &str,
    parent: &str,
    node: &RemoteNode,
    kind: ScriptKind,
    source: &str,
) -> Result<WrittenScript, SyncError> {
    let file_name = naming::mirror_file_name(parent, &node.name, kind, extension);
    let content = metadata::embed(source, &node.id, kind);
    let path = write_mirror_file(dir, &file_name, &content)?;
    tracing::info!(path = %path.display(), instance = %node.id, kind = %kind, "wrote script");
    Ok(WrittenScript {
        path,
        id: node.id.clone(),
        kind,
    })
}
