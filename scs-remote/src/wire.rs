//! JSON shapes of the place API.
//!
//! Field names follow the wire exactly; nothing outside this module spells
//! them out.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use scs_core::{InstanceId, NodeKind, OperationHandle, RemoteNode, ScriptKind};

use crate::error::RemoteError;

const FOLDER_KEY: &str = "Folder";
const SOURCE_KEY: &str = "Source";

// ---------------------------------------------------------------------------
// Long-running operations
// ---------------------------------------------------------------------------

/// A long-running operation, as returned by `listChildren` and by polling
/// its path.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Operation {
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub response: Option<Value>,
    #[serde(default)]
    pub error: Option<OperationError>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OperationError {
    #[serde(default)]
    pub code: Option<Value>,
    #[serde(default)]
    pub message: String,
}

impl Operation {
    pub fn handle(&self) -> Option<OperationHandle> {
        self.path.clone().map(OperationHandle::from)
    }

    /// Unwrap a finished operation into its response payload.
    pub fn into_result(self, handle: &OperationHandle) -> Result<Value, RemoteError> {
        if let Some(error) = self.error {
            let message = match error.code {
                Some(code) => format!("{} (code {code})", error.message),
                None => error.message,
            };
            return Err(RemoteError::OperationFailed {
                handle: handle.clone(),
                message,
            });
        }
        Ok(self.response.unwrap_or(Value::Null))
    }
}

// ---------------------------------------------------------------------------
// listChildren
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListChildrenResponse {
    #[serde(default)]
    pub instances: Vec<InstanceEntry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceEntry {
    #[serde(default)]
    pub has_children: bool,
    #[serde(default)]
    pub engine_instance: EngineInstance,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EngineInstance {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// One key per instance class, e.g. `{"ModuleScript": {"Source": "..."}}`.
    #[serde(default)]
    pub details: Map<String, Value>,
}

impl InstanceEntry {
    /// Classify the entry. Script kinds are checked in [`ScriptKind::all`]
    /// order and the first present key wins.
    pub fn into_node(self) -> RemoteNode {
        let EngineInstance { id, name, details } = self.engine_instance;
        let script = ScriptKind::all()
            .iter()
            .copied()
            .find(|kind| details.contains_key(kind.as_str()));

        let (kind, source) = match script {
            Some(kind) => {
                let source = details
                    .get(kind.as_str())
                    .and_then(|props| props.get(SOURCE_KEY))
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_owned();
                (NodeKind::Script(kind), Some(source))
            }
            None if details.contains_key(FOLDER_KEY) => (NodeKind::Folder, None),
            None => (
                NodeKind::Other(details.keys().next().cloned().unwrap_or_default()),
                None,
            ),
        };

        RemoteNode {
            id: InstanceId::from(id),
            name,
            kind,
            source,
            has_children: self.has_children,
        }
    }
}

// ---------------------------------------------------------------------------
// Instance update
// ---------------------------------------------------------------------------

/// PATCH body replacing the `Source` of one script instance:
/// `{"engineInstance":{"Details":{"<Kind>":{"Source":"..."}}}}`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateInstanceBody<'a> {
    engine_instance: EngineInstancePatch<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct EngineInstancePatch<'a> {
    details: BTreeMap<&'static str, SourceProperty<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct SourceProperty<'a> {
    source: &'a str,
}

impl<'a> UpdateInstanceBody<'a> {
    pub fn new(kind: ScriptKind, source: &'a str) -> Self {
        Self {
            engine_instance: EngineInstancePatch {
                details: BTreeMap::from([(kind.as_str(), SourceProperty { source })]),
            },
        }
    }
}
