//! Domain types for the remote place tree and the local mirror.
//!
//! Remote nodes are rebuilt from the wire on every traversal pass; nothing in
//! here is cached between passes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Opaque identity of a remote instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InstanceId(pub String);

impl InstanceId {
    /// The id addressing the top of the place tree.
    pub fn root() -> Self {
        Self("root".to_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for InstanceId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for InstanceId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Path of a pending long-running remote operation, e.g.
/// `universes/1/places/2/instances/root/operations/abc`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OperationHandle(pub String);

impl fmt::Display for OperationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for OperationHandle {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for OperationHandle {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Kinds
// ---------------------------------------------------------------------------

/// The script-like instance classes that are mirrored locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScriptKind {
    Script,
    LocalScript,
    ModuleScript,
}

impl ScriptKind {
    /// Detail keys in classification order; the first one present wins.
    pub fn all() -> &'static [ScriptKind] {
        &[
            ScriptKind::Script,
            ScriptKind::LocalScript,
            ScriptKind::ModuleScript,
        ]
    }

    /// Wire name, used both as the `Details` key and in file names.
    pub fn as_str(self) -> &'static str {
        match self {
            ScriptKind::Script => "Script",
            ScriptKind::LocalScript => "LocalScript",
            ScriptKind::ModuleScript => "ModuleScript",
        }
    }
}

impl fmt::Display for ScriptKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string does not name a [`ScriptKind`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownScriptKind(pub String);

impl fmt::Display for UnknownScriptKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown script kind '{}'; expected: Script, LocalScript, ModuleScript",
            self.0
        )
    }
}

impl std::error::Error for UnknownScriptKind {}

impl FromStr for ScriptKind {
    type Err = UnknownScriptKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ScriptKind::all()
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownScriptKind(s.to_owned()))
    }
}

/// Classification of any remote node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Script(ScriptKind),
    Folder,
    /// Any other instance class, carrying its detail key when one was present.
    Other(String),
}

impl NodeKind {
    pub fn script_kind(&self) -> Option<ScriptKind> {
        match self {
            NodeKind::Script(kind) => Some(*kind),
            _ => None,
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Script(kind) => kind.fmt(f),
            NodeKind::Folder => f.write_str("Folder"),
            NodeKind::Other(name) => f.write_str(name),
        }
    }
}

// ---------------------------------------------------------------------------
// Remote node
// ---------------------------------------------------------------------------

/// One child entry of a remote container, as seen during a single pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteNode {
    pub id: InstanceId,
    pub name: String,
    pub kind: NodeKind,
    /// Script source; `None` for non-script kinds.
    pub source: Option<String>,
    pub has_children: bool,
}

impl RemoteNode {
    pub fn is_folder(&self) -> bool {
        self.kind == NodeKind::Folder
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newtype_display() {
        assert_eq!(InstanceId::from("abc").to_string(), "abc");
        assert_eq!(OperationHandle::from("ops/1").to_string(), "ops/1");
        assert_eq!(InstanceId::root().as_str(), "root");
    }

    #[test]
    fn script_kind_parses_wire_names() {
        for kind in ScriptKind::all() {
            assert_eq!(kind.as_str().parse::<ScriptKind>().unwrap(), *kind);
        }
        assert!("Folder".parse::<ScriptKind>().is_err());
        assert!("script".parse::<ScriptKind>().is_err());
    }

    #[test]
    fn node_kind_display() {
        assert_eq!(NodeKind::Script(ScriptKind::ModuleScript).to_string(), "ModuleScript");
        assert_eq!(NodeKind::Folder.to_string(), "Folder");
        assert_eq!(NodeKind::Other("Part".into()).to_string(), "Part");
        assert_eq!(NodeKind::Folder.script_kind(), None);
    }
}
