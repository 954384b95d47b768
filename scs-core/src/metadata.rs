//! Identity tag embedded in mirrored script files.
//!
//! Each pulled file carries one block binding it to its remote instance, so
//! the mirror needs no separate index. The block is a Lua long comment and
//! leaves the script valid:
//!
//! ```text
//! --[[ scs:metadata
//! instanceId: 6b3a…
//! instanceType: ModuleScript
//! scs:metadata ]]
//! ```
//!
//! Only the first block in a file is read or rewritten. Everything outside it
//! passes through byte-for-byte. A block ends at the first closing delimiter
//! and starts at the nearest opening delimiter before it, so a stray opener
//! earlier in the script never captures the block.
//!
//! Ids are stored verbatim, surrounding whitespace included. They must not
//! contain line breaks or either delimiter.

use std::ops::Range;

use crate::types::{InstanceId, ScriptKind};

/// Opening delimiter of the metadata block.
pub const BLOCK_START: &str = "--[[ scs:metadata";
/// Closing delimiter of the metadata block.
pub const BLOCK_END: &str = "scs:metadata ]]";

const ID_KEY: &str = "instanceId";
const TYPE_KEY: &str = "instanceType";

/// Values read from a metadata block. Both fields are `None` when the file has
/// no complete block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    pub instance_id: Option<InstanceId>,
    pub instance_type: Option<String>,
}

impl Metadata {
    /// The remote binding, present only when the id is set and the type names
    /// a mirrored script kind.
    pub fn binding(&self) -> Option<(InstanceId, ScriptKind)> {
        let id = self.instance_id.clone()?;
        let kind = self.instance_type.as_deref()?.parse().ok()?;
        Some((id, kind))
    }
}

/// Render a standalone block for `id` / `kind`, without a trailing newline.
pub fn format_block(id: &InstanceId, kind: ScriptKind) -> String {
    format!("{BLOCK_START}\n{ID_KEY}: {id}\n{TYPE_KEY}: {kind}\n{BLOCK_END}")
}

/// Write `id` / `kind` into `content`.
///
/// The first existing block is replaced in place; otherwise a new block is
/// appended on its own line.
pub fn embed(content: &str, id: &InstanceId, kind: ScriptKind) -> String {
    let block = format_block(id, kind);
    match locate(content) {
        Some(range) => {
            let mut out =
                String::with_capacity(content.len() - range.len() + block.len());
            out.push_str(&content[..range.start]);
            out.push_str(&block);
            out.push_str(&content[range.end..]);
            out
        }
        None => {
            let mut out = String::with_capacity(content.len() + block.len() + 2);
            out.push_str(content);
            if !out.is_empty() && !out.ends_with('\n') {
                out.push('\n');
            }
            out.push_str(&block);
            out.push('\n');
            out
        }
    }
}

/// Read the first block of `content`.
///
/// A missing start or end delimiter is not an error: it yields an empty
/// [`Metadata`].
pub fn extract(content: &str) -> Metadata {
    let Some(range) = locate(content) else {
        return Metadata::default();
    };
    let body = &content[range.start + BLOCK_START.len()..range.end - BLOCK_END.len()];

    let mut metadata = Metadata::default();
    for line in body.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.strip_suffix('\r').unwrap_or(value);
        let value = value.strip_prefix(' ').unwrap_or(value);
        match key.trim() {
            ID_KEY if metadata.instance_id.is_none() && !value.is_empty() => {
                metadata.instance_id = Some(InstanceId::from(value));
            }
            TYPE_KEY if metadata.instance_type.is_none() && !value.trim().is_empty() => {
                metadata.instance_type = Some(value.trim().to_owned());
            }
            _ => {}
        }
    }
    metadata
}

/// Byte range of the first complete block, delimiters included.
///
/// Anchored on the closing delimiter: the first one with an opener before it
/// wins, paired with the nearest such opener.
fn locate(content: &str) -> Option<Range<usize>> {
    let mut from = 0;
    while let Some(offset) = content[from..].find(BLOCK_END) {
        let end_at = from + offset;
        if let Some(start) = content[..end_at].rfind(BLOCK_START) {
            return Some(start..end_at + BLOCK_END.len());
        }
        from = end_at + BLOCK_END.len();
    }
    None
}
