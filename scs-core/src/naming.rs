//! Mirror file naming: `{parentName}_{childName}-{kind}.{ext}`.

use crate::types::ScriptKind;

/// Default extension for mirrored scripts.
pub const DEFAULT_EXTENSION: &str = "lua";

/// Build the mirror file name for a script `child` under `parent`.
///
/// Characters that are not allowed in file names on common platforms are
/// replaced with `_`, so a remote name can never escape the mirror directory.
pub fn mirror_file_name(parent: &str, child: &str, kind: ScriptKind, ext: &str) -> String {
    format!(
        "{}_{}-{}.{}",
        sanitize(parent),
        sanitize(child),
        kind,
        ext.trim_start_matches('.')
    )
}

fn sanitize(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    match cleaned.as_str() {
        "" | "." | ".." => "_".repeat(cleaned.len().max(1)),
        _ => cleaned,
    }
}
