//! Local mirror writer.
//!
//! Each write goes to its own uniquely named `.<random>.scs.tmp` file next to
//! the target and is then renamed over it, so an editor or the monitor never
//! observes a half-written script and concurrent writers of the same name
//! never share a temporary file. Existing files are replaced unconditionally:
//! pull is authoritative for the mirror.

use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{io_err, SyncError};

/// Suffix of in-flight temporary files; the push scan ignores them.
pub const TMP_SUFFIX: &str = ".scs.tmp";

/// Write `content` to `dir/file_name`, creating `dir` as needed.
pub fn write_mirror_file(dir: &Path, file_name: &str, content: &str) -> Result<PathBuf, SyncError> {
    std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
    let path = dir.join(file_name);

    let mut tmp = tempfile::Builder::new()
        .prefix(".")
        .suffix(TMP_SUFFIX)
        .tempfile_in(dir)
        .map_err(|e| io_err(dir, e))?;
    tmp.write_all(content.as_bytes())
        .map_err(|e| io_err(tmp.path(), e))?;
    // A failed persist drops the temporary file, which deletes it.
    tmp.persist(&path).map_err(|e| io_err(&path, e.error))?;

    tracing::debug!(path = %path.display(), "wrote mirror file");
    Ok(path)
}
