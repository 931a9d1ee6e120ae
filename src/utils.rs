use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::error::{Result, TalonError};

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("talon"));
    name.push(".tmp");
    path.with_file_name(name)
}

/// Replaces `path` in one step so readers never observe a half-written file.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let tmp = temp_path(path);
    std::fs::write(&tmp, contents).map_err(|source| TalonError::Write {
        path: tmp.clone(),
        source,
    })?;
    std::fs::rename(&tmp, path).map_err(|source| TalonError::Write {
        path: path.to_path_buf(),
        source,
    })
}
