use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::{Builder, NamedTempFile};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("output directory {path:?} is unusable: {reason}")]
    OutputDir { path: PathBuf, reason: String },
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Creates the output directory when missing and checks that files can be created in it.
pub fn ensure_output_dir(dir: &Path) -> Result<(), PersistError> {
    let unusable = |reason: String| PersistError::OutputDir {
        path: dir.to_path_buf(),
        reason,
    };
    if !dir.exists() {
        fs::create_dir_all(dir).map_err(|e| unusable(e.to_string()))?;
    } else if !dir.is_dir() {
        return Err(unusable("not a directory".into()));
    }
    partial_file(dir).map_err(|e| unusable(e.to_string()))?;
    Ok(())
}

/// Writes `{dir}/{filename}` through a hidden `.partial` sibling that is
/// synced and then renamed over the target. An existing file stays in place
/// until the rename.
pub fn write_atomically(dir: &Path, filename: &str, bytes: &[u8]) -> Result<PathBuf, PersistError> {
    ensure_output_dir(dir)?;

    let mut partial = partial_file(dir)?;
    partial.write_all(bytes)?;
    partial.as_file_mut().sync_all()?;

    let target = dir.join(filename);
    partial
        .persist(&target)
        .map_err(|err| PersistError::Io(err.error))?;
    Ok(target)
}

fn partial_file(dir: &Path) -> io::Result<NamedTempFile> {
    Builder::new().prefix(".").suffix(".partial").tempfile_in(dir)
}
