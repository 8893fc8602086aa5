use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("directory missing or not writable: {0}")]
    Dir(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Creates `dir` (and parents) unless it is already a directory.
pub fn ensure_dir(dir: &Path) -> Result<(), PersistError> {
    match fs::metadata(dir) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(PersistError::Dir(format!(
            "{} exists and is not a directory",
            dir.display()
        ))),
        Err(err) if err.kind() == io::ErrorKind::NotFound => fs::create_dir_all(dir)
            .map_err(|err| PersistError::Dir(format!("{}: {err}", dir.display()))),
        Err(err) => Err(PersistError::Dir(format!("{}: {err}", dir.display()))),
    }
}

/// Removes `path`; a file that is already gone is not an error.
/// Returns whether anything was removed.
pub fn remove_file_if_exists(path: &Path) -> Result<bool, PersistError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(PersistError::Io(err)),
    }
}

/// Writes whole files under one directory via temp-file-then-rename, so a
/// reader never observes a half-written session or config file.
pub struct AtomicFileWriter {
    dir: PathBuf,
}

impl AtomicFileWriter {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Replaces `dir/filename` with `content` in one rename.
    pub fn write(&self, filename: &str, content: &[u8]) -> Result<PathBuf, PersistError> {
        ensure_dir(&self.dir)?;
        let target = self.dir.join(filename);

        let mut staged = NamedTempFile::new_in(&self.dir)?;
        staged.write_all(content)?;
        staged.as_file().sync_all()?;
        staged
            .persist(&target)
            .map_err(|err| PersistError::Io(err.error))?;
        Ok(target)
    }
}
