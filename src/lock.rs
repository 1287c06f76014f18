//! Single instance guard for one output directory.

use crate::error::{AppResult, Error};
use fs2::FileExt;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

const LOCK_FILE: &str = ".hockey-calendar.lock";

/// Holds the lock until dropped
#[derive(Debug)]
pub struct RunLock {
    _file: File,
    path: PathBuf,
}

impl RunLock {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Acquire an exclusive lock, failing if another run uses the same directory
pub fn acquire_lock(dir: &Path) -> AppResult<RunLock> {
    fs::create_dir_all(dir)?;
    let path = dir.join(LOCK_FILE);
    let file = File::create(&path)?;

    file.try_lock_exclusive()
        .map_err(|_| Error::Lock(path.clone()))?;

    Ok(RunLock { _file: file, path })
}
