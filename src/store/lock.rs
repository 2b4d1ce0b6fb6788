//! Advisory exclusive file lock shared by every process using a pool.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;

use crate::error::{IpamError, Result};

/// File name used when the lock is taken on a directory
pub const LOCK_FILE_NAME: &str = "lock";

#[derive(Debug)]
pub struct FileLock {
    file: File,
    path: PathBuf,
}

impl FileLock {
    /// Open a lock on `lock_path`. A directory is locked through a `lock`
    /// file created inside it.
    pub fn new(lock_path: &Path) -> Result<Self> {
        let metadata = fs::metadata(lock_path).map_err(|e| {
            IpamError::io(format!("failed to stat {}", lock_path.display()), e)
        })?;

        let path = if metadata.is_dir() {
            lock_path.join(LOCK_FILE_NAME)
        } else {
            lock_path.to_path_buf()
        };

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| IpamError::io(format!("failed to open lock file {}", path.display()), e))?;

        Ok(FileLock { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Blocks until the lock is acquired; there is no timeout.
    pub fn lock(&self) -> Result<()> {
        log::debug!("Acquiring lock {:?}", self.path);
        self.file
            .lock_exclusive()
            .map_err(|e| IpamError::io(format!("failed to lock {}", self.path.display()), e))
    }

    pub fn unlock(&self) -> Result<()> {
        FileExt::unlock(&self.file)
            .map_err(|e| IpamError::io(format!("failed to unlock {}", self.path.display()), e))
    }
}
