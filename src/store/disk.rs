//! File-per-address store shared between independent invocations.
//!
//! Layout under `<data_dir>/<network>/`:
//!
//! - `<ip>`: one file per reservation, containing the owner id
//! - `last_reserved_ip.<range index>`: last address handed out per range set
//! - `lock`: advisory lock file guarding the whole directory
//!
//! Creating a reservation file with `create_new` is what makes two racing
//! writers for the same address end with exactly one winner.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::net::IpAddr;
use std::path::{Path, PathBuf};

use super::lock::{FileLock, LOCK_FILE_NAME};
use super::Store;
use crate::error::{IpamError, Result};
use crate::utils::ip_utils::parse_ip;

/// Prefix of the per-range-set marker files
pub const LAST_IP_FILE_PREFIX: &str = "last_reserved_ip.";

/// Data directory used when the configuration does not name one
pub const DEFAULT_DATA_DIR: &str = "/var/lib/cni/networks";

#[derive(Debug)]
pub struct DiskStore {
    lock: FileLock,
    data_dir: PathBuf,
}

impl DiskStore {
    /// Open (creating if needed) the directory for `network` under `data_dir`
    pub fn new(network: &str, data_dir: Option<&Path>) -> Result<Self> {
        let data_dir = data_dir.unwrap_or_else(|| Path::new(DEFAULT_DATA_DIR));
        let dir = data_dir.join(network);
        fs::create_dir_all(&dir)
            .map_err(|e| IpamError::io(format!("failed to create {}", dir.display()), e))?;

        let lock = FileLock::new(&dir)?;
        Ok(DiskStore {
            lock,
            data_dir: dir,
        })
    }

    /// Directory holding this network's reservations
    pub fn dir(&self) -> &Path {
        &self.data_dir
    }

    fn reservation_path(&self, ip: IpAddr) -> PathBuf {
        escaped_path(&self.data_dir, &ip.to_string())
    }

    fn marker_path(&self, range_id: usize) -> PathBuf {
        escaped_path(&self.data_dir, &format!("{}{}", LAST_IP_FILE_PREFIX, range_id))
    }

    fn is_bookkeeping_file(name: &str) -> bool {
        name == LOCK_FILE_NAME || name.starts_with(LAST_IP_FILE_PREFIX)
    }
}

impl Store for DiskStore {
    fn lock(&mut self) -> Result<()> {
        self.lock.lock()
    }

    fn unlock(&mut self) -> Result<()> {
        self.lock.unlock()
    }

    // The lock file handle is closed when the store is dropped
    fn close(&mut self) -> Result<()> {
        Ok(())
    }

    fn reserve(&mut self, id: &str, ip: IpAddr, range_id: usize) -> Result<bool> {
        let path = self.reservation_path(ip);

        let mut options = OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o644);
        }

        let mut file = match options.open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                log::debug!("{} is already reserved", ip);
                return Ok(false);
            }
            Err(e) => {
                return Err(IpamError::io(format!("failed to create {}", path.display()), e));
            }
        };

        if let Err(e) = file.write_all(id.trim().as_bytes()).and_then(|_| file.sync_all()) {
            drop(file);
            let _ = fs::remove_file(&path);
            return Err(IpamError::io(format!("failed to write {}", path.display()), e));
        }

        let marker = self.marker_path(range_id);
        fs::write(&marker, ip.to_string())
            .map_err(|e| IpamError::io(format!("failed to write {}", marker.display()), e))?;

        log::debug!("Reserved {} for {} in {:?}", ip, id, self.data_dir);
        Ok(true)
    }

    fn last_reserved_ip(&self, range_id: usize) -> Result<IpAddr> {
        let marker = self.marker_path(range_id);
        let data = match fs::read_to_string(&marker) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(IpamError::LastReservedNotFound { range_id });
            }
            Err(e) => {
                return Err(IpamError::io(format!("failed to read {}", marker.display()), e));
            }
        };

        parse_ip(&data).ok_or_else(|| IpamError::InvalidAddress(data.trim().to_string()))
    }

    fn release(&mut self, ip: IpAddr) -> Result<()> {
        let path = self.reservation_path(ip);
        fs::remove_file(&path)
            .map_err(|e| IpamError::io(format!("failed to remove {}", path.display()), e))
    }

    fn release_by_id(&mut self, id: &str) -> Result<()> {
        let id = id.trim();
        let entries = fs::read_dir(&self.data_dir)
            .map_err(|e| IpamError::io(format!("failed to list {}", self.data_dir.display()), e))?;

        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                continue;
            }
            let is_bookkeeping = path
                .file_name()
                .and_then(|n| n.to_str())
                .map_or(false, Self::is_bookkeeping_file);
            if is_bookkeeping {
                continue;
            }

            let Ok(data) = fs::read_to_string(&path) else {
                continue;
            };
            if data.trim() == id {
                match fs::remove_file(&path) {
                    Ok(()) => log::debug!("Released {:?} held by {}", path, id),
                    Err(e) => log::warn!("Failed to remove {:?}: {}", path, e),
                }
            }
        }

        Ok(())
    }
}

/// Join a file name onto `dir`, escaping characters the platform forbids
pub fn escaped_path(dir: &Path, name: &str) -> PathBuf {
    if cfg!(windows) {
        dir.join(name.replace(':', "_"))
    } else {
        dir.join(name)
    }
}
