//! Cross-process named mutex built on advisory file locks.
//!
//! The name (usually the path of the file being protected) is hashed into a
//! lock file under the configured lock directory, so every process that
//! protects the same file contends on the same lock.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use fd_lock::{RwLock, RwLockWriteGuard};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::{LicenseError, LicenseResult};

/// Scoped exclusive hold on a [`NamedMutex`]; released on drop.
pub type NamedMutexGuard<'a> = RwLockWriteGuard<'a, File>;

/// A system-wide mutex identified by name.
pub struct NamedMutex {
    lock_file: RwLock<File>,
    lock_path: PathBuf,
}

impl NamedMutex {
    /// Opens (creating if needed) the lock file for `name` under `lock_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`LicenseError::Lock`] if the lock directory or file cannot be created.
    pub fn open(lock_dir: &Path, name: &str) -> LicenseResult<Self> {
        std::fs::create_dir_all(lock_dir).map_err(|e| {
            LicenseError::Lock(format!("cannot create {}: {e}", lock_dir.display()))
        })?;
        let lock_path = lock_dir.join(lock_file_name(name));
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)
            .map_err(|e| LicenseError::Lock(format!("cannot open {}: {e}", lock_path.display())))?;
        Ok(Self {
            lock_file: RwLock::new(file),
            lock_path,
        })
    }

    /// Opens the mutex guarding a particular file.
    ///
    /// # Errors
    ///
    /// See [`open`](Self::open).
    pub fn for_file(lock_dir: &Path, protected: &Path) -> LicenseResult<Self> {
        Self::open(lock_dir, &protected.to_string_lossy())
    }

    /// Blocks until the mutex is held exclusively.
    ///
    /// # Errors
    ///
    /// Returns [`LicenseError::Lock`] if the OS lock call fails.
    pub fn lock(&mut self) -> LicenseResult<NamedMutexGuard<'_>> {
        debug!(path = %self.lock_path.display(), "Acquiring named mutex");
        let path = self.lock_path.display().to_string();
        self.lock_file
            .write()
            .map_err(|e| LicenseError::Lock(format!("cannot lock {path}: {e}")))
    }

    /// Returns the lock file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.lock_path
    }
}

fn lock_file_name(name: &str) -> String {
    let digest = Sha256::digest(name.as_bytes());
    format!("{}.lock", hex::encode(&digest[..16]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_name_same_file() {
        let dir = tempfile::tempdir().unwrap();
        let a = NamedMutex::open(dir.path(), "store.json").unwrap();
        let b = NamedMutex::open(dir.path(), "store.json").unwrap();
        let c = NamedMutex::open(dir.path(), "other.json").unwrap();
        assert_eq!(a.path(), b.path());
        assert_ne!(a.path(), c.path());
    }

    #[test]
    fn held_mutex_excludes_second_handle() {
        let dir = tempfile::tempdir().unwrap();
        let mut first = NamedMutex::open(dir.path(), "store.json").unwrap();
        let mut second = NamedMutex::open(dir.path(), "store.json").unwrap();

        let guard = first.lock().unwrap();
        assert!(second.lock_file.try_write().is_err());
        drop(guard);
        assert!(second.lock().is_ok());
    }
}
