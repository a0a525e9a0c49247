//! Cross-process lock around instance registration.
//!
//! Overlapping invocations race to become "the" instance, so an in-process
//! mutex is useless here. Every invocation takes an exclusive advisory lock
//! (`flock(2)` via `fs2`) on `<state_dir>/once-lock` for the short window in
//! which it reads, kills and rewrites the pid record. The lock is released
//! before the child is spawned.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use tracing::debug;

use crate::{Error, Result};

/// Exclusive ownership of the lock file. Release it with [`InstanceLock::release`].
#[derive(Debug)]
pub struct InstanceLock {
    file: File,
    path: PathBuf,
    released: bool,
}

impl InstanceLock {
    /// Block until the exclusive lock on `path` is held.
    ///
    /// The file is created if missing but its directory is not; an unusable
    /// path fails immediately with [`Error::Lock`].
    pub fn acquire(path: &Path) -> Result<Self> {
        let lock_err = |source| Error::Lock {
            path: path.to_path_buf(),
            source,
        };

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(path)
            .map_err(lock_err)?;

        debug!(path = %path.display(), "waiting for instance lock");
        file.lock_exclusive().map_err(lock_err)?;
        debug!(path = %path.display(), "instance lock acquired");

        Ok(Self {
            file,
            path: path.to_path_buf(),
            released: false,
        })
    }

    /// Give up the lock. Consumes the handle so it cannot be released twice.
    pub fn release(mut self) -> Result<()> {
        self.released = true;
        FileExt::unlock(&self.file).map_err(|source| Error::Unlock {
            path: self.path.clone(),
            source,
        })?;
        debug!(path = %self.path.display(), "instance lock released");
        Ok(())
    }
}

impl Drop for InstanceLock {
    // Covers early returns between acquire and release.
    fn drop(&mut self) {
        if !self.released {
            let _ = FileExt::unlock(&self.file);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn acquire_creates_lock_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("once-lock");

        let lock = InstanceLock::acquire(&path).unwrap();
        assert!(path.exists());
        lock.release().unwrap();
    }

    #[test]
    fn acquire_keeps_existing_content() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("once-lock");
        std::fs::write(&path, "leftover").unwrap();

        InstanceLock::acquire(&path).unwrap().release().unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "leftover");
    }

    #[test]
    fn missing_directory_is_lock_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("no-such-dir").join("once-lock");

        let err = InstanceLock::acquire(&path).unwrap_err();
        assert!(matches!(err, Error::Lock { .. }), "got {err:?}");
    }

    #[test]
    fn second_acquire_blocks_until_release() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("once-lock");

        let first = InstanceLock::acquire(&path).unwrap();

        let (tx, rx) = mpsc::channel();
        let contender_path = path.clone();
        let contender = thread::spawn(move || {
            let second = InstanceLock::acquire(&contender_path).unwrap();
            tx.send(()).unwrap();
            second.release().unwrap();
        });

        assert!(
            rx.recv_timeout(Duration::from_millis(300)).is_err(),
            "second acquire must wait while the first holds the lock"
        );

        first.release().unwrap();
        rx.recv_timeout(Duration::from_secs(5))
            .expect("second acquire should proceed after release");
        contender.join().unwrap();
    }

    #[test]
    fn dropping_unreleased_lock_unlocks() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("once-lock");

        drop(InstanceLock::acquire(&path).unwrap());

        let other = OpenOptions::new().write(true).open(&path).unwrap();
        other.try_lock_exclusive().unwrap();
    }
}
