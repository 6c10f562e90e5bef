//! Advisory lock files
//!
//! A lock on `path` is the file `{path}.lock`, created exclusively. Processes
//! that crash while holding a lock leave it behind, so waiters may steal it
//! after their deadline.

use std::ffi::OsString;
use std::fs::OpenOptions;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, warn};

use crate::{Error, Result};

const LOCK_SUFFIX: &str = ".lock";
const RETRY_INTERVAL: Duration = Duration::from_millis(500);

/// Lock file guarding `path`
pub fn lock_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(LOCK_SUFFIX);
    PathBuf::from(name)
}

/// Take the lock, failing if it is already held
pub fn lock_file(path: &Path) -> Result<()> {
    let lock = lock_path(path);
    match OpenOptions::new().write(true).create_new(true).open(&lock) {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == ErrorKind::AlreadyExists => Err(Error::Locked { path: lock }),
        Err(e) => Err(Error::command_failed(format!(
            "failed to create lock file {}: {}",
            lock.display(),
            e
        ))),
    }
}

/// Release the lock; releasing a lock nobody holds is fine
pub fn unlock_file(path: &Path) -> Result<()> {
    let lock = lock_path(path);
    match std::fs::remove_file(&lock) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::command_failed(format!(
            "failed to delete lock file {}: {}",
            lock.display(),
            e
        ))),
    }
}

/// Held lock, released on drop
#[derive(Debug)]
pub struct FileLockGuard {
    path: PathBuf,
}

impl Drop for FileLockGuard {
    fn drop(&mut self) {
        if let Err(e) = unlock_file(&self.path) {
            warn!(path = %self.path.display(), error = %e, "Failed to release lock");
        }
    }
}

/// Wait up to `max_wait` for the lock on `path`.
///
/// With `steal` set, a lock still held at the deadline is removed and taken.
pub async fn wait_lock_file(path: &Path, max_wait: Duration, steal: bool) -> Result<FileLockGuard> {
    let deadline = Instant::now() + max_wait;

    loop {
        match lock_file(path) {
            Ok(()) => {
                return Ok(FileLockGuard {
                    path: path.to_path_buf(),
                })
            }
            Err(Error::Locked { .. }) => {}
            Err(e) => return Err(e),
        }

        let now = Instant::now();
        if now >= deadline {
            break;
        }
        debug!(path = %path.display(), "Lock held, waiting");
        tokio::time::sleep(RETRY_INTERVAL.min(deadline - now)).await;
    }

    if !steal {
        return Err(Error::Locked {
            path: lock_path(path),
        });
    }

    warn!(
        path = %path.display(),
        waited = ?max_wait,
        "Taking over stale lock"
    );
    unlock_file(path)?;
    lock_file(path)?;
    Ok(FileLockGuard {
        path: path.to_path_buf(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_is_exclusive_and_unlock_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config");

        lock_file(&path).unwrap();
        assert!(lock_path(&path).exists());
        assert!(matches!(lock_file(&path), Err(Error::Locked { .. })));

        unlock_file(&path).unwrap();
        assert!(!lock_path(&path).exists());
        unlock_file(&path).unwrap();

        lock_file(&path).unwrap();
        unlock_file(&path).unwrap();
    }

    #[test]
    fn lock_path_appends_suffix() {
        assert_eq!(
            lock_path(Path::new("/home/u/.sparkcli/config")),
            PathBuf::from("/home/u/.sparkcli/config.lock")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn wait_takes_free_lock_and_releases_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config");

        let guard = wait_lock_file(&path, Duration::from_secs(1), false)
            .await
            .unwrap();
        assert!(lock_path(&path).exists());
        drop(guard);
        assert!(!lock_path(&path).exists());
    }

    #[tokio::test(start_paused = true)]
    async fn wait_times_out_without_steal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config");
        lock_file(&path).unwrap();

        let start = Instant::now();
        let err = wait_lock_file(&path, Duration::from_secs(2), false)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Locked { .. }));
        assert!(start.elapsed() >= Duration::from_secs(2));
        assert!(lock_path(&path).exists());
    }

    #[tokio::test(start_paused = true)]
    async fn wait_steals_stale_lock() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config");
        lock_file(&path).unwrap();

        let guard = wait_lock_file(&path, Duration::from_secs(1), true)
            .await
            .unwrap();
        assert!(lock_path(&path).exists());
        drop(guard);
        assert!(!lock_path(&path).exists());
    }

    #[tokio::test(start_paused = true)]
    async fn wait_gets_lock_released_by_other_holder() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config");
        lock_file(&path).unwrap();

        let releaser = path.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(700)).await;
            unlock_file(&releaser).unwrap();
        });

        let start = Instant::now();
        let _guard = wait_lock_file(&path, Duration::from_secs(5), false)
            .await
            .unwrap();
        assert!(start.elapsed() < Duration::from_secs(2));
    }
}
