//! One run at a time.
//!
//! Hotplug watchers tend to fire several times per plug, so every run that
//! may change the display state takes an exclusive lock on
//! `<profiles-root>/.lock` first. Runs that find it taken do nothing.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::Path;

use nix::errno::Errno;
use nix::fcntl::{Flock, FlockArg};
use tracing::debug;

use crate::error::Result;

pub struct RunLock {
    _lock: Flock<File>,
}

impl RunLock {
    /// `None` when another run holds the lock.
    pub fn try_acquire(dir: &Path) -> Result<Option<Self>> {
        fs::create_dir_all(dir)?;
        let path = dir.join(".lock");
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        match Flock::lock(file, FlockArg::LockExclusiveNonblock) {
            Ok(lock) => {
                debug!("holding {}", path.display());
                Ok(Some(RunLock { _lock: lock }))
            }
            Err((_, errno)) if errno == Errno::EWOULDBLOCK => Ok(None),
            Err((_, errno)) => Err(io::Error::from(errno).into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_run_is_turned_away() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let root = dir.path().join("profiles");

        let first = RunLock::try_acquire(&root)?;
        assert!(first.is_some());
        assert!(RunLock::try_acquire(&root)?.is_none());

        drop(first);
        assert!(RunLock::try_acquire(&root)?.is_some());
        Ok(())
    }
}
