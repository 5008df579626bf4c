//! Advisory file locking
//!
//! Keytab sessions hold an OS advisory lock for as long as the file is open:
//! shared for scans, exclusive for mutation.

use std::fs::File;
use std::io;

/// Lock mode requested for a keytab session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    Shared,
    Exclusive,
}

/// Holds an advisory lock until dropped.
///
/// The guard keeps its own duplicate of the descriptor; the lock belongs to
/// the shared open file description, so it also covers the handle that does
/// the actual I/O.
#[derive(Debug)]
pub struct FileLock {
    file: File,
    mode: LockMode,
}

impl FileLock {
    /// Block until the lock is granted
    pub fn acquire(file: &File, mode: LockMode) -> io::Result<Self> {
        let file = file.try_clone()?;
        match mode {
            LockMode::Shared => file.lock_shared()?,
            LockMode::Exclusive => file.lock()?,
        }
        Ok(Self { file, mode })
    }

    pub fn mode(&self) -> LockMode {
        self.mode
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        // Closing the last descriptor releases the lock anyway
        let _ = self.file.unlock();
    }
}
