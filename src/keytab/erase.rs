//! Secure keytab removal
//!
//! Unlinks the keytab and overwrites its content when no other link keeps
//! the data reachable.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::Path;

use super::lock::{FileLock, LockMode};
use super::storage::{KeytabStorage, StorageFlags};

/// Remove `path`, scrubbing the file content first where possible.
///
/// Symlinks are unlinked without touching their target.
pub(crate) fn erase_file(path: &Path) -> io::Result<()> {
    let meta = fs::symlink_metadata(path)?;
    if meta.file_type().is_symlink() {
        return fs::remove_file(path);
    }

    let file = OpenOptions::new().read(true).write(true).open(path)?;
    let _lock = FileLock::acquire(&file, LockMode::Exclusive)?;
    unlink_and_scrub(path, &file)
}

#[cfg(unix)]
fn unlink_and_scrub(path: &Path, file: &File) -> io::Result<()> {
    use std::os::unix::fs::MetadataExt;

    fs::remove_file(path)?;
    let meta = file.metadata()?;
    if meta.nlink() > 0 {
        // another hard link still owns the data
        return Ok(());
    }
    scrub(file, meta.len())
}

#[cfg(not(unix))]
fn unlink_and_scrub(path: &Path, file: &File) -> io::Result<()> {
    scrub(file, file.metadata()?.len())?;
    fs::remove_file(path)
}

fn scrub(file: &File, len: u64) -> io::Result<()> {
    let mut storage = KeytabStorage::new(file, StorageFlags::default());
    storage.seek_to(0)?;
    storage.write_zeros(len)?;
    file.sync_all()
}
