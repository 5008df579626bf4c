//! Keytab cursor
//!
//! Sequential, read-only scan over the live entries of a keytab file.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::error::{KeytabError, Result};

use super::codec::{read_header, read_record};
use super::entry::KeytabEntry;
use super::lock::{FileLock, LockMode};
use super::storage::{FormatVersion, KeytabStorage, StorageFlags};

/// An open scan over a keytab file.
///
/// Holds a shared advisory lock until it is closed or dropped.
pub struct KeytabCursor {
    storage: KeytabStorage<BufReader<File>>,
    path: PathBuf,
    version: FormatVersion,
    /// Set once the scan cannot make progress any more
    finished: bool,
    _lock: FileLock,
}

impl KeytabCursor {
    /// Open `path` read-only, lock it shared and validate the header.
    ///
    /// A file too short to hold a header reports `EndOfStream`.
    pub(crate) fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| KeytabError::io(path, e))?;
        let lock = FileLock::acquire(&file, LockMode::Shared).map_err(|e| KeytabError::io(path, e))?;

        let mut storage = KeytabStorage::new(BufReader::new(file), StorageFlags::default());
        let version = read_header(&mut storage, path)?;
        storage.set_flags(version.flags());

        tracing::debug!(path = %path.display(), version = version.tag(), "opened keytab cursor");

        Ok(Self {
            storage,
            path: path.to_path_buf(),
            version,
            finished: false,
            _lock: lock,
        })
    }

    /// Format tag of the file being scanned
    pub fn version(&self) -> FormatVersion {
        self.version
    }

    /// Read the next live entry.
    ///
    /// Returns `Ok(None)` at end of file. A corrupt record yields an error
    /// but leaves the cursor on the following record.
    pub fn next_entry(&mut self) -> Result<Option<KeytabEntry>> {
        Ok(read_record(&mut self.storage, &self.path)?.map(|(entry, _)| entry))
    }

    /// Release the file and its lock
    pub fn close(self) {
        tracing::debug!(path = %self.path.display(), "closed keytab cursor");
    }
}

impl Iterator for KeytabCursor {
    type Item = Result<KeytabEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.next_entry() {
            Ok(Some(entry)) => Some(Ok(entry)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(e @ KeytabError::Corrupt { .. }) => Some(Err(e)),
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}
