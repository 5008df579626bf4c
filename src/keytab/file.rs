//! File keytab handle
//!
//! Resolves keytab names to paths and implements add/remove/scan over the
//! on-disk record chain.
//!
//! ## Slot Reuse
//! `add` walks the record chain from the start of the data region and writes
//! into the first tombstone whose payload is at least as large as the new
//! record, keeping the tombstone's length. Without such a slot the record is
//! appended. `remove` never shrinks the file: matching records get their
//! length negated and their payload zeroed in place.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::{KeytabError, Result};

use super::codec::{encode_entry, read_header, read_record, write_header, RecordSpan, LENGTH_SIZE};
use super::cursor::KeytabCursor;
use super::entry::{EntrySelector, KeytabEntry};
use super::erase::erase_file;
use super::lock::{FileLock, LockMode};
use super::storage::{is_eof, FormatVersion, KeytabStorage, StorageFlags};

/// Flavor of file keytab, selected by the name prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeytabKind {
    /// `FILE:` - read/write keytab
    File,
    /// `WRFILE:` - same on-disk behavior, distinguished by caller policy
    WriteFile,
    /// `JAVA14:` - never writes the extended kvno and flags fields
    Java14,
}

impl KeytabKind {
    pub fn prefix(self) -> &'static str {
        match self {
            KeytabKind::File => "FILE",
            KeytabKind::WriteFile => "WRFILE",
            KeytabKind::Java14 => "JAVA14",
        }
    }

    fn from_prefix(prefix: &str) -> Option<Self> {
        [KeytabKind::File, KeytabKind::WriteFile, KeytabKind::Java14]
            .into_iter()
            .find(|kind| kind.prefix().eq_ignore_ascii_case(prefix))
    }

    /// Whether records carry the 32-bit kvno and flags trailer
    pub fn writes_extended(self) -> bool {
        self != KeytabKind::Java14
    }
}

/// A keytab stored in a single file.
///
/// Resolving only records the path; the file is opened, locked and closed
/// again by every operation.
#[derive(Debug, Clone)]
pub struct FileKeytab {
    path: PathBuf,
    kind: KeytabKind,
    new_file_version: FormatVersion,
}

impl FileKeytab {
    // =========================================================================
    // Resolution
    // =========================================================================

    /// Resolve a `FILE:` keytab
    pub fn resolve(path: impl Into<PathBuf>) -> Self {
        Self::resolve_kind(KeytabKind::File, path)
    }

    /// Resolve a `WRFILE:` keytab
    pub fn resolve_write(path: impl Into<PathBuf>) -> Self {
        Self::resolve_kind(KeytabKind::WriteFile, path)
    }

    /// Resolve a `JAVA14:` keytab for consumers that cannot parse the
    /// extended kvno and flags fields
    pub fn resolve_java14(path: impl Into<PathBuf>) -> Self {
        Self::resolve_kind(KeytabKind::Java14, path)
    }

    pub fn resolve_kind(kind: KeytabKind, path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            kind,
            new_file_version: FormatVersion::V2,
        }
    }

    /// Resolve `KIND:path`, or a bare path as `FILE:`
    pub fn from_name(name: &str) -> Result<Self> {
        if let Some((prefix, rest)) = name.split_once(':') {
            // single letters are drive names, anything with a separator is a path
            let looks_like_kind = prefix.len() > 1 && prefix.chars().all(|c| c.is_ascii_alphanumeric());
            if looks_like_kind {
                let kind = KeytabKind::from_prefix(prefix).ok_or_else(|| {
                    KeytabError::InvalidName(format!("unsupported keytab type {:?}", prefix))
                })?;
                if rest.is_empty() {
                    return Err(KeytabError::InvalidName(format!("{:?} has no path", name)));
                }
                return Ok(Self::resolve_kind(kind, rest));
            }
        }
        if name.is_empty() {
            return Err(KeytabError::InvalidName("empty keytab name".to_string()));
        }
        Ok(Self::resolve(name))
    }

    /// Resolve the configured default keytab
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::from_name(&config.default_keytab)?.with_new_file_version(config.new_file_version))
    }

    /// Format tag used when `add` has to create the file
    pub fn with_new_file_version(mut self, version: FormatVersion) -> Self {
        self.new_file_version = version;
        self
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn kind(&self) -> KeytabKind {
        self.kind
    }

    /// The configured file name
    pub fn get_name(&self) -> &Path {
        &self.path
    }

    /// `KIND:path`
    pub fn full_name(&self) -> String {
        format!("{}:{}", self.kind.prefix(), self.path.display())
    }

    /// Release the handle; nothing is held open between operations
    pub fn close(self) {}

    /// Erase and unlink the keytab file
    pub fn destroy(self) -> Result<()> {
        erase_file(&self.path).map_err(|e| KeytabError::io(&self.path, e))?;
        tracing::debug!(path = %self.path.display(), "destroyed keytab");
        Ok(())
    }

    // =========================================================================
    // Scanning
    // =========================================================================

    /// Open a sequential scan (shared lock)
    pub fn open_cursor(&self) -> Result<KeytabCursor> {
        KeytabCursor::open(&self.path)
    }

    /// All live entries; corrupt records are skipped.
    /// A file without a complete header holds no entries.
    pub fn entries(&self) -> Result<Vec<KeytabEntry>> {
        let cursor = match self.open_cursor() {
            Ok(cursor) => cursor,
            Err(KeytabError::EndOfStream) => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut entries = Vec::new();
        for item in cursor {
            match item {
                Ok(entry) => entries.push(entry),
                Err(KeytabError::Corrupt { reason, .. }) => {
                    tracing::warn!(path = %self.path.display(), %reason, "skipping corrupt record");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(entries)
    }

    /// Find the entry matching `selector`.
    ///
    /// Without a kvno in the selector the highest matching kvno wins.
    pub fn get_entry(&self, selector: &EntrySelector) -> Result<KeytabEntry> {
        let mut best: Option<KeytabEntry> = None;
        for entry in self.entries()? {
            if !selector.matches(&entry) {
                continue;
            }
            if selector.kvno.is_some() {
                return Ok(entry);
            }
            if best.as_ref().map_or(true, |b| entry.kvno > b.kvno) {
                best = Some(entry);
            }
        }
        best.ok_or_else(|| KeytabError::NotFound {
            path: self.path.clone(),
        })
    }

    // =========================================================================
    // Mutation
    // =========================================================================

    /// Store `entry`, creating the file if needed.
    ///
    /// The record reuses the first large-enough tombstone or is appended.
    /// The file is synced before the exclusive lock is released.
    pub fn add(&self, entry: &KeytabEntry) -> Result<()> {
        let path = self.path.as_path();
        let io_err = |e| KeytabError::io(path, e);

        let (file, created) = self.open_for_add()?;
        let _lock = FileLock::acquire(&file, LockMode::Exclusive).map_err(io_err)?;
        let mut storage = KeytabStorage::new(file, StorageFlags::default());

        let version = if created {
            write_header(&mut storage, self.new_file_version).map_err(io_err)?;
            self.new_file_version
        } else {
            match read_header(&mut storage, path) {
                Ok(version) => version,
                Err(KeytabError::EndOfStream) => {
                    tracing::warn!(path = %path.display(), "keytab has no header, writing a fresh one");
                    storage.get_ref().set_len(0).map_err(io_err)?;
                    storage.seek_to(0).map_err(io_err)?;
                    write_header(&mut storage, self.new_file_version).map_err(io_err)?;
                    self.new_file_version
                }
                Err(e) => return Err(e),
            }
        };
        storage.set_flags(version.flags());

        let record = encode_entry(entry, version.flags(), self.kind.writes_extended())?;
        let file_len = storage.get_ref().metadata().map_err(io_err)?.len();
        let slot_len = find_slot(&mut storage, path, record.len(), file_len)?;

        let offset = storage.position().map_err(io_err)?;
        storage.write_i32(slot_len).map_err(io_err)?;
        storage.write_all(&record).map_err(io_err)?;
        storage.get_ref().sync_all().map_err(io_err)?;

        tracing::debug!(
            path = %path.display(),
            principal = %entry.principal,
            kvno = entry.kvno,
            offset,
            slot_len,
            "added keytab entry"
        );
        Ok(())
    }

    /// Open read-write, creating the file (mode 0600) when it is missing
    fn open_for_add(&self) -> Result<(File, bool)> {
        let path = self.path.as_path();
        match OpenOptions::new().read(true).write(true).open(path) {
            Ok(file) => return Ok((file, false)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(KeytabError::io(path, e)),
        }

        let mut options = OpenOptions::new();
        options.read(true).write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        match options.open(path) {
            Ok(file) => Ok((file, true)),
            // lost a creation race; the winner writes the header under its lock
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => OpenOptions::new()
                .read(true)
                .write(true)
                .open(path)
                .map(|file| (file, false))
                .map_err(|e| KeytabError::io(path, e)),
            Err(e) => Err(KeytabError::io(path, e)),
        }
    }

    /// Tombstone every live entry matching `selector`.
    ///
    /// Returns the number of removed entries. No match is `NotFound` and
    /// leaves the file untouched. An I/O failure after some records were
    /// already tombstoned is reported as `PartialRemove`.
    pub fn remove(&self, selector: &EntrySelector) -> Result<usize> {
        let path = self.path.as_path();
        let io_err = |e| KeytabError::io(path, e);

        let file = OpenOptions::new().read(true).write(true).open(path).map_err(io_err)?;
        let _lock = FileLock::acquire(&file, LockMode::Exclusive).map_err(io_err)?;
        let mut storage = KeytabStorage::new(file, StorageFlags::default());

        let version = match read_header(&mut storage, path) {
            Err(KeytabError::EndOfStream) => {
                return Err(KeytabError::NotFound {
                    path: path.to_path_buf(),
                })
            }
            other => other?,
        };
        storage.set_flags(version.flags());

        let mut removed = 0;
        let mut failure: Option<io::Error> = None;
        loop {
            match read_record(&mut storage, path) {
                Ok(None) => break,
                Ok(Some((entry, span))) => {
                    if !selector.matches(&entry) {
                        continue;
                    }
                    if let Err(e) = tombstone(&mut storage, span) {
                        failure = Some(e);
                        break;
                    }
                    removed += 1;
                    tracing::debug!(
                        path = %path.display(),
                        principal = %entry.principal,
                        kvno = entry.kvno,
                        offset = span.start,
                        "removed keytab entry"
                    );
                }
                Err(KeytabError::Corrupt { reason, .. }) => {
                    tracing::warn!(path = %path.display(), %reason, "skipping corrupt record");
                }
                Err(KeytabError::Io { source, .. }) => {
                    failure = Some(source);
                    break;
                }
                Err(e) => return Err(e),
            }
        }

        if removed > 0 {
            if let Err(e) = storage.get_ref().sync_all() {
                failure.get_or_insert(e);
            }
        }

        match (removed, failure) {
            (0, None) => Err(KeytabError::NotFound {
                path: path.to_path_buf(),
            }),
            (0, Some(source)) => Err(KeytabError::io(path, source)),
            (removed, Some(source)) => Err(KeytabError::PartialRemove {
                path: path.to_path_buf(),
                removed,
                source,
            }),
            (removed, None) => Ok(removed),
        }
    }
}

/// Position the stream at the slot for a record of `needed` bytes and
/// return the length to write in front of it.
///
/// The chain is cut back to the last complete record before appending when
/// it ends in a partial length field, or in a length whose payload runs past
/// the end of the file.
fn find_slot(storage: &mut KeytabStorage<File>, path: &Path, needed: usize, file_len: u64) -> Result<i32> {
    let io_err = |e| KeytabError::io(path, e);
    let needed_len =
        i32::try_from(needed).map_err(|_| KeytabError::Encode(format!("record is {} bytes long", needed)))?;

    loop {
        let here = storage.position().map_err(io_err)?;
        let len = match storage.read_i32() {
            Ok(len) => len,
            Err(e) if is_eof(&e) => {
                if here < file_len {
                    tracing::warn!(path = %path.display(), offset = here, "truncating partial record length");
                }
                return append_at(storage, path, here, file_len, needed_len);
            }
            Err(e) => return Err(io_err(e)),
        };

        let slot = len.unsigned_abs();
        let next = here + LENGTH_SIZE + u64::from(slot);
        if next > file_len {
            tracing::warn!(
                path = %path.display(),
                offset = here,
                len,
                file_len,
                "truncating record that runs past end of file"
            );
            return append_at(storage, path, here, file_len, needed_len);
        }

        if len < 0 && slot as usize >= needed {
            let slot_len = i32::try_from(slot)
                .map_err(|_| KeytabError::corrupt(path, format!("tombstone length {} at offset {}", len, here)))?;
            storage.seek_to(here).map_err(io_err)?;
            return Ok(slot_len);
        }
        storage.seek_to(next).map_err(io_err)?;
    }
}

/// Drop everything from `offset` on and position the stream there
fn append_at(
    storage: &mut KeytabStorage<File>,
    path: &Path,
    offset: u64,
    file_len: u64,
    needed_len: i32,
) -> Result<i32> {
    let io_err = |e| KeytabError::io(path, e);
    if offset < file_len {
        storage.get_ref().set_len(offset).map_err(io_err)?;
    }
    storage.seek_to(offset).map_err(io_err)?;
    Ok(needed_len)
}

/// Negate the record's length and zero its payload
fn tombstone(storage: &mut KeytabStorage<File>, span: RecordSpan) -> io::Result<()> {
    let len = span.payload_len();
    storage.seek_to(span.start)?;
    storage.write_i32(-(len as i32))?;
    storage.write_zeros(len)?;
    debug_assert_eq!(storage.position()?, span.start + LENGTH_SIZE + len);
    Ok(())
}
