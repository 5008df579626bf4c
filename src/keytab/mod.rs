//! Keytab File Module
//!
//! Persistent store of long-term keys, keyed by principal and key version.
//!
//! ## Responsibilities
//! - Versioned binary record format (two dialects)
//! - Sequential scans that skip deleted records
//! - Deletion by tombstoning, with slot reuse on add
//! - Shared/exclusive advisory locking per open
//!
//! ## File Format
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ Header                                      │
//! │ ┌──────────────┬──────────────┐             │
//! │ │ 0x05 (1)     │ Version (1)  │             │
//! │ └──────────────┴──────────────┘             │
//! ├─────────────────────────────────────────────┤
//! │ Record 1                                    │
//! │ ┌──────────┬──────────────────────────────┐ │
//! │ │ Len (4)  │ Entry body (Len bytes)       │ │
//! │ └──────────┴──────────────────────────────┘ │
//! ├─────────────────────────────────────────────┤
//! │ Record 2 (deleted)                          │
//! │ ┌──────────┬──────────────────────────────┐ │
//! │ │ -Len (4) │ Zeroes (Len bytes)           │ │
//! │ └──────────┴──────────────────────────────┘ │
//! └─────────────────────────────────────────────┘
//! ```
//! Version 1 files store integers in host byte order, count one extra
//! principal component and have no name-type field.

mod codec;
mod cursor;
mod entry;
mod erase;
mod file;
mod lock;
mod storage;

pub use codec::encode_entry;
pub use cursor::KeytabCursor;
pub use entry::{EntrySelector, Keyblock, KeytabEntry, NameType, Principal};
pub use file::{FileKeytab, KeytabKind};
pub use lock::{FileLock, LockMode};
pub use storage::{FormatVersion, KeytabStorage, StorageFlags};

/// First byte of every keytab file
pub const KEYTAB_SENTINEL: u8 = 0x05;

/// Size of the file header: sentinel (1) + version tag (1)
pub const HEADER_SIZE: u64 = 2;
