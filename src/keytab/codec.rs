//! Keytab record codec
//!
//! Encoding and decoding of principals, keyblocks and record bodies.
//!
//! ## Record Layout
//! ```text
//! ┌───────────┬───────────┬─────────────┬──────────┬──────────┬──────────┬──────────┐
//! │ Principal │ Stamp (4) │ Kvno8 (1)   │ Type (2) │ KLen (2) │ Key      │ Kvno32 + │
//! │           │           │             │          │          │          │ Flags    │
//! └───────────┴───────────┴─────────────┴──────────┴──────────┴──────────┴──────────┘
//! ```
//! The trailing 32-bit kvno and flags are optional. Their presence is inferred
//! from the bytes left in the record envelope, which may also hold stale data
//! when a larger tombstone slot was reused.

use std::io::{self, Read, Seek, Write};
use std::path::Path;

use zeroize::Zeroizing;

use crate::error::{KeytabError, Result};

use super::entry::{Keyblock, KeytabEntry, NameType, Principal};
use super::storage::{is_eof, FormatVersion, KeytabStorage, StorageFlags};
use super::KEYTAB_SENTINEL;

/// Size of the signed length that prefixes every record
pub(crate) const LENGTH_SIZE: u64 = 4;

/// Byte range of one live record, length field included
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RecordSpan {
    pub start: u64,
    pub end: u64,
}

impl RecordSpan {
    /// Payload length, not counting the length field
    pub fn payload_len(&self) -> u64 {
        self.end - self.start - LENGTH_SIZE
    }
}

// =============================================================================
// Encoding
// =============================================================================

fn field_len(len: usize, what: &str) -> Result<i16> {
    i16::try_from(len).map_err(|_| KeytabError::Encode(format!("{} is {} bytes long", what, len)))
}

/// Bytes needed for the record body of `entry` (length field excluded).
/// Also rejects values that cannot be represented on disk.
fn encoded_len(entry: &KeytabEntry, flags: StorageFlags, extended: bool) -> Result<usize> {
    let principal = &entry.principal;
    let count = principal.components.len() + usize::from(flags.wrong_num_components);
    field_len(count, "component count")?;

    let mut len = 2 + 2 + field_len(principal.realm.len(), "realm")? as usize;
    for component in &principal.components {
        len += 2 + field_len(component.len(), "principal component")? as usize;
    }
    if !flags.no_name_type {
        len += 4;
    }

    // timestamp + kvno8 + keytype + key length + key
    len += 4 + 1 + 2 + 2 + field_len(entry.keyblock.value.len(), "key")? as usize;

    if extended {
        len += 4 + 4;
    }
    Ok(len)
}

fn store_bytes<S: Write>(storage: &mut KeytabStorage<S>, value: &[u8]) -> io::Result<()> {
    storage.write_i16(value.len() as i16)?;
    storage.write_all(value)
}

fn store_principal<S: Write>(storage: &mut KeytabStorage<S>, principal: &Principal) -> io::Result<()> {
    let mut count = principal.components.len() as i16;
    if storage.flags().wrong_num_components {
        count += 1;
    }
    storage.write_i16(count)?;
    store_bytes(storage, &principal.realm)?;
    for component in &principal.components {
        store_bytes(storage, component)?;
    }
    if !storage.flags().no_name_type {
        storage.write_i32(principal.name_type.0)?;
    }
    Ok(())
}

fn store_keyblock<S: Write>(storage: &mut KeytabStorage<S>, keyblock: &Keyblock) -> io::Result<()> {
    storage.write_i16(keyblock.keytype)?;
    storage.write_i16(keyblock.value.len() as i16)?;
    storage.write_all(&keyblock.value)
}

/// Encode the record body of `entry` in the given dialect.
///
/// The buffer is sized up front so key material is never left behind in a
/// reallocated copy; it is zeroed when dropped. `extended` controls the
/// trailing 32-bit kvno and flags fields.
pub fn encode_entry(entry: &KeytabEntry, flags: StorageFlags, extended: bool) -> Result<Zeroizing<Vec<u8>>> {
    let len = encoded_len(entry, flags, extended)?;
    let mut buf = Zeroizing::new(Vec::new());
    buf.try_reserve_exact(len)?;

    let mut storage = KeytabStorage::new(&mut *buf, flags);
    write_body(&mut storage, entry, extended).map_err(|e| KeytabError::Encode(e.to_string()))?;

    debug_assert_eq!(buf.len(), len);
    Ok(buf)
}

fn write_body<S: Write>(storage: &mut KeytabStorage<S>, entry: &KeytabEntry, extended: bool) -> io::Result<()> {
    store_principal(storage, &entry.principal)?;
    storage.write_u32(entry.timestamp)?;
    storage.write_i8((entry.kvno % 256) as u8 as i8)?;
    store_keyblock(storage, &entry.keyblock)?;
    if extended {
        storage.write_i32(entry.kvno as i32)?;
        storage.write_u32(entry.flags)?;
    }
    Ok(())
}

// =============================================================================
// Decoding
// =============================================================================

fn invalid(msg: impl Into<String>) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg.into())
}

fn read_len<S: Read>(storage: &mut KeytabStorage<S>, what: &str) -> io::Result<usize> {
    let len = storage.read_i16()?;
    usize::try_from(len).map_err(|_| invalid(format!("negative {} length {}", what, len)))
}

fn read_data<S: Read>(storage: &mut KeytabStorage<S>, what: &str) -> io::Result<Zeroizing<Vec<u8>>> {
    let len = read_len(storage, what)?;
    let mut data = Zeroizing::new(Vec::new());
    data.try_reserve_exact(len)
        .map_err(|_| io::Error::from(io::ErrorKind::OutOfMemory))?;
    data.resize(len, 0);
    storage.read_exact(&mut data)?;
    Ok(data)
}

/// Length-prefixed name bytes, taken as stored
fn read_name<S: Read>(storage: &mut KeytabStorage<S>, what: &str) -> io::Result<Vec<u8>> {
    let len = read_len(storage, what)?;
    let mut bytes = vec![0u8; len];
    storage.read_exact(&mut bytes)?;
    Ok(bytes)
}

fn read_principal<S: Read>(storage: &mut KeytabStorage<S>) -> io::Result<Principal> {
    let mut count = i32::from(storage.read_i16()?);
    if storage.flags().wrong_num_components {
        count -= 1;
    }
    let count = usize::try_from(count)
        .map_err(|_| invalid(format!("principal has invalid component count {}", count)))?;

    let realm = read_name(storage, "realm")?;
    let mut components = Vec::with_capacity(count);
    for _ in 0..count {
        components.push(read_name(storage, "principal component")?);
    }

    let name_type = if storage.flags().no_name_type {
        NameType::UNKNOWN
    } else {
        NameType(storage.read_i32()?)
    };

    Ok(Principal {
        realm,
        components,
        name_type,
    })
}

fn read_keyblock<S: Read>(storage: &mut KeytabStorage<S>) -> io::Result<Keyblock> {
    let keytype = storage.read_i16()?;
    let value = read_data(storage, "key")?;
    Ok(Keyblock { keytype, value })
}

/// Decode a record body whose envelope ends at `record_end`
fn read_body<S: Read + Seek>(storage: &mut KeytabStorage<S>, record_end: u64) -> io::Result<KeytabEntry> {
    let principal = read_principal(storage)?;
    let timestamp = storage.read_u32()?;
    let kvno8 = storage.read_i8()? as u8;
    let keyblock = read_keyblock(storage)?;

    let mut entry = KeytabEntry {
        principal,
        timestamp,
        kvno: u32::from(kvno8),
        keyblock,
        flags: 0,
    };

    // Trailing fields may be absent, or may be leftovers of an earlier,
    // longer record that occupied this slot. A 32-bit kvno only counts when
    // it is non-zero and agrees with the 8-bit one.
    let remaining = record_end as i64 - storage.position()? as i64;
    if remaining >= 4 {
        let kvno32 = storage.read_i32()?;
        if kvno32 != 0 && kvno32 % 256 == i32::from(kvno8) {
            entry.kvno = kvno32 as u32;
        }
    }
    if remaining >= 8 {
        entry.flags = storage.read_u32()?;
    }

    Ok(entry)
}

fn decode_error(path: &Path, err: io::Error) -> KeytabError {
    match err.kind() {
        io::ErrorKind::UnexpectedEof => KeytabError::corrupt(path, "record truncated"),
        io::ErrorKind::InvalidData => KeytabError::corrupt(path, err.to_string()),
        io::ErrorKind::OutOfMemory => KeytabError::OutOfMemory,
        _ => KeytabError::io(path, err),
    }
}

/// Read the next live record, stepping over tombstones.
///
/// Returns `Ok(None)` once the length field cannot be read. A record that
/// fails to decode is reported as an error, but the stream has already been
/// moved to that record's declared end so scanning can go on.
pub(crate) fn read_record<S: Read + Seek>(
    storage: &mut KeytabStorage<S>,
    path: &Path,
) -> Result<Option<(KeytabEntry, RecordSpan)>> {
    let io_err = |e| KeytabError::io(path, e);

    let mut start = storage.position().map_err(io_err)?;
    let len = loop {
        let len = match storage.read_i32() {
            Ok(len) => len,
            Err(e) if is_eof(&e) => return Ok(None),
            Err(e) => return Err(io_err(e)),
        };
        if len >= 0 {
            break len as u64;
        }
        tracing::trace!(offset = start, len = len.unsigned_abs(), "skipping tombstone");
        start = storage.skip(i64::from(len.unsigned_abs())).map_err(io_err)?;
    };

    let span = RecordSpan {
        start,
        end: start + LENGTH_SIZE + len,
    };
    let result = read_body(storage, span.end);
    storage.seek_to(span.end).map_err(io_err)?;

    match result {
        Ok(entry) => {
            tracing::trace!(offset = span.start, principal = %entry.principal, "read keytab entry");
            Ok(Some((entry, span)))
        }
        Err(e) => Err(decode_error(path, e)),
    }
}

// =============================================================================
// File Header
// =============================================================================

/// Read and validate the 2-byte file header.
///
/// Unknown format tags are accepted and handled like the current format.
/// Running out of bytes reports `EndOfStream`.
pub(crate) fn read_header<S: Read>(storage: &mut KeytabStorage<S>, path: &Path) -> Result<FormatVersion> {
    let read = |storage: &mut KeytabStorage<S>| {
        storage.read_u8().map_err(|e| {
            if is_eof(&e) {
                KeytabError::EndOfStream
            } else {
                KeytabError::io(path, e)
            }
        })
    };

    let sentinel = read(storage)?;
    if sentinel != KEYTAB_SENTINEL {
        return Err(KeytabError::BadVersion {
            path: path.to_path_buf(),
            found: sentinel,
        });
    }

    let version = FormatVersion::from_tag(read(storage)?);
    if let FormatVersion::Other(tag) = version {
        tracing::warn!(path = %path.display(), tag, "unknown keytab format tag, reading as version 2");
    }
    Ok(version)
}

/// Write the 2-byte file header
pub(crate) fn write_header<S: Write>(storage: &mut KeytabStorage<S>, version: FormatVersion) -> io::Result<()> {
    storage.write_u8(KEYTAB_SENTINEL)?;
    storage.write_u8(version.tag())
}
