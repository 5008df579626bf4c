//! Keytab byte storage
//!
//! Typed integer and blob I/O over a seekable byte stream. Integers are
//! big-endian unless the file's dialect selects host byte order.

use std::io::{self, Read, Seek, SeekFrom, Write};

use byteorder::{BigEndian, NativeEndian, ReadBytesExt, WriteBytesExt};

/// On-disk format tag following the 0x05 sentinel byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatVersion {
    /// Legacy dialect: host byte order, component count off by one, no name-type
    V1,
    /// Current dialect
    V2,
    /// Unrecognized tag; read and written like V2
    Other(u8),
}

impl FormatVersion {
    pub fn from_tag(tag: u8) -> Self {
        match tag {
            1 => FormatVersion::V1,
            2 => FormatVersion::V2,
            other => FormatVersion::Other(other),
        }
    }

    pub fn tag(self) -> u8 {
        match self {
            FormatVersion::V1 => 1,
            FormatVersion::V2 => 2,
            FormatVersion::Other(tag) => tag,
        }
    }

    /// Dialect flags applied to every record of a file with this tag
    pub fn flags(self) -> StorageFlags {
        match self {
            FormatVersion::V1 => StorageFlags {
                wrong_num_components: true,
                no_name_type: true,
                host_byte_order: true,
            },
            FormatVersion::V2 | FormatVersion::Other(_) => StorageFlags::default(),
        }
    }
}

/// Dialect quirks derived from the format tag
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StorageFlags {
    /// Stored component count is one greater than the real count
    pub wrong_num_components: bool,
    /// Principal has no trailing name-type field
    pub no_name_type: bool,
    /// Integers use host byte order instead of network order
    pub host_byte_order: bool,
}

/// Typed reader/writer over a byte stream with dialect flags
pub struct KeytabStorage<S> {
    inner: S,
    flags: StorageFlags,
}

impl<S> KeytabStorage<S> {
    pub fn new(inner: S, flags: StorageFlags) -> Self {
        Self { inner, flags }
    }

    pub fn flags(&self) -> StorageFlags {
        self.flags
    }

    /// Switch dialect once the header has been read
    pub fn set_flags(&mut self, flags: StorageFlags) {
        self.flags = flags;
    }

    pub fn get_ref(&self) -> &S {
        &self.inner
    }

}

// =============================================================================
// Reading
// =============================================================================

impl<S: Read> KeytabStorage<S> {
    pub fn read_i8(&mut self) -> io::Result<i8> {
        self.inner.read_i8()
    }

    pub fn read_u8(&mut self) -> io::Result<u8> {
        self.inner.read_u8()
    }

    pub fn read_i16(&mut self) -> io::Result<i16> {
        if self.flags.host_byte_order {
            self.inner.read_i16::<NativeEndian>()
        } else {
            self.inner.read_i16::<BigEndian>()
        }
    }

    pub fn read_i32(&mut self) -> io::Result<i32> {
        if self.flags.host_byte_order {
            self.inner.read_i32::<NativeEndian>()
        } else {
            self.inner.read_i32::<BigEndian>()
        }
    }

    pub fn read_u32(&mut self) -> io::Result<u32> {
        if self.flags.host_byte_order {
            self.inner.read_u32::<NativeEndian>()
        } else {
            self.inner.read_u32::<BigEndian>()
        }
    }

    /// Fill `buf` completely; a short read is `UnexpectedEof`
    pub fn read_exact(&mut self, buf: &mut [u8]) -> io::Result<()> {
        self.inner.read_exact(buf)
    }
}

// =============================================================================
// Writing
// =============================================================================

impl<S: Write> KeytabStorage<S> {
    pub fn write_i8(&mut self, value: i8) -> io::Result<()> {
        self.inner.write_i8(value)
    }

    pub fn write_u8(&mut self, value: u8) -> io::Result<()> {
        self.inner.write_u8(value)
    }

    pub fn write_i16(&mut self, value: i16) -> io::Result<()> {
        if self.flags.host_byte_order {
            self.inner.write_i16::<NativeEndian>(value)
        } else {
            self.inner.write_i16::<BigEndian>(value)
        }
    }

    pub fn write_i32(&mut self, value: i32) -> io::Result<()> {
        if self.flags.host_byte_order {
            self.inner.write_i32::<NativeEndian>(value)
        } else {
            self.inner.write_i32::<BigEndian>(value)
        }
    }

    pub fn write_u32(&mut self, value: u32) -> io::Result<()> {
        if self.flags.host_byte_order {
            self.inner.write_u32::<NativeEndian>(value)
        } else {
            self.inner.write_u32::<BigEndian>(value)
        }
    }

    pub fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.inner.write_all(bytes)
    }

    /// Write `len` zero bytes in fixed-size chunks
    pub fn write_zeros(&mut self, mut len: u64) -> io::Result<()> {
        let zeros = [0u8; 128];
        while len > 0 {
            let chunk = len.min(zeros.len() as u64) as usize;
            self.inner.write_all(&zeros[..chunk])?;
            len -= chunk as u64;
        }
        Ok(())
    }
}

// =============================================================================
// Positioning
// =============================================================================

impl<S: Seek> KeytabStorage<S> {
    pub fn position(&mut self) -> io::Result<u64> {
        self.inner.stream_position()
    }

    pub fn seek_to(&mut self, offset: u64) -> io::Result<u64> {
        self.inner.seek(SeekFrom::Start(offset))
    }

    /// Move relative to the current position
    pub fn skip(&mut self, delta: i64) -> io::Result<u64> {
        self.inner.seek(SeekFrom::Current(delta))
    }
}

/// True when an I/O error means the stream ran out of bytes
pub fn is_eof(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::UnexpectedEof
}
