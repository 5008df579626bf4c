//! Error types for krbtab
//!
//! Provides a unified error type for keytab and key-derivation operations.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using KeytabError
pub type Result<T> = std::result::Result<T, KeytabError>;

/// Unified error type for krbtab operations
#[derive(Debug, Error)]
pub enum KeytabError {
    // -------------------------------------------------------------------------
    // Format Errors
    // -------------------------------------------------------------------------
    #[error("bad keytab format in {path}: expected tag 0x05, found {found:#04x}")]
    BadVersion { path: PathBuf, found: u8 },

    #[error("keytab {path} is corrupt: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    #[error("value does not fit its keytab field: {0}")]
    Encode(String),

    // -------------------------------------------------------------------------
    // Lookup Errors
    // -------------------------------------------------------------------------
    #[error("end of keytab stream")]
    EndOfStream,

    #[error("no matching entry in keytab {path}")]
    NotFound { path: PathBuf },

    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("I/O error on keytab {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("removed {removed} entries from {path} before failing: {source}")]
    PartialRemove {
        path: PathBuf,
        removed: usize,
        #[source]
        source: io::Error,
    },

    #[error("out of memory")]
    OutOfMemory,

    // -------------------------------------------------------------------------
    // Input Errors
    // -------------------------------------------------------------------------
    #[error("invalid keytab name: {0}")]
    InvalidName(String),

    #[error("invalid principal name: {0}")]
    InvalidPrincipal(String),

    #[error("invalid argument: {0}")]
    InvalidInput(String),

    #[error("invalid n-fold request: {0}")]
    InvalidFold(String),
}

impl KeytabError {
    /// Wrap an I/O error with the keytab path it happened on
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        KeytabError::Io {
            path: path.into(),
            source,
        }
    }

    /// Build a corruption error for the given keytab
    pub fn corrupt(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        KeytabError::Corrupt {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

impl From<std::collections::TryReserveError> for KeytabError {
    fn from(_: std::collections::TryReserveError) -> Self {
        KeytabError::OutOfMemory
    }
}
