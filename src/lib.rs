//! # krbtab
//!
//! Kerberos keytab storage and key folding:
//! - File-backed keytab with a versioned, self-delimiting record format
//! - In-place deletion by tombstoning, with slot reuse on add
//! - Shared/exclusive advisory locking per open
//! - n-fold key stretching
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                FileKeytab (resolve / add / remove)           │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │   Cursor    │          │  FileLock   │
//!   │  (scan)     │          │ (advisory)  │
//!   └──────┬──────┘          └─────────────┘
//!          │
//!          ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │    Codec    │────────▶ │   Storage   │
//!   │  (records)  │          │ (typed I/O) │
//!   └─────────────┘          └─────────────┘
//!
//!   ┌─────────────┐
//!   │   n-fold    │   (independent of the store)
//!   └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod keytab;
pub mod crypto;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{KeytabError, Result};
pub use config::Config;
pub use keytab::{EntrySelector, FileKeytab, Keyblock, KeytabEntry, Principal};
pub use crypto::nfold;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of krbtab
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
