//! Keytab entry definitions
//!
//! Principals, keyblocks and the stored credential record.

use std::fmt;
use std::str::FromStr;

use zeroize::Zeroizing;

use crate::error::{KeytabError, Result};

/// Kerberos principal name-type (signed 32-bit on disk)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct NameType(pub i32);

impl NameType {
    pub const UNKNOWN: NameType = NameType(0);
    pub const PRINCIPAL: NameType = NameType(1);
    pub const SRV_INST: NameType = NameType(2);
    pub const SRV_HST: NameType = NameType(3);
    pub const SRV_XHST: NameType = NameType(4);
    pub const UID: NameType = NameType(5);
    pub const ENTERPRISE: NameType = NameType(10);
}

// =============================================================================
// Principal
// =============================================================================

/// A realm plus an ordered list of name components.
///
/// Names are kept as the raw bytes stored in the keytab; they are not
/// required to be UTF-8.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Principal {
    pub realm: Vec<u8>,
    pub components: Vec<Vec<u8>>,
    pub name_type: NameType,
}

impl Principal {
    pub fn new<I, S>(realm: impl Into<Vec<u8>>, components: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Vec<u8>>,
    {
        Self {
            realm: realm.into(),
            components: components.into_iter().map(Into::into).collect(),
            name_type: NameType::PRINCIPAL,
        }
    }

    pub fn with_name_type(mut self, name_type: NameType) -> Self {
        self.name_type = name_type;
        self
    }

    /// Parse `comp1/comp2@REALM`, falling back to `default_realm` when the
    /// name carries no realm. `\` escapes the next character (`\n`, `\t`,
    /// `\b` and `\0` map to control characters).
    pub fn parse(name: &str, default_realm: Option<&str>) -> Result<Self> {
        let mut components = Vec::new();
        let mut current = String::new();
        let mut realm: Option<String> = None;
        let mut chars = name.chars();

        while let Some(c) = chars.next() {
            match c {
                '\\' => {
                    let escaped = chars.next().ok_or_else(|| {
                        KeytabError::InvalidPrincipal(format!("trailing backslash in {:?}", name))
                    })?;
                    current.push(match escaped {
                        'n' => '\n',
                        't' => '\t',
                        'b' => '\u{8}',
                        '0' => '\0',
                        other => other,
                    });
                }
                '/' if realm.is_none() => components.push(std::mem::take(&mut current)),
                '@' if realm.is_none() => {
                    components.push(std::mem::take(&mut current));
                    realm = Some(String::new());
                }
                '/' | '@' => {
                    return Err(KeytabError::InvalidPrincipal(format!(
                        "unescaped {:?} in realm of {:?}",
                        c, name
                    )))
                }
                other => current.push(other),
            }
        }

        let realm = match realm {
            Some(_) => current,
            None => {
                components.push(current);
                default_realm
                    .map(str::to_string)
                    .ok_or_else(|| KeytabError::InvalidPrincipal(format!("no realm in {:?}", name)))?
            }
        };

        if realm.is_empty() {
            return Err(KeytabError::InvalidPrincipal(format!("empty realm in {:?}", name)));
        }

        Ok(Self::new(realm, components))
    }

    /// Compare realm and components; the name-type does not take part
    pub fn same_name(&self, other: &Principal) -> bool {
        self.realm == other.realm && self.components == other.components
    }
}

impl FromStr for Principal {
    type Err = KeytabError;

    fn from_str(s: &str) -> Result<Self> {
        Principal::parse(s, None)
    }
}

/// Escaped text form of one name part; invalid UTF-8 is shown as U+FFFD
fn write_escaped(f: &mut fmt::Formatter<'_>, part: &[u8]) -> fmt::Result {
    for c in String::from_utf8_lossy(part).chars() {
        match c {
            '/' | '@' | '\\' => write!(f, "\\{}", c)?,
            '\n' => f.write_str("\\n")?,
            '\t' => f.write_str("\\t")?,
            '\u{8}' => f.write_str("\\b")?,
            '\0' => f.write_str("\\0")?,
            other => write!(f, "{}", other)?,
        }
    }
    Ok(())
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, component) in self.components.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            write_escaped(f, component)?;
        }
        f.write_str("@")?;
        write_escaped(f, &self.realm)
    }
}

// =============================================================================
// Keyblock
// =============================================================================

/// Key type plus raw key material; the material is zeroed on drop
#[derive(Clone, PartialEq, Eq)]
pub struct Keyblock {
    pub keytype: i16,
    pub value: Zeroizing<Vec<u8>>,
}

impl Keyblock {
    pub fn new(keytype: i16, value: impl Into<Vec<u8>>) -> Self {
        Self {
            keytype,
            value: Zeroizing::new(value.into()),
        }
    }
}

impl fmt::Debug for Keyblock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keyblock")
            .field("keytype", &self.keytype)
            .field("len", &self.value.len())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Keytab Entry
// =============================================================================

/// One stored long-term key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeytabEntry {
    pub principal: Principal,
    /// Seconds since the epoch when the key was set
    pub timestamp: u32,
    /// Key version number; only the low 8 bits survive in legacy records
    pub kvno: u32,
    pub keyblock: Keyblock,
    pub flags: u32,
}

impl KeytabEntry {
    pub fn new(principal: Principal, kvno: u32, keyblock: Keyblock) -> Self {
        Self {
            principal,
            timestamp: 0,
            kvno,
            keyblock,
            flags: 0,
        }
    }

    pub fn with_timestamp(mut self, timestamp: u32) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_flags(mut self, flags: u32) -> Self {
        self.flags = flags;
        self
    }
}

// =============================================================================
// Entry Selection
// =============================================================================

/// Criteria for `remove` and `get_entry`; unset fields match anything
#[derive(Debug, Clone, Default)]
pub struct EntrySelector {
    pub principal: Option<Principal>,
    pub kvno: Option<u32>,
    pub keytype: Option<i16>,
}

impl EntrySelector {
    /// Match every entry
    pub fn any() -> Self {
        Self::default()
    }

    pub fn principal(principal: Principal) -> Self {
        Self {
            principal: Some(principal),
            ..Self::default()
        }
    }

    /// Restrict to one kvno; zero keeps the wildcard
    pub fn kvno(mut self, kvno: u32) -> Self {
        self.kvno = (kvno != 0).then_some(kvno);
        self
    }

    /// Restrict to one key type; zero keeps the wildcard
    pub fn keytype(mut self, keytype: i16) -> Self {
        self.keytype = (keytype != 0).then_some(keytype);
        self
    }

    pub fn matches(&self, entry: &KeytabEntry) -> bool {
        if let Some(principal) = &self.principal {
            if !principal.same_name(&entry.principal) {
                return false;
            }
        }
        if let Some(kvno) = self.kvno {
            if kvno != entry.kvno {
                return false;
            }
        }
        if let Some(keytype) = self.keytype {
            if keytype != entry.keyblock.keytype {
                return false;
            }
        }
        true
    }
}
