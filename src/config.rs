//! Configuration for krbtab
//!
//! Centralized configuration with sensible defaults.

use crate::keytab::FormatVersion;

/// Main configuration for keytab access
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Keytab Location
    // -------------------------------------------------------------------------
    /// Keytab name used when the caller does not supply one.
    /// Accepts the same `KIND:path` forms as `FileKeytab::from_name`.
    pub default_keytab: String,

    // -------------------------------------------------------------------------
    // File Format
    // -------------------------------------------------------------------------
    /// Format tag written when `add` creates a keytab or repairs one that
    /// has no header yet. Existing files keep their own tag.
    pub new_file_version: FormatVersion,

    // -------------------------------------------------------------------------
    // Principal Parsing
    // -------------------------------------------------------------------------
    /// Realm applied to principal names given without `@REALM`
    pub default_realm: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_keytab: "FILE:/etc/krb5.keytab".to_string(),
            new_file_version: FormatVersion::V2,
            default_realm: None,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the keytab name used when none is given
    pub fn default_keytab(mut self, name: impl Into<String>) -> Self {
        self.config.default_keytab = name.into();
        self
    }

    /// Set the format tag for newly created keytab files
    pub fn new_file_version(mut self, version: FormatVersion) -> Self {
        self.config.new_file_version = version;
        self
    }

    /// Set the realm used for unqualified principal names
    pub fn default_realm(mut self, realm: impl Into<String>) -> Self {
        self.config.default_realm = Some(realm.into());
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
