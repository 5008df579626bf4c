//! Key Derivation Module
//!
//! Stateless primitives used by string-to-key and key derivation routines.
//! Nothing here touches the keytab store.

mod n_fold;

pub use n_fold::{nfold, nfold_into};

/// Encryption type numbers as stored in keyblocks
pub mod enctype {
    pub const DES_CBC_CRC: i16 = 1;
    pub const DES_CBC_MD5: i16 = 3;
    pub const DES3_CBC_SHA1: i16 = 16;
    pub const AES128_CTS_HMAC_SHA1_96: i16 = 17;
    pub const AES256_CTS_HMAC_SHA1_96: i16 = 18;
    pub const AES128_CTS_HMAC_SHA256_128: i16 = 19;
    pub const AES256_CTS_HMAC_SHA384_192: i16 = 20;
    pub const ARCFOUR_HMAC_MD5: i16 = 23;

    const NAMES: &[(i16, &str)] = &[
        (DES_CBC_CRC, "des-cbc-crc"),
        (DES_CBC_MD5, "des-cbc-md5"),
        (DES3_CBC_SHA1, "des3-cbc-sha1"),
        (AES128_CTS_HMAC_SHA1_96, "aes128-cts-hmac-sha1-96"),
        (AES256_CTS_HMAC_SHA1_96, "aes256-cts-hmac-sha1-96"),
        (AES128_CTS_HMAC_SHA256_128, "aes128-cts-hmac-sha256-128"),
        (AES256_CTS_HMAC_SHA384_192, "aes256-cts-hmac-sha384-192"),
        (ARCFOUR_HMAC_MD5, "arcfour-hmac-md5"),
    ];

    /// Canonical name of a known enctype
    pub fn name(enctype: i16) -> Option<&'static str> {
        NAMES.iter().find(|(e, _)| *e == enctype).map(|(_, n)| *n)
    }

    /// Parse a canonical name or a decimal enctype number
    pub fn parse(s: &str) -> Option<i16> {
        NAMES
            .iter()
            .find(|(_, n)| n.eq_ignore_ascii_case(s))
            .map(|(e, _)| *e)
            .or_else(|| s.parse().ok())
    }
}
