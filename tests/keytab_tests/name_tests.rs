//! Tests for keytab names, principal names and keytab lifecycle
//!
//! These tests verify:
//! - `KIND:path` resolution and rejection of unknown kinds
//! - Principal parsing, escaping and default realms
//! - Destroying keytabs (including symlinked ones)
//! - Advisory lock guards

use std::fs::{self, File};
use std::path::PathBuf;

use krbtab::config::Config;
use krbtab::keytab::{FileKeytab, FileLock, FormatVersion, Keyblock, KeytabEntry, KeytabKind, LockMode, Principal};
use krbtab::KeytabError;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_keytab() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("test.keytab");
    (temp_dir, path)
}

fn sample_entry() -> KeytabEntry {
    KeytabEntry::new(
        Principal::new("EXAMPLE.COM", ["alice"]),
        1,
        Keyblock::new(18, vec![0x77u8; 32]),
    )
}

// =============================================================================
// Keytab Name Tests
// =============================================================================

#[test]
fn test_resolve_prefixed_names() {
    let keytab = FileKeytab::from_name("FILE:/etc/krb5.keytab").unwrap();
    assert_eq!(keytab.kind(), KeytabKind::File);
    assert_eq!(keytab.get_name(), PathBuf::from("/etc/krb5.keytab").as_path());
    assert_eq!(keytab.full_name(), "FILE:/etc/krb5.keytab");

    let keytab = FileKeytab::from_name("WRFILE:/var/kt").unwrap();
    assert_eq!(keytab.kind(), KeytabKind::WriteFile);
    assert_eq!(keytab.full_name(), "WRFILE:/var/kt");

    let keytab = FileKeytab::from_name("java14:/opt/app.keytab").unwrap();
    assert_eq!(keytab.kind(), KeytabKind::Java14);
    assert_eq!(keytab.full_name(), "JAVA14:/opt/app.keytab");
}

#[test]
fn test_bare_paths_are_file_keytabs() {
    let keytab = FileKeytab::from_name("/tmp/service.keytab").unwrap();
    assert_eq!(keytab.kind(), KeytabKind::File);
    assert_eq!(keytab.full_name(), "FILE:/tmp/service.keytab");

    let keytab = FileKeytab::from_name("C:\\keytabs\\host.keytab").unwrap();
    assert_eq!(keytab.kind(), KeytabKind::File);
    assert_eq!(keytab.get_name(), PathBuf::from("C:\\keytabs\\host.keytab").as_path());

    let keytab = FileKeytab::from_name("./dir.v2:x/host.keytab").unwrap();
    assert_eq!(keytab.get_name(), PathBuf::from("./dir.v2:x/host.keytab").as_path());
}

#[test]
fn test_invalid_names_rejected() {
    for name in ["", "FILE:", "MEMORY:cache", "KEYRING:persistent"] {
        let result = FileKeytab::from_name(name);
        assert!(
            matches!(result, Err(KeytabError::InvalidName(_))),
            "{:?} should be rejected",
            name
        );
    }
}

#[test]
fn test_from_config() {
    let (_temp, path) = setup_temp_keytab();
    let config = Config::builder()
        .default_keytab(format!("WRFILE:{}", path.display()))
        .new_file_version(FormatVersion::V1)
        .build();

    let keytab = FileKeytab::from_config(&config).unwrap();
    assert_eq!(keytab.kind(), KeytabKind::WriteFile);

    keytab.add(&sample_entry()).unwrap();
    assert_eq!(&fs::read(&path).unwrap()[..2], &[0x05, 0x01]);
}

#[test]
fn test_default_config() {
    let config = Config::default();

    assert_eq!(config.default_keytab, "FILE:/etc/krb5.keytab");
    assert_eq!(config.new_file_version, FormatVersion::V2);
    assert!(config.default_realm.is_none());
}

// =============================================================================
// Principal Name Tests
// =============================================================================

#[test]
fn test_parse_principal() {
    let principal: Principal = "host/db.example.com@EXAMPLE.COM".parse().unwrap();

    assert_eq!(principal.realm, b"EXAMPLE.COM");
    assert_eq!(principal.components, vec![b"host".to_vec(), b"db.example.com".to_vec()]);
    assert_eq!(principal.to_string(), "host/db.example.com@EXAMPLE.COM");
}

#[test]
fn test_parse_uses_default_realm() {
    let principal = Principal::parse("alice", Some("CORP.EXAMPLE")).unwrap();
    assert_eq!(principal, Principal::new("CORP.EXAMPLE", ["alice"]));

    let explicit = Principal::parse("bob@OTHER.REALM", Some("CORP.EXAMPLE")).unwrap();
    assert_eq!(explicit.realm, b"OTHER.REALM");

    assert!(matches!(
        Principal::parse("alice", None),
        Err(KeytabError::InvalidPrincipal(_))
    ));
}

#[test]
fn test_parse_escapes() {
    let principal = Principal::parse(r"we\/ird\@name/x@R\@LM", None).unwrap();

    assert_eq!(principal.components, vec![b"we/ird@name".to_vec(), b"x".to_vec()]);
    assert_eq!(principal.realm, b"R@LM");
    assert_eq!(principal.to_string(), r"we\/ird\@name/x@R\@LM");
    assert_eq!(principal.to_string().parse::<Principal>().unwrap(), principal);
}

#[test]
fn test_parse_control_escapes() {
    let principal = Principal::parse(r"a\nb\tc@R", None).unwrap();

    assert_eq!(principal.components, vec![b"a\nb\tc".to_vec()]);
    assert_eq!(principal.to_string(), r"a\nb\tc@R");
}

#[test]
fn test_display_non_utf8_name() {
    let principal = Principal::new(vec![0xc3u8, 0x28], [b"caf\xe9".to_vec()]);

    assert_eq!(principal.to_string(), "caf\u{fffd}@\u{fffd}(");
}

#[test]
fn test_parse_errors() {
    for name in [r"alice\", "alice@", "alice@A@B", "alice@A/B"] {
        assert!(
            matches!(Principal::parse(name, None), Err(KeytabError::InvalidPrincipal(_))),
            "{:?} should be rejected",
            name
        );
    }
}

// =============================================================================
// Destroy Tests
// =============================================================================

#[test]
fn test_destroy_removes_file() {
    let (_temp, path) = setup_temp_keytab();
    let keytab = FileKeytab::resolve(&path);
    keytab.add(&sample_entry()).unwrap();

    keytab.destroy().unwrap();

    assert!(!path.exists());
}

#[test]
fn test_destroy_missing_file_is_io_error() {
    let (_temp, path) = setup_temp_keytab();

    let result = FileKeytab::resolve(&path).destroy();

    assert!(matches!(result, Err(KeytabError::Io { .. })));
}

#[cfg(unix)]
#[test]
fn test_destroy_keeps_hard_linked_data() {
    let (temp, path) = setup_temp_keytab();
    let keytab = FileKeytab::resolve(&path);
    keytab.add(&sample_entry()).unwrap();
    let link = temp.path().join("link.keytab");
    fs::hard_link(&path, &link).unwrap();
    let before = fs::read(&link).unwrap();

    keytab.destroy().unwrap();

    assert!(!path.exists());
    assert_eq!(fs::read(&link).unwrap(), before);
}

#[cfg(unix)]
#[test]
fn test_destroy_symlink_leaves_target() {
    let (temp, path) = setup_temp_keytab();
    FileKeytab::resolve(&path).add(&sample_entry()).unwrap();
    let before = fs::read(&path).unwrap();

    let link = temp.path().join("link.keytab");
    std::os::unix::fs::symlink(&path, &link).unwrap();

    FileKeytab::resolve(&link).destroy().unwrap();

    assert!(fs::symlink_metadata(&link).is_err());
    assert_eq!(fs::read(&path).unwrap(), before);
}

// =============================================================================
// Lock Tests
// =============================================================================

#[test]
fn test_exclusive_lock_blocks_others_until_dropped() {
    let (_temp, path) = setup_temp_keytab();
    File::create(&path).unwrap();

    let file = File::open(&path).unwrap();
    let guard = FileLock::acquire(&file, LockMode::Exclusive).unwrap();
    assert_eq!(guard.mode(), LockMode::Exclusive);

    let probe = File::open(&path).unwrap();
    assert!(probe.try_lock_shared().is_err());

    drop(guard);
    assert!(probe.try_lock_shared().is_ok());
}

#[test]
fn test_shared_locks_coexist() {
    let (_temp, path) = setup_temp_keytab();
    File::create(&path).unwrap();

    let first = File::open(&path).unwrap();
    let second = File::open(&path).unwrap();
    let a = FileLock::acquire(&first, LockMode::Shared).unwrap();
    let b = FileLock::acquire(&second, LockMode::Shared).unwrap();

    assert_eq!(a.mode(), LockMode::Shared);
    assert_eq!(b.mode(), LockMode::Shared);
}

// =============================================================================
// Enctype Name Tests
// =============================================================================

#[test]
fn test_enctype_names() {
    use krbtab::crypto::enctype;

    assert_eq!(enctype::name(enctype::AES256_CTS_HMAC_SHA1_96), Some("aes256-cts-hmac-sha1-96"));
    assert_eq!(enctype::parse("AES128-CTS-HMAC-SHA1-96"), Some(17));
    assert_eq!(enctype::parse("23"), Some(enctype::ARCFOUR_HMAC_MD5));
    assert_eq!(enctype::parse("rot13"), None);
    assert_eq!(enctype::name(99), None);
}
