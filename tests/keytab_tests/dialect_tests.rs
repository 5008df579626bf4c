//! Tests for the two on-disk dialects
//!
//! These tests verify:
//! - Version 1 files (host byte order, off-by-one component count, no name-type)
//! - Records are encoded in the dialect of the file they are added to
//! - Unknown format tags behave like version 2

use std::fs;
use std::io::Cursor;
use std::path::PathBuf;

use krbtab::keytab::{
    encode_entry, EntrySelector, FileKeytab, FormatVersion, Keyblock, KeytabEntry, KeytabStorage, NameType,
    Principal, StorageFlags,
};
use proptest::prelude::*;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_keytab() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("test.keytab");
    (temp_dir, path)
}

fn service_entry(kvno: u32) -> KeytabEntry {
    KeytabEntry::new(
        Principal::new("EXAMPLE.COM", ["HTTP", "www.example.com"]).with_name_type(NameType::SRV_HST),
        kvno,
        Keyblock::new(17, vec![0x11u8; 16]),
    )
    .with_timestamp(1_234_567_890)
}

fn push_name_ne(buf: &mut Vec<u8>, value: &[u8]) {
    buf.extend((value.len() as i16).to_ne_bytes());
    buf.extend(value);
}

/// Version 1 record for `entry`, built field by field
fn v1_record(entry: &KeytabEntry) -> Vec<u8> {
    let principal = &entry.principal;
    let mut body = Vec::new();
    body.extend((principal.components.len() as i16 + 1).to_ne_bytes());
    push_name_ne(&mut body, &principal.realm);
    for component in &principal.components {
        push_name_ne(&mut body, component);
    }
    body.extend(entry.timestamp.to_ne_bytes());
    body.push(entry.kvno as u8);
    body.extend(entry.keyblock.keytype.to_ne_bytes());
    body.extend((entry.keyblock.value.len() as i16).to_ne_bytes());
    body.extend(entry.keyblock.value.iter());
    body.extend((entry.kvno as i32).to_ne_bytes());
    body.extend(entry.flags.to_ne_bytes());

    let mut record = (body.len() as i32).to_ne_bytes().to_vec();
    record.extend(body);
    record
}

// =============================================================================
// Version 1 Tests
// =============================================================================

#[test]
fn test_v1_encoding_matches_layout() {
    let entry = service_entry(3).with_flags(0x20);

    let encoded = encode_entry(&entry, FormatVersion::V1.flags(), true).unwrap();

    assert_eq!(encoded.as_slice(), &v1_record(&entry)[4..]);
}

#[test]
fn test_read_hand_built_v1_file() {
    let (_temp, path) = setup_temp_keytab();
    let entry = service_entry(300).with_flags(0x1);

    let mut bytes = vec![0x05u8, 0x01];
    bytes.extend(v1_record(&entry));
    fs::write(&path, bytes).unwrap();

    let mut cursor = FileKeytab::resolve(&path).open_cursor().unwrap();
    assert_eq!(cursor.version(), FormatVersion::V1);

    let read = cursor.next_entry().unwrap().unwrap();
    assert!(read.principal.same_name(&entry.principal));
    assert_eq!(read.principal.name_type, NameType::UNKNOWN);
    assert_eq!(read.kvno, 300);
    assert_eq!(read.flags, 0x1);
    assert_eq!(read.keyblock, entry.keyblock);
    assert!(cursor.next_entry().unwrap().is_none());
}

#[test]
fn test_add_to_v1_file_uses_v1_dialect() {
    let (_temp, path) = setup_temp_keytab();
    let existing = service_entry(1);

    let mut bytes = vec![0x05u8, 0x01];
    bytes.extend(v1_record(&existing));
    fs::write(&path, &bytes).unwrap();

    let keytab = FileKeytab::resolve(&path);
    let added = service_entry(2).with_flags(0x8);
    keytab.add(&added).unwrap();

    bytes.extend(v1_record(&added));
    assert_eq!(fs::read(&path).unwrap(), bytes);
}

#[test]
fn test_new_v1_file_round_trip() {
    let (_temp, path) = setup_temp_keytab();
    let keytab = FileKeytab::resolve(&path).with_new_file_version(FormatVersion::V1);

    keytab.add(&service_entry(5)).unwrap();
    keytab.add(&service_entry(6)).unwrap();
    keytab.remove(&EntrySelector::any().kvno(5)).unwrap();

    let read = keytab.entries().unwrap();
    assert_eq!(read.len(), 1);
    assert_eq!(read[0].kvno, 6);

    // the tombstone length is stored in host order too
    let bytes = fs::read(&path).unwrap();
    let tomb = i32::from_ne_bytes(bytes[2..6].try_into().unwrap());
    assert!(tomb < 0);
}

#[test]
fn test_v1_storage_uses_host_order() {
    let mut storage = KeytabStorage::new(Cursor::new(Vec::new()), FormatVersion::V1.flags());
    storage.write_i32(0x0102_0304).unwrap();
    storage.write_i16(0x0506).unwrap();

    let bytes = storage.get_ref().get_ref().clone();
    let mut expected = 0x0102_0304i32.to_ne_bytes().to_vec();
    expected.extend(0x0506i16.to_ne_bytes());
    assert_eq!(bytes, expected);

    storage.seek_to(0).unwrap();
    assert_eq!(storage.read_i32().unwrap(), 0x0102_0304);
    assert_eq!(storage.read_i16().unwrap(), 0x0506);
}

// =============================================================================
// Version 2 Tests
// =============================================================================

#[test]
fn test_v2_storage_is_big_endian() {
    let mut storage = KeytabStorage::new(Cursor::new(Vec::new()), StorageFlags::default());
    storage.write_i32(0x0102_0304).unwrap();
    storage.write_u32(0xa0b0_c0d0).unwrap();

    assert_eq!(
        storage.get_ref().get_ref().as_slice(),
        &[0x01, 0x02, 0x03, 0x04, 0xa0, 0xb0, 0xc0, 0xd0]
    );
}

#[test]
fn test_v2_keeps_name_type() {
    let (_temp, path) = setup_temp_keytab();
    let keytab = FileKeytab::resolve(&path);

    keytab.add(&service_entry(1)).unwrap();

    assert_eq!(keytab.entries().unwrap()[0].principal.name_type, NameType::SRV_HST);
}

#[test]
fn test_unknown_tag_preserved_on_add() {
    let (_temp, path) = setup_temp_keytab();
    fs::write(&path, [0x05u8, 0x09]).unwrap();

    let keytab = FileKeytab::resolve(&path);
    let entry = service_entry(4);
    keytab.add(&entry).unwrap();

    let bytes = fs::read(&path).unwrap();
    assert_eq!(&bytes[..2], &[0x05, 0x09]);
    let body = encode_entry(&entry, FormatVersion::V2.flags(), true).unwrap();
    assert_eq!(&bytes[6..], body.as_slice());
    assert_eq!(keytab.entries().unwrap(), vec![entry]);
}

#[test]
fn test_format_tags() {
    assert_eq!(FormatVersion::from_tag(1), FormatVersion::V1);
    assert_eq!(FormatVersion::from_tag(2), FormatVersion::V2);
    assert_eq!(FormatVersion::from_tag(3), FormatVersion::Other(3));
    assert_eq!(FormatVersion::Other(3).tag(), 3);
    assert_eq!(FormatVersion::Other(3).flags(), StorageFlags::default());
    assert!(FormatVersion::V1.flags().host_byte_order);
}

// =============================================================================
// Property Tests
// =============================================================================

fn arb_entry() -> impl Strategy<Value = KeytabEntry> {
    (
        "[A-Z.]{1,16}",
        proptest::collection::vec("[a-z0-9./@-]{0,12}", 0..4),
        any::<i32>(),
        any::<u32>(),
        0u32..=i32::MAX as u32,
        any::<i16>(),
        proptest::collection::vec(any::<u8>(), 0..64),
        any::<u32>(),
    )
        .prop_map(|(realm, components, name_type, timestamp, kvno, keytype, key, flags)| {
            KeytabEntry::new(
                Principal::new(realm, components).with_name_type(NameType(name_type)),
                kvno,
                Keyblock::new(keytype, key),
            )
            .with_timestamp(timestamp)
            .with_flags(flags)
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_entries_round_trip_in_both_dialects(entry in arb_entry()) {
        let (_temp, path) = setup_temp_keytab();

        let v2 = FileKeytab::resolve(path.with_extension("v2"));
        v2.add(&entry).unwrap();
        prop_assert_eq!(v2.entries().unwrap(), vec![entry.clone()]);

        let v1 = FileKeytab::resolve(path.with_extension("v1")).with_new_file_version(FormatVersion::V1);
        v1.add(&entry).unwrap();
        let read = v1.entries().unwrap();
        prop_assert_eq!(read.len(), 1);
        prop_assert!(read[0].principal.same_name(&entry.principal));
        prop_assert_eq!(read[0].principal.name_type, NameType::UNKNOWN);
        prop_assert_eq!(read[0].kvno, entry.kvno);
        prop_assert_eq!(read[0].flags, entry.flags);
        prop_assert_eq!(&read[0].keyblock, &entry.keyblock);
    }
}
