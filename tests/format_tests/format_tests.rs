//! Tests for the on-medium format and value encoding
//!
//! These tests verify:
//! - Header and index entry byte layout (little-endian, fixed width)
//! - Encode/decode symmetry
//! - Entry name validation and case-insensitive matching
//! - Length-prefixed payloads and the Value sum type

use pstorage::format::{
    EntryName, EntryType, IndexEntry, StorageHeader, COMPATIBILITY_TAG, ENTRY_LEN, ENTRY_SIZE,
    HEADER_LEN, NAME_CAPACITY,
};
use pstorage::value::{decode_variable, encode_variable, Scalar, Value};
use pstorage::PStorageError;

// =============================================================================
// Helper Functions
// =============================================================================

fn named(name: &str, entry_type: EntryType, this: u32, previous: u32, next: u32) -> IndexEntry {
    IndexEntry {
        name: EntryName::parse(name).unwrap(),
        entry_type,
        this_offset: this,
        previous_offset: previous,
        next_offset: next,
    }
}

// =============================================================================
// Header Tests
// =============================================================================

#[test]
fn test_header_layout() {
    let header = StorageHeader::new(119);
    let bytes = header.encode();

    assert_eq!(bytes.len(), HEADER_LEN);
    // 26202 = 0x665A, least significant byte first
    assert_eq!(bytes, [0x5A, 0x66, 0, 0, 119, 0, 0, 0, 12, 0, 0, 0]);
}

#[test]
fn test_header_decode_inverts_encode() {
    let header = StorageHeader {
        compatibility_tag: COMPATIBILITY_TAG,
        region_size: 0x0102_0304,
        first_entry: 12,
    };

    assert_eq!(StorageHeader::decode(&header.encode()), header);
}

#[test]
fn test_header_geometry() {
    let header = StorageHeader::new(119);

    assert!(header.is_compatible());
    assert_eq!(header.first_entry, 12);
    assert_eq!(header.region_end(), 131);
    assert_eq!(header.storage_size(), 131);
}

#[test]
fn test_header_foreign_tag_is_incompatible() {
    let mut bytes = StorageHeader::new(64).encode();
    bytes[0] = 0xFF;

    let header = StorageHeader::decode(&bytes);
    assert!(!header.is_compatible());
}

// =============================================================================
// Entry Tests
// =============================================================================

#[test]
fn test_entry_layout() {
    let entry = named("ab", EntryType::Int, 12, 0, 35);
    let bytes = entry.encode();

    assert_eq!(bytes.len(), ENTRY_LEN);
    assert_eq!(
        bytes,
        [
            b'a', b'b', 0, 0, 0, 0, // name field
            1, // type tag
            12, 0, 0, 0, // this
            0, 0, 0, 0, // previous
            35, 0, 0, 0, // next
        ]
    );
}

#[test]
fn test_entry_decode_inverts_encode() {
    let entries = [
        IndexEntry::free(12, 0, 131),
        named("abcde", EntryType::String, 300, 250, 70_000),
        named("x", EntryType::Float, 0x0A0B_0C0D, 0x0102_0304, u32::MAX),
    ];

    for entry in entries {
        assert_eq!(IndexEntry::decode(&entry.encode()).unwrap(), entry);
    }
}

#[test]
fn test_entry_decode_unknown_tag() {
    let mut bytes = IndexEntry::free(12, 0, 131).encode();
    bytes[6] = 42;

    let result = IndexEntry::decode(&bytes);
    assert!(matches!(result, Err(PStorageError::Corrupted(_))));
}

#[test]
fn test_entry_capacity_and_span() {
    let entry = named("a", EntryType::Int, 12, 0, 35);

    assert_eq!(entry.value_offset(), 12 + ENTRY_SIZE);
    assert_eq!(entry.capacity(), 4);
    assert_eq!(entry.span(), 23);
    assert!(entry.is_first());
    assert!(!entry.is_free());
}

#[test]
fn test_entry_free_has_empty_name() {
    let entry = IndexEntry::free(40, 12, 100);

    assert!(entry.is_free());
    assert!(entry.name.is_empty());
    assert!(!entry.is_first());
}

#[test]
fn test_entry_type_tags() {
    let all = [
        EntryType::Free,
        EntryType::Int,
        EntryType::UInt,
        EntryType::Long,
        EntryType::ULong,
        EntryType::Float,
        EntryType::Array,
        EntryType::String,
    ];

    for (i, entry_type) in all.iter().enumerate() {
        assert_eq!(entry_type.tag(), i as u8);
        assert_eq!(EntryType::from_tag(i as u8), Some(*entry_type));
    }
    assert_eq!(EntryType::from_tag(8), None);
    assert!(EntryType::Array.is_variable());
    assert!(EntryType::String.is_variable());
    assert!(!EntryType::Long.is_variable());
}

// =============================================================================
// Name Tests
// =============================================================================

#[test]
fn test_name_accepts_full_capacity() {
    let name = EntryName::parse("abcde").unwrap();

    assert_eq!(name.as_bytes(), b"abcde");
    assert_eq!(name.as_bytes().len(), NAME_CAPACITY);

    let entry = IndexEntry {
        name,
        ..IndexEntry::free(12, 0, 131)
    };
    assert_eq!(IndexEntry::decode(&entry.encode()).unwrap().name, name);
}

#[test]
fn test_name_too_long() {
    let result = EntryName::parse("abcdef");

    match result {
        Err(PStorageError::NameTooLong { name, max }) => {
            assert_eq!(name, "abcdef");
            assert_eq!(max, NAME_CAPACITY);
        }
        other => panic!("expected NameTooLong, got {:?}", other),
    }
}

#[test]
fn test_name_rejects_empty_and_nul() {
    assert!(matches!(
        EntryName::parse(""),
        Err(PStorageError::InvalidName(_))
    ));
    assert!(matches!(
        EntryName::parse("a\0b"),
        Err(PStorageError::InvalidName(_))
    ));
}

#[test]
fn test_name_matches_case_insensitively() {
    let lower = EntryName::parse("temp").unwrap();
    let mixed = EntryName::parse("TeMp").unwrap();
    let other = EntryName::parse("tempo").unwrap();

    assert!(lower.matches(&mixed));
    assert!(!lower.matches(&other));
    assert_eq!(mixed.to_string(), "TeMp");
}

// =============================================================================
// Value Tests
// =============================================================================

#[test]
fn test_scalar_widths() {
    assert_eq!(<i32 as Scalar>::WIDTH, 4);
    assert_eq!(<u32 as Scalar>::WIDTH, 4);
    assert_eq!(<i64 as Scalar>::WIDTH, 8);
    assert_eq!(<u64 as Scalar>::WIDTH, 8);
    assert_eq!(<f32 as Scalar>::WIDTH, 4);
}

#[test]
fn test_scalar_little_endian() {
    let mut buf = Vec::new();
    (-2i32).encode(&mut buf);

    assert_eq!(buf, vec![0xFE, 0xFF, 0xFF, 0xFF]);
    assert_eq!(i32::decode(&buf), -2);
}

#[test]
fn test_variable_payload_prefix() {
    let payload = encode_variable(b"hey").unwrap();

    assert_eq!(payload, vec![3, 0, 0, 0, b'h', b'e', b'y']);
    assert_eq!(decode_variable(&payload).unwrap(), b"hey");
}

#[test]
fn test_variable_payload_ignores_slack() {
    let mut payload = encode_variable(b"hi").unwrap();
    payload.extend_from_slice(b"stale bytes");

    assert_eq!(decode_variable(&payload).unwrap(), b"hi");
}

#[test]
fn test_variable_payload_rejects_oversized_prefix() {
    let payload = [10, 0, 0, 0, b'a', b'b'];

    assert!(matches!(
        decode_variable(&payload),
        Err(PStorageError::Corrupted(_))
    ));
    assert!(matches!(
        decode_variable(&[1, 0]),
        Err(PStorageError::Corrupted(_))
    ));
}

#[test]
fn test_value_decode_by_type() {
    let int = Value::Int(-456).encode().unwrap();
    let text = Value::from("Ich heiße Martin").encode().unwrap();

    assert_eq!(Value::decode(EntryType::Int, &int).unwrap(), Value::Int(-456));
    assert_eq!(
        Value::decode(EntryType::String, &text).unwrap(),
        Value::String("Ich heiße Martin".to_string())
    );
    assert!(Value::decode(EntryType::Free, &int).is_err());
    assert!(Value::decode(EntryType::Long, &int).is_err()); // 4 bytes, needs 8
}

#[test]
fn test_value_decode_rejects_invalid_utf8() {
    let payload = encode_variable(&[0xFF, 0xFE]).unwrap();

    assert!(matches!(
        Value::decode(EntryType::String, &payload),
        Err(PStorageError::Corrupted(_))
    ));
    assert_eq!(
        Value::decode(EntryType::Array, &payload).unwrap(),
        Value::Array(vec![0xFF, 0xFE])
    );
}

#[test]
fn test_value_preview() {
    assert_eq!(Value::UInt(7).preview(), "7");
    assert_eq!(Value::from("short").preview(), "\"short\"");
    assert_eq!(Value::Array(vec![0xDE, 0xAD]).preview(), "[dead]");

    let long = "Zu Dionys dem Tyrannen schlich Damon";
    assert_eq!(Value::from(long).preview(), "\"Zu Dionys dem Tyrannen s\"..");

    let bytes: Vec<u8> = (0..20).collect();
    assert!(Value::Array(bytes).preview().ends_with("(20 bytes)"));
}

#[test]
fn test_value_entry_types() {
    assert_eq!(Value::from(1i32).entry_type(), EntryType::Int);
    assert_eq!(Value::from(1u32).entry_type(), EntryType::UInt);
    assert_eq!(Value::from(1i64).entry_type(), EntryType::Long);
    assert_eq!(Value::from(1u64).entry_type(), EntryType::ULong);
    assert_eq!(Value::from(1.5f32).entry_type(), EntryType::Float);
    assert_eq!(Value::from(vec![1u8]).entry_type(), EntryType::Array);
    assert_eq!(Value::from("s").entry_type(), EntryType::String);
}
