//! Tests for region layout and the index list walker
//!
//! These tests verify:
//! - Fresh region layout (header, single free entry, filled payload)
//! - Minimum region size clamping
//! - Loading existing regions and rejecting foreign or truncated files
//! - Forward iteration and name lookups
//! - Detection of broken links

use pstorage::format::{EntryName, EntryType, StorageHeader, FILL_BYTE};
use pstorage::io::{Backend, MemoryBackend, MemoryFile, OpenMode};
use pstorage::region::Region;
use pstorage::{PStorageError, SyncStrategy};

// =============================================================================
// Helper Functions
// =============================================================================

const FILE: &str = "region.dat";

fn create_region(backend: &MemoryBackend, requested: u32) -> Region<MemoryFile> {
    let file = backend.open(FILE, OpenMode::Truncate).unwrap();
    Region::create(file, requested, SyncStrategy::EveryWrite).unwrap()
}

fn load_region(backend: &MemoryBackend) -> pstorage::Result<Region<MemoryFile>> {
    let file = backend.open(FILE, OpenMode::Existing).unwrap();
    Region::load(file, SyncStrategy::EveryWrite)
}

fn name(s: &str) -> EntryName {
    EntryName::parse(s).unwrap()
}

// =============================================================================
// Layout Tests
// =============================================================================

#[test]
fn test_create_single_free_entry() {
    let backend = MemoryBackend::new();
    let mut region = create_region(&backend, 100);

    assert_eq!(region.header().region_size, 119);
    assert_eq!(region.region_end(), 131);

    let first = region.read_first().unwrap();
    assert!(first.is_free());
    assert_eq!(first.this_offset, 12);
    assert_eq!(first.previous_offset, 0);
    assert_eq!(first.next_offset, 131);
    assert_eq!(first.capacity(), 100);

    assert!(region.is_last(&first));
    assert!(region.read_next(&first).unwrap().is_none());
    assert_eq!(region.entries().count(), 1);
}

#[test]
fn test_create_fills_payload() {
    let backend = MemoryBackend::new();
    let _region = create_region(&backend, 100);

    let bytes = backend.contents(FILE).unwrap();
    assert_eq!(bytes.len(), 131);
    assert_eq!(&bytes[..12], &StorageHeader::new(119).encode());
    assert!(bytes[31..].iter().all(|&b| b == FILL_BYTE));
}

#[test]
fn test_create_clamps_to_minimum() {
    let backend = MemoryBackend::new();

    for requested in [0, 2, 4] {
        let mut region = create_region(&backend, requested);
        let first = region.read_first().unwrap();

        assert_eq!(region.header().region_size, 23);
        assert_eq!(first.capacity(), 4);
    }
}

#[test]
fn test_create_rejects_overflowing_size() {
    let backend = MemoryBackend::new();
    let file = backend.open(FILE, OpenMode::Truncate).unwrap();

    let result = Region::create(file, u32::MAX - 10, SyncStrategy::Manual);
    assert!(matches!(result, Err(PStorageError::Config(_))));
}

// =============================================================================
// Load Tests
// =============================================================================

#[test]
fn test_load_existing_region() {
    let backend = MemoryBackend::new();
    let header = *create_region(&backend, 64).header();

    let mut region = load_region(&backend).unwrap();
    assert_eq!(*region.header(), header);
    assert_eq!(region.read_first().unwrap().capacity(), 64);
}

#[test]
fn test_load_foreign_tag() {
    let backend = MemoryBackend::new();
    create_region(&backend, 64);
    backend.patch(FILE, 0, &[0x34, 0x12, 0, 0]);

    let result = load_region(&backend);
    assert!(matches!(
        result,
        Err(PStorageError::IncompatibleFormat { found: 0x1234 })
    ));
}

#[test]
fn test_load_empty_file() {
    let backend = MemoryBackend::new();
    backend.open(FILE, OpenMode::Truncate).unwrap();

    let err = load_region(&backend).err().unwrap();
    assert!(err.is_incompatible());
}

#[test]
fn test_load_truncated_file() {
    let backend = MemoryBackend::new();
    backend.open(FILE, OpenMode::Truncate).unwrap();
    backend.patch(FILE, 0, &StorageHeader::new(119).encode());

    let result = load_region(&backend);
    assert!(matches!(result, Err(PStorageError::Corrupted(_))));
}

// =============================================================================
// Walk and Lookup Tests
// =============================================================================

#[test]
fn test_walk_follows_links() {
    let backend = MemoryBackend::new();
    let mut region = create_region(&backend, 100);
    region.allocate(&name("a"), 4, EntryType::Int).unwrap();
    region.allocate(&name("b"), 8, EntryType::Long).unwrap();

    let entries: Vec<_> = region.entries().map(|e| e.unwrap()).collect();
    assert_eq!(entries.len(), 3);

    // every entry links back to its predecessor, the last one ends the region
    assert_eq!(entries[0].previous_offset, 0);
    for pair in entries.windows(2) {
        assert_eq!(pair[0].next_offset, pair[1].this_offset);
        assert_eq!(pair[1].previous_offset, pair[0].this_offset);
    }
    assert_eq!(entries[2].next_offset, 131);
    assert!(entries[2].is_free());
}

#[test]
fn test_find_by_name_and_type() {
    let backend = MemoryBackend::new();
    let mut region = create_region(&backend, 100);
    region.allocate(&name("a"), 4, EntryType::Int).unwrap();
    let b = region.allocate(&name("Bee"), 8, EntryType::Long).unwrap();

    let found = region
        .find_by_name_and_type(&name("bEE"), EntryType::Long)
        .unwrap();
    assert_eq!(found, Some(b));

    let wrong_type = region
        .find_by_name_and_type(&name("bee"), EntryType::Int)
        .unwrap();
    assert!(wrong_type.is_none());

    assert_eq!(region.find_by_name(&name("BEE")).unwrap(), Some(b));
    assert!(region.find_by_name(&name("zz")).unwrap().is_none());
}

#[test]
fn test_find_skips_free_entries() {
    let backend = MemoryBackend::new();
    let mut region = create_region(&backend, 100);
    let a = region.allocate(&name("a"), 4, EntryType::Int).unwrap();
    region.allocate(&name("b"), 4, EntryType::Int).unwrap();
    region.free(&a).unwrap();

    assert!(region.find_by_name(&name("a")).unwrap().is_none());
}

#[test]
fn test_read_next_rejects_backward_link() {
    let backend = MemoryBackend::new();
    let mut region = create_region(&backend, 100);

    // next offset field of the first entry
    backend.patch(FILE, 12 + 15, &5u32.to_le_bytes());

    let first = region.read_first().unwrap();
    assert!(matches!(
        region.read_next(&first),
        Err(PStorageError::Corrupted(_))
    ));

    let results: Vec<_> = region.entries().collect();
    assert_eq!(results.len(), 2);
    assert!(results[0].is_ok());
    assert!(results[1].is_err());
}

#[test]
fn test_read_entry_rejects_misplaced_entry() {
    let backend = MemoryBackend::new();
    let mut region = create_region(&backend, 100);
    let a = region.allocate(&name("a"), 4, EntryType::Int).unwrap();

    // this offset field of the remainder entry
    backend.patch(FILE, a.next_offset as usize + 7, &99u32.to_le_bytes());

    assert!(matches!(
        region.read_entry(a.next_offset),
        Err(PStorageError::Corrupted(_))
    ));
    assert!(matches!(
        region.read_entry(200),
        Err(PStorageError::Corrupted(_))
    ));
}

#[test]
fn test_read_first_rejects_back_link() {
    let backend = MemoryBackend::new();
    let mut region = create_region(&backend, 100);

    // previous offset field of the first entry
    backend.patch(FILE, 12 + 11, &40u32.to_le_bytes());

    assert!(matches!(
        region.read_first(),
        Err(PStorageError::Corrupted(_))
    ));
}
