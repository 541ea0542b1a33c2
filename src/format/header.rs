//! Storage header codec

use super::{get_u32, put_u32, COMPATIBILITY_TAG, HEADER_LEN, HEADER_SIZE};

/// Fixed record at offset 0 of every storage file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageHeader {
    /// Must equal [`COMPATIBILITY_TAG`] for the file to be ours
    pub compatibility_tag: u32,

    /// Number of bytes managed after the header
    pub region_size: u32,

    /// File offset of the first index entry
    pub first_entry: u32,
}

impl StorageHeader {
    /// Header for a fresh region of `region_size` bytes
    pub fn new(region_size: u32) -> Self {
        Self {
            compatibility_tag: COMPATIBILITY_TAG,
            region_size,
            first_entry: HEADER_SIZE,
        }
    }

    pub fn is_compatible(&self) -> bool {
        self.compatibility_tag == COMPATIBILITY_TAG
    }

    /// Offset one past the last byte of the region.
    /// The last entry's `next_offset` points here.
    pub fn region_end(&self) -> u32 {
        self.first_entry.saturating_add(self.region_size)
    }

    /// Total number of bytes the storage occupies, header included
    pub fn storage_size(&self) -> u32 {
        HEADER_SIZE.saturating_add(self.region_size)
    }

    /// Encode to the on-medium representation
    pub fn encode(&self) -> [u8; HEADER_LEN] {
        let mut buf = [0u8; HEADER_LEN];
        let mut dst = &mut buf[..];
        put_u32(&mut dst, self.compatibility_tag);
        put_u32(&mut dst, self.region_size);
        put_u32(&mut dst, self.first_entry);
        buf
    }

    /// Decode from the on-medium representation.
    ///
    /// Does not check the tag; see [`StorageHeader::is_compatible`].
    pub fn decode(buf: &[u8; HEADER_LEN]) -> Self {
        let mut src = &buf[..];
        Self {
            compatibility_tag: get_u32(&mut src),
            region_size: get_u32(&mut src),
            first_entry: get_u32(&mut src),
        }
    }
}
