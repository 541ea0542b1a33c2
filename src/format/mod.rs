//! Format Module
//!
//! On-medium layout of a PStorage file.
//!
//! ## File Format
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ Header (12 bytes)                                       │
//! │   Tag: u32 (4) | RegionSize: u32 (4) | FirstEntry (4)   │
//! ├─────────────────────────────────────────────────────────┤
//! │ Region (RegionSize bytes), tiled by entries:            │
//! │ ┌─────────────────────────────────────────────────────┐ │
//! │ │ IndexEntry (19 bytes)                               │ │
//! │ │   Name (6) | Type (1) | This (4) | Prev (4) | Next  │ │
//! │ ├─────────────────────────────────────────────────────┤ │
//! │ │ Payload (Next - This - 19 bytes)                    │ │
//! │ └─────────────────────────────────────────────────────┘ │
//! │   ... repeated until Next == FirstEntry + RegionSize    │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! Every multi-byte integer goes through [`put_u32`] / [`get_u32`], so the
//! header and the entries can never disagree on byte order.

mod entry;
mod header;

use bytes::{Buf, BufMut};

pub use entry::{EntryName, EntryType, IndexEntry};
pub use header::StorageHeader;

// =============================================================================
// Shared Constants
// =============================================================================

/// Magic value identifying a PStorage file. Changing it invalidates every
/// existing storage.
pub const COMPATIBILITY_TAG: u32 = 26202;

/// Encoded header length
pub const HEADER_LEN: usize = 12;

/// Header size as a file offset
pub const HEADER_SIZE: u32 = HEADER_LEN as u32;

/// Maximum number of bytes in an entry name
pub const NAME_CAPACITY: usize = 5;

/// Width of the on-medium name field (name plus terminating zero)
pub const NAME_FIELD_LEN: usize = NAME_CAPACITY + 1;

/// Encoded index entry length: name field + type tag + three offsets
pub const ENTRY_LEN: usize = NAME_FIELD_LEN + 1 + 3 * 4;

/// Index entry size as a file offset delta
pub const ENTRY_SIZE: u32 = ENTRY_LEN as u32;

/// Smallest payload a split remainder is allowed to keep.
/// Larger values leave more slack in allocated entries but fragment less.
pub const ENTRY_MIN_SIZE: u32 = 4;

/// Byte used to fill fresh payload space on `create`
pub const FILL_BYTE: u8 = b'.';

// =============================================================================
// Byte Order
// =============================================================================

/// Append a u32 in storage byte order (little-endian)
pub fn put_u32(dst: &mut impl BufMut, value: u32) {
    dst.put_u32_le(value);
}

/// Consume a u32 in storage byte order (little-endian)
pub fn get_u32(src: &mut impl Buf) -> u32 {
    src.get_u32_le()
}
