//! Index entry codec
//!
//! One entry describes one span of the region: its own header, followed by
//! `capacity()` payload bytes.

use std::fmt;

use bytes::{Buf, BufMut};

use crate::error::{PStorageError, Result};

use super::{get_u32, put_u32, ENTRY_LEN, ENTRY_SIZE, NAME_CAPACITY, NAME_FIELD_LEN};

// =============================================================================
// Entry Type
// =============================================================================

/// Type tag stored with every entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum EntryType {
    Free = 0,
    Int = 1,
    UInt = 2,
    Long = 3,
    ULong = 4,
    Float = 5,
    Array = 6,
    String = 7,
}

impl EntryType {
    /// Parse an on-medium tag byte
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(EntryType::Free),
            1 => Some(EntryType::Int),
            2 => Some(EntryType::UInt),
            3 => Some(EntryType::Long),
            4 => Some(EntryType::ULong),
            5 => Some(EntryType::Float),
            6 => Some(EntryType::Array),
            7 => Some(EntryType::String),
            _ => None,
        }
    }

    pub fn tag(self) -> u8 {
        self as u8
    }

    /// Array and String payloads carry a length prefix
    pub fn is_variable(self) -> bool {
        matches!(self, EntryType::Array | EntryType::String)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EntryType::Free => "FREE",
            EntryType::Int => "INT",
            EntryType::UInt => "UINT",
            EntryType::Long => "LONG",
            EntryType::ULong => "ULONG",
            EntryType::Float => "FLOAT",
            EntryType::Array => "ARRAY",
            EntryType::String => "STRING",
        }
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Entry Name
// =============================================================================

/// Fixed-capacity entry name, compared case-insensitively (ASCII)
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryName {
    bytes: [u8; NAME_CAPACITY],
    len: u8,
}

impl EntryName {
    /// The name carried by free entries
    pub const EMPTY: EntryName = EntryName {
        bytes: [0; NAME_CAPACITY],
        len: 0,
    };

    /// Validate a caller-supplied name
    pub fn parse(name: &str) -> Result<Self> {
        let raw = name.as_bytes();
        if raw.is_empty() || raw.contains(&0) {
            return Err(PStorageError::InvalidName(name.to_string()));
        }
        if raw.len() > NAME_CAPACITY {
            return Err(PStorageError::NameTooLong {
                name: name.to_string(),
                max: NAME_CAPACITY,
            });
        }

        let mut bytes = [0u8; NAME_CAPACITY];
        bytes[..raw.len()].copy_from_slice(raw);
        Ok(Self {
            bytes,
            len: raw.len() as u8,
        })
    }

    /// Read a name field: bytes up to the first zero, at most NAME_CAPACITY
    fn from_field(field: &[u8]) -> Self {
        let len = field
            .iter()
            .take(NAME_CAPACITY)
            .position(|&b| b == 0)
            .unwrap_or(NAME_CAPACITY.min(field.len()));

        let mut bytes = [0u8; NAME_CAPACITY];
        bytes[..len].copy_from_slice(&field[..len]);
        Self {
            bytes,
            len: len as u8,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Case-insensitive comparison used by every lookup
    pub fn matches(&self, other: &EntryName) -> bool {
        self.as_bytes().eq_ignore_ascii_case(other.as_bytes())
    }
}

impl fmt::Display for EntryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(self.as_bytes()))
    }
}

impl fmt::Debug for EntryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntryName({:?})", String::from_utf8_lossy(self.as_bytes()))
    }
}

// =============================================================================
// Index Entry
// =============================================================================

/// Catalog record for one allocated or free span of the region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexEntry {
    /// Empty for free entries
    pub name: EntryName,

    pub entry_type: EntryType,

    /// File offset of this entry's header
    pub this_offset: u32,

    /// File offset of the previous entry's header, 0 for the first entry
    pub previous_offset: u32,

    /// File offset of the next entry's header, region end for the last entry
    pub next_offset: u32,
}

impl IndexEntry {
    /// A nameless free entry
    pub fn free(this_offset: u32, previous_offset: u32, next_offset: u32) -> Self {
        Self {
            name: EntryName::EMPTY,
            entry_type: EntryType::Free,
            this_offset,
            previous_offset,
            next_offset,
        }
    }

    pub fn is_free(&self) -> bool {
        self.entry_type == EntryType::Free
    }

    pub fn is_first(&self) -> bool {
        self.previous_offset == 0
    }

    /// File offset of the payload, right behind the entry header
    pub fn value_offset(&self) -> u32 {
        self.this_offset.saturating_add(ENTRY_SIZE)
    }

    /// Payload capacity ("derived size")
    pub fn capacity(&self) -> u32 {
        self.next_offset.saturating_sub(self.value_offset())
    }

    /// Header plus payload
    pub fn span(&self) -> u32 {
        self.next_offset.saturating_sub(self.this_offset)
    }

    /// Encode to the on-medium representation
    pub fn encode(&self) -> [u8; ENTRY_LEN] {
        let mut buf = [0u8; ENTRY_LEN];
        let mut dst = &mut buf[..];

        let mut field = [0u8; NAME_FIELD_LEN];
        field[..self.name.as_bytes().len()].copy_from_slice(self.name.as_bytes());
        dst.put_slice(&field);
        dst.put_u8(self.entry_type.tag());
        put_u32(&mut dst, self.this_offset);
        put_u32(&mut dst, self.previous_offset);
        put_u32(&mut dst, self.next_offset);
        buf
    }

    /// Decode from the on-medium representation.
    ///
    /// Fails only on an unknown type tag.
    pub fn decode(buf: &[u8; ENTRY_LEN]) -> Result<Self> {
        let mut src = &buf[..];

        let name = EntryName::from_field(&src[..NAME_FIELD_LEN]);
        src.advance(NAME_FIELD_LEN);

        let tag = src.get_u8();
        let entry_type = EntryType::from_tag(tag)
            .ok_or_else(|| PStorageError::Corrupted(format!("unknown entry type tag {}", tag)))?;

        Ok(Self {
            name,
            entry_type,
            this_offset: get_u32(&mut src),
            previous_offset: get_u32(&mut src),
            next_offset: get_u32(&mut src),
        })
    }
}
