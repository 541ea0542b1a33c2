//! Region Module
//!
//! The managed byte range of a storage file and everything that moves bytes
//! in and out of it.
//!
//! ## Responsibilities
//! - Lay out a fresh region (header + one free entry) or load an existing one
//! - Read and write index entries and value payloads at their offsets
//! - Walk the entry chain (`walker`)
//! - Allocate and free entries (`allocator`)
//!
//! Every transfer repositions the file cursor, so a region is driven through
//! `&mut self` only and must never be shared.

mod allocator;
mod walker;

pub use walker::EntryIter;

use crate::config::SyncStrategy;
use crate::error::{PStorageError, Result};
use crate::format::{
    IndexEntry, StorageHeader, ENTRY_LEN, ENTRY_MIN_SIZE, ENTRY_SIZE, FILL_BYTE, HEADER_LEN,
    HEADER_SIZE,
};
use crate::io::StorageFile;

/// Chunk size used when filling fresh payload space
const FILL_CHUNK: usize = 256;

/// A loaded region backed by a storage file
pub struct Region<F: StorageFile> {
    /// Exclusively owned storage file
    file: F,

    /// Header read on load or written on create (never changes afterwards)
    header: StorageHeader,

    /// Whether every write is followed by a flush
    sync_strategy: SyncStrategy,
}

impl<F: StorageFile> Region<F> {
    /// Lay out a fresh region on an empty file
    ///
    /// The region holds `requested_size` payload bytes plus one entry header,
    /// and is never smaller than a single entry with a minimal payload.
    /// Writes the header, a single free entry spanning the region, then fills
    /// the payload so the medium has deterministic content.
    pub fn create(file: F, requested_size: u32, sync_strategy: SyncStrategy) -> Result<Self> {
        let region_size = requested_size
            .checked_add(ENTRY_SIZE)
            .map(|size| size.max(ENTRY_SIZE + ENTRY_MIN_SIZE))
            .filter(|size| size.checked_add(HEADER_SIZE).is_some())
            .ok_or_else(|| {
                PStorageError::Config(format!("region size {} is too large", requested_size))
            })?;

        let header = StorageHeader::new(region_size);
        let mut region = Self {
            file,
            header,
            sync_strategy,
        };

        region.write_at(0, &header.encode())?;

        let entry = IndexEntry::free(header.first_entry, 0, header.region_end());
        region.write_entry(&entry)?;
        region.fill(entry.value_offset(), entry.capacity())?;
        region.file.flush()?;

        tracing::info!(
            region_size,
            storage_size = header.storage_size(),
            "Created storage region"
        );

        Ok(region)
    }

    /// Load an existing region
    ///
    /// Fails with `IncompatibleFormat` if the header is missing or carries a
    /// foreign tag, and with `Corrupted` if the header is ours but its
    /// geometry does not match the file.
    pub fn load(mut file: F, sync_strategy: SyncStrategy) -> Result<Self> {
        let mut buf = [0u8; HEADER_LEN];
        file.seek(0)?;
        let read = file.read(&mut buf)?;
        let header = StorageHeader::decode(&buf);

        if read != HEADER_LEN || !header.is_compatible() {
            tracing::warn!(
                found = header.compatibility_tag,
                bytes = read,
                "Storage header not compatible"
            );
            return Err(PStorageError::IncompatibleFormat {
                found: header.compatibility_tag,
            });
        }

        if header.first_entry != HEADER_SIZE {
            return Err(PStorageError::Corrupted(format!(
                "first entry at {}, expected {}",
                header.first_entry, HEADER_SIZE
            )));
        }

        if header.region_size < ENTRY_SIZE + ENTRY_MIN_SIZE
            || header.first_entry.checked_add(header.region_size).is_none()
        {
            return Err(PStorageError::Corrupted(format!(
                "invalid region size {}",
                header.region_size
            )));
        }

        let file_size = file.size()?;
        if file_size < u64::from(header.storage_size()) {
            return Err(PStorageError::Corrupted(format!(
                "file holds {} bytes, header describes {}",
                file_size,
                header.storage_size()
            )));
        }

        tracing::info!(
            region_size = header.region_size,
            "Loaded storage region"
        );

        Ok(Self {
            file,
            header,
            sync_strategy,
        })
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn header(&self) -> &StorageHeader {
        &self.header
    }

    /// Offset one past the region; the last entry's `next_offset`
    pub fn region_end(&self) -> u32 {
        self.header.region_end()
    }

    /// Flush the storage file
    pub fn flush(&mut self) -> Result<()> {
        self.file.flush()
    }

    // =========================================================================
    // Entry Transfer
    // =========================================================================

    /// Read and decode the entry whose header starts at `offset`
    pub fn read_entry(&mut self, offset: u32) -> Result<IndexEntry> {
        let in_region = offset >= self.header.first_entry
            && offset
                .checked_add(ENTRY_SIZE)
                .map_or(false, |end| end <= self.region_end());
        if !in_region {
            return Err(PStorageError::Corrupted(format!(
                "entry offset {} outside region",
                offset
            )));
        }

        let mut buf = [0u8; ENTRY_LEN];
        self.read_at(offset, &mut buf)?;
        let entry = IndexEntry::decode(&buf)?;

        if entry.this_offset != offset {
            return Err(PStorageError::Corrupted(format!(
                "entry at {} claims offset {}",
                offset, entry.this_offset
            )));
        }

        Ok(entry)
    }

    /// Encode `entry` in place at its own offset
    pub fn write_entry(&mut self, entry: &IndexEntry) -> Result<()> {
        tracing::trace!(
            offset = entry.this_offset,
            name = %entry.name,
            entry_type = %entry.entry_type,
            "Writing index entry"
        );
        self.write_at(entry.this_offset, &entry.encode())
    }

    // =========================================================================
    // Value Transfer
    // =========================================================================

    /// Read the payload of `entry` into `buf`
    ///
    /// Transfers `min(buf.len(), capacity)` bytes and returns that count.
    pub fn read_value(&mut self, entry: &IndexEntry, buf: &mut [u8]) -> Result<usize> {
        let n = buf.len().min(entry.capacity() as usize);
        self.read_at(entry.value_offset(), &mut buf[..n])?;
        Ok(n)
    }

    /// Write `data` at the start of the payload of `entry`
    pub fn write_value(&mut self, entry: &IndexEntry, data: &[u8]) -> Result<()> {
        if data.len() > entry.capacity() as usize {
            return Err(PStorageError::ValueTooLarge {
                len: data.len(),
                capacity: entry.capacity(),
            });
        }
        self.write_at(entry.value_offset(), data)
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn read_at(&mut self, offset: u32, buf: &mut [u8]) -> Result<()> {
        self.file.seek(u64::from(offset))?;
        let read = self.file.read(buf)?;
        if read != buf.len() {
            return Err(PStorageError::ShortRead {
                offset: u64::from(offset),
                expected: buf.len(),
                actual: read,
            });
        }
        Ok(())
    }

    fn write_at(&mut self, offset: u32, bytes: &[u8]) -> Result<()> {
        self.file.seek(u64::from(offset))?;
        let written = self.file.write(bytes)?;
        if written != bytes.len() {
            return Err(PStorageError::ShortWrite {
                offset: u64::from(offset),
                expected: bytes.len(),
                actual: written,
            });
        }
        if self.sync_strategy == SyncStrategy::EveryWrite {
            self.file.flush()?;
        }
        Ok(())
    }

    /// Overwrite `len` bytes at `offset` with the fill byte
    fn fill(&mut self, offset: u32, len: u32) -> Result<()> {
        let chunk = [FILL_BYTE; FILL_CHUNK];
        let mut position = offset;
        let end = offset + len;

        while position < end {
            let n = ((end - position) as usize).min(FILL_CHUNK);
            self.write_at(position, &chunk[..n])?;
            position += n as u32;
        }
        Ok(())
    }
}
