//! Allocator
//!
//! Free-list management done in place on the entry chain.
//!
//! ## Allocation
//! ```text
//! before:  │ Free ─────────────────────────────────────────── │
//! after:   │ Named (size) │ Free (remainder) ──────────────── │
//! ```
//! A free entry is only split when the remainder can still hold an entry
//! header plus `ENTRY_MIN_SIZE` payload bytes; otherwise the whole entry is
//! handed out and the surplus stays as slack.
//!
//! ## Free
//! ```text
//! before:  │ Free │ Named │ Free │
//! after:   │ Free ──────────────── │
//! ```
//! Free neighbours on either side are always merged.

use crate::error::{PStorageError, Result};
use crate::format::{EntryName, EntryType, IndexEntry, ENTRY_MIN_SIZE, ENTRY_SIZE};
use crate::io::StorageFile;

use super::Region;

impl<F: StorageFile> Region<F> {
    /// Find a free entry with at least `min_size` bytes of capacity
    ///
    /// The first fitting entry becomes the candidate; later entries replace it
    /// only when strictly smaller, so ties go to the entry found first.
    pub fn search_free(&mut self, min_size: u32) -> Result<Option<IndexEntry>> {
        let mut best: Option<IndexEntry> = None;

        for entry in self.entries() {
            let entry = entry?;
            if !entry.is_free() || entry.capacity() < min_size {
                continue;
            }
            match best {
                Some(candidate) if candidate.capacity() <= entry.capacity() => {}
                _ => best = Some(entry),
            }
        }

        Ok(best)
    }

    /// Allocate an entry named `name` with room for `size` payload bytes
    pub fn allocate(
        &mut self,
        name: &EntryName,
        size: u32,
        entry_type: EntryType,
    ) -> Result<IndexEntry> {
        if name.is_empty() || entry_type == EntryType::Free {
            return Err(PStorageError::InvalidName(name.to_string()));
        }

        let mut entry = self
            .search_free(size)?
            .ok_or(PStorageError::OutOfSpace { requested: size })?;

        let split_threshold = size.saturating_add(ENTRY_SIZE + ENTRY_MIN_SIZE);
        if entry.capacity() >= split_threshold {
            let split_at = entry.value_offset() + size;
            let remainder = IndexEntry::free(split_at, entry.this_offset, entry.next_offset);

            tracing::debug!(
                at = entry.this_offset,
                split_at,
                remainder = remainder.capacity(),
                "Splitting free entry"
            );

            self.write_entry(&remainder)?;
            self.relink_successor(&remainder)?;
            entry.next_offset = split_at;
        }

        entry.name = *name;
        entry.entry_type = entry_type;
        self.write_entry(&entry)?;

        tracing::debug!(
            name = %name,
            entry_type = %entry_type,
            offset = entry.this_offset,
            capacity = entry.capacity(),
            "Allocated entry"
        );

        Ok(entry)
    }

    /// Release `entry`, merging it with free neighbours
    ///
    /// Returns the resulting free entry, which may start before `entry`.
    pub fn free(&mut self, entry: &IndexEntry) -> Result<IndexEntry> {
        let mut merged = IndexEntry::free(
            entry.this_offset,
            entry.previous_offset,
            entry.next_offset,
        );

        if !merged.is_first() {
            let previous = self.read_entry(merged.previous_offset)?;
            if previous.next_offset != merged.this_offset {
                return Err(PStorageError::Corrupted(format!(
                    "entry at {} does not link forward to {}",
                    previous.this_offset, merged.this_offset
                )));
            }
            if previous.is_free() {
                tracing::debug!(
                    left = previous.this_offset,
                    right = merged.this_offset,
                    "Coalescing with previous free entry"
                );
                merged.this_offset = previous.this_offset;
                merged.previous_offset = previous.previous_offset;
            }
        }

        if let Some(next) = self.read_next(entry)? {
            if next.is_free() {
                tracing::debug!(
                    left = merged.this_offset,
                    right = next.this_offset,
                    "Coalescing with next free entry"
                );
                merged.next_offset = next.next_offset;
            }
        }

        self.write_entry(&merged)?;
        self.relink_successor(&merged)?;

        tracing::debug!(
            name = %entry.name,
            offset = merged.this_offset,
            capacity = merged.capacity(),
            "Freed entry"
        );

        Ok(merged)
    }

    /// Point the successor of `entry` back at `entry`
    fn relink_successor(&mut self, entry: &IndexEntry) -> Result<()> {
        if let Some(mut successor) = self.read_next(entry)? {
            if successor.previous_offset != entry.this_offset {
                successor.previous_offset = entry.this_offset;
                self.write_entry(&successor)?;
            }
        }
        Ok(())
    }
}
