//! Index List Walker
//!
//! Follows the `next_offset` links from the first entry to the region end.

use crate::error::{PStorageError, Result};
use crate::format::{EntryName, EntryType, IndexEntry, ENTRY_SIZE};
use crate::io::StorageFile;

use super::Region;

impl<F: StorageFile> Region<F> {
    /// Read the entry right behind the header
    pub fn read_first(&mut self) -> Result<IndexEntry> {
        let entry = self.read_entry(self.header.first_entry)?;
        if !entry.is_first() {
            return Err(PStorageError::Corrupted(format!(
                "first entry links back to {}",
                entry.previous_offset
            )));
        }
        Ok(entry)
    }

    /// Read the entry following `entry`, or `None` if `entry` is the last one
    ///
    /// A link that does not advance past `entry`'s header, or that points
    /// beyond the region, is reported as corruption so a walk always ends.
    pub fn read_next(&mut self, entry: &IndexEntry) -> Result<Option<IndexEntry>> {
        if self.is_last(entry) {
            return Ok(None);
        }

        let advances = entry
            .this_offset
            .checked_add(ENTRY_SIZE)
            .map_or(false, |min| entry.next_offset >= min);
        if !advances || entry.next_offset > self.region_end() {
            return Err(PStorageError::Corrupted(format!(
                "entry at {} links to {}",
                entry.this_offset, entry.next_offset
            )));
        }

        self.read_entry(entry.next_offset).map(Some)
    }

    pub fn is_last(&self, entry: &IndexEntry) -> bool {
        entry.next_offset == self.region_end()
    }

    /// Iterate over all entries, first to last
    pub fn entries(&mut self) -> EntryIter<'_, F> {
        EntryIter {
            region: self,
            current: None,
            done: false,
        }
    }

    /// First entry matching `name` (case-insensitive) and `entry_type`
    pub fn find_by_name_and_type(
        &mut self,
        name: &EntryName,
        entry_type: EntryType,
    ) -> Result<Option<IndexEntry>> {
        for entry in self.entries() {
            let entry = entry?;
            if entry.entry_type == entry_type && entry.name.matches(name) {
                return Ok(Some(entry));
            }
        }
        Ok(None)
    }

    /// First allocated entry matching `name` (case-insensitive), any type
    pub fn find_by_name(&mut self, name: &EntryName) -> Result<Option<IndexEntry>> {
        for entry in self.entries() {
            let entry = entry?;
            if !entry.is_free() && entry.name.matches(name) {
                return Ok(Some(entry));
            }
        }
        Ok(None)
    }
}

/// Iterator over the entry chain
///
/// Stops after the first error.
pub struct EntryIter<'a, F: StorageFile> {
    region: &'a mut Region<F>,
    current: Option<IndexEntry>,
    done: bool,
}

impl<F: StorageFile> Iterator for EntryIter<'_, F> {
    type Item = Result<IndexEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let step = match self.current {
            None => self.region.read_first().map(Some),
            Some(previous) => self.region.read_next(&previous),
        };

        match step {
            Ok(Some(entry)) => {
                self.current = Some(entry);
                Some(Ok(entry))
            }
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
