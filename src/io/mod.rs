//! Storage Medium Module
//!
//! The engine consumes its persistent medium through two small traits:
//! a [`Backend`] that names, opens and removes files, and the
//! [`StorageFile`] it hands out, which only knows how to seek and move
//! bytes around.
//!
//! ## Responsibilities
//! - Report how many bytes a read or write actually transferred
//! - Leave short-transfer policy to the caller (the region treats it as an error)
//! - Flush on request
//!
//! Two backends ship with the crate:
//! - [`DiskBackend`]: plain files in a directory
//! - [`MemoryBackend`]: shared in-memory files, reopenable after the engine
//!   is dropped, with an optional write budget to simulate a failing medium

mod disk;
mod memory;

pub use disk::{DiskBackend, DiskFile};
pub use memory::{MemoryBackend, MemoryFile};

use crate::error::Result;

/// How a backend should open a file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Open an existing file for reading and writing
    Existing,

    /// Create the file, discarding any previous content
    Truncate,
}

/// A seekable, byte-addressable file
pub trait StorageFile {
    /// Position the cursor at an absolute offset
    fn seek(&mut self, offset: u64) -> Result<()>;

    /// Read into `buf` from the cursor, returning the number of bytes read.
    /// Fewer than `buf.len()` bytes means the end of the file was reached.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Write `buf` at the cursor, returning the number of bytes written
    fn write(&mut self, buf: &[u8]) -> Result<usize>;

    /// Push buffered writes to the medium
    fn flush(&mut self) -> Result<()>;

    /// Current file length in bytes
    fn size(&self) -> Result<u64>;
}

/// Names and opens storage files
pub trait Backend {
    type File: StorageFile;

    fn open(&self, name: &str, mode: OpenMode) -> Result<Self::File>;

    fn exists(&self, name: &str) -> bool;

    fn remove(&self, name: &str) -> Result<()>;
}
