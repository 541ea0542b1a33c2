//! Error types for PStorage
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

use crate::format::EntryType;

/// Result type alias using PStorageError
pub type Result<T> = std::result::Result<T, PStorageError>;

/// Unified error type for PStorage operations
#[derive(Debug, Error)]
pub enum PStorageError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Short read at offset {offset}: expected {expected} bytes, got {actual}")]
    ShortRead {
        offset: u64,
        expected: usize,
        actual: usize,
    },

    #[error("Short write at offset {offset}: expected {expected} bytes, wrote {actual}")]
    ShortWrite {
        offset: u64,
        expected: usize,
        actual: usize,
    },

    // -------------------------------------------------------------------------
    // Format Errors
    // -------------------------------------------------------------------------
    #[error("Incompatible storage format: compatibility tag {found}")]
    IncompatibleFormat { found: u32 },

    #[error("Storage '{0}' does not exist")]
    StorageAbsent(String),

    #[error("Storage corrupted: {0}")]
    Corrupted(String),

    // -------------------------------------------------------------------------
    // Lookup Errors
    // -------------------------------------------------------------------------
    #[error("Entry '{0}' not found")]
    NotFound(String),

    #[error("Entry '{name}' is stored as {stored}, not {requested}")]
    TypeMismatch {
        name: String,
        stored: EntryType,
        requested: EntryType,
    },

    // -------------------------------------------------------------------------
    // Capacity Errors
    // -------------------------------------------------------------------------
    #[error("Entry name '{name}' exceeds {max} bytes")]
    NameTooLong { name: String, max: usize },

    #[error("Invalid entry name: {0:?}")]
    InvalidName(String),

    #[error("No free entry can hold {requested} bytes")]
    OutOfSpace { requested: u32 },

    #[error("Value of {len} bytes exceeds capacity of {capacity} bytes")]
    ValueTooLarge { len: usize, capacity: u32 },

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl PStorageError {
    /// The storage is missing or was not written by this format.
    ///
    /// Callers typically react by creating a fresh storage.
    pub fn is_incompatible(&self) -> bool {
        matches!(
            self,
            PStorageError::IncompatibleFormat { .. } | PStorageError::StorageAbsent(_)
        )
    }

    /// A transfer against the storage medium failed or moved fewer bytes than requested.
    pub fn is_io_failure(&self) -> bool {
        matches!(
            self,
            PStorageError::Io(_) | PStorageError::ShortRead { .. } | PStorageError::ShortWrite { .. }
        )
    }

    /// A name is unusable, a value does not fit, or the region has no room left.
    pub fn is_capacity_exceeded(&self) -> bool {
        matches!(
            self,
            PStorageError::NameTooLong { .. }
                | PStorageError::InvalidName(_)
                | PStorageError::OutOfSpace { .. }
                | PStorageError::ValueTooLarge { .. }
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, PStorageError::NotFound(_))
    }
}
