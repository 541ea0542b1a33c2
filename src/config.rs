//! Configuration for PStorage
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::error::{PStorageError, Result};
use crate::format::{ENTRY_SIZE, HEADER_SIZE};

/// Main configuration for a PStorage instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Directory holding the storage file (disk backend only)
    pub data_dir: PathBuf,

    /// Name of the storage file inside the backend
    pub file_name: String,

    /// Requested payload size used by `create` and `open_or_create`.
    /// The managed region adds one index entry header on top of this.
    pub region_size: u32,

    // -------------------------------------------------------------------------
    // Durability Configuration
    // -------------------------------------------------------------------------
    /// When to flush the storage file
    pub sync_strategy: SyncStrategy,
}

/// Flush strategy for the storage file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStrategy {
    /// Flush after every index entry and value write (safest, slowest)
    EveryWrite,

    /// Flush only on explicit `flush()` / `close()`
    Manual,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./pstorage_data"),
            file_name: "pstorage.dat".to_string(),
            region_size: 1024,
            sync_strategy: SyncStrategy::EveryWrite,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Check that the configuration describes a storage that can be created
    pub fn validate(&self) -> Result<()> {
        if self.file_name.is_empty() {
            return Err(PStorageError::Config("file name must not be empty".to_string()));
        }
        if self.file_name.contains(['/', '\\']) {
            return Err(PStorageError::Config(format!(
                "file name '{}' must not contain path separators",
                self.file_name
            )));
        }

        let overhead = HEADER_SIZE + ENTRY_SIZE;
        if self.region_size.checked_add(overhead).is_none() {
            return Err(PStorageError::Config(format!(
                "region size {} leaves no room for {} bytes of headers",
                self.region_size, overhead
            )));
        }

        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory (disk backend root)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the storage file name
    pub fn file_name(mut self, name: impl Into<String>) -> Self {
        self.config.file_name = name.into();
        self
    }

    /// Set the requested region size (in bytes)
    pub fn region_size(mut self, size: u32) -> Self {
        self.config.region_size = size;
        self
    }

    /// Set the flush strategy
    pub fn sync_strategy(mut self, strategy: SyncStrategy) -> Self {
        self.config.sync_strategy = strategy;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
