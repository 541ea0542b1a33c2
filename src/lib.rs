//! # PStorage
//!
//! A persistent key-value store for flash-backed devices with:
//! - Named, typed records (integers, floats, byte arrays, strings)
//! - A single fixed-size region inside one storage file
//! - An in-place free-list allocator with splitting and coalescing
//! - A pluggable storage medium (disk or memory)
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Engine                                  │
//! │          map / get / remove, sizes, dump, verify             │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                      Region                                  │
//! │        walker (chain)  ·  allocator (split / coalesce)       │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │   Format    │          │ StorageFile │
//!   │ header/entry│          │ disk/memory │
//!   └─────────────┘          └─────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use pstorage::{Config, Engine};
//!
//! let config = Config::builder().data_dir("./data").region_size(512).build();
//! let mut engine = Engine::open_or_create(config)?;
//!
//! engine.map("boot", 3u32)?;
//! engine.map_str("ssid", "home")?;
//! assert_eq!(engine.get::<u32>("boot")?, 3);
//! # Ok::<(), pstorage::PStorageError>(())
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod format;
pub mod io;
pub mod region;
pub mod value;
pub mod engine;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{PStorageError, Result};
pub use config::{Config, SyncStrategy};
pub use engine::{Engine, Stats};
pub use format::{EntryType, IndexEntry};
pub use value::{Scalar, Value};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of PStorage
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
