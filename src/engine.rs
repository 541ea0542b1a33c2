//! Engine Module
//!
//! The typed key-value facade over a storage region.
//!
//! ## Responsibilities
//! - Create, open and close the storage file
//! - Map names to scalar, byte array and string values
//! - Grow variable-length values by reallocation, shrink them in place
//! - Report sizes and dump the entry chain for diagnostics
//!
//! ## Naming
//! Names are at most `NAME_CAPACITY` bytes, compared case-insensitively, and
//! bound to a single type: mapping or reading a name under another type than
//! the one it was created with fails with `TypeMismatch`.

use crate::config::Config;
use crate::error::{PStorageError, Result};
use crate::format::{EntryName, EntryType, IndexEntry, StorageHeader, ENTRY_SIZE, HEADER_SIZE};
use crate::io::{Backend, DiskBackend, DiskFile, OpenMode, StorageFile};
use crate::region::Region;
use crate::value::{decode_variable, encode_variable, Scalar, Value};

/// The storage engine
///
/// ## Ownership
/// An engine exclusively owns its storage file. Every operation repositions
/// the file cursor, so all of them take `&mut self`; the engine is not
/// reentrant and is meant to be driven from one thread.
pub struct Engine<F: StorageFile = DiskFile> {
    /// Engine configuration
    config: Config,

    /// Header, entry chain and payloads
    region: Region<F>,
}

/// Size accounting for a storage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stats {
    /// Header plus region, in bytes
    pub storage_size: u32,

    /// Header plus every allocated entry (header and payload)
    pub allocated_size: u32,

    /// Sum of the payload capacities of free entries
    pub free_size: u32,

    /// Largest single free payload capacity
    pub largest_free: u32,

    /// Number of entries in the chain, free ones included
    pub entry_count: usize,

    pub free_entry_count: usize,
}

impl Engine<DiskFile> {
    /// Open an existing storage in `config.data_dir`
    pub fn open(config: Config) -> Result<Self> {
        let backend = DiskBackend::new(&config.data_dir)?;
        Self::open_with(&backend, config)
    }

    /// Create a fresh storage in `config.data_dir`, discarding any previous one
    pub fn create(config: Config) -> Result<Self> {
        let backend = DiskBackend::new(&config.data_dir)?;
        Self::create_with(&backend, config)
    }

    /// Open the storage in `config.data_dir`, creating it if absent or incompatible
    pub fn open_or_create(config: Config) -> Result<Self> {
        let backend = DiskBackend::new(&config.data_dir)?;
        Self::open_or_create_with(&backend, config)
    }
}

impl<F: StorageFile> Engine<F> {
    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Open an existing storage through `backend`
    ///
    /// Fails with `StorageAbsent` if there is no such file and with
    /// `IncompatibleFormat` if the file was not written by this engine.
    pub fn open_with<B: Backend<File = F>>(backend: &B, config: Config) -> Result<Self> {
        config.validate()?;

        if !backend.exists(&config.file_name) {
            return Err(PStorageError::StorageAbsent(config.file_name.clone()));
        }

        let file = backend.open(&config.file_name, OpenMode::Existing)?;
        let region = Region::load(file, config.sync_strategy)?;

        tracing::info!("Opened storage '{}'", config.file_name);
        Ok(Self { config, region })
    }

    /// Create a fresh storage of `config.region_size` payload bytes
    pub fn create_with<B: Backend<File = F>>(backend: &B, config: Config) -> Result<Self> {
        config.validate()?;

        if backend.exists(&config.file_name) {
            tracing::debug!("Discarding existing storage '{}'", config.file_name);
            backend.remove(&config.file_name)?;
        }

        let file = backend.open(&config.file_name, OpenMode::Truncate)?;
        let region = Region::create(file, config.region_size, config.sync_strategy)?;

        tracing::info!("Created storage '{}'", config.file_name);
        Ok(Self { config, region })
    }

    /// Open the storage, recreating it if it is absent or incompatible
    pub fn open_or_create_with<B: Backend<File = F>>(backend: &B, config: Config) -> Result<Self> {
        match Self::open_with(backend, config.clone()) {
            Ok(engine) => Ok(engine),
            Err(e) if e.is_incompatible() => {
                tracing::warn!("Recreating storage '{}': {}", config.file_name, e);
                Self::create_with(backend, config)
            }
            Err(e) => Err(e),
        }
    }

    /// Flush the storage file
    pub fn flush(&mut self) -> Result<()> {
        self.region.flush()
    }

    /// Flush and release the storage file
    pub fn close(mut self) -> Result<()> {
        self.flush()?;
        tracing::debug!("Closed storage '{}'", self.config.file_name);
        Ok(())
    }

    // =========================================================================
    // Map
    // =========================================================================

    /// Store a scalar under `name`, allocating the entry on first use
    pub fn map<T: Scalar>(&mut self, name: &str, value: T) -> Result<()> {
        let name = EntryName::parse(name)?;

        let entry = match self.lookup(&name, T::ENTRY_TYPE)? {
            Some(entry) => entry,
            None => self.region.allocate(&name, T::WIDTH as u32, T::ENTRY_TYPE)?,
        };

        let mut payload = Vec::with_capacity(T::WIDTH);
        value.encode(&mut payload);
        self.region.write_value(&entry, &payload)
    }

    /// Store a byte array under `name`
    pub fn map_bytes(&mut self, name: &str, bytes: &[u8]) -> Result<()> {
        self.map_variable(name, EntryType::Array, bytes)
    }

    /// Store a string under `name`
    pub fn map_str(&mut self, name: &str, s: &str) -> Result<()> {
        self.map_variable(name, EntryType::String, s.as_bytes())
    }

    /// Store any value under `name`
    pub fn map_value(&mut self, name: &str, value: &Value) -> Result<()> {
        match value {
            Value::Int(v) => self.map(name, *v),
            Value::UInt(v) => self.map(name, *v),
            Value::Long(v) => self.map(name, *v),
            Value::ULong(v) => self.map(name, *v),
            Value::Float(v) => self.map(name, *v),
            Value::Array(bytes) => self.map_bytes(name, bytes),
            Value::String(s) => self.map_str(name, s),
        }
    }

    // =========================================================================
    // Get
    // =========================================================================

    /// Read the scalar stored under `name`
    pub fn get<T: Scalar>(&mut self, name: &str) -> Result<T> {
        let entry = self.require(name, T::ENTRY_TYPE)?;

        let mut payload = vec![0u8; T::WIDTH];
        let read = self.region.read_value(&entry, &mut payload)?;
        if read < T::WIDTH {
            return Err(PStorageError::Corrupted(format!(
                "entry '{}' holds {} bytes, {} needs {}",
                entry.name,
                read,
                T::ENTRY_TYPE,
                T::WIDTH
            )));
        }

        Ok(T::decode(&payload))
    }

    /// Read the byte array stored under `name`
    pub fn get_bytes(&mut self, name: &str) -> Result<Vec<u8>> {
        let entry = self.require(name, EntryType::Array)?;
        let payload = self.read_payload(&entry)?;
        Ok(decode_variable(&payload)?.to_vec())
    }

    /// Read the string stored under `name`
    pub fn get_str(&mut self, name: &str) -> Result<String> {
        let entry = self.require(name, EntryType::String)?;
        let payload = self.read_payload(&entry)?;
        match Value::decode(EntryType::String, &payload)? {
            Value::String(s) => Ok(s),
            other => Err(PStorageError::Corrupted(format!(
                "string entry decoded as {}",
                other.entry_type()
            ))),
        }
    }

    /// Read whatever is stored under `name`
    pub fn get_value(&mut self, name: &str) -> Result<Value> {
        let parsed = EntryName::parse(name)?;
        let entry = self
            .region
            .find_by_name(&parsed)?
            .ok_or_else(|| PStorageError::NotFound(name.to_string()))?;

        let payload = self.read_payload(&entry)?;
        Value::decode(entry.entry_type, &payload)
    }

    /// Copy the content of the array or string stored under `name` into `buf`
    ///
    /// Transfers at most `buf.len()` bytes and returns how many were copied.
    pub fn read_bytes(&mut self, name: &str, buf: &mut [u8]) -> Result<usize> {
        let parsed = EntryName::parse(name)?;
        let entry = self
            .region
            .find_by_name(&parsed)?
            .ok_or_else(|| PStorageError::NotFound(name.to_string()))?;

        if !entry.entry_type.is_variable() {
            return Err(PStorageError::TypeMismatch {
                name: name.to_string(),
                stored: entry.entry_type,
                requested: EntryType::Array,
            });
        }

        let payload = self.read_payload(&entry)?;
        let content = decode_variable(&payload)?;
        let n = buf.len().min(content.len());
        buf[..n].copy_from_slice(&content[..n]);
        Ok(n)
    }

    /// Whether any entry is named `name`
    pub fn contains(&mut self, name: &str) -> Result<bool> {
        let name = EntryName::parse(name)?;
        Ok(self.region.find_by_name(&name)?.is_some())
    }

    // =========================================================================
    // Remove
    // =========================================================================

    /// Free every entry named `name`, whatever its type
    ///
    /// Returns `false` if there was nothing to remove.
    pub fn remove(&mut self, name: &str) -> Result<bool> {
        let name = EntryName::parse(name)?;
        let mut removed = false;

        while let Some(entry) = self.region.find_by_name(&name)? {
            self.region.free(&entry)?;
            removed = true;
        }

        if removed {
            tracing::debug!("Removed '{}'", name);
        }
        Ok(removed)
    }

    // =========================================================================
    // Diagnostics
    // =========================================================================

    /// Header plus every allocated entry, headers and payloads included
    pub fn allocated_size(&mut self) -> Result<u32> {
        Ok(self.stats()?.allocated_size)
    }

    /// Total size of the storage, header included
    pub fn storage_size(&self) -> u32 {
        self.region.header().storage_size()
    }

    /// Walk the chain and account for every entry
    pub fn stats(&mut self) -> Result<Stats> {
        let mut stats = Stats {
            storage_size: self.storage_size(),
            allocated_size: HEADER_SIZE,
            free_size: 0,
            largest_free: 0,
            entry_count: 0,
            free_entry_count: 0,
        };

        for entry in self.region.entries() {
            let entry = entry?;
            stats.entry_count += 1;
            if entry.is_free() {
                stats.free_entry_count += 1;
                stats.free_size += entry.capacity();
                stats.largest_free = stats.largest_free.max(entry.capacity());
            } else {
                stats.allocated_size += entry.span();
            }
        }

        Ok(stats)
    }

    /// Every entry of the chain, first to last
    pub fn entries(&mut self) -> Result<Vec<IndexEntry>> {
        self.region.entries().collect()
    }

    /// Human-readable listing of every entry with a value preview
    pub fn dump(&mut self) -> Result<String> {
        let stats = self.stats()?;
        let entries = self.entries()?;

        let mut out = format!(
            "PStorage '{}': {} bytes, {} allocated, {} free in {} of {} entries\n",
            self.config.file_name,
            stats.storage_size,
            stats.allocated_size,
            stats.free_size,
            stats.free_entry_count,
            stats.entry_count
        );
        out.push_str(&format!(
            "{:>3}  {:<5}  {:<6}  {:>6}  {:>6}  {:>6}  {:>6}  {}\n",
            "#", "NAME", "TYPE", "SIZE", "THIS", "PREV", "NEXT", "VALUE"
        ));

        for (i, entry) in entries.iter().enumerate() {
            let preview = if entry.is_free() {
                "-".to_string()
            } else {
                match self
                    .read_payload(entry)
                    .and_then(|payload| Value::decode(entry.entry_type, &payload))
                {
                    Ok(value) => value.preview(),
                    Err(e) => format!("<{}>", e),
                }
            };

            out.push_str(&format!(
                "{:>3}  {:<5}  {:<6}  {:>6}  {:>6}  {:>6}  {:>6}  {}\n",
                i,
                entry.name.to_string(),
                entry.entry_type.as_str(),
                entry.capacity(),
                entry.this_offset,
                entry.previous_offset,
                entry.next_offset,
                preview
            ));
        }

        tracing::debug!("Dumped {} entries", entries.len());
        Ok(out)
    }

    /// Check the structural invariants of the entry chain
    ///
    /// Returns the number of entries on success.
    pub fn verify(&mut self) -> Result<usize> {
        let first_entry = self.region.header().first_entry;
        let mut previous: Option<IndexEntry> = None;
        let mut count = 0;

        for entry in self.region.entries() {
            let entry = entry?;

            let expected_previous = previous.map_or(0, |p| p.this_offset);
            let expected_this = previous.map_or(first_entry, |p| p.next_offset);
            if entry.this_offset != expected_this || entry.previous_offset != expected_previous {
                return Err(PStorageError::Corrupted(format!(
                    "entry at {} links back to {}, expected {}",
                    entry.this_offset, entry.previous_offset, expected_previous
                )));
            }

            if entry.is_free() != entry.name.is_empty() {
                return Err(PStorageError::Corrupted(format!(
                    "{} entry at {} has name '{}'",
                    entry.entry_type, entry.this_offset, entry.name
                )));
            }

            previous = Some(entry);
            count += 1;
        }

        Ok(count)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn header(&self) -> &StorageHeader {
        self.region.header()
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Entry named `name` with type `entry_type`, if any
    ///
    /// A name bound to another type is reported as `TypeMismatch`.
    fn lookup(&mut self, name: &EntryName, entry_type: EntryType) -> Result<Option<IndexEntry>> {
        if let Some(entry) = self.region.find_by_name_and_type(name, entry_type)? {
            return Ok(Some(entry));
        }

        match self.region.find_by_name(name)? {
            Some(other) => Err(PStorageError::TypeMismatch {
                name: name.to_string(),
                stored: other.entry_type,
                requested: entry_type,
            }),
            None => Ok(None),
        }
    }

    /// Like `lookup`, but a missing entry is `NotFound`
    fn require(&mut self, name: &str, entry_type: EntryType) -> Result<IndexEntry> {
        let parsed = EntryName::parse(name)?;
        self.lookup(&parsed, entry_type)?
            .ok_or_else(|| PStorageError::NotFound(name.to_string()))
    }

    /// Store a length-prefixed value, reallocating if it outgrew its entry
    fn map_variable(&mut self, name: &str, entry_type: EntryType, content: &[u8]) -> Result<()> {
        let name = EntryName::parse(name)?;
        let payload = encode_variable(content)?;
        let needed = payload.len() as u32;

        let entry = match self.lookup(&name, entry_type)? {
            Some(entry) if entry.capacity() >= needed => entry,
            Some(entry) => {
                if !self.can_grow(&entry, needed)? {
                    return Err(PStorageError::OutOfSpace { requested: needed });
                }
                tracing::debug!(
                    name = %name,
                    capacity = entry.capacity(),
                    needed,
                    "Reallocating grown value"
                );
                self.region.free(&entry)?;
                self.region.allocate(&name, needed, entry_type)?
            }
            None => self.region.allocate(&name, needed, entry_type)?,
        };

        self.region.write_value(&entry, &payload)
    }

    /// Whether `entry` can be reallocated with `needed` payload bytes
    ///
    /// Either some free entry already fits, or `entry` merged with its free
    /// neighbours does. A failed grow leaves `entry` untouched.
    fn can_grow(&mut self, entry: &IndexEntry, needed: u32) -> Result<bool> {
        if self.region.search_free(needed)?.is_some() {
            return Ok(true);
        }

        let mut span = u64::from(entry.span());
        if !entry.is_first() {
            let previous = self.region.read_entry(entry.previous_offset)?;
            if previous.is_free() {
                span += u64::from(previous.span());
            }
        }
        if let Some(next) = self.region.read_next(entry)? {
            if next.is_free() {
                span += u64::from(next.span());
            }
        }

        Ok(span >= u64::from(needed) + u64::from(ENTRY_SIZE))
    }

    /// The full payload of `entry`, slack included
    fn read_payload(&mut self, entry: &IndexEntry) -> Result<Vec<u8>> {
        let mut payload = vec![0u8; entry.capacity() as usize];
        self.region.read_value(entry, &mut payload)?;
        Ok(payload)
    }
}

