//! In-memory backend
//!
//! Files live in a map shared by every clone of the backend, so a file
//! outlives the engine that wrote it. Tests use this to reopen a storage
//! (a simulated power cycle), to inspect or patch raw bytes, and to make
//! writes come up short.

use std::collections::HashMap;
use std::io::{Error as IoError, ErrorKind};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::Result;

use super::{Backend, OpenMode, StorageFile};

#[derive(Debug, Default)]
struct MemoryState {
    files: HashMap<String, Vec<u8>>,

    /// Bytes that may still be written before writes come up short
    write_budget: Option<usize>,
}

/// Shared in-memory backend
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of a file's bytes
    pub fn contents(&self, name: &str) -> Option<Vec<u8>> {
        self.state.lock().files.get(name).cloned()
    }

    /// Overwrite raw bytes of a file, growing it if needed.
    /// Returns false if the file does not exist.
    pub fn patch(&self, name: &str, offset: usize, bytes: &[u8]) -> bool {
        let mut state = self.state.lock();
        match state.files.get_mut(name) {
            Some(data) => {
                let end = offset + bytes.len();
                if data.len() < end {
                    data.resize(end, 0);
                }
                data[offset..end].copy_from_slice(bytes);
                true
            }
            None => false,
        }
    }

    /// Limit the total number of bytes later writes may transfer.
    /// `None` lifts the limit.
    pub fn set_write_budget(&self, budget: Option<usize>) {
        self.state.lock().write_budget = budget;
    }
}

impl Backend for MemoryBackend {
    type File = MemoryFile;

    fn open(&self, name: &str, mode: OpenMode) -> Result<MemoryFile> {
        let mut state = self.state.lock();
        match mode {
            OpenMode::Existing => {
                if !state.files.contains_key(name) {
                    return Err(missing(name).into());
                }
            }
            OpenMode::Truncate => {
                state.files.insert(name.to_string(), Vec::new());
            }
        }

        Ok(MemoryFile {
            name: name.to_string(),
            state: Arc::clone(&self.state),
            position: 0,
        })
    }

    fn exists(&self, name: &str) -> bool {
        self.state.lock().files.contains_key(name)
    }

    fn remove(&self, name: &str) -> Result<()> {
        match self.state.lock().files.remove(name) {
            Some(_) => Ok(()),
            None => Err(missing(name).into()),
        }
    }
}

/// A file handed out by [`MemoryBackend`]
#[derive(Debug)]
pub struct MemoryFile {
    name: String,
    state: Arc<Mutex<MemoryState>>,
    position: usize,
}

impl StorageFile for MemoryFile {
    fn seek(&mut self, offset: u64) -> Result<()> {
        self.position = usize::try_from(offset)
            .map_err(|_| IoError::new(ErrorKind::InvalidInput, "seek offset out of range"))?;
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let state = self.state.lock();
        let data = state.files.get(&self.name).ok_or_else(|| missing(&self.name))?;

        let available = data.len().saturating_sub(self.position);
        let n = buf.len().min(available);
        if n == 0 {
            return Ok(0);
        }
        buf[..n].copy_from_slice(&data[self.position..self.position + n]);
        self.position += n;
        Ok(n)
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let data = state.files.get_mut(&self.name).ok_or_else(|| missing(&self.name))?;

        let n = match state.write_budget.as_mut() {
            Some(budget) => {
                let n = buf.len().min(*budget);
                *budget -= n;
                n
            }
            None => buf.len(),
        };

        let end = self.position + n;
        if data.len() < end {
            data.resize(end, 0);
        }
        data[self.position..end].copy_from_slice(&buf[..n]);
        self.position = end;
        Ok(n)
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn size(&self) -> Result<u64> {
        let state = self.state.lock();
        let data = state.files.get(&self.name).ok_or_else(|| missing(&self.name))?;
        Ok(data.len() as u64)
    }
}

fn missing(name: &str) -> IoError {
    IoError::new(ErrorKind::NotFound, format!("no such file: {}", name))
}
