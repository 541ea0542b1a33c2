//! Disk backend
//!
//! Storage files are regular files inside a root directory.

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::error::Result;

use super::{Backend, OpenMode, StorageFile};

/// Backend storing each file under a root directory
#[derive(Debug, Clone)]
pub struct DiskBackend {
    root: PathBuf,
}

impl DiskBackend {
    /// Use `root` as the storage directory, creating it if needed
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Full path of a storage file
    pub fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

impl Backend for DiskBackend {
    type File = DiskFile;

    fn open(&self, name: &str, mode: OpenMode) -> Result<DiskFile> {
        let path = self.path(name);
        let file = match mode {
            OpenMode::Existing => OpenOptions::new().read(true).write(true).open(&path)?,
            OpenMode::Truncate => OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(true)
                .open(&path)?,
        };

        tracing::trace!("Opened {} ({:?})", path.display(), mode);
        Ok(DiskFile { file, path })
    }

    fn exists(&self, name: &str) -> bool {
        self.path(name).is_file()
    }

    fn remove(&self, name: &str) -> Result<()> {
        fs::remove_file(self.path(name))?;
        Ok(())
    }
}

/// A storage file on disk
#[derive(Debug)]
pub struct DiskFile {
    file: File,
    path: PathBuf,
}

impl DiskFile {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StorageFile for DiskFile {
    fn seek(&mut self, offset: u64) -> Result<()> {
        self.file.seek(SeekFrom::Start(offset))?;
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut total = 0;
        while total < buf.len() {
            match self.file.read(&mut buf[total..]) {
                Ok(0) => break,
                Ok(n) => total += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(total)
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        let mut total = 0;
        while total < buf.len() {
            match self.file.write(&buf[total..]) {
                Ok(0) => break,
                Ok(n) => total += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(total)
    }

    fn flush(&mut self) -> Result<()> {
        self.file.flush()?;
        self.file.sync_data()?;
        Ok(())
    }

    fn size(&self) -> Result<u64> {
        Ok(self.file.metadata()?.len())
    }
}
