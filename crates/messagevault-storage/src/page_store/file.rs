//! File-backed page store.
//!
//! Keeps the message stream in a single `stream.dat` file inside a vault
//! directory. Page writes are flushed with `sync_data` so a completed
//! commit survives a process crash; bytes past the committed length may be
//! stale, which the writer's tail rebuild tolerates.

use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use super::{
    check_page_write, check_range_read, full_pages, PageStore, DATA_BLOB_NAME, MAX_COMMIT_SIZE,
    PAGE_SIZE,
};
use crate::error::{Error, Result};

/// Page store backed by one file (`stream.dat`).
pub struct FilePageStore {
    path: PathBuf,
    file: Mutex<Option<File>>,
}

impl FilePageStore {
    /// Store for the vault at `dir`. Does not touch the filesystem; call
    /// [`PageStore::init`] (the writer does) to create the blob.
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(DATA_BLOB_NAME),
            file: Mutex::new(None),
        }
    }

    /// Path of the underlying data blob.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn with_file<T>(&self, op: impl FnOnce(&mut File) -> std::io::Result<T>) -> Result<T> {
        let mut guard = self.file.lock();
        if let Some(file) = guard.as_mut() {
            return op(file).map_err(Error::Io);
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&self.path)
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    Error::Storage(format!(
                        "data blob {} does not exist; the vault has not been initialized",
                        self.path.display()
                    ))
                } else {
                    Error::Io(e)
                }
            })?;
        op(guard.insert(file)).map_err(Error::Io)
    }
}

impl PageStore for FilePageStore {
    fn page_size(&self) -> u64 {
        PAGE_SIZE
    }

    fn max_commit_size(&self) -> u64 {
        MAX_COMMIT_SIZE
    }

    fn init(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut guard = self.file.lock();
        if guard.is_none() {
            let file = OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(false)
                .open(&self.path)?;
            *guard = Some(file);
        }
        Ok(())
    }

    fn size(&self) -> Result<u64> {
        self.with_file(|f| f.metadata().map(|m| m.len()))
    }

    fn ensure_size(&self, n: u64) -> Result<()> {
        let target = full_pages(n, PAGE_SIZE);
        self.with_file(|f| {
            if f.metadata()?.len() < target {
                f.set_len(target)?;
            }
            Ok(())
        })
    }

    fn write_pages(&self, offset: u64, data: &[u8]) -> Result<()> {
        let size = self.size()?;
        check_page_write(offset, data.len() as u64, PAGE_SIZE, size)?;
        self.with_file(|f| {
            f.seek(SeekFrom::Start(offset))?;
            f.write_all(data)?;
            f.sync_data()
        })
    }

    fn read_range(&self, offset: u64, out: &mut [u8]) -> Result<()> {
        let size = self.size()?;
        check_range_read(offset, out.len() as u64, size)?;
        self.with_file(|f| {
            f.seek(SeekFrom::Start(offset))?;
            f.read_exact(out)
        })
    }
}
