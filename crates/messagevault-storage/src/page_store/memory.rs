//! In-memory page store.
//!
//! Backs tests and throwaway vaults. Besides the plain byte container it
//! counts how often each page region has been written, which lets tests
//! assert the commit protocol's central promise: a page that is full and
//! behind the committed length is never touched again.

use parking_lot::Mutex;

use super::{check_page_write, check_range_read, full_pages, PageStore, MAX_COMMIT_SIZE, PAGE_SIZE};
use crate::error::Result;

/// Page store backed by a `Vec<u8>`.
pub struct MemoryPageStore {
    page_size: u64,
    max_commit_size: u64,
    inner: Mutex<Inner>,
}

struct Inner {
    data: Vec<u8>,
    /// Write count per page index.
    write_counts: Vec<u64>,
}

impl MemoryPageStore {
    /// Store with the default geometry (512-byte pages, 4 MiB commits).
    pub fn new() -> Self {
        Self::with_geometry(PAGE_SIZE, MAX_COMMIT_SIZE)
    }

    /// Store with a custom geometry, for tests that want to exercise
    /// buffer pressure without multi-megabyte payloads.
    ///
    /// `max_commit_size` must be a non-zero multiple of `page_size`.
    pub fn with_geometry(page_size: u64, max_commit_size: u64) -> Self {
        assert!(page_size > 0 && max_commit_size % page_size == 0 && max_commit_size > 0);
        Self {
            page_size,
            max_commit_size,
            inner: Mutex::new(Inner {
                data: Vec::new(),
                write_counts: Vec::new(),
            }),
        }
    }

    /// How many times the page at `page_index` has been written.
    pub fn write_count(&self, page_index: u64) -> u64 {
        self.inner
            .lock()
            .write_counts
            .get(page_index as usize)
            .copied()
            .unwrap_or(0)
    }

    /// Snapshot of the raw blob contents.
    pub fn contents(&self) -> Vec<u8> {
        self.inner.lock().data.clone()
    }
}

impl Default for MemoryPageStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PageStore for MemoryPageStore {
    fn page_size(&self) -> u64 {
        self.page_size
    }

    fn max_commit_size(&self) -> u64 {
        self.max_commit_size
    }

    fn init(&self) -> Result<()> {
        // Nothing to create; the container exists from construction.
        Ok(())
    }

    fn size(&self) -> Result<u64> {
        Ok(self.inner.lock().data.len() as u64)
    }

    fn ensure_size(&self, n: u64) -> Result<()> {
        let target = full_pages(n, self.page_size) as usize;
        let mut inner = self.inner.lock();
        if inner.data.len() < target {
            inner.data.resize(target, 0);
            let pages = target / self.page_size as usize;
            inner.write_counts.resize(pages, 0);
        }
        Ok(())
    }

    fn write_pages(&self, offset: u64, data: &[u8]) -> Result<()> {
        let mut inner = self.inner.lock();
        check_page_write(
            offset,
            data.len() as u64,
            self.page_size,
            inner.data.len() as u64,
        )?;

        let start = offset as usize;
        inner.data[start..start + data.len()].copy_from_slice(data);

        let first_page = offset / self.page_size;
        let pages = data.len() as u64 / self.page_size;
        for page in first_page..first_page + pages {
            inner.write_counts[page as usize] += 1;
        }
        Ok(())
    }

    fn read_range(&self, offset: u64, out: &mut [u8]) -> Result<()> {
        let inner = self.inner.lock();
        check_range_read(offset, out.len() as u64, inner.data.len() as u64)?;
        let start = offset as usize;
        out.copy_from_slice(&inner.data[start..start + out.len()]);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_empty() {
        let store = MemoryPageStore::new();
        assert_eq!(store.size().unwrap(), 0);
    }

    #[test]
    fn test_ensure_size_rounds_up_to_pages() {
        let store = MemoryPageStore::new();
        store.ensure_size(1).unwrap();
        assert_eq!(store.size().unwrap(), 512);
        store.ensure_size(513).unwrap();
        assert_eq!(store.size().unwrap(), 1024);
    }

    #[test]
    fn test_ensure_size_never_shrinks() {
        let store = MemoryPageStore::new();
        store.ensure_size(2048).unwrap();
        store.ensure_size(512).unwrap();
        assert_eq!(store.size().unwrap(), 2048);
    }

    #[test]
    fn test_write_then_read_roundtrip() {
        let store = MemoryPageStore::new();
        store.ensure_size(1024).unwrap();

        let mut page = vec![0u8; 512];
        page[..5].copy_from_slice(b"hello");
        store.write_pages(512, &page).unwrap();

        let mut out = vec![0u8; 5];
        store.read_range(512, &mut out).unwrap();
        assert_eq!(&out, b"hello");
    }

    #[test]
    fn test_rejects_unaligned_offset() {
        let store = MemoryPageStore::new();
        store.ensure_size(1024).unwrap();
        let err = store.write_pages(100, &[0u8; 512]).unwrap_err();
        assert!(err.to_string().contains("not aligned"));
    }

    #[test]
    fn test_rejects_partial_page_write() {
        let store = MemoryPageStore::new();
        store.ensure_size(1024).unwrap();
        assert!(store.write_pages(0, &[0u8; 100]).is_err());
    }

    #[test]
    fn test_rejects_write_past_end() {
        let store = MemoryPageStore::new();
        store.ensure_size(512).unwrap();
        assert!(store.write_pages(512, &[0u8; 512]).is_err());
    }

    #[test]
    fn test_rejects_read_past_end() {
        let store = MemoryPageStore::new();
        store.ensure_size(512).unwrap();
        let mut out = vec![0u8; 16];
        assert!(store.read_range(500, &mut out).is_err());
    }

    #[test]
    fn test_write_counts_track_pages() {
        let store = MemoryPageStore::new();
        store.ensure_size(1536).unwrap();

        store.write_pages(0, &[1u8; 1024]).unwrap();
        store.write_pages(512, &[2u8; 512]).unwrap();

        assert_eq!(store.write_count(0), 1);
        assert_eq!(store.write_count(1), 2);
        assert_eq!(store.write_count(2), 0);
    }

    #[test]
    fn test_custom_geometry() {
        let store = MemoryPageStore::with_geometry(512, 2048);
        assert_eq!(store.page_size(), 512);
        assert_eq!(store.max_commit_size(), 2048);
    }

    #[test]
    fn test_init_is_idempotent() {
        let store = MemoryPageStore::new();
        store.init().unwrap();
        store.init().unwrap();
        assert_eq!(store.size().unwrap(), 0);
    }
}
