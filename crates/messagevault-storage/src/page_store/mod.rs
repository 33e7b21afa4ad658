//! Page Storage Abstraction
//!
//! This module defines the `PageStore` trait - the block-aligned blob that
//! holds the raw message stream - together with the reference backends.
//!
//! ## What is a Page Store?
//!
//! A growable byte container with a fixed page size P:
//!
//! - Reads are ranged and byte-granular
//! - Writes must start on a page boundary and cover whole pages
//! - The total length is a multiple of P and only ever grows
//!
//! The store holds an unstructured byte stream; message framing is the
//! engine's responsibility. The committed logical length lives out-of-band
//! in the [`crate::checkpoint::Checkpoint`].
//!
//! ## Backends
//!
//! | Backend | Use case |
//! |---|---|
//! | [`MemoryPageStore`] | tests, embedded/throwaway vaults |
//! | [`FilePageStore`] | local durability (`stream.dat` in a vault directory) |
//!
//! Cloud page-blob drivers implement the same trait behind their own SDKs
//! and are wired in by the hosting layer.
//!
//! ## Geometry
//!
//! The defaults mirror cloud page-blob limits: 512-byte pages with a 4 MiB
//! ceiling per write operation. The commit ceiling doubles as the writer's
//! buffer capacity.

mod file;
mod memory;

pub use file::FilePageStore;
pub use memory::MemoryPageStore;

use crate::error::{Error, Result};

/// Fixed page size of the reference backends, in bytes.
pub const PAGE_SIZE: u64 = 512;

/// Largest single commit the reference backends accept, in bytes.
pub const MAX_COMMIT_SIZE: u64 = 4 * 1024 * 1024;

/// Conventional name of the data blob inside a vault directory.
pub const DATA_BLOB_NAME: &str = "stream.dat";

/// Block-aligned blob holding the raw message stream.
///
/// Implementations must be safe to share across threads; the engine reads
/// from many readers concurrently while a single writer appends.
pub trait PageStore: Send + Sync {
    /// Page size P. Writes must be aligned to this and sized in multiples
    /// of it.
    fn page_size(&self) -> u64;

    /// Largest write the store accepts in one `write_pages` call; a
    /// multiple of the page size. The writer sizes its buffer to this.
    fn max_commit_size(&self) -> u64;

    /// Create the underlying object if it is missing. Idempotent.
    fn init(&self) -> Result<()>;

    /// Current physical size in bytes; always a multiple of the page size.
    fn size(&self) -> Result<u64>;

    /// Grow the store to at least `n` bytes, rounded up to a whole page.
    /// Never shrinks.
    fn ensure_size(&self, n: u64) -> Result<()>;

    /// Overwrite the page range starting at `offset` with `data`.
    ///
    /// `offset` and `data.len()` must be multiples of the page size and the
    /// range must lie within the current size.
    fn write_pages(&self, offset: u64, data: &[u8]) -> Result<()>;

    /// Fill `out` with the bytes at `[offset, offset + out.len())`.
    /// Fails if any part of the range is beyond the current size.
    fn read_range(&self, offset: u64, out: &mut [u8]) -> Result<()>;
}

/// `n` rounded up to a whole number of pages.
pub fn full_pages(n: u64, page_size: u64) -> u64 {
    n.div_ceil(page_size) * page_size
}

/// Shared alignment validation for `write_pages` implementations.
fn check_page_write(offset: u64, len: u64, page_size: u64, size: u64) -> Result<()> {
    if offset % page_size != 0 {
        return Err(Error::InvalidArgument(format!(
            "write offset {offset} is not aligned to the {page_size}-byte page size"
        )));
    }
    if len % page_size != 0 {
        return Err(Error::InvalidArgument(format!(
            "write of {len} bytes is not a multiple of the {page_size}-byte page size"
        )));
    }
    if offset + len > size {
        return Err(Error::InvalidArgument(format!(
            "write of {len} bytes at {offset} runs past the {size}-byte blob"
        )));
    }
    Ok(())
}

/// Shared bounds validation for `read_range` implementations.
fn check_range_read(offset: u64, len: u64, size: u64) -> Result<()> {
    if offset + len > size {
        return Err(Error::InvalidArgument(format!(
            "read of {len} bytes at {offset} runs past the {size}-byte blob"
        )));
    }
    Ok(())
}
