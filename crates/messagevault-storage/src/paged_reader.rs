//! Page-Prefetching Reader
//!
//! A forward-only byte-stream view over the interval `[start, max)` of a
//! page store, with a sliding in-RAM window.
//!
//! ## The Problem
//!
//! Remote page stores have high per-request latency. Decoding frames with
//! one ranged read per field would turn a single message into half a dozen
//! round trips.
//!
//! ## The Solution
//!
//! `PageReader` downloads ahead into a caller-sized buffer and serves
//! decode-sized reads from RAM:
//!
//! ```text
//! read(out)
//!     ↓
//! window has enough bytes? ── YES ──► copy from RAM, advance
//!     ↓ NO
//! compact unread remainder to the buffer head
//!     ↓
//! range-read min(free space, bytes left to max) into the tail
//!     ↓
//! copy from RAM, advance
//! ```
//!
//! One refill per buffer-full of stream, regardless of how fine-grained the
//! decode reads are.
//!
//! ## Contract
//!
//! - Forward-only; not seekable; never reads past `max`
//! - `read` returns up to `out.len()` bytes and 0 exactly when the logical
//!   position has reached `max`
//! - A single request larger than the buffer fails with `BufferTooSmall`;
//!   the buffer must therefore hold the largest expected frame
//!
//! The reader also implements [`std::io::Read`], which is how frame decoding
//! consumes it (see `messagevault_core::format::read_frame`).

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::page_store::PageStore;

/// Forward-only streaming reader over `[start, max)` of a page store.
pub struct PageReader {
    store: Arc<dyn PageStore>,
    /// Logical offset of the next byte to hand out.
    position: u64,
    /// Exclusive upper bound of the readable interval.
    max: u64,
    buf: Vec<u8>,
    /// Unread window is `buf[window_start..window_end]`.
    window_start: usize,
    window_end: usize,
}

impl PageReader {
    /// Open a reader over `[start, max)` with a window of `buffer_size`
    /// bytes.
    ///
    /// `buffer_size` must be at least one page and at least as large as the
    /// biggest frame that will be decoded through this reader.
    pub fn new(store: Arc<dyn PageStore>, start: u64, max: u64, buffer_size: usize) -> Result<Self> {
        if max < start {
            return Err(Error::InvalidArgument(format!(
                "reader range end {max} is before its start {start}"
            )));
        }
        if (buffer_size as u64) < store.page_size() {
            return Err(Error::InvalidArgument(format!(
                "reader buffer of {buffer_size} bytes is smaller than one {}-byte page",
                store.page_size()
            )));
        }
        Ok(Self {
            store,
            position: start,
            max,
            buf: vec![0u8; buffer_size],
            window_start: 0,
            window_end: 0,
        })
    }

    /// Logical offset of the next byte this reader will return.
    pub fn position(&self) -> u64 {
        self.position
    }

    fn remaining(&self) -> usize {
        self.window_end - self.window_start
    }

    /// Read up to `out.len()` bytes, advancing the logical position.
    ///
    /// Returns 0 exactly when the position has reached the end of the
    /// interval. Returns fewer bytes than requested only at the end of the
    /// interval; a request that exceeds the buffer capacity fails with
    /// `BufferTooSmall`.
    pub fn read(&mut self, out: &mut [u8]) -> Result<usize> {
        if out.is_empty() || self.position >= self.max {
            return Ok(0);
        }
        if out.len() > self.buf.len() {
            return Err(Error::BufferTooSmall {
                requested: out.len(),
                capacity: self.buf.len(),
            });
        }
        if self.remaining() < out.len() {
            self.refill()?;
        }

        let served = out.len().min(self.remaining());
        out[..served].copy_from_slice(&self.buf[self.window_start..self.window_start + served]);
        self.window_start += served;
        self.position += served as u64;
        Ok(served)
    }

    /// Slide the window forward: keep the unread remainder, download as much
    /// of `[position + remaining, max)` as fits behind it.
    fn refill(&mut self) -> Result<()> {
        let remaining = self.remaining();
        self.buf.copy_within(self.window_start..self.window_end, 0);
        self.window_start = 0;
        self.window_end = remaining;

        let download_from = self.position + remaining as u64;
        let available = self.max - download_from;
        let download = ((self.buf.len() - remaining) as u64).min(available) as usize;
        if download > 0 {
            self.store
                .read_range(download_from, &mut self.buf[remaining..remaining + download])?;
            self.window_end += download;
        }
        Ok(())
    }
}

impl std::io::Read for PageReader {
    fn read(&mut self, out: &mut [u8]) -> std::io::Result<usize> {
        PageReader::read(self, out).map_err(std::io::Error::other)
    }
}
