//! Vault Writer
//!
//! This module implements the single-writer append path: buffering, page
//! rewriting, and checkpoint publication.
//!
//! ## Write Flow
//!
//! ```text
//! append(batch)
//!     ↓
//! validate sizes          ← nothing mutated on oversize input
//!     ↓
//! frame into RAM buffer   ← id assigned from (offset, clock)
//!     ↓ buffer pressure?
//! flush()                 ← rewrite whole pages starting at the tail page
//!     ↓
//! flush()                 ← final pages for the batch
//!     ↓
//! checkpoint.update(L)    ← batch becomes visible, all-or-nothing
//! ```
//!
//! ## Tail Preservation
//!
//! Page stores only accept page-aligned writes, but the committed stream
//! almost never ends on a page boundary. The last partial page therefore
//! holds `L mod P` bytes of live data that every flush must write back
//! intact. The writer keeps a copy of those bytes at the head of its
//! buffer:
//!
//! - On open, the tail is re-read from the page at `L - (L mod P)`
//! - On flush, the buffer is written from that page's offset, so the tail
//!   page is *rewritten* - possibly many times, until it fills up
//! - Once a page is full and behind L it is never written again
//!
//! ## Crash Model
//!
//! A crash between the page write and the checkpoint update leaves stale
//! bytes past L. They are unobservable (readers stop at L) and the next
//! writer rebuilds its tail from the committed page, so no recovery step is
//! needed. L never regresses.
//!
//! ## Concurrency
//!
//! One writer per log, enforced by the deployment (blob lease or a single
//! owning process), not by this type.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info, trace};

use messagevault_core::{format, MessageId, NewMessage};

use crate::checkpoint::Checkpoint;
use crate::error::{Error, Result};
use crate::page_store::{full_pages, PageStore};

/// Source of timestamps for message ids.
///
/// Injected so tests (and replicas that need reproducible ids) can supply
/// their own readings.
pub trait Clock: Send + Sync {
    /// Current time in unix milliseconds.
    fn now_ms(&self) -> u64;
}

/// Wall clock.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }
}

/// Single writer for one vault.
pub struct Writer {
    store: Arc<dyn PageStore>,
    checkpoint: Arc<dyn Checkpoint>,
    clock: Arc<dyn Clock>,

    /// Preserved tail followed by framed-but-unflushed messages.
    buffer: Vec<u8>,
    /// Valid bytes in `buffer`.
    cursor: usize,
    /// Committed logical length L.
    length: u64,

    page_size: u64,
}

impl Writer {
    /// Open the vault for appending with the wall clock.
    pub fn open(store: Arc<dyn PageStore>, checkpoint: Arc<dyn Checkpoint>) -> Result<Self> {
        Self::open_with_clock(store, checkpoint, Arc::new(SystemClock))
    }

    /// Open the vault for appending.
    ///
    /// Initializes storage (idempotent), reads the committed length, and
    /// rebuilds the partial-page tail into the write buffer.
    pub fn open_with_clock(
        store: Arc<dyn PageStore>,
        checkpoint: Arc<dyn Checkpoint>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        store.init()?;
        let length = checkpoint.get_or_init()?;

        let page_size = store.page_size();
        let capacity = store.max_commit_size() as usize;
        let mut buffer = vec![0u8; capacity];

        let tail = (length % page_size) as usize;
        if tail > 0 {
            store.read_range(length - tail as u64, &mut buffer[..tail])?;
        }

        info!(length, tail, "opened vault writer");
        Ok(Self {
            store,
            checkpoint,
            clock,
            buffer,
            cursor: tail,
            length,
            page_size,
        })
    }

    /// Committed logical length of the stream.
    pub fn position(&self) -> u64 {
        self.length
    }

    /// Stream offset of `buffer[0]`: the start of the page holding the tail.
    fn tail_base(&self) -> u64 {
        self.length - self.length % self.page_size
    }

    /// Logical offset at which the next framed byte will live.
    fn virtual_position(&self) -> u64 {
        self.tail_base() + self.cursor as u64
    }

    /// Append a batch of messages and return the new committed length.
    ///
    /// The batch becomes visible to readers atomically: the checkpoint is
    /// published only after every page holding the batch has been written.
    /// On failure the committed length is unchanged and the writer remains
    /// usable; the whole batch can be retried.
    pub fn append(&mut self, batch: &[NewMessage]) -> Result<u64> {
        if batch.is_empty() {
            return Err(Error::InvalidArgument(
                "append requires at least one message".to_string(),
            ));
        }
        for message in batch {
            format::validate(&message.contract, &message.payload)
                .map_err(|e| Error::InvalidArgument(e.to_string()))?;
        }

        for message in batch {
            let size = format::estimated_size(&message.contract, &message.payload);
            if size > self.buffer.len() - self.cursor {
                self.flush()?;
            }
            if size > self.buffer.len() - self.cursor {
                return Err(Error::InvalidArgument(format!(
                    "message of {size} bytes cannot fit the {}-byte write buffer",
                    self.buffer.len()
                )));
            }

            let offset = self.virtual_position();
            let id = MessageId::new(offset, self.clock.now_ms());
            let mut sink = &mut self.buffer[self.cursor..self.cursor + size];
            format::write_frame(&mut sink, id, &message.contract, &message.payload);
            self.cursor += size;
            trace!(offset, size, contract = %message.contract, "framed message");
        }

        self.flush()?;
        self.checkpoint.update(self.length)?;
        debug!(
            length = self.length,
            count = batch.len(),
            "append committed"
        );
        Ok(self.length)
    }

    /// Persist the buffer to page storage without publishing the checkpoint.
    ///
    /// Rewrites whole pages starting at the tail page, then slides the new
    /// partial tail back to the head of the buffer for the next round.
    fn flush(&mut self) -> Result<()> {
        let bytes_in_buffer = self.cursor;
        let pages_to_write = full_pages(bytes_in_buffer as u64, self.page_size) as usize;
        if pages_to_write == 0 {
            return Ok(());
        }

        let tail_base = self.tail_base();
        let new_length = self.virtual_position();

        let write = self
            .store
            .ensure_size(full_pages(new_length, self.page_size))
            .and_then(|_| {
                self.store
                    .write_pages(tail_base, &self.buffer[..pages_to_write])
            });
        if let Err(e) = write {
            // Drop the uncommitted frames; buffer[0..tail] still holds the
            // committed tail, so the writer stays consistent for a retry.
            self.cursor = (self.length % self.page_size) as usize;
            return Err(e);
        }

        debug!(
            offset = tail_base,
            bytes = bytes_in_buffer,
            pages = pages_to_write as u64 / self.page_size,
            "flushed pages"
        );
        self.length = new_length;

        let page_size = self.page_size as usize;
        if bytes_in_buffer >= page_size {
            // Crossed at least one page boundary: slide the bytes of the
            // new partial tail page to the buffer head.
            let new_tail = bytes_in_buffer % page_size;
            if new_tail > 0 {
                let last_page_start = bytes_in_buffer - new_tail;
                self.buffer.copy_within(last_page_start..bytes_in_buffer, 0);
            }
            self.cursor = new_tail;
        }
        // Still inside the first page: the buffer already starts with the
        // (grown) tail, nothing moves.
        Ok(())
    }

    /// Close the writer. Buffered data is always committed at the end of
    /// `append`, so there is nothing to flush here.
    pub fn close(self) {
        info!(length = self.length, "closed vault writer");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::MemoryCheckpoint;
    use crate::page_store::MemoryPageStore;
    use bytes::Bytes;

    struct FixedClock(u64);

    impl Clock for FixedClock {
        fn now_ms(&self) -> u64 {
            self.0
        }
    }

    fn open_writer(
        store: &Arc<MemoryPageStore>,
        checkpoint: &Arc<MemoryCheckpoint>,
    ) -> Writer {
        Writer::open_with_clock(
            store.clone(),
            checkpoint.clone(),
            Arc::new(FixedClock(1_700_000_000_000)),
        )
        .unwrap()
    }

    fn message(contract: &str, payload: Vec<u8>) -> NewMessage {
        NewMessage::new(contract.to_string(), Bytes::from(payload))
    }

    #[test]
    fn test_open_fresh_vault() {
        let store = Arc::new(MemoryPageStore::new());
        let checkpoint = Arc::new(MemoryCheckpoint::new());
        let writer = open_writer(&store, &checkpoint);
        assert_eq!(writer.position(), 0);
    }

    #[test]
    fn test_single_message_commit() {
        let store = Arc::new(MemoryPageStore::new());
        let checkpoint = Arc::new(MemoryCheckpoint::new());
        let mut writer = open_writer(&store, &checkpoint);

        // 1 + 16 + 1 + 1 + 4 + 100 bytes of frame
        let new_length = writer.append(&[message("a", vec![0u8; 100])]).unwrap();
        assert_eq!(new_length, 123);
        assert_eq!(writer.position(), 123);
        assert_eq!(checkpoint.read().unwrap(), 123);
        assert_eq!(store.size().unwrap(), 512);
    }

    #[test]
    fn test_append_empty_batch_is_invalid() {
        let store = Arc::new(MemoryPageStore::new());
        let checkpoint = Arc::new(MemoryCheckpoint::new());
        let mut writer = open_writer(&store, &checkpoint);

        let err = writer.append(&[]).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn test_append_oversize_message_leaves_state_untouched() {
        let store = Arc::new(MemoryPageStore::new());
        let checkpoint = Arc::new(MemoryCheckpoint::new());
        let mut writer = open_writer(&store, &checkpoint);

        writer.append(&[message("k", vec![1u8; 10])]).unwrap();
        let before = writer.position();

        let oversize = message("k", vec![0u8; messagevault_core::MAX_MESSAGE_SIZE]);
        let err = writer.append(&[oversize]).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        assert_eq!(writer.position(), before);
        assert_eq!(checkpoint.read().unwrap(), before);
    }

    #[test]
    fn test_checkpoint_published_once_per_append() {
        let store = Arc::new(MemoryPageStore::new());
        let checkpoint = Arc::new(MemoryCheckpoint::new());
        let mut writer = open_writer(&store, &checkpoint);

        let batch: Vec<NewMessage> = (0..10).map(|_| message("k", vec![0xAB; 100])).collect();
        let new_length = writer.append(&batch).unwrap();

        let frame = 123; // same shape as the single-message test
        assert_eq!(new_length, 10 * frame);
        assert_eq!(checkpoint.read().unwrap(), 10 * frame);
        // 1230 logical bytes span three 512-byte pages
        assert_eq!(store.size().unwrap(), 1536);
    }

    #[test]
    fn test_ids_encode_offset_and_clock() {
        let store = Arc::new(MemoryPageStore::new());
        let checkpoint = Arc::new(MemoryCheckpoint::new());
        let mut writer = Writer::open_with_clock(
            store.clone(),
            checkpoint.clone(),
            Arc::new(FixedClock(42)),
        )
        .unwrap();

        writer
            .append(&[message("a", vec![0; 10]), message("b", vec![0; 10])])
            .unwrap();

        // First frame at offset 0, second right behind it
        let first_len = format::estimated_size("a", &[0; 10]) as u64;
        let mut page = vec![0u8; 512];
        store.read_range(0, &mut page).unwrap();
        assert_eq!(&page[1..9], &42u64.to_le_bytes());
        assert_eq!(&page[9..17], &0u64.to_le_bytes());
        let second = &page[first_len as usize..];
        assert_eq!(&second[9..17], &first_len.to_le_bytes());
    }

    #[test]
    fn test_full_pages_are_never_rewritten() {
        let store = Arc::new(MemoryPageStore::new());
        let checkpoint = Arc::new(MemoryCheckpoint::new());
        let mut writer = open_writer(&store, &checkpoint);

        for _ in 0..40 {
            writer.append(&[message("k", vec![0x11; 100])]).unwrap();
        }

        let length = writer.position();
        let full_page_count = length / 512;
        assert!(full_page_count >= 2);

        let counts: Vec<u64> = (0..full_page_count).map(|p| store.write_count(p)).collect();

        for _ in 0..40 {
            writer.append(&[message("k", vec![0x22; 100])]).unwrap();
        }

        // Pages that were full before the second round kept their counts,
        // except the tail page of the first round which keeps filling.
        let tail_page = length / 512;
        for (page, before) in counts.iter().enumerate() {
            if (page as u64) < tail_page {
                assert_eq!(
                    store.write_count(page as u64),
                    *before,
                    "full page {page} was rewritten"
                );
            }
        }
    }

    #[test]
    fn test_tail_page_rewritten_until_full() {
        let store = Arc::new(MemoryPageStore::new());
        let checkpoint = Arc::new(MemoryCheckpoint::new());
        let mut writer = open_writer(&store, &checkpoint);

        // Three appends inside page 0: each commit rewrites it
        for _ in 0..3 {
            writer.append(&[message("k", vec![0u8; 80])]).unwrap();
        }
        assert!(writer.position() < 512);
        assert_eq!(store.write_count(0), 3);
    }

    #[test]
    fn test_mid_append_flush_on_buffer_pressure() {
        // 2 KiB buffer forces flushes inside a single append call
        let store = Arc::new(MemoryPageStore::with_geometry(512, 2048));
        let checkpoint = Arc::new(MemoryCheckpoint::new());
        let mut writer = open_writer(&store, &checkpoint);

        let batch: Vec<NewMessage> = (0..8).map(|_| message("k", vec![0xEE; 500])).collect();
        let new_length = writer.append(&batch).unwrap();

        let frame = format::estimated_size("k", &[0xEE; 500]) as u64;
        assert_eq!(new_length, 8 * frame);
        assert_eq!(checkpoint.read().unwrap(), new_length);
        assert_eq!(store.size().unwrap(), full_pages(new_length, 512));
    }

    #[test]
    fn test_reopen_preserves_tail() {
        let store = Arc::new(MemoryPageStore::new());
        let checkpoint = Arc::new(MemoryCheckpoint::new());

        {
            let mut writer = open_writer(&store, &checkpoint);
            writer.append(&[message("k", vec![0xAA; 100])]).unwrap();
        }
        let first_length = checkpoint.read().unwrap();

        {
            let mut writer = open_writer(&store, &checkpoint);
            assert_eq!(writer.position(), first_length);
            writer.append(&[message("k", vec![0xBB; 100])]).unwrap();
        }

        // Both frames intact in page 0, back to back
        let contents = store.contents();
        assert_eq!(contents[0], 0x01);
        let second_frame = &contents[first_length as usize..];
        assert_eq!(second_frame[0], 0x01);
        // Page 0 written once per session
        assert_eq!(store.write_count(0), 2);
    }

    #[test]
    fn test_simulated_crash_keeps_old_length() {
        let store = Arc::new(MemoryPageStore::new());
        let checkpoint = Arc::new(MemoryCheckpoint::new());

        {
            let mut writer = open_writer(&store, &checkpoint);
            writer.append(&[message("k", vec![0xAA; 100])]).unwrap();
        }
        let committed = checkpoint.read().unwrap();

        // Crash after the page write but before the checkpoint update:
        // scribble stale bytes past L straight into the store.
        store.ensure_size(1024).unwrap();
        store.write_pages(512, &[0xDD; 512]).unwrap();

        let mut writer = open_writer(&store, &checkpoint);
        assert_eq!(writer.position(), committed);

        // Appending over the stale region yields a valid stream
        let new_length = writer.append(&[message("k", vec![0xBB; 600])]).unwrap();
        assert!(new_length > 512);
        assert_eq!(checkpoint.read().unwrap(), new_length);
    }
}
