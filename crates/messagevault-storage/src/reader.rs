//! Vault Reader
//!
//! High-level read API over a vault: bounded batch reads, blocking tail
//! reads, and live subscriptions.
//!
//! ## Reading Model
//!
//! The checkpoint is the only coordination point between the writer and any
//! number of readers. A reader learns the committed length L, then streams
//! frames out of page storage through its own [`PageReader`] - no locks, no
//! shared buffers.
//!
//! ```text
//! position()            ← checkpoint read
//! read(from, till, n)   ← decode ≤ n frames out of [from, till)
//! read_async(from, n)   ← wait (cancellable) until L > from, then read
//! subscribe(start, ..)  ← background task pushing the live tail to a queue
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! use messagevault_storage::{Reader, FilePageStore, FileCheckpoint};
//! use std::sync::Arc;
//!
//! let reader = Reader::new(
//!     Arc::new(FilePageStore::new("./vault")),
//!     Arc::new(FileCheckpoint::new("./vault")),
//!     1024 * 1024, // reader buffer: must hold the largest frame
//! );
//!
//! let mut position = 0;
//! loop {
//!     let batch = reader.read_async(position, 100, &cancel).await?;
//!     for message in batch.messages {
//!         process(message);
//!     }
//!     position = batch.next_position;
//! }
//! ```

use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use messagevault_core::{format, Message};

use crate::checkpoint::Checkpoint;
use crate::error::{Error, Result};
use crate::page_store::PageStore;
use crate::paged_reader::PageReader;
use crate::subscription::{self, Subscription, SubscriptionConfig};

/// Reader over one vault.
pub struct Reader {
    store: Arc<dyn PageStore>,
    checkpoint: Arc<dyn Checkpoint>,
    buffer_size: usize,
    poll_interval: Duration,
}

/// Result of one bounded read.
#[derive(Debug, Clone)]
pub struct ReadResult {
    /// Decoded messages, in stream order.
    pub messages: Vec<Message>,

    /// Logical offset immediately after the last decoded frame; equals the
    /// requested start if nothing was decoded. Pass this as the next `from`.
    pub next_position: u64,
}

impl Reader {
    /// Reader with a `buffer_size`-byte window per read.
    ///
    /// The buffer must be at least one page and at least as large as the
    /// biggest frame in the log.
    pub fn new(
        store: Arc<dyn PageStore>,
        checkpoint: Arc<dyn Checkpoint>,
        buffer_size: usize,
    ) -> Self {
        Self {
            store,
            checkpoint,
            buffer_size,
            poll_interval: Duration::from_secs(1),
        }
    }

    /// Override the checkpoint polling interval used by `read_async`.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Committed logical length of the stream.
    pub fn position(&self) -> Result<u64> {
        self.checkpoint.read()
    }

    /// Decode up to `max_count` messages out of `[from, till)`.
    ///
    /// Stops at `max_count` or when the window is exhausted, whichever comes
    /// first. `next_position` is the exact end offset of the last decoded
    /// frame.
    pub fn read(&self, from: u64, till: u64, max_count: usize) -> Result<ReadResult> {
        if till < from {
            return Err(Error::InvalidArgument(format!(
                "read range end {till} is before its start {from}"
            )));
        }
        if max_count == 0 {
            return Err(Error::InvalidArgument(
                "max_count must be at least 1".to_string(),
            ));
        }

        let mut reader = PageReader::new(self.store.clone(), from, till, self.buffer_size)?;
        let mut messages = Vec::new();
        while messages.len() < max_count && reader.position() < till {
            let message = format::read_frame(&mut reader)?;
            messages.push(message);
        }

        Ok(ReadResult {
            next_position: reader.position(),
            messages,
        })
    }

    /// Read from `from`, waiting until the writer has committed past it.
    ///
    /// Fails with `InvalidState` if `from` is beyond the committed length
    /// and with `Cancelled` if the token fires while waiting.
    pub async fn read_async(
        &self,
        from: u64,
        max_count: usize,
        cancel: &CancellationToken,
    ) -> Result<ReadResult> {
        if max_count == 0 {
            return Err(Error::InvalidArgument(
                "max_count must be at least 1".to_string(),
            ));
        }

        loop {
            let length = self.checkpoint.read()?;
            if length < from {
                return Err(Error::InvalidState(format!(
                    "read position {from} is beyond the committed length {length}"
                )));
            }
            if length > from {
                return self.read(from, length, max_count);
            }

            tokio::select! {
                _ = cancel.cancelled() => return Err(Error::Cancelled),
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }
    }

    /// Stream the live tail into a bounded queue from a background task.
    ///
    /// The task starts at `start`, owns its own `buffer_size`-byte window,
    /// and keeps the queue at or below `queue_limit` cooperatively. It runs
    /// until `cancel` fires; storage errors are logged and retried with
    /// backoff, never surfaced to the consumer.
    pub fn subscribe(
        &self,
        start: u64,
        buffer_size: usize,
        queue_limit: usize,
        cancel: CancellationToken,
    ) -> Subscription {
        self.subscribe_with_config(
            start,
            buffer_size,
            queue_limit,
            cancel,
            SubscriptionConfig::default(),
        )
    }

    /// `subscribe` with explicit loop intervals.
    pub fn subscribe_with_config(
        &self,
        start: u64,
        buffer_size: usize,
        queue_limit: usize,
        cancel: CancellationToken,
        config: SubscriptionConfig,
    ) -> Subscription {
        subscription::spawn(
            self.store.clone(),
            self.checkpoint.clone(),
            start,
            buffer_size,
            queue_limit,
            cancel,
            config,
        )
    }
}
