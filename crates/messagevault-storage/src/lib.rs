//! MessageVault Storage Engine
//!
//! This crate implements the storage engine for MessageVault - an
//! append-only message log kept in a page-addressable blob store with a
//! tiny out-of-band checkpoint publishing the committed length.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────┐
//! │   Producer   │
//! └──────┬───────┘
//!        │ append(batch)
//!        ▼
//! ┌──────────────────┐      page-aligned writes      ┌─────────────────┐
//! │      Writer      │ ────────────────────────────► │   Page Store    │
//! │ - frames to RAM  │                               │  (stream.dat)   │
//! │ - rewrites tail  │      committed length L       └────────┬────────┘
//! │ - publishes L    │ ──────────────┐                        │ ranged
//! └──────────────────┘               ▼                        │ reads
//!                           ┌─────────────────┐               ▼
//!                           │   Checkpoint    │      ┌─────────────────┐
//!                           │  (stream.chk)   │ ◄──  │    PageReader   │
//!                           └─────────────────┘ read │ sliding window  │
//!                                                    └────────┬────────┘
//!                                                             │ frames
//!                                                             ▼
//!                                          ┌──────────────────────────┐
//!                                          │  Reader / Subscription   │
//!                                          └──────────────────────────┘
//! ```
//!
//! ## Main Components
//!
//! ### Writer
//! Buffers framed messages in RAM and commits them with page-aligned
//! rewrites, preserving the partial tail page across flushes. The
//! checkpoint is published only after the pages are durable, so readers
//! observe each append all-or-nothing.
//!
//! ### PageReader
//! Forward-only sliding window over a byte range of the store; one ranged
//! read per buffer-full regardless of decode granularity.
//!
//! ### Reader
//! Bounded batch reads (`read`), blocking tail reads (`read_async`), and
//! live subscriptions feeding a cooperatively bounded queue.
//!
//! ### Backends
//! `PageStore` and `Checkpoint` are small sync traits. Memory and file
//! backends ship here; cloud page-blob drivers live with the hosting layer.
//!
//! ## Consistency Model
//!
//! - A single writer per log (external coordination assumed)
//! - Readers only ever see bytes below the committed length L
//! - Every byte in `[0, L)` decodes as a gapless sequence of frames
//! - Bytes in `[L, physical size)` are stale and unobservable
//! - L is monotone; a crash before checkpoint publication loses only the
//!   unpublished suffix, never committed data
//!
//! ## Usage Example
//!
//! ```ignore
//! use messagevault_storage::{
//!     FileCheckpoint, FilePageStore, Reader, Writer,
//! };
//! use messagevault_core::NewMessage;
//! use std::sync::Arc;
//!
//! let store = Arc::new(FilePageStore::new("./vault"));
//! let checkpoint = Arc::new(FileCheckpoint::new("./vault"));
//!
//! // Single writer
//! let mut writer = Writer::open(store.clone(), checkpoint.clone())?;
//! writer.append(&[NewMessage::new("orders.Created", payload)])?;
//!
//! // Any number of readers
//! let reader = Reader::new(store, checkpoint, 1024 * 1024);
//! let batch = reader.read(0, reader.position()?, 100)?;
//! ```

pub mod checkpoint;
pub mod error;
pub mod page_store;
pub mod paged_reader;
pub mod reader;
pub mod subscription;
pub mod writer;

pub use checkpoint::{Checkpoint, FileCheckpoint, MemoryCheckpoint, CHECKPOINT_BLOB_NAME};
pub use error::{Error, Result};
pub use page_store::{
    FilePageStore, MemoryPageStore, PageStore, DATA_BLOB_NAME, MAX_COMMIT_SIZE, PAGE_SIZE,
};
pub use paged_reader::PageReader;
pub use reader::{ReadResult, Reader};
pub use subscription::{Subscription, SubscriptionConfig};
pub use writer::{Clock, SystemClock, Writer};
