//! MessageVault Core
//!
//! Shared types for MessageVault - an append-only message log backed by a
//! page-addressable blob store.
//!
//! ## What Lives Here
//!
//! This crate holds everything both sides of the log need to agree on:
//!
//! 1. **Message types**: [`Message`], [`MessageId`], [`NewMessage`]
//! 2. **Frame format**: the bit-exact on-disk encoding of one message
//!    ([`format`])
//! 3. **Varint codec**: the compact length prefix used inside frames
//!    ([`varint`])
//! 4. **Error types**: format and limit errors ([`Error`])
//!
//! The storage engine itself (page store, writer, readers, subscriptions)
//! lives in the `messagevault-storage` crate.
//!
//! ## Frame Format at a Glance
//!
//! ```text
//! ┌──────┬────────────┬─────────────────┬────────────────┬─────────┬─────────┐
//! │ 0x01 │ 16-byte id │ varint contract │ contract bytes │ payload │ payload │
//! │      │            │ length          │ (UTF-8)        │ len u32 │ bytes   │
//! └──────┴────────────┴─────────────────┴────────────────┴─────────┴─────────┘
//! ```
//!
//! Every committed byte range decodes as a gapless sequence of these frames;
//! see [`format::read_frame`] and [`format::write_frame`].

pub mod error;
pub mod format;
pub mod message;
pub mod varint;

pub use error::{Error, Result};
pub use format::{FORMAT_VERSION, MAX_CONTRACT_BYTES, MAX_MESSAGE_SIZE};
pub use message::{Message, MessageId, NewMessage};
