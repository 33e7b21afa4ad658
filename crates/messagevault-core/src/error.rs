//! Error Types for MessageVault Core
//!
//! This module defines the errors that can occur while framing or unframing
//! messages.
//!
//! ## Error Categories
//!
//! ### Format Errors
//! - `UnknownFormat`: frame version byte is not the supported 0x01
//! - `Truncated`: the byte stream ended in the middle of a frame
//! - `VarintOverflow`: a length prefix did not terminate within 64 bits
//!
//! ### Limit Errors
//! - `ContractTooLarge` / `MessageTooLarge`: a frame exceeds the hard size
//!   limits (enforced on both the append and the decode path)
//!
//! ## Usage
//!
//! All functions in this crate return `Result<T>` which is aliased to
//! `Result<T, Error>`, so `?` propagation works throughout.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unknown frame format: 0x{0:02x}")]
    UnknownFormat(u8),

    #[error("unexpected end of stream inside a frame")]
    Truncated,

    #[error("contract of {0} bytes exceeds the contract size limit")]
    ContractTooLarge(usize),

    #[error("message of {0} bytes exceeds the message size limit")]
    MessageTooLarge(usize),

    #[error("contract is not valid UTF-8: {0}")]
    InvalidContract(#[from] std::string::FromUtf8Error),

    #[error("varint is longer than 64 bits")]
    VarintOverflow,
}
