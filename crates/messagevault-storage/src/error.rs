//! Storage Error Types
//!
//! This module defines all error types that can occur while operating a
//! vault.
//!
//! ## Error Categories
//!
//! ### Caller Errors
//! - `InvalidArgument`: bad offsets, counts, oversize messages, misaligned
//!   page writes
//! - `InvalidState`: reading beyond the committed length, checkpoint
//!   regressions
//! - `BufferTooSmall`: a single read request larger than the reader buffer
//!
//! ### Runtime Errors
//! - `Storage`: an underlying page store or checkpoint backend failed
//! - `Io`: raw filesystem failure from the file-backed backends
//! - `Format`: a frame failed to decode (wraps the core error)
//! - `Cancelled`: the operation was aborted via its cancellation token
//!
//! ## Usage
//!
//! All storage operations return `Result<T>` which is aliased to
//! `Result<T, Error>`, so `?` propagation works throughout the engine.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("read of {requested} bytes exceeds the {capacity}-byte reader buffer")]
    BufferTooSmall { requested: usize, capacity: usize },

    #[error("storage error: {0}")]
    Storage(String),

    #[error("frame error: {0}")]
    Format(messagevault_core::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("operation cancelled")]
    Cancelled,
}

impl From<messagevault_core::Error> for Error {
    fn from(err: messagevault_core::Error) -> Self {
        match err {
            // Storage errors that crossed the io::Read boundary inside a
            // frame decode come back out intact.
            messagevault_core::Error::Io(io_err) => match io_err.downcast::<Error>() {
                Ok(inner) => inner,
                Err(io_err) => Error::Io(io_err),
            },
            other => Error::Format(other),
        }
    }
}
