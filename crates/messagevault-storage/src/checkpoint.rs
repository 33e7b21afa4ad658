//! Checkpoint - the Committed Length
//!
//! A checkpoint stores a single `u64`: the committed logical length L of the
//! message stream. It is the sole source of truth for what readers may see.
//!
//! ## Lifecycle
//!
//! - Initialized to 0 on first use
//! - Monotonically non-decreasing
//! - Mutated only by the writer, and only after the pages holding the new
//!   bytes have been persisted
//!
//! Readers poll `read()`; the writer calls `get_or_init()` once on open and
//! `update(n)` after every successful append. Implementations reject
//! regressions so a misconfigured second writer cannot roll visibility
//! backwards.
//!
//! ## Backends
//!
//! [`MemoryCheckpoint`] pairs with the in-memory page store;
//! [`FileCheckpoint`] stores 8 little-endian bytes in `stream.chk` next to
//! the data blob.

use parking_lot::Mutex;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Conventional name of the checkpoint blob inside a vault directory.
pub const CHECKPOINT_BLOB_NAME: &str = "stream.chk";

/// Out-of-band store for the committed logical length.
pub trait Checkpoint: Send + Sync {
    /// Committed length; 0 if the checkpoint object does not exist yet.
    fn read(&self) -> Result<u64>;

    /// Writer-only: ensure the checkpoint object exists and return the
    /// committed length.
    fn get_or_init(&self) -> Result<u64>;

    /// Writer-only: publish a new committed length. Fails with
    /// `InvalidState` if `n` is smaller than the stored value.
    fn update(&self, n: u64) -> Result<()>;
}

fn check_monotone(current: u64, n: u64) -> Result<()> {
    if n < current {
        return Err(Error::InvalidState(format!(
            "checkpoint regression: {n} is behind the committed length {current}"
        )));
    }
    Ok(())
}

/// Checkpoint held in memory.
#[derive(Default)]
pub struct MemoryCheckpoint {
    value: Mutex<u64>,
}

impl MemoryCheckpoint {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Checkpoint for MemoryCheckpoint {
    fn read(&self) -> Result<u64> {
        Ok(*self.value.lock())
    }

    fn get_or_init(&self) -> Result<u64> {
        self.read()
    }

    fn update(&self, n: u64) -> Result<()> {
        let mut value = self.value.lock();
        check_monotone(*value, n)?;
        *value = n;
        Ok(())
    }
}

/// Checkpoint stored as 8 little-endian bytes in `stream.chk`.
pub struct FileCheckpoint {
    path: PathBuf,
}

impl FileCheckpoint {
    /// Checkpoint for the vault at `dir`.
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(CHECKPOINT_BLOB_NAME),
        }
    }

    /// Path of the underlying checkpoint blob.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_value(&self, n: u64) -> Result<()> {
        std::fs::write(&self.path, n.to_le_bytes())?;
        Ok(())
    }
}

impl Checkpoint for FileCheckpoint {
    fn read(&self) -> Result<u64> {
        match std::fs::read(&self.path) {
            Ok(bytes) => {
                let bytes: [u8; 8] = bytes.as_slice().try_into().map_err(|_| {
                    Error::Storage(format!(
                        "checkpoint blob {} is corrupt ({} bytes, expected 8)",
                        self.path.display(),
                        bytes.len()
                    ))
                })?;
                Ok(u64::from_le_bytes(bytes))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(0),
            Err(e) => Err(Error::Io(e)),
        }
    }

    fn get_or_init(&self) -> Result<u64> {
        if !self.path.exists() {
            if let Some(parent) = self.path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            self.write_value(0)?;
        }
        self.read()
    }

    fn update(&self, n: u64) -> Result<()> {
        check_monotone(self.read()?, n)?;
        self.write_value(n)
    }
}
