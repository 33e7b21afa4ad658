//! Message Frame Format
//!
//! This module frames and unframes single message records. The writer frames
//! messages into its page buffer; readers unframe them from a forward byte
//! stream.
//!
//! ## On-disk Layout
//!
//! All multi-byte integers are little-endian:
//!
//! ```text
//! ┌──────┬────────────┬─────────────────┬────────────────┬─────────┬─────────┐
//! │ 0x01 │ 16-byte id │ varint contract │ contract bytes │ payload │ payload │
//! │      │            │ length          │ (UTF-8)        │ len u32 │ bytes   │
//! └──────┴────────────┴─────────────────┴────────────────┴─────────┴─────────┘
//! ```
//!
//! The contract length uses the compact unsigned varint from [`crate::varint`]
//! so that the format stays bit-compatible across implementations.
//!
//! ## Size Limits
//!
//! A framed message never exceeds [`MAX_MESSAGE_SIZE`] and a contract never
//! exceeds [`MAX_CONTRACT_BYTES`]. The limits are enforced before framing
//! (so an oversize append fails cleanly) and again while decoding (so stale
//! bytes past the committed length can never cause an absurd allocation).
//!
//! ## Error Handling
//!
//! - `UnknownFormat`: version byte is not 0x01
//! - `Truncated`: the source ended mid-frame
//! - `ContractTooLarge` / `MessageTooLarge`: limit violations

use bytes::{BufMut, Bytes};
use std::io::Read;

use crate::error::{Error, Result};
use crate::message::{Message, MessageId};
use crate::varint;

/// Version byte at the head of every frame.
pub const FORMAT_VERSION: u8 = 0x01;

/// Hard ceiling on a framed message, framing overhead included.
pub const MAX_MESSAGE_SIZE: usize = 2 * 1024 * 1024;

/// Hard ceiling on the contract string, in UTF-8 bytes.
pub const MAX_CONTRACT_BYTES: usize = 1024;

/// Exact size of the frame for `contract` and `payload`.
///
/// The writer uses this to decide when the page buffer must be flushed
/// before framing the next message.
pub fn estimated_size(contract: &str, payload: &[u8]) -> usize {
    1 + MessageId::SIZE
        + varint::encoded_len(contract.len() as u64)
        + contract.len()
        + 4
        + payload.len()
}

/// Check the append-side size limits for a message.
pub fn validate(contract: &str, payload: &[u8]) -> Result<()> {
    if contract.len() > MAX_CONTRACT_BYTES {
        return Err(Error::ContractTooLarge(contract.len()));
    }
    let size = estimated_size(contract, payload);
    if size > MAX_MESSAGE_SIZE {
        return Err(Error::MessageTooLarge(size));
    }
    Ok(())
}

/// Frame one message into `buf`.
///
/// The sink is an in-RAM buffer, so framing itself cannot fail; callers are
/// expected to have checked [`validate`] first.
pub fn write_frame(buf: &mut impl BufMut, id: MessageId, contract: &str, payload: &[u8]) {
    buf.put_u8(FORMAT_VERSION);
    buf.put_slice(id.as_bytes());
    varint::encode_u64(buf, contract.len() as u64);
    buf.put_slice(contract.as_bytes());
    buf.put_u32_le(payload.len() as u32);
    buf.put_slice(payload);
}

/// Unframe one message from a forward byte source.
pub fn read_frame(src: &mut impl Read) -> Result<Message> {
    let version = read_u8(src)?;
    if version != FORMAT_VERSION {
        return Err(Error::UnknownFormat(version));
    }

    let mut id = [0u8; MessageId::SIZE];
    read_exact(src, &mut id)?;

    let contract_len = varint::read_u64(src)? as usize;
    if contract_len > MAX_CONTRACT_BYTES {
        return Err(Error::ContractTooLarge(contract_len));
    }
    let mut contract = vec![0u8; contract_len];
    read_exact(src, &mut contract)?;
    let contract = String::from_utf8(contract)?;

    let payload_len = read_u32_le(src)? as usize;
    if payload_len > MAX_MESSAGE_SIZE {
        return Err(Error::MessageTooLarge(payload_len));
    }
    let mut payload = vec![0u8; payload_len];
    read_exact(src, &mut payload)?;

    Ok(Message::new(
        MessageId::from_bytes(id),
        contract,
        Bytes::from(payload),
    ))
}

fn read_u8(src: &mut impl Read) -> Result<u8> {
    let mut byte = [0u8; 1];
    read_exact(src, &mut byte)?;
    Ok(byte[0])
}

fn read_u32_le(src: &mut impl Read) -> Result<u32> {
    let mut bytes = [0u8; 4];
    read_exact(src, &mut bytes)?;
    Ok(u32::from_le_bytes(bytes))
}

fn read_exact(src: &mut impl Read, out: &mut [u8]) -> Result<()> {
    src.read_exact(out).map_err(|e| match e.kind() {
        std::io::ErrorKind::UnexpectedEof => Error::Truncated,
        _ => Error::Io(e),
    })
}
