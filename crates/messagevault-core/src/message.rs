//! Message Data Structures
//!
//! This module defines the core `Message` type - the fundamental unit of data
//! in a vault - together with its 16-byte id.
//!
//! ## What is a Message?
//!
//! A message is a single immutable record in the append-only log:
//! - **id**: 16 bytes encoding the creation time and the logical offset at
//!   which the message was written
//! - **contract**: a short UTF-8 string identifying the payload schema
//!   (e.g., `"orders.v2.Shipped"`)
//! - **payload**: the actual data (arbitrary bytes)
//!
//! ## Message ids
//!
//! Ids are deterministic: given the same logical offset and the same clock
//! reading, the same id is produced. The layout is little-endian throughout:
//!
//! ```text
//! [0..8)   creation timestamp, unix milliseconds
//! [8..16)  logical stream offset of the frame
//! ```
//!
//! Because offsets are unique within a log, ids are unique per message, and
//! the offset can always be recovered from an id without touching storage.
//!
//! ## Design Decisions
//! - Uses `bytes::Bytes` for zero-copy payload slicing
//! - Implements `Serialize`/`Deserialize` so messages can travel through
//!   JSON-speaking layers unchanged
//! - `NewMessage` is the unwritten half: a contract and payload that have not
//!   yet been assigned an id (the writer assigns ids at append time)

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// 16-byte message id: creation timestamp plus logical offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId([u8; MessageId::SIZE]);

impl MessageId {
    /// Size of an id on the wire.
    pub const SIZE: usize = 16;

    /// Build an id from the logical offset the message will occupy and a
    /// clock reading in unix milliseconds.
    pub fn new(offset: u64, timestamp_ms: u64) -> Self {
        let mut bytes = [0u8; Self::SIZE];
        bytes[..8].copy_from_slice(&timestamp_ms.to_le_bytes());
        bytes[8..].copy_from_slice(&offset.to_le_bytes());
        Self(bytes)
    }

    pub fn from_bytes(bytes: [u8; Self::SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; Self::SIZE] {
        &self.0
    }

    /// Clock reading captured when the message was appended.
    pub fn timestamp_ms(&self) -> u64 {
        u64::from_le_bytes(self.0[..8].try_into().unwrap())
    }

    /// Logical offset at which the message was written.
    pub fn offset(&self) -> u64 {
        u64::from_le_bytes(self.0[8..].try_into().unwrap())
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

/// A message that has not been written yet: contract plus payload.
///
/// The writer assigns the id when the message is framed into the log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMessage {
    /// Schema identifier for the payload (UTF-8, short)
    pub contract: String,

    /// Payload bytes
    pub payload: Bytes,
}

impl NewMessage {
    pub fn new(contract: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            contract: contract.into(),
            payload: payload.into(),
        }
    }
}

/// A single committed message read back from the log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Id assigned at append time
    pub id: MessageId,

    /// Schema identifier for the payload
    pub contract: String,

    /// Payload bytes
    pub payload: Bytes,
}

impl Message {
    pub fn new(id: MessageId, contract: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            id,
            contract: contract.into(),
            payload: payload.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ---------------------------------------------------------------
    // MessageId layout
    // ---------------------------------------------------------------

    #[test]
    fn test_id_roundtrips_offset_and_timestamp() {
        let id = MessageId::new(12_345, 1_700_000_000_000);
        assert_eq!(id.offset(), 12_345);
        assert_eq!(id.timestamp_ms(), 1_700_000_000_000);
    }

    #[test]
    fn test_id_is_little_endian() {
        let id = MessageId::new(1, 2);
        assert_eq!(id.as_bytes()[0], 2); // timestamp low byte first
        assert_eq!(id.as_bytes()[8], 1); // offset low byte first
        assert_eq!(&id.as_bytes()[1..8], &[0u8; 7]);
    }

    #[test]
    fn test_id_deterministic() {
        assert_eq!(MessageId::new(7, 99), MessageId::new(7, 99));
        assert_ne!(MessageId::new(7, 99), MessageId::new(8, 99));
        assert_ne!(MessageId::new(7, 99), MessageId::new(7, 100));
    }

    #[test]
    fn test_id_max_values() {
        let id = MessageId::new(u64::MAX, u64::MAX);
        assert_eq!(id.offset(), u64::MAX);
        assert_eq!(id.timestamp_ms(), u64::MAX);
    }

    #[test]
    fn test_id_from_bytes_preserves_wire_form() {
        let id = MessageId::new(42, 1000);
        let copied = MessageId::from_bytes(*id.as_bytes());
        assert_eq!(id, copied);
    }

    #[test]
    fn test_id_display_is_hex() {
        let id = MessageId::new(0, 0);
        assert_eq!(id.to_string(), "0".repeat(32));
    }

    // ---------------------------------------------------------------
    // Message construction
    // ---------------------------------------------------------------

    #[test]
    fn test_message_new() {
        let id = MessageId::new(0, 1);
        let msg = Message::new(id, "orders.Created", Bytes::from("payload"));
        assert_eq!(msg.id, id);
        assert_eq!(msg.contract, "orders.Created");
        assert_eq!(msg.payload, Bytes::from("payload"));
    }

    #[test]
    fn test_message_empty_payload() {
        let msg = Message::new(MessageId::new(0, 0), "ping", Bytes::new());
        assert!(msg.payload.is_empty());
    }

    #[test]
    fn test_new_message_holds_contract_and_payload() {
        let draft = NewMessage::new("k", Bytes::from(vec![0xAB; 100]));
        assert_eq!(draft.contract, "k");
        assert_eq!(draft.payload.len(), 100);
    }

    // ---------------------------------------------------------------
    // Serde round-trip (JSON)
    // ---------------------------------------------------------------

    #[test]
    fn test_serde_roundtrip() {
        let msg = Message::new(
            MessageId::new(100, 1_700_000_000_000),
            "orders.Created",
            Bytes::from(r#"{"amount":99.99}"#),
        );
        let json = serde_json::to_string(&msg).expect("serialize");
        let back: Message = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(msg, back);
    }

    #[test]
    fn test_serde_roundtrip_binary_payload() {
        let msg = Message::new(
            MessageId::new(3, 4),
            "blob",
            Bytes::from(vec![0u8, 1, 2, 255, 254]),
        );
        let json = serde_json::to_string(&msg).expect("serialize");
        let back: Message = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(msg, back);
    }
}
