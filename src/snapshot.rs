//! Snapshot codec
//!
//! Serializes a table's rows (identity, sort key, hidden flag) so a view can
//! be rebuilt without recomputing every sort key.
//!
//! ## Frame Format
//! ```text
//! ┌──────────┬───────────┬───────────┬────────────┬───────────────┬─────────┐
//! │Magic (4) │Version (2)│ Rows (4)  │ Len (4)    │ bincode rows  │ CRC (4) │
//! └──────────┴───────────┴───────────┴────────────┴───────────────┴─────────┘
//! ```
//! All integers are big-endian; the CRC32 covers the payload only.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};

use crate::error::{KeyTableError, Result};
use crate::key::{ObjectKey, SortKey};

/// Frame magic
pub const MAGIC: &[u8; 4] = b"KTSN";

/// Current frame version
pub const VERSION: u16 = 1;

/// Magic + version + row count + payload length
pub const HEADER_SIZE: usize = 14;

/// Trailing checksum
pub const FOOTER_SIZE: usize = 4;

/// One row as stored in a snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotRow {
    pub id: ObjectKey,
    pub key: SortKey,
    pub hidden: bool,
}

/// Encode rows into a checksummed frame
pub fn encode(rows: &[SnapshotRow]) -> Result<Bytes> {
    let payload =
        bincode::serialize(rows).map_err(|e| KeyTableError::Serialization(e.to_string()))?;

    let mut buf = BytesMut::with_capacity(HEADER_SIZE + payload.len() + FOOTER_SIZE);
    buf.put_slice(MAGIC);
    buf.put_u16(VERSION);
    buf.put_u32(rows.len() as u32);
    buf.put_u32(payload.len() as u32);
    buf.put_slice(&payload);
    buf.put_u32(crc32fast::hash(&payload));

    Ok(buf.freeze())
}

/// Decode a frame produced by [`encode`]
pub fn decode(bytes: &[u8]) -> Result<Vec<SnapshotRow>> {
    if bytes.len() < HEADER_SIZE + FOOTER_SIZE {
        return Err(KeyTableError::Corrupted(format!(
            "Incomplete snapshot: expected at least {} bytes, got {}",
            HEADER_SIZE + FOOTER_SIZE,
            bytes.len()
        )));
    }

    let mut buf = bytes;
    if &buf[..4] != MAGIC {
        return Err(KeyTableError::Corrupted("Bad snapshot magic".to_string()));
    }
    buf.advance(4);

    let version = buf.get_u16();
    if version != VERSION {
        return Err(KeyTableError::Corrupted(format!(
            "Unsupported snapshot version {}",
            version
        )));
    }

    let row_count = buf.get_u32() as usize;
    let payload_len = buf.get_u32() as usize;
    if buf.remaining() != payload_len + FOOTER_SIZE {
        return Err(KeyTableError::Corrupted(format!(
            "Snapshot length mismatch: header says {} payload bytes, frame has {}",
            payload_len,
            buf.remaining().saturating_sub(FOOTER_SIZE)
        )));
    }

    let payload = &buf[..payload_len];
    buf.advance(payload_len);
    let expected_crc = buf.get_u32();
    let actual_crc = crc32fast::hash(payload);
    if expected_crc != actual_crc {
        return Err(KeyTableError::Corrupted(format!(
            "Snapshot checksum mismatch: expected {:08x}, got {:08x}",
            expected_crc, actual_crc
        )));
    }

    let rows: Vec<SnapshotRow> =
        bincode::deserialize(payload).map_err(|e| KeyTableError::Serialization(e.to_string()))?;
    if rows.len() != row_count {
        return Err(KeyTableError::Corrupted(format!(
            "Snapshot row count mismatch: header says {}, payload has {}",
            row_count,
            rows.len()
        )));
    }
    Ok(rows)
}
