//! The overflow segment log.
//!
//! When the shards are full the store spills entities into an append-only
//! log made of numbered segments. The recovery loop later reads the oldest
//! segment back into memory and removes it.
//!
//! ## Chunk Format
//!
//! ```text
//! | record_len (4) | sequence (8) | payload (N) | crc32 (4) |
//! ```
//!
//! `record_len` covers the whole frame. The payload is one CBOR-encoded
//! [`crate::MessageEntity`].

mod chunk;
mod dir;
mod manager;

pub use chunk::{compute_crc32, scan_chunks, Chunk, ChunkScan};
pub use dir::{list_segments, segment_file, OverflowDir};
pub use manager::{SegmentInfo, SegmentManager};

use crate::error::StoreResult;
use crate::types::SegmentId;

/// A segment read back for recovery.
#[derive(Debug, Clone)]
pub struct LoadedSegment {
    /// Identifier to pass to [`SegmentLog::remove`] once loaded.
    pub id: SegmentId,
    /// Chunks in append order.
    pub chunks: Vec<Chunk>,
}

/// Append-only log of persisted chunks consumed oldest segment first.
///
/// The store only relies on this interface; [`SegmentManager`] is the
/// implementation it ships with.
pub trait SegmentLog: Send + Sync {
    /// Opens the log and discovers segments left by an earlier run.
    fn start(&self) -> StoreResult<()>;

    /// Appends one serialized entity.
    fn append(&self, payload: &[u8]) -> StoreResult<()>;

    /// Returns the oldest segment, or `None` if the log is empty.
    ///
    /// The returned segment is sealed: later appends go to a newer segment.
    fn peek_oldest(&self) -> StoreResult<Option<LoadedSegment>>;

    /// Deletes a segment. Unknown identifiers are ignored.
    fn remove(&self, id: SegmentId) -> StoreResult<()>;

    /// Number of segments currently held.
    fn segment_count(&self) -> usize;

    /// Flushes and closes the log. Persisted segments stay where they are.
    fn close(&self) -> StoreResult<()>;
}
