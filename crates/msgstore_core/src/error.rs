//! Error types for the message store.

use std::io;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur inside the message store.
///
/// Facade operations such as [`crate::MessageStore::save`] never return
/// these directly; they log them and report `false`. Lifecycle and segment
/// log calls propagate them.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Storage backend error.
    #[error("storage error: {0}")]
    Storage(#[from] msgstore_storage::StorageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// An entity could not be serialized.
    #[error("failed to encode entity {message_id}: {message}")]
    Encode {
        /// Identifier of the entity.
        message_id: String,
        /// Description of the failure.
        message: String,
    },

    /// A persisted chunk could not be deserialized.
    #[error("failed to decode entity: {message}")]
    Decode {
        /// Description of the failure.
        message: String,
    },

    /// A segment is corrupted or truncated.
    #[error("segment corruption: {message}")]
    SegmentCorruption {
        /// Description of the corruption.
        message: String,
    },

    /// Checksum mismatch on a chunk.
    #[error("checksum mismatch: expected {expected:08x}, got {actual:08x}")]
    ChecksumMismatch {
        /// Checksum stored in the chunk.
        expected: u32,
        /// Checksum computed over the chunk.
        actual: u32,
    },

    /// Another process holds the overflow directory.
    #[error("overflow directory locked: another process has exclusive access")]
    DirectoryLocked,

    /// The segment log has been closed.
    #[error("segment log is closed")]
    LogClosed,

    /// Configuration rejected by validation.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// Description of the problem.
        message: String,
    },
}

impl StoreError {
    /// Creates an encode error for the given entity.
    pub fn encode(message_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Encode {
            message_id: message_id.into(),
            message: message.into(),
        }
    }

    /// Creates a decode error.
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Creates a segment corruption error.
    pub fn segment_corruption(message: impl Into<String>) -> Self {
        Self::SegmentCorruption {
            message: message.into(),
        }
    }

    /// Creates an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }
}
