//! # msgstore core
//!
//! In-memory message store of a message-queue broker.
//!
//! This crate provides:
//! - [`MessageEntity`], the stored message, and its CBOR encoding
//! - Sixteen lock-striped shards routed by the last hex digit of the id
//! - The overflow segment log ([`SegmentLog`], [`SegmentManager`])
//! - A background recovery loop reloading overflow into memory
//! - The [`MessageStore`] facade used by the broker
//!
//! ## Example
//!
//! ```rust,ignore
//! use msgstore_core::{MessageEntity, MessageStore, StoreConfig};
//!
//! let store = MessageStore::open(
//!     StoreConfig::default().max_capacity(100_000).overflow_dir("data/overflow"),
//! )?;
//!
//! store.save(entity);
//! for shard in 0..store.recover_num() {
//!     let (more, page) = store.page_query_entity(&shard_key(shard), now, 0, 100);
//!     // redeliver `page`, then update_entity / delete
//! }
//! store.close()?;
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod entity;
mod error;
mod overflow;
mod recovery;
pub mod segment;
pub mod shard;
mod stats;
mod store;
mod types;

pub use config::StoreConfig;
pub use entity::{message_id_for_shard, new_message_id, MessageEntity, MessageHeader};
pub use error::{StoreError, StoreResult};
pub use overflow::{OverflowController, Signal};
pub use segment::{LoadedSegment, SegmentInfo, SegmentLog, SegmentManager};
pub use shard::{route, shard_key, SHARD_COUNT};
pub use stats::{StatsSnapshot, StoreStats};
pub use store::MessageStore;
pub use types::{SegmentId, StoreMode};
