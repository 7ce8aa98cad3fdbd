//! Test fixtures and store helpers.

use msgstore_core::{
    message_id_for_shard, MessageEntity, MessageHeader, MessageStore, StoreConfig,
};
use std::path::Path;
use std::time::{Duration, Instant};
use tempfile::TempDir;

/// Reference clock for fixtures, in epoch seconds.
pub const NOW: i64 = 1_700_000_000;

/// Delivery limit given to fixture entities.
pub const DELIVER_LIMIT: i32 = 3;

/// A test store with automatic cleanup.
pub struct TestStore {
    /// The store instance.
    pub store: MessageStore,
    /// The temporary directory (kept alive to prevent cleanup).
    temp_dir: Option<TempDir>,
}

impl TestStore {
    /// Creates a store whose overflow log lives in memory.
    pub fn memory(shard_capacity: usize) -> Self {
        let config = StoreConfig::default().shard_capacity(shard_capacity);
        Self {
            store: MessageStore::open_in_memory(config).expect("Failed to open in-memory store"),
            temp_dir: None,
        }
    }

    /// Creates a store overflowing into a temporary directory.
    pub fn file(shard_capacity: usize) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = MessageStore::open(Self::file_config(temp_dir.path(), shard_capacity))
            .expect("Failed to open file store");
        Self {
            store,
            temp_dir: Some(temp_dir),
        }
    }

    fn file_config(dir: &Path, shard_capacity: usize) -> StoreConfig {
        StoreConfig::default()
            .shard_capacity(shard_capacity)
            .overflow_dir(dir)
            .max_chunks_per_segment(16)
    }

    /// Returns the overflow directory if file-based, None if in-memory.
    pub fn dir(&self) -> Option<&Path> {
        self.temp_dir.as_ref().map(TempDir::path)
    }

    /// Closes the store and opens a new one on the same directory.
    ///
    /// # Panics
    ///
    /// Panics for in-memory stores.
    pub fn reopen(self) -> Self {
        let Self { store, temp_dir } = self;
        let temp_dir = temp_dir.expect("Only file stores can be reopened");
        let capacity = store.config().shard_capacity;
        store.close().expect("Failed to close store");
        drop(store);

        let store = MessageStore::open(Self::file_config(temp_dir.path(), capacity))
            .expect("Failed to reopen store");
        Self {
            store,
            temp_dir: Some(temp_dir),
        }
    }
}

impl std::ops::Deref for TestStore {
    type Target = MessageStore;

    fn deref(&self) -> &Self::Target {
        &self.store
    }
}

/// An entity routed to `shard` that is due for delivery at `now`.
pub fn due_entity(shard: usize, now: i64) -> MessageEntity {
    let header = MessageHeader {
        message_id: message_id_for_shard(shard),
        topic: "trade".to_string(),
        message_type: "pay-succ".to_string(),
        group_id: "producer".to_string(),
        expired_time: now + 3_600,
        deliver_limit: DELIVER_LIMIT,
        ..MessageHeader::default()
    };
    MessageEntity::new(header, b"fixture body".to_vec(), now - 1)
}

/// An entity routed to `shard` that has used up its delivery attempts.
pub fn exhausted_entity(shard: usize, now: i64) -> MessageEntity {
    let mut entity = due_entity(shard, now);
    entity.deliver_count = entity.deliver_limit();
    entity
}

/// An entity routed to `shard` that expires at `now`.
pub fn expired_entity(shard: usize, now: i64) -> MessageEntity {
    let mut entity = due_entity(shard, now);
    entity.expired_time = now;
    entity
}

/// An entity routed to `shard` that becomes due `delay` seconds after `now`.
pub fn future_entity(shard: usize, now: i64, delay: i64) -> MessageEntity {
    let mut entity = due_entity(shard, now);
    entity.next_deliver_time = now + delay;
    entity
}

/// Polls `condition` until it holds or `timeout` passes.
///
/// Returns the final value of `condition`.
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    condition()
}

/// Waits up to five seconds for the recovery loop to empty the log.
pub fn wait_for_recovery(store: &MessageStore) -> bool {
    wait_until(Duration::from_secs(5), || {
        store.segment_count() == 0 && store.mode() == msgstore_core::StoreMode::Memory
    })
}
