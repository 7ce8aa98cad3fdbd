//! The message store facade.

use crate::config::StoreConfig;
use crate::entity::MessageEntity;
use crate::error::{StoreError, StoreResult};
use crate::overflow::{OverflowController, Signal};
use crate::recovery::RecoveryLoop;
use crate::segment::{SegmentLog, SegmentManager};
use crate::shard::{route, ShardSet, SHARD_COUNT};
use crate::stats::StoreStats;
use crate::types::StoreMode;
use parking_lot::{Mutex, RwLock};
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// State shared between the facade and the recovery thread.
pub(crate) struct StoreInner {
    pub(crate) config: StoreConfig,
    pub(crate) shards: ShardSet,
    pub(crate) log: Arc<dyn SegmentLog>,
    pub(crate) controller: OverflowController,
    pub(crate) stats: StoreStats,
    /// Serializes full-store drains. Saves never take it; they are held
    /// back by the shard locks a drain owns instead.
    passes: Mutex<()>,
}

impl StoreInner {
    pub(crate) fn new(config: StoreConfig, log: Arc<dyn SegmentLog>) -> (Self, Receiver<Signal>) {
        let (controller, signals) = OverflowController::new();
        let inner = Self {
            shards: ShardSet::new(config.shard_capacity),
            config,
            log,
            controller,
            stats: StoreStats::new(),
            passes: Mutex::new(()),
        };
        (inner, signals)
    }

    fn append_entity(&self, entity: &MessageEntity) -> StoreResult<()> {
        let bytes = entity.encode()?;
        self.log.append(&bytes)
    }

    /// Empties every shard into the log, oldest entity first.
    ///
    /// Every shard stays write-locked until the whole drain is done, so a
    /// save that sees overflow mode appends after the entities drained
    /// ahead of it. Entities that cannot be appended stay in their shard.
    /// Returns the number of entities written.
    fn drain_to_log(&self) -> u64 {
        let _pass = self.passes.lock();
        let mut shards = self.shards.write_all();
        let mut drained = 0u64;

        for (index, list) in shards.iter_mut().enumerate() {
            let mut pending = list.drain_oldest_first().into_iter();

            while let Some(entity) = pending.next() {
                match self.append_entity(&entity) {
                    Ok(()) => drained += 1,
                    Err(e @ StoreError::Encode { .. }) => {
                        error!(message_id = %entity.message_id, error = %e, "dropping entity that cannot be encoded");
                    }
                    Err(e) => {
                        error!(shard = index, error = %e, "overflow append failed, keeping entities in memory");
                        list.push_front(entity);
                        for rest in pending.by_ref() {
                            list.push_front(rest);
                        }
                        break;
                    }
                }
            }
        }
        drop(shards);

        self.stats.record_drained(drained);
        drained
    }
}

/// Sharded in-memory message store that overflows into a segment log.
///
/// Messages are spread over [`SHARD_COUNT`] shards by the last hex digit of
/// their identifier. When any shard reaches its capacity the whole store
/// switches to overflow mode: every shard is drained into the segment log
/// and new messages are appended there, while a background thread loads
/// segments back as redelivery scans empty the shards.
///
/// ```rust,ignore
/// use msgstore_core::{MessageStore, StoreConfig};
///
/// let store = MessageStore::open(StoreConfig::default().overflow_dir("overflow"))?;
/// store.save(entity);
/// let (more, page) = store.page_query_entity("3", now, 0, 100);
/// store.close()?;
/// ```
pub struct MessageStore {
    inner: Arc<StoreInner>,
    recovery: Mutex<Option<RecoveryLoop>>,
    is_open: RwLock<bool>,
}

impl MessageStore {
    /// Opens a store with the log described by `config`.
    ///
    /// With an overflow directory, segments left by an earlier run are
    /// queued for recovery before this returns.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, the overflow
    /// directory cannot be locked, or the recovery thread cannot start.
    pub fn open(config: StoreConfig) -> StoreResult<Self> {
        config.validate()?;
        let log = Arc::new(SegmentManager::from_config(&config));
        Self::with_log(config, log)
    }

    /// Opens a store whose overflow segments are kept in memory.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn open_in_memory(mut config: StoreConfig) -> StoreResult<Self> {
        config.overflow_dir = None;
        Self::open(config)
    }

    /// Opens a store on top of a caller-provided segment log.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the log fails
    /// to start.
    pub fn with_log(config: StoreConfig, log: Arc<dyn SegmentLog>) -> StoreResult<Self> {
        config.validate()?;
        log.start()?;

        let (inner, signals) = StoreInner::new(config, log);
        let inner = Arc::new(inner);
        let recovery = match RecoveryLoop::spawn(Arc::clone(&inner), signals) {
            Ok(recovery) => recovery,
            Err(e) => {
                if let Err(close_err) = inner.log.close() {
                    warn!(error = %close_err, "failed to close segment log");
                }
                return Err(e);
            }
        };

        let pending = inner.log.segment_count();
        if pending > 0 {
            if inner.controller.try_enter_overflow() {
                inner.stats.record_overflow_transition();
            }
            inner.controller.notify_load();
            info!(segments = pending, "resuming overflow left by a previous run");
        }

        info!(
            shard_capacity = inner.config.shard_capacity,
            overflow_dir = ?inner.config.overflow_dir,
            "message store opened"
        );

        Ok(Self {
            inner,
            recovery: Mutex::new(Some(recovery)),
            is_open: RwLock::new(true),
        })
    }

    /// Stops the recovery loop, flushes every shard into the log and closes
    /// the log. Calling it again does nothing.
    ///
    /// # Errors
    ///
    /// Returns an error if the log fails to sync on close.
    pub fn close(&self) -> StoreResult<()> {
        let mut is_open = self.is_open.write();
        if !*is_open {
            return Ok(());
        }
        *is_open = false;

        self.inner.controller.stop();
        if let Some(recovery) = self.recovery.lock().take() {
            recovery.join();
        }

        let drained = self.inner.drain_to_log();
        let result = self.inner.log.close();
        info!(drained, "message store closed");
        result
    }

    /// Whether the store accepts new messages.
    #[must_use]
    pub fn is_open(&self) -> bool {
        *self.is_open.read()
    }

    /// Stores a new message.
    ///
    /// If the target shard is full, or the log still holds segments, the
    /// store switches to overflow mode first. Returns `false` if the message
    /// could not be written.
    pub fn save(&self, entity: MessageEntity) -> bool {
        let is_open = self.is_open.read();
        if !*is_open {
            warn!(message_id = %entity.message_id, "save on a closed store");
            self.inner.stats.record_failed_save();
            return false;
        }

        let inner = &*self.inner;
        let shard = inner.shards.shard_for(&entity.message_id);

        if (shard.len() >= inner.shards.capacity() || inner.log.segment_count() > 0)
            && inner.controller.try_enter_overflow()
        {
            inner.stats.record_overflow_transition();
            info!(
                shard = route(&entity.message_id),
                capacity = inner.shards.capacity(),
                "switching to overflow mode"
            );
            let drained = inner.drain_to_log();
            debug!(drained, "drained shards into overflow log");
            inner.controller.notify_load();
        }

        // The mode may have flipped since the check above; decide under the lock.
        let mut list = shard.write();
        if inner.controller.is_overflow() {
            match inner.append_entity(&entity) {
                Ok(()) => {
                    inner.stats.record_save(true);
                    true
                }
                Err(e) => {
                    error!(message_id = %entity.message_id, error = %e, "overflow save failed");
                    inner.stats.record_failed_save();
                    false
                }
            }
        } else {
            list.push_front(entity);
            inner.stats.record_save(false);
            true
        }
    }

    /// Looks up a resident message.
    #[must_use]
    pub fn query(&self, message_id: &str) -> Option<MessageEntity> {
        self.inner
            .shards
            .shard_for(message_id)
            .read()
            .get(message_id)
            .cloned()
    }

    /// Marks a message as committed. Returns `false` if it is not resident.
    pub fn commit(&self, message_id: &str) -> bool {
        let mut list = self.inner.shards.shard_for(message_id).write();
        match list.get_mut(message_id) {
            Some(entity) => {
                entity.commit = true;
                true
            }
            None => false,
        }
    }

    /// Discards an uncommitted message. Same as [`MessageStore::delete`].
    pub fn rollback(&self, message_id: &str) -> bool {
        self.delete(message_id)
    }

    /// Copies delivery progress from `entity` into the resident message with
    /// the same identifier. A missing message is not an error.
    pub fn update_entity(&self, entity: &MessageEntity) -> bool {
        let mut list = self.inner.shards.shard_for(&entity.message_id).write();
        if let Some(resident) = list.get_mut(&entity.message_id) {
            resident.apply_delivery_progress(entity);
        }
        true
    }

    /// Removes a message. A missing message is not an error.
    pub fn delete(&self, message_id: &str) -> bool {
        let removed = self
            .inner
            .shards
            .shard_for(message_id)
            .write()
            .remove(message_id);
        if removed.is_some() {
            self.inner.stats.record_delete();
        }
        true
    }

    /// Same as [`MessageStore::update_entity`].
    pub fn async_update(&self, entity: &MessageEntity) -> bool {
        self.update_entity(entity)
    }

    /// Same as [`MessageStore::delete`].
    pub fn async_delete(&self, message_id: &str) -> bool {
        self.delete(message_id)
    }

    /// Same as [`MessageStore::commit`].
    pub fn async_commit(&self, message_id: &str) -> bool {
        self.commit(message_id)
    }

    /// Returns one page of messages due for redelivery from the shard
    /// `hash_key` routes to, oldest first.
    ///
    /// A message is due when `next_deliver_time <= next_delivery_time`, it
    /// has delivery attempts left and it has not expired. `start_idx` skips
    /// that many due messages. Exhausted or expired messages anywhere in the
    /// shard are deleted and never returned. The flag is `true` when more
    /// due messages follow the page.
    ///
    /// An empty page asks the recovery loop to load the next segment.
    pub fn page_query_entity(
        &self,
        hash_key: &str,
        next_delivery_time: i64,
        start_idx: usize,
        limit: usize,
    ) -> (bool, Vec<MessageEntity>) {
        let shard = self.inner.shards.shard_for(hash_key);
        let mut page = Vec::new();
        let mut dead = Vec::new();

        {
            let list = shard.read();
            let mut due = 0usize;
            for entity in list.iter_oldest_first() {
                if entity.is_redeliverable(next_delivery_time) {
                    if due >= start_idx && page.len() <= limit {
                        page.push(entity.clone());
                    }
                    due += 1;
                } else if entity.is_dead(next_delivery_time) {
                    dead.push(entity.message_id.clone());
                }
            }
        }

        if !dead.is_empty() {
            let mut list = shard.write();
            let swept = dead.iter().filter(|id| list.remove(id).is_some()).count();
            self.inner.stats.record_swept(swept as u64);
            debug!(shard = route(hash_key), swept, "removed exhausted or expired messages");
        }

        if page.is_empty() {
            self.inner.controller.notify_load();
        }

        let more = page.len() > limit;
        page.truncate(limit);
        (more, page)
    }

    /// Number of hash keys a redelivery sweep should cover.
    #[must_use]
    pub fn recover_num(&self) -> usize {
        SHARD_COUNT
    }

    /// One-line occupancy report: `memory-length:<resident messages>`.
    #[must_use]
    pub fn monitor(&self) -> String {
        format!("memory-length:{}", self.len())
    }

    /// Resident messages over all shards.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.shards.total_len()
    }

    /// Whether no message is resident.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.shards.iter().all(|shard| shard.is_empty())
    }

    /// Where new messages currently go.
    #[must_use]
    pub fn mode(&self) -> StoreMode {
        self.inner.controller.mode()
    }

    /// Segments waiting in the overflow log.
    #[must_use]
    pub fn segment_count(&self) -> usize {
        self.inner.log.segment_count()
    }

    /// Counters since the store was opened.
    #[must_use]
    pub fn stats(&self) -> &StoreStats {
        &self.inner.stats
    }

    /// The configuration the store was opened with.
    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }
}

impl Drop for MessageStore {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

impl std::fmt::Debug for MessageStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageStore")
            .field("mode", &self.mode())
            .field("len", &self.len())
            .field("segments", &self.segment_count())
            .field("is_open", &self.is_open())
            .finish_non_exhaustive()
    }
}
