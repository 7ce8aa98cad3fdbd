//! Background loop that reloads overflow segments into the shards.

use crate::entity::MessageEntity;
use crate::error::StoreResult;
use crate::overflow::Signal;
use crate::store::StoreInner;
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info, warn};

const THREAD_NAME: &str = "msgstore-recovery";

/// Handle to the recovery thread.
pub(crate) struct RecoveryLoop {
    handle: JoinHandle<()>,
}

impl RecoveryLoop {
    /// Spawns the loop. It runs until it receives [`Signal::Stop`] or the
    /// channel closes.
    pub(crate) fn spawn(inner: Arc<StoreInner>, signals: Receiver<Signal>) -> StoreResult<Self> {
        let handle = thread::Builder::new()
            .name(THREAD_NAME.to_string())
            .spawn(move || run(&inner, &signals))?;
        Ok(Self { handle })
    }

    /// Waits for the loop to exit.
    pub(crate) fn join(self) {
        if self.handle.join().is_err() {
            error!("recovery thread panicked");
        }
    }
}

fn run(inner: &StoreInner, signals: &Receiver<Signal>) {
    debug!("recovery loop started");
    while let Ok(signal) = signals.recv() {
        match signal {
            Signal::Load => load_oldest(inner),
            Signal::Stop => {
                release_current(inner);
                break;
            }
        }
    }
    debug!("recovery loop exited");
}

/// Moves the oldest segment back into the shards and removes it.
pub(crate) fn load_oldest(inner: &StoreInner) {
    let segment = match inner.log.peek_oldest() {
        Ok(Some(segment)) => segment,
        Ok(None) => {
            enter_memory(inner);
            return;
        }
        Err(e) => {
            error!(error = %e, "failed to read oldest overflow segment");
            return;
        }
    };

    let mut recovered = 0u64;
    let mut failures = 0u64;
    for chunk in &segment.chunks {
        match MessageEntity::decode(&chunk.payload) {
            Ok(entity) => {
                inner.shards.insert(entity);
                recovered += 1;
            }
            Err(e) => {
                warn!(segment = %segment.id, sequence = chunk.sequence, error = %e, "skipping undecodable chunk");
                failures += 1;
            }
        }
    }

    inner.controller.set_current_sid(segment.id);
    inner.stats.record_segment_loaded(recovered, failures);
    debug!(segment = %segment.id, recovered, failures, "loaded overflow segment");

    if let Err(e) = inner.log.remove(segment.id) {
        error!(segment = %segment.id, error = %e, "failed to remove loaded segment");
        return;
    }

    if inner.log.segment_count() == 0 {
        enter_memory(inner);
    } else if inner.shards.total_len() < inner.config.total_capacity() {
        inner.controller.notify_load();
    }
}

fn enter_memory(inner: &StoreInner) {
    if !inner.controller.try_enter_memory() {
        return;
    }
    inner.stats.record_memory_transition();
    info!("overflow log drained, writes go to memory again");

    // A save that chose overflow before the switch holds its shard lock
    // until its append is done. Wait those out, then pick up what they wrote.
    for shard in inner.shards.iter() {
        drop(shard.write());
    }
    if inner.log.segment_count() > 0 {
        inner.controller.notify_load();
    }
}

/// The last loaded segment is resident in memory; drop its file so the
/// shutdown flush does not leave a second copy behind.
fn release_current(inner: &StoreInner) {
    let sid = inner.controller.current_sid();
    if sid.is_none() {
        return;
    }
    if let Err(e) = inner.log.remove(sid) {
        warn!(segment = %sid, error = %e, "failed to remove current segment on stop");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use crate::entity::message_id_for_shard;
    use crate::segment::{SegmentLog, SegmentManager};
    use crate::types::StoreMode;

    fn inner_with_log(capacity: usize) -> (Arc<StoreInner>, Receiver<Signal>) {
        let log = Arc::new(SegmentManager::in_memory());
        log.start().unwrap();
        let config = StoreConfig::default().shard_capacity(capacity);
        let (inner, rx) = StoreInner::new(config, log);
        (Arc::new(inner), rx)
    }

    fn append(inner: &StoreInner, shard: usize) -> String {
        let entity = MessageEntity {
            message_id: message_id_for_shard(shard),
            ..MessageEntity::default()
        };
        inner.log.append(&entity.encode().unwrap()).unwrap();
        entity.message_id
    }

    #[test]
    fn load_on_empty_log_returns_to_memory() {
        let (inner, _rx) = inner_with_log(4);
        inner.controller.try_enter_overflow();

        load_oldest(&inner);
        assert_eq!(inner.controller.mode(), StoreMode::Memory);
        assert_eq!(inner.stats.memory_transitions(), 1);
    }

    #[test]
    fn load_moves_segment_into_shards() {
        let (inner, _rx) = inner_with_log(4);
        inner.controller.try_enter_overflow();
        let a = append(&inner, 2);
        let b = append(&inner, 9);

        load_oldest(&inner);
        assert!(inner.shards.shard_for(&a).read().contains(&a));
        assert!(inner.shards.shard_for(&b).read().contains(&b));
        assert_eq!(inner.log.segment_count(), 0);
        assert_eq!(inner.controller.mode(), StoreMode::Memory);
        assert!(!inner.controller.current_sid().is_none());
        assert_eq!(inner.stats.entities_recovered(), 2);
    }

    #[test]
    fn undecodable_chunks_are_skipped() {
        let (inner, _rx) = inner_with_log(4);
        inner.log.append(b"not cbor").unwrap();
        let id = append(&inner, 1);

        load_oldest(&inner);
        assert_eq!(inner.shards.total_len(), 1);
        assert!(inner.shards.shard_for(&id).read().contains(&id));
        assert_eq!(inner.stats.decode_failures(), 1);
    }

    #[test]
    fn remaining_backlog_is_resignalled() {
        let (inner, rx) = inner_with_log(4);
        inner.controller.try_enter_overflow();
        append(&inner, 0);
        inner.log.peek_oldest().unwrap();
        append(&inner, 0);
        assert_eq!(inner.log.segment_count(), 2);

        load_oldest(&inner);
        assert_eq!(rx.try_recv(), Ok(Signal::Load));
        assert!(inner.controller.is_overflow());

        load_oldest(&inner);
        assert_eq!(inner.shards.total_len(), 2);
        assert_eq!(inner.controller.mode(), StoreMode::Memory);
    }

    #[test]
    fn thread_exits_on_stop() {
        let (inner, rx) = inner_with_log(4);
        let recovery = RecoveryLoop::spawn(Arc::clone(&inner), rx).unwrap();
        append(&inner, 5);

        inner.controller.notify_load();
        inner.controller.stop();
        recovery.join();

        assert_eq!(inner.shards.total_len(), 1);
        assert_eq!(inner.log.segment_count(), 0);
    }
}
