//! Store counters.
//!
//! ```rust,ignore
//! let store = MessageStore::open_in_memory(StoreConfig::default())?;
//! store.save(entity);
//!
//! let stats = store.stats().snapshot();
//! println!("saved {} ({} to overflow)", stats.saves, stats.overflow_saves);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters describing what the store has done since it was opened.
///
/// All counters are relaxed atomics and only ever increase.
#[derive(Debug, Default)]
pub struct StoreStats {
    saves: AtomicU64,
    overflow_saves: AtomicU64,
    failed_saves: AtomicU64,
    deletes: AtomicU64,
    swept: AtomicU64,

    overflow_transitions: AtomicU64,
    memory_transitions: AtomicU64,
    drained: AtomicU64,

    segments_loaded: AtomicU64,
    entities_recovered: AtomicU64,
    decode_failures: AtomicU64,
}

impl StoreStats {
    /// Creates zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_save(&self, overflow: bool) {
        self.saves.fetch_add(1, Ordering::Relaxed);
        if overflow {
            self.overflow_saves.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn record_failed_save(&self) {
        self.failed_saves.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_delete(&self) {
        self.deletes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_swept(&self, count: u64) {
        self.swept.fetch_add(count, Ordering::Relaxed);
    }

    pub(crate) fn record_overflow_transition(&self) {
        self.overflow_transitions.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_memory_transition(&self) {
        self.memory_transitions.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_drained(&self, count: u64) {
        self.drained.fetch_add(count, Ordering::Relaxed);
    }

    pub(crate) fn record_segment_loaded(&self, recovered: u64, failures: u64) {
        self.segments_loaded.fetch_add(1, Ordering::Relaxed);
        self.entities_recovered
            .fetch_add(recovered, Ordering::Relaxed);
        self.decode_failures.fetch_add(failures, Ordering::Relaxed);
    }

    /// Saves that returned `true`, memory and overflow alike.
    pub fn saves(&self) -> u64 {
        self.saves.load(Ordering::Relaxed)
    }

    /// Saves that went to the segment log.
    pub fn overflow_saves(&self) -> u64 {
        self.overflow_saves.load(Ordering::Relaxed)
    }

    /// Saves that returned `false`.
    pub fn failed_saves(&self) -> u64 {
        self.failed_saves.load(Ordering::Relaxed)
    }

    /// Entities removed by `delete` or `rollback`.
    pub fn deletes(&self) -> u64 {
        self.deletes.load(Ordering::Relaxed)
    }

    /// Entities removed by page scans because they were exhausted or expired.
    pub fn swept(&self) -> u64 {
        self.swept.load(Ordering::Relaxed)
    }

    /// Times the store switched from memory to overflow mode.
    pub fn overflow_transitions(&self) -> u64 {
        self.overflow_transitions.load(Ordering::Relaxed)
    }

    /// Times the store switched back to memory mode.
    pub fn memory_transitions(&self) -> u64 {
        self.memory_transitions.load(Ordering::Relaxed)
    }

    /// Entities moved from the shards into the log, on overflow or shutdown.
    pub fn drained(&self) -> u64 {
        self.drained.load(Ordering::Relaxed)
    }

    /// Segments read back by the recovery loop.
    pub fn segments_loaded(&self) -> u64 {
        self.segments_loaded.load(Ordering::Relaxed)
    }

    /// Entities reinserted by the recovery loop.
    pub fn entities_recovered(&self) -> u64 {
        self.entities_recovered.load(Ordering::Relaxed)
    }

    /// Chunks the recovery loop could not decode.
    pub fn decode_failures(&self) -> u64 {
        self.decode_failures.load(Ordering::Relaxed)
    }

    /// Returns a plain copy of every counter.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            saves: self.saves(),
            overflow_saves: self.overflow_saves(),
            failed_saves: self.failed_saves(),
            deletes: self.deletes(),
            swept: self.swept(),
            overflow_transitions: self.overflow_transitions(),
            memory_transitions: self.memory_transitions(),
            drained: self.drained(),
            segments_loaded: self.segments_loaded(),
            entities_recovered: self.entities_recovered(),
            decode_failures: self.decode_failures(),
        }
    }
}

/// A point-in-time copy of [`StoreStats`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    /// Successful saves.
    pub saves: u64,
    /// Saves that went to the segment log.
    pub overflow_saves: u64,
    /// Saves that returned `false`.
    pub failed_saves: u64,
    /// Explicit deletes.
    pub deletes: u64,
    /// Entities removed by page scans.
    pub swept: u64,
    /// Memory to overflow switches.
    pub overflow_transitions: u64,
    /// Overflow to memory switches.
    pub memory_transitions: u64,
    /// Entities drained from the shards into the log.
    pub drained: u64,
    /// Segments loaded by recovery.
    pub segments_loaded: u64,
    /// Entities reinserted by recovery.
    pub entities_recovered: u64,
    /// Chunks recovery failed to decode.
    pub decode_failures: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_stats_are_zero() {
        let stats = StoreStats::new();
        assert_eq!(stats.snapshot(), StatsSnapshot::default());
    }

    #[test]
    fn overflow_saves_also_count_as_saves() {
        let stats = StoreStats::new();
        stats.record_save(false);
        stats.record_save(true);
        stats.record_failed_save();

        assert_eq!(stats.saves(), 2);
        assert_eq!(stats.overflow_saves(), 1);
        assert_eq!(stats.failed_saves(), 1);
    }

    #[test]
    fn segment_loads_accumulate() {
        let stats = StoreStats::new();
        stats.record_segment_loaded(10, 1);
        stats.record_segment_loaded(5, 0);

        let snap = stats.snapshot();
        assert_eq!(snap.segments_loaded, 2);
        assert_eq!(snap.entities_recovered, 15);
        assert_eq!(snap.decode_failures, 1);
    }

    #[test]
    fn concurrent_updates() {
        use std::sync::Arc;
        use std::thread;

        let stats = Arc::new(StoreStats::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let s = Arc::clone(&stats);
                thread::spawn(move || {
                    for _ in 0..100 {
                        s.record_save(false);
                        s.record_swept(2);
                    }
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(stats.saves(), 800);
        assert_eq!(stats.swept(), 1600);
    }
}
