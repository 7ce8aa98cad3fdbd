//! Overflow mode and the notification channel to the recovery loop.

use crate::types::{SegmentId, StoreMode};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};

/// Message sent to the recovery loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// Load the oldest overflow segment back into the shards.
    Load,
    /// Release the last loaded segment and exit.
    Stop,
}

/// Store-wide overflow state.
///
/// The mode only changes through compare-and-swap, so exactly one caller
/// wins each transition. Notifications travel over a channel with a single
/// slot: a pending `Load` absorbs any further ones until the loop takes it.
#[derive(Debug)]
pub struct OverflowController {
    mode: AtomicU8,
    current_sid: AtomicU64,
    sender: RwLock<Option<SyncSender<Signal>>>,
}

impl OverflowController {
    /// Creates a controller in memory mode and the receiving end of its
    /// notification channel.
    #[must_use]
    pub fn new() -> (Self, Receiver<Signal>) {
        let (tx, rx) = mpsc::sync_channel(1);
        let controller = Self {
            mode: AtomicU8::new(StoreMode::Memory.as_u8()),
            current_sid: AtomicU64::new(SegmentId::NONE.as_u64()),
            sender: RwLock::new(Some(tx)),
        };
        (controller, rx)
    }

    /// Current mode.
    #[inline]
    pub fn mode(&self) -> StoreMode {
        StoreMode::from_u8(self.mode.load(Ordering::Acquire))
    }

    /// Whether new writes go to the segment log.
    #[inline]
    pub fn is_overflow(&self) -> bool {
        self.mode() == StoreMode::Overflow
    }

    /// Switches memory to overflow. Returns `true` for the caller that made
    /// the switch, `false` if the store already was in overflow mode.
    pub fn try_enter_overflow(&self) -> bool {
        self.transition(StoreMode::Memory, StoreMode::Overflow)
    }

    /// Switches overflow back to memory. Returns `true` for the caller that
    /// made the switch.
    pub fn try_enter_memory(&self) -> bool {
        self.transition(StoreMode::Overflow, StoreMode::Memory)
    }

    fn transition(&self, from: StoreMode, to: StoreMode) -> bool {
        self.mode
            .compare_exchange(
                from.as_u8(),
                to.as_u8(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Asks the recovery loop to load a segment without blocking.
    ///
    /// Returns `false` once the loop has been stopped.
    pub fn notify_load(&self) -> bool {
        let sender = self.sender.read();
        let Some(tx) = sender.as_ref() else {
            return false;
        };
        match tx.try_send(Signal::Load) {
            // Full: a load is already pending and covers this one.
            Ok(()) | Err(TrySendError::Full(_)) => true,
            Err(TrySendError::Disconnected(_)) => false,
        }
    }

    /// Sends `Stop` and closes the channel.
    ///
    /// Blocks until the loop has room for the signal. Later notifications
    /// are dropped.
    pub fn stop(&self) {
        let tx = self.sender.write().take();
        if let Some(tx) = tx {
            // The loop may already be gone; nothing left to stop then.
            let _ = tx.send(Signal::Stop);
        }
    }

    /// Records the segment the recovery loop loaded last.
    pub fn set_current_sid(&self, id: SegmentId) {
        self.current_sid.store(id.as_u64(), Ordering::Release);
    }

    /// The segment the recovery loop loaded last, or [`SegmentId::NONE`].
    pub fn current_sid(&self) -> SegmentId {
        SegmentId::new(self.current_sid.load(Ordering::Acquire))
    }
}
