//! Core type definitions.

use std::fmt;

/// Identifier of a persisted overflow segment.
///
/// Segment IDs are monotonically increasing, start at 1 and are never
/// reused. [`SegmentId::NONE`] stands for "no segment".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SegmentId(pub u64);

impl SegmentId {
    /// Placeholder for "no segment loaded yet".
    pub const NONE: Self = Self(0);

    /// The first identifier handed out by a fresh log.
    pub const FIRST: Self = Self(1);

    /// Creates a segment ID.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Returns the following segment ID.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// Returns true for [`SegmentId::NONE`].
    #[must_use]
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "seg:{}", self.0)
    }
}

/// Where new writes land.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum StoreMode {
    /// Writes are inserted into the shards.
    Memory = 0,
    /// Writes are appended to the overflow segment log.
    Overflow = 1,
}

impl StoreMode {
    /// Decodes the raw flag value; anything but `1` is memory mode.
    #[must_use]
    pub const fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Self::Overflow,
            _ => Self::Memory,
        }
    }

    /// Returns the raw flag value.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for StoreMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory => f.write_str("memory"),
            Self::Overflow => f.write_str("overflow"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segment_id_ordering() {
        assert!(SegmentId::FIRST < SegmentId::FIRST.next());
        assert!(SegmentId::NONE.is_none());
        assert!(!SegmentId::FIRST.is_none());
        assert_eq!(SegmentId::new(7).to_string(), "seg:7");
    }

    #[test]
    fn mode_flag_roundtrip() {
        assert_eq!(StoreMode::from_u8(StoreMode::Overflow.as_u8()), StoreMode::Overflow);
        assert_eq!(StoreMode::from_u8(StoreMode::Memory.as_u8()), StoreMode::Memory);
        assert_eq!(StoreMode::from_u8(9), StoreMode::Memory);
    }
}
