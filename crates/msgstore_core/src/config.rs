//! Store configuration.

use crate::error::{StoreError, StoreResult};
use crate::shard::SHARD_COUNT;
use std::path::PathBuf;

/// Configuration for opening a [`crate::MessageStore`].
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Entries a single shard holds before the store switches to overflow.
    pub shard_capacity: usize,

    /// Directory for overflow segments. `None` keeps segments in memory.
    pub overflow_dir: Option<PathBuf>,

    /// Maximum size of one segment in bytes before a new one is started.
    pub max_segment_size: u64,

    /// Maximum number of chunks in one segment before a new one is started.
    pub max_chunks_per_segment: usize,

    /// Whether every overflow append is flushed to the OS.
    pub sync_on_append: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            shard_capacity: 10_000,
            overflow_dir: None,
            max_segment_size: 64 * 1024 * 1024, // 64 MB
            max_chunks_per_segment: 1_000,
            sync_on_append: false,
        }
    }
}

impl StoreConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the per-shard capacity directly.
    #[must_use]
    pub const fn shard_capacity(mut self, capacity: usize) -> Self {
        self.shard_capacity = capacity;
        self
    }

    /// Spreads a store-wide capacity evenly over the shards.
    ///
    /// Every shard gets at least one slot.
    #[must_use]
    pub const fn max_capacity(mut self, total: usize) -> Self {
        let per_shard = total / SHARD_COUNT;
        self.shard_capacity = if per_shard == 0 { 1 } else { per_shard };
        self
    }

    /// Persists overflow segments under `dir`.
    #[must_use]
    pub fn overflow_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.overflow_dir = Some(dir.into());
        self
    }

    /// Sets the maximum segment size in bytes.
    #[must_use]
    pub const fn max_segment_size(mut self, size: u64) -> Self {
        self.max_segment_size = size;
        self
    }

    /// Sets the maximum number of chunks per segment.
    #[must_use]
    pub const fn max_chunks_per_segment(mut self, chunks: usize) -> Self {
        self.max_chunks_per_segment = chunks;
        self
    }

    /// Sets whether each overflow append is flushed.
    #[must_use]
    pub const fn sync_on_append(mut self, value: bool) -> Self {
        self.sync_on_append = value;
        self
    }

    /// Total number of entries the shards hold before overflowing.
    #[must_use]
    pub const fn total_capacity(&self) -> usize {
        self.shard_capacity.saturating_mul(SHARD_COUNT)
    }

    /// Checks that the limits are usable.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidConfig`] for a zero shard capacity or
    /// zero segment limits.
    pub fn validate(&self) -> StoreResult<()> {
        if self.shard_capacity == 0 {
            return Err(StoreError::invalid_config("shard_capacity must be positive"));
        }
        if self.max_segment_size == 0 {
            return Err(StoreError::invalid_config("max_segment_size must be positive"));
        }
        if self.max_chunks_per_segment == 0 {
            return Err(StoreError::invalid_config(
                "max_chunks_per_segment must be positive",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = StoreConfig::default();
        assert_eq!(config.shard_capacity, 10_000);
        assert!(config.overflow_dir.is_none());
        assert!(!config.sync_on_append);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn builder_pattern() {
        let config = StoreConfig::new()
            .shard_capacity(2)
            .overflow_dir("/tmp/overflow")
            .max_chunks_per_segment(10)
            .sync_on_append(true);

        assert_eq!(config.shard_capacity, 2);
        assert_eq!(config.total_capacity(), 32);
        assert_eq!(config.max_chunks_per_segment, 10);
        assert!(config.sync_on_append);
        assert_eq!(config.overflow_dir, Some(PathBuf::from("/tmp/overflow")));
    }

    #[test]
    fn max_capacity_divides_over_shards() {
        assert_eq!(StoreConfig::new().max_capacity(160).shard_capacity, 10);
        assert_eq!(StoreConfig::new().max_capacity(5).shard_capacity, 1);
    }

    #[test]
    fn validate_rejects_zero_limits() {
        assert!(StoreConfig::new().shard_capacity(0).validate().is_err());
        assert!(StoreConfig::new().max_segment_size(0).validate().is_err());
        assert!(StoreConfig::new()
            .max_chunks_per_segment(0)
            .validate()
            .is_err());
    }
}
