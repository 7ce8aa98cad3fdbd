//! Message identifier to shard routing.

use tracing::warn;

/// Number of shards in every store.
pub const SHARD_COUNT: usize = 16;

/// Maps a message identifier to its shard.
///
/// The last character is read as a hexadecimal digit and reduced modulo
/// [`SHARD_COUNT`]. Empty identifiers and identifiers ending in anything
/// else route to shard 0; this is logged, never reported to the caller.
#[must_use]
pub fn route(message_id: &str) -> usize {
    match message_id.chars().last().and_then(|c| c.to_digit(16)) {
        Some(digit) => digit as usize % SHARD_COUNT,
        None => {
            warn!(message_id, "invalid message id, routing to shard 0");
            0
        }
    }
}

/// Returns a hash key that routes to `shard`, for per-shard page scans.
#[must_use]
pub fn shard_key(shard: usize) -> String {
    format!("{:x}", shard % SHARD_COUNT)
}
