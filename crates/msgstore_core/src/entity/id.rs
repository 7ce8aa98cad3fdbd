//! Message identifier generation.

use crate::shard::SHARD_COUNT;
use uuid::Uuid;

/// Generates a fresh message identifier.
///
/// Identifiers are 32 lowercase hex digits, so the trailing character
/// always routes to a real shard.
#[must_use]
pub fn new_message_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Generates a fresh identifier that routes to `shard`.
///
/// `shard` is reduced modulo the shard count.
#[must_use]
pub fn message_id_for_shard(shard: usize) -> String {
    let mut id = new_message_id();
    id.pop();
    let digit = std::char::from_digit((shard % SHARD_COUNT) as u32, 16).unwrap_or('0');
    id.push(digit);
    id
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shard::route;

    #[test]
    fn ids_are_unique_hex() {
        let a = new_message_id();
        let b = new_message_id();
        assert_ne!(a, b);
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn shard_targeted_ids_route_there() {
        for shard in 0..SHARD_COUNT {
            assert_eq!(route(&message_id_for_shard(shard)), shard);
        }
        assert_eq!(route(&message_id_for_shard(SHARD_COUNT + 3)), 3);
    }
}
