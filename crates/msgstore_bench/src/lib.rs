//! Benchmark utilities.

#![warn(missing_docs)]

use msgstore_core::{message_id_for_shard, MessageEntity, MessageHeader};
use rand::Rng;

/// Reference clock for benchmark entities, in epoch seconds.
pub const NOW: i64 = 1_700_000_000;

/// Generate a random message body of the specified size.
pub fn random_body(size: usize) -> Vec<u8> {
    let mut rng = rand::thread_rng();
    (0..size).map(|_| rng.gen()).collect()
}

/// Generate a due entity on a random shard.
pub fn random_entity(body_size: usize) -> MessageEntity {
    let shard = rand::thread_rng().gen_range(0..16);
    entity_on_shard(shard, body_size)
}

/// Generate a due entity routed to `shard`.
pub fn entity_on_shard(shard: usize, body_size: usize) -> MessageEntity {
    let header = MessageHeader {
        message_id: message_id_for_shard(shard),
        topic: "bench".to_string(),
        expired_time: NOW + 3_600,
        deliver_limit: 100,
        ..MessageHeader::default()
    };
    MessageEntity::new(header, random_body(body_size), NOW - 1)
}

/// Generate a batch of entities spread over all shards.
pub fn generate_entities(count: usize, body_size: usize) -> Vec<MessageEntity> {
    (0..count).map(|_| random_entity(body_size)).collect()
}
