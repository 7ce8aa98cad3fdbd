//! Property-based test generators using proptest.
//!
//! Provides strategies for message identifiers, entities and store
//! operations.

use crate::fixtures::DELIVER_LIMIT;
use msgstore_core::{MessageEntity, MessageHeader};
use proptest::prelude::*;

/// Strategy for identifiers in the broker's usual shape: 32 hex digits.
pub fn message_id_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[0-9a-f]{32}").expect("Invalid regex")
}

/// Strategy for arbitrary identifiers, including empty and non-hex ones.
pub fn any_message_id_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        3 => message_id_strategy(),
        1 => any::<String>(),
        1 => prop::string::string_regex("[0-9a-zA-Z_-]{0,8}").expect("Invalid regex"),
    ]
}

/// Strategy for delivery state relative to `now`.
///
/// Covers due, not yet due, exhausted and expired entities.
pub fn entity_strategy(now: i64) -> impl Strategy<Value = MessageEntity> {
    (
        message_id_strategy(),
        0..=DELIVER_LIMIT + 1,
        -120i64..120,
        -60i64..3_600,
        prop::collection::vec(any::<u8>(), 0..64),
    )
        .prop_map(move |(id, deliver_count, next_offset, expiry_offset, body)| {
            let header = MessageHeader {
                message_id: id,
                topic: "prop".to_string(),
                expired_time: now + expiry_offset,
                deliver_limit: DELIVER_LIMIT,
                ..MessageHeader::default()
            };
            let mut entity = MessageEntity::new(header, body, now - 300);
            entity.deliver_count = deliver_count;
            entity.next_deliver_time = now + next_offset;
            entity
        })
}

/// An operation against the store facade.
#[derive(Debug, Clone)]
pub enum StoreOperation {
    /// Save an entity
    Save(MessageEntity),
    /// Query an identifier
    Query(String),
    /// Delete an identifier
    Delete(String),
    /// Commit an identifier
    Commit(String),
}

/// Strategy for store operations over a small identifier space, so that
/// queries and deletes regularly hit saved entities.
pub fn store_operation_strategy(now: i64) -> impl Strategy<Value = StoreOperation> {
    let small_id = (0u8..32).prop_map(|n| format!("{:031x}{:x}", n, n % 16));
    prop_oneof![
        3 => (entity_strategy(now), small_id.clone()).prop_map(|(mut e, id)| {
            e.message_id = id.clone();
            e.header.message_id = id;
            StoreOperation::Save(e)
        }),
        2 => small_id.clone().prop_map(StoreOperation::Query),
        1 => small_id.clone().prop_map(StoreOperation::Delete),
        1 => small_id.prop_map(StoreOperation::Commit),
    ]
}

/// Strategy for a sequence of store operations.
pub fn operation_sequence_strategy(
    now: i64,
    min_ops: usize,
    max_ops: usize,
) -> impl Strategy<Value = Vec<StoreOperation>> {
    prop::collection::vec(store_operation_strategy(now), min_ops..max_ops)
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}
