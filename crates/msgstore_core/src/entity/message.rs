//! The stored message entity.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Broker metadata attached to a message.
///
/// The store only reads `deliver_limit`; every other field is carried
/// through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MessageHeader {
    /// Message identifier as assigned by the producer.
    pub message_id: String,
    /// Topic the message was published to.
    pub topic: String,
    /// Message type within the topic.
    pub message_type: String,
    /// Producer group.
    pub group_id: String,
    /// Expiry as epoch seconds.
    pub expired_time: i64,
    /// Maximum number of delivery attempts.
    pub deliver_limit: i32,
    /// Fire-and-forget delivery (no acknowledgement expected).
    pub fly: bool,
    /// Free-form properties.
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

/// A message held by the store until every consumer group acknowledged it.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MessageEntity {
    /// Globally unique identifier; its last character selects the shard.
    pub message_id: String,
    /// Broker metadata, including the delivery limit.
    pub header: MessageHeader,
    /// Topic the message was published to.
    pub topic: String,
    /// Message type within the topic.
    pub message_type: String,
    /// Group of the publishing producer.
    pub publish_group: String,
    /// Opaque payload.
    #[serde(default)]
    pub body: Vec<u8>,
    /// Set once the producer confirmed its transaction.
    pub commit: bool,
    /// Publish time as epoch seconds.
    pub publish_time: i64,
    /// Expiry as epoch seconds.
    pub expired_time: i64,
    /// Delivery attempts so far.
    pub deliver_count: i32,
    /// Earliest time of the next delivery attempt, epoch seconds.
    pub next_deliver_time: i64,
    /// Consumer groups that acknowledged the message.
    #[serde(default)]
    pub succ_groups: Vec<String>,
    /// Consumer groups that rejected or failed the message.
    #[serde(default)]
    pub fail_groups: Vec<String>,
}

impl MessageEntity {
    /// Creates an entity from its header, copying the routing fields.
    #[must_use]
    pub fn new(header: MessageHeader, body: Vec<u8>, publish_time: i64) -> Self {
        Self {
            message_id: header.message_id.clone(),
            topic: header.topic.clone(),
            message_type: header.message_type.clone(),
            publish_group: header.group_id.clone(),
            expired_time: header.expired_time,
            commit: false,
            publish_time,
            deliver_count: 0,
            next_deliver_time: publish_time,
            succ_groups: Vec::new(),
            fail_groups: Vec::new(),
            body,
            header,
        }
    }

    /// Maximum number of delivery attempts.
    #[inline]
    #[must_use]
    pub fn deliver_limit(&self) -> i32 {
        self.header.deliver_limit
    }

    /// Whether a redelivery scan at `now` should hand this message out.
    #[must_use]
    pub fn is_redeliverable(&self, now: i64) -> bool {
        self.next_deliver_time <= now
            && self.deliver_count < self.deliver_limit()
            && self.expired_time > now
    }

    /// Whether a redelivery scan at `now` should drop this message:
    /// retries are exhausted or it has expired.
    #[must_use]
    pub fn is_dead(&self, now: i64) -> bool {
        self.deliver_count >= self.deliver_limit() || self.expired_time <= now
    }

    /// Copies the delivery progress of `other` into `self`.
    pub fn apply_delivery_progress(&mut self, other: &MessageEntity) {
        self.deliver_count = other.deliver_count;
        self.next_deliver_time = other.next_deliver_time;
        self.succ_groups.clone_from(&other.succ_groups);
        self.fail_groups.clone_from(&other.fail_groups);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(deliver_count: i32, next: i64, expired: i64) -> MessageEntity {
        let mut e = MessageEntity::new(
            MessageHeader {
                message_id: "abc1".into(),
                deliver_limit: 3,
                expired_time: expired,
                ..MessageHeader::default()
            },
            vec![1, 2, 3],
            0,
        );
        e.deliver_count = deliver_count;
        e.next_deliver_time = next;
        e
    }

    #[test]
    fn new_copies_header_fields() {
        let header = MessageHeader {
            message_id: "m-1".into(),
            topic: "trade".into(),
            message_type: "pay".into(),
            group_id: "producers".into(),
            expired_time: 500,
            deliver_limit: 5,
            ..MessageHeader::default()
        };
        let e = MessageEntity::new(header, Vec::new(), 100);
        assert_eq!(e.message_id, "m-1");
        assert_eq!(e.topic, "trade");
        assert_eq!(e.publish_group, "producers");
        assert_eq!(e.expired_time, 500);
        assert_eq!(e.next_deliver_time, 100);
        assert_eq!(e.deliver_limit(), 5);
        assert!(!e.commit);
    }

    #[test]
    fn redeliverable_window() {
        assert!(entity(0, 10, 100).is_redeliverable(10));
        assert!(!entity(0, 11, 100).is_redeliverable(10));
        assert!(!entity(3, 10, 100).is_redeliverable(10));
        assert!(!entity(0, 10, 10).is_redeliverable(10));
    }

    #[test]
    fn dead_when_exhausted_or_expired() {
        assert!(entity(3, 0, 100).is_dead(10));
        assert!(entity(0, 0, 10).is_dead(10));
        assert!(!entity(2, 50, 100).is_dead(10));
    }

    #[test]
    fn not_yet_due_is_neither() {
        let e = entity(0, 50, 100);
        assert!(!e.is_redeliverable(10));
        assert!(!e.is_dead(10));
    }

    #[test]
    fn delivery_progress_copies_only_progress() {
        let mut stored = entity(0, 0, 100);
        let mut update = entity(2, 40, 999);
        update.succ_groups = vec!["g1".into()];
        update.fail_groups = vec!["g2".into()];
        update.commit = true;

        stored.apply_delivery_progress(&update);
        assert_eq!(stored.deliver_count, 2);
        assert_eq!(stored.next_deliver_time, 40);
        assert_eq!(stored.succ_groups, vec!["g1".to_string()]);
        assert_eq!(stored.fail_groups, vec!["g2".to_string()]);
        assert_eq!(stored.expired_time, 100);
        assert!(!stored.commit);
    }
}
