//! Shards: the in-memory half of the store.
//!
//! Every message lives in exactly one of [`SHARD_COUNT`] shards, chosen by
//! [`route`]. Each shard is an [`EntityList`] behind its own reader-writer
//! lock. Only a full-store drain holds more than one shard lock, and it
//! takes them in index order.

mod list;
mod router;

pub use list::{EntityList, OldestFirst};
pub use router::{route, shard_key, SHARD_COUNT};

use crate::entity::MessageEntity;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// One lock-protected entity list.
#[derive(Debug, Default)]
pub struct Shard {
    list: RwLock<EntityList>,
}

impl Shard {
    /// Creates an empty shard sized for `capacity` entities.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            list: RwLock::new(EntityList::with_capacity(capacity)),
        }
    }

    /// Acquires the shard for reading.
    pub fn read(&self) -> RwLockReadGuard<'_, EntityList> {
        self.list.read()
    }

    /// Acquires the shard for writing.
    pub fn write(&self) -> RwLockWriteGuard<'_, EntityList> {
        self.list.write()
    }

    /// Current number of entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.list.read().len()
    }

    /// Whether the shard is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.list.read().is_empty()
    }
}

/// The fixed set of shards shared by the store facade and the recovery loop.
#[derive(Debug)]
pub struct ShardSet {
    shards: Vec<Shard>,
    capacity: usize,
}

impl ShardSet {
    /// Creates [`SHARD_COUNT`] empty shards holding `capacity` entries each.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        // Only the initial allocation is bounded; shards may grow past it.
        let reserve = capacity.min(1024);
        Self {
            shards: (0..SHARD_COUNT)
                .map(|_| Shard::with_capacity(reserve))
                .collect(),
            capacity,
        }
    }

    /// Per-shard capacity that triggers overflow.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The shard at `index`, reduced modulo [`SHARD_COUNT`].
    #[must_use]
    pub fn get(&self, index: usize) -> &Shard {
        &self.shards[index % SHARD_COUNT]
    }

    /// The shard `message_id` routes to.
    #[must_use]
    pub fn shard_for(&self, message_id: &str) -> &Shard {
        self.get(route(message_id))
    }

    /// Iterates over all shards in index order.
    pub fn iter(&self) -> impl Iterator<Item = &Shard> {
        self.shards.iter()
    }

    /// Write-locks every shard in index order.
    ///
    /// The guards are returned in the same order and released when dropped.
    pub fn write_all(&self) -> Vec<RwLockWriteGuard<'_, EntityList>> {
        self.shards.iter().map(Shard::write).collect()
    }

    /// Inserts an entity at the front of its shard, ignoring capacity.
    pub fn insert(&self, entity: MessageEntity) {
        self.shard_for(&entity.message_id).write().push_front(entity);
    }

    /// Live entities over all shards, taking each shard lock in turn.
    #[must_use]
    pub fn total_len(&self) -> usize {
        self.shards.iter().map(Shard::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::message_id_for_shard;

    fn entity(id: String) -> MessageEntity {
        MessageEntity {
            message_id: id,
            ..MessageEntity::default()
        }
    }

    #[test]
    fn insert_routes_by_suffix() {
        let set = ShardSet::new(4);
        set.insert(entity(message_id_for_shard(3)));
        set.insert(entity(message_id_for_shard(3)));
        set.insert(entity(message_id_for_shard(12)));

        assert_eq!(set.get(3).len(), 2);
        assert_eq!(set.get(12).len(), 1);
        assert_eq!(set.total_len(), 3);
        assert_eq!(set.capacity(), 4);
    }

    #[test]
    fn insert_ignores_capacity() {
        let set = ShardSet::new(1);
        for _ in 0..5 {
            set.insert(entity(message_id_for_shard(0)));
        }
        assert_eq!(set.get(0).len(), 5);
    }

    #[test]
    fn same_id_stays_unique() {
        let set = ShardSet::new(8);
        let id = message_id_for_shard(7);
        set.insert(entity(id.clone()));
        set.insert(entity(id.clone()));
        assert_eq!(set.total_len(), 1);
        assert!(set.shard_for(&id).read().contains(&id));
    }

    #[test]
    fn write_all_locks_every_shard() {
        let set = ShardSet::new(4);
        set.insert(entity(message_id_for_shard(5)));

        let guards = set.write_all();
        assert_eq!(guards.len(), SHARD_COUNT);
        assert_eq!(guards[5].len(), 1);
        assert!(set.get(0).list.try_read().is_none());
        drop(guards);
        assert!(set.get(0).list.try_read().is_some());
    }
}
