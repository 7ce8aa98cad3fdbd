//! Insertion-ordered entity list with identifier lookup.

use crate::entity::MessageEntity;
use std::collections::HashMap;

struct Node {
    entity: MessageEntity,
    /// Towards the front (newer).
    prev: Option<usize>,
    /// Towards the back (older).
    next: Option<usize>,
}

/// Doubly linked list of entities stored in a slot arena, plus an index
/// from message identifier to slot.
///
/// The front holds the newest insertion and the back the oldest. Lookups
/// never reorder the list. Each identifier occupies at most one slot.
#[derive(Default)]
pub struct EntityList {
    index: HashMap<String, usize>,
    slots: Vec<Option<Node>>,
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
}

impl EntityList {
    /// Creates an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty list with room for `capacity` entities.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            index: HashMap::with_capacity(capacity),
            slots: Vec::with_capacity(capacity),
            ..Self::default()
        }
    }

    /// Number of live entities.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Whether the list holds no entities.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Whether an entity with `message_id` is present.
    #[must_use]
    pub fn contains(&self, message_id: &str) -> bool {
        self.index.contains_key(message_id)
    }

    /// Looks up an entity by identifier.
    #[must_use]
    pub fn get(&self, message_id: &str) -> Option<&MessageEntity> {
        let slot = *self.index.get(message_id)?;
        self.slots[slot].as_ref().map(|n| &n.entity)
    }

    /// Looks up an entity by identifier for in-place mutation.
    pub fn get_mut(&mut self, message_id: &str) -> Option<&mut MessageEntity> {
        let slot = *self.index.get(message_id)?;
        self.slots[slot].as_mut().map(|n| &mut n.entity)
    }

    /// Inserts `entity` as the newest element.
    ///
    /// An existing entity with the same identifier is unlinked first and
    /// returned, so the identifier stays unique.
    pub fn push_front(&mut self, entity: MessageEntity) -> Option<MessageEntity> {
        let replaced = self.remove(&entity.message_id);
        let message_id = entity.message_id.clone();
        let slot = self.allocate(entity);

        if let Some(node) = self.slots[slot].as_mut() {
            node.prev = None;
            node.next = self.head;
        }
        if let Some(old_head) = self.head {
            if let Some(node) = self.slots[old_head].as_mut() {
                node.prev = Some(slot);
            }
        }
        self.head = Some(slot);
        if self.tail.is_none() {
            self.tail = Some(slot);
        }

        self.index.insert(message_id, slot);
        replaced
    }

    /// Removes and returns the entity with `message_id`.
    pub fn remove(&mut self, message_id: &str) -> Option<MessageEntity> {
        let slot = self.index.remove(message_id)?;
        self.unlink(slot);
        let node = self.slots[slot].take()?;
        self.free.push(slot);
        Some(node.entity)
    }

    /// Iterates from the oldest entity to the newest.
    pub fn iter_oldest_first(&self) -> OldestFirst<'_> {
        OldestFirst {
            list: self,
            cursor: self.tail,
        }
    }

    /// Removes every entity, returning them oldest first.
    pub fn drain_oldest_first(&mut self) -> Vec<MessageEntity> {
        let mut out = Vec::with_capacity(self.len());
        let mut cursor = self.tail;
        while let Some(slot) = cursor {
            match self.slots[slot].take() {
                Some(node) => {
                    cursor = node.prev;
                    out.push(node.entity);
                }
                None => break,
            }
        }
        self.index.clear();
        self.slots.clear();
        self.free.clear();
        self.head = None;
        self.tail = None;
        out
    }

    fn allocate(&mut self, entity: MessageEntity) -> usize {
        let node = Node {
            entity,
            prev: None,
            next: None,
        };
        if let Some(slot) = self.free.pop() {
            self.slots[slot] = Some(node);
            slot
        } else {
            self.slots.push(Some(node));
            self.slots.len() - 1
        }
    }

    fn unlink(&mut self, slot: usize) {
        let Some((prev, next)) = self.slots[slot].as_ref().map(|n| (n.prev, n.next)) else {
            return;
        };

        match prev {
            Some(p) => {
                if let Some(node) = self.slots[p].as_mut() {
                    node.next = next;
                }
            }
            None => self.head = next,
        }
        match next {
            Some(n) => {
                if let Some(node) = self.slots[n].as_mut() {
                    node.prev = prev;
                }
            }
            None => self.tail = prev,
        }
    }
}

impl std::fmt::Debug for EntityList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityList")
            .field("len", &self.len())
            .field("slots", &self.slots.len())
            .finish_non_exhaustive()
    }
}

/// Iterator over an [`EntityList`] from oldest to newest.
pub struct OldestFirst<'a> {
    list: &'a EntityList,
    cursor: Option<usize>,
}

impl<'a> Iterator for OldestFirst<'a> {
    type Item = &'a MessageEntity;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.list.slots[self.cursor?].as_ref()?;
        self.cursor = node.prev;
        Some(&node.entity)
    }
}
