//! Intrusive doubly linked list backed by `SlotArena`.
//!
//! Nodes live in a [`SlotArena`] and link to each other by [`SlotId`], so a
//! policy can keep the id in its key index and splice the node in O(1)
//! without unsafe pointer juggling. [`LruCache`](crate::policy::lru::LruCache)
//! and [`AdaptiveCache`](crate::policy::adaptive::AdaptiveCache) build their
//! recency orders on it; [`GhostList`](crate::ds::GhostList) uses it for
//! evicted-key history.
//!
//! ```text
//!   head (MRU) ─► [id_3] ◄──► [id_1] ◄──► [id_2] ◄── tail (LRU)
//! ```
//!
//! | Operation                     | Time |
//! |-------------------------------|------|
//! | `push_front` / `push_back`    | O(1) |
//! | `pop_front` / `pop_back`      | O(1) |
//! | `move_to_front` / `remove`    | O(1) |
//! | `iter`                        | O(n) |
use crate::ds::slot_arena::{SlotArena, SlotId};

#[derive(Debug)]
struct Link<T> {
    value: T,
    prev: Option<SlotId>,
    next: Option<SlotId>,
}

/// Arena-backed doubly linked list addressed by [`SlotId`].
#[derive(Debug)]
pub struct IntrusiveList<T> {
    arena: SlotArena<Link<T>>,
    head: Option<SlotId>,
    tail: Option<SlotId>,
}

impl<T> IntrusiveList<T> {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            arena: SlotArena::with_capacity(capacity),
            head: None,
            tail: None,
        }
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    pub fn contains(&self, id: SlotId) -> bool {
        self.arena.contains(id)
    }

    /// Value at the front (most recent end).
    pub fn front(&self) -> Option<&T> {
        self.get(self.head?)
    }

    /// Value at the back (least recent end).
    pub fn back(&self) -> Option<&T> {
        self.get(self.tail?)
    }

    pub fn back_id(&self) -> Option<SlotId> {
        self.tail
    }

    pub fn get(&self, id: SlotId) -> Option<&T> {
        self.arena.get(id).map(|link| &link.value)
    }

    pub fn get_mut(&mut self, id: SlotId) -> Option<&mut T> {
        self.arena.get_mut(id).map(|link| &mut link.value)
    }

    /// Front-to-back iterator.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            list: self,
            current: self.head,
        }
    }

    pub fn push_front(&mut self, value: T) -> SlotId {
        let id = self.arena.insert(Link {
            value,
            prev: None,
            next: None,
        });
        self.attach_front(id);
        id
    }

    pub fn push_back(&mut self, value: T) -> SlotId {
        let id = self.arena.insert(Link {
            value,
            prev: None,
            next: None,
        });
        self.attach_back(id);
        id
    }

    pub fn pop_front(&mut self) -> Option<T> {
        self.remove(self.head?)
    }

    pub fn pop_back(&mut self) -> Option<T> {
        self.remove(self.tail?)
    }

    pub fn remove(&mut self, id: SlotId) -> Option<T> {
        self.detach(id)?;
        self.arena.remove(id).map(|link| link.value)
    }

    /// Moves `id` to the front; returns `false` if `id` is not in the list.
    pub fn move_to_front(&mut self, id: SlotId) -> bool {
        if !self.arena.contains(id) {
            return false;
        }
        if self.head != Some(id) {
            self.detach(id);
            self.attach_front(id);
        }
        true
    }

    pub fn clear(&mut self) {
        self.arena.clear();
        self.head = None;
        self.tail = None;
    }

    fn detach(&mut self, id: SlotId) -> Option<()> {
        let (prev, next) = {
            let link = self.arena.get(id)?;
            (link.prev, link.next)
        };

        match prev.and_then(|p| self.arena.get_mut(p)) {
            Some(link) => link.next = next,
            None => self.head = next,
        }
        match next.and_then(|n| self.arena.get_mut(n)) {
            Some(link) => link.prev = prev,
            None => self.tail = prev,
        }

        let link = self.arena.get_mut(id)?;
        link.prev = None;
        link.next = None;
        Some(())
    }

    fn attach_front(&mut self, id: SlotId) {
        let old_head = self.head;
        if let Some(link) = self.arena.get_mut(id) {
            link.prev = None;
            link.next = old_head;
        }
        match old_head.and_then(|h| self.arena.get_mut(h)) {
            Some(link) => link.prev = Some(id),
            None => self.tail = Some(id),
        }
        self.head = Some(id);
    }

    fn attach_back(&mut self, id: SlotId) {
        let old_tail = self.tail;
        if let Some(link) = self.arena.get_mut(id) {
            link.next = None;
            link.prev = old_tail;
        }
        match old_tail.and_then(|t| self.arena.get_mut(t)) {
            Some(link) => link.next = Some(id),
            None => self.head = Some(id),
        }
        self.tail = Some(id);
    }

    #[cfg(any(test, debug_assertions))]
    pub fn debug_validate_invariants(&self) {
        self.arena.debug_validate_invariants();
        if self.head.is_none() || self.tail.is_none() {
            assert!(self.head.is_none() && self.tail.is_none());
            assert_eq!(self.len(), 0);
            return;
        }

        let mut count = 0usize;
        let mut prev = None;
        let mut current = self.head;
        while let Some(id) = current {
            let link = self.arena.get(id).expect("linked slot missing");
            assert_eq!(link.prev, prev);
            prev = Some(id);
            current = link.next;
            count += 1;
            assert!(count <= self.len(), "cycle in intrusive list");
        }
        assert_eq!(self.tail, prev);
        assert_eq!(count, self.len());
    }
}

impl<T> Default for IntrusiveList<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Front-to-back iterator over an [`IntrusiveList`].
pub struct Iter<'a, T> {
    list: &'a IntrusiveList<T>,
    current: Option<SlotId>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let link = self.list.arena.get(self.current?)?;
        self.current = link.next;
        Some(&link.value)
    }
}
