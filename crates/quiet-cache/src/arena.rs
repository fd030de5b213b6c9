use std::sync::Arc;

/// Sentinel index meaning "no neighbour".
pub const NIL: u32 = u32::MAX;

/// One entry of the recency list. The value is shared so readers can clone
/// it out without holding the owner's lock.
pub struct Entry<K, V> {
    pub key: K,
    pub value: Arc<V>,
    prev: u32,
    next: u32,
}

impl<K, V> Entry<K, V> {
    pub fn new(key: K, value: V) -> Self {
        Self {
            key,
            value: Arc::new(value),
            prev: NIL,
            next: NIL,
        }
    }

    #[inline]
    pub fn prev(&self) -> u32 {
        self.prev
    }

    #[inline]
    pub fn next(&self) -> u32 {
        self.next
    }
}

/// Fixed-capacity doubly-linked list stored in a slot vector.
///
/// The head is the most recently touched entry, the tail the least. Slot
/// indices act as pointers and freed slots are recycled through a free list,
/// so the arena never allocates after construction.
pub struct RecencyList<K, V> {
    slots: Vec<Option<Entry<K, V>>>,
    free: Vec<u32>,
    head: u32,
    tail: u32,
    len: usize,
}

impl<K, V> RecencyList<K, V> {
    pub fn with_capacity(capacity: usize) -> Self {
        let slots = (0..capacity).map(|_| None).collect();
        // Reversed so the lowest index is handed out first.
        let free = (0..capacity as u32).rev().collect();

        Self {
            slots,
            free,
            head: NIL,
            tail: NIL,
            len: 0,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn head(&self) -> u32 {
        self.head
    }

    #[inline]
    pub fn tail(&self) -> u32 {
        self.tail
    }

    #[inline]
    pub fn get(&self, index: u32) -> Option<&Entry<K, V>> {
        self.slots.get(index as usize).and_then(Option::as_ref)
    }

    #[inline]
    fn entry_mut(&mut self, index: u32) -> Option<&mut Entry<K, V>> {
        self.slots.get_mut(index as usize).and_then(Option::as_mut)
    }

    /// Store `entry` in a free slot and link it as the most recent.
    /// Returns `None` when every slot is taken.
    pub fn push_front(&mut self, entry: Entry<K, V>) -> Option<u32> {
        let index = self.free.pop()?;
        self.slots[index as usize] = Some(entry);
        self.link_front(index);
        self.len += 1;
        Some(index)
    }

    /// Unlink and return the entry at `index`, recycling its slot.
    pub fn remove(&mut self, index: u32) -> Option<Entry<K, V>> {
        self.get(index)?;
        self.unlink(index);
        let entry = self.slots[index as usize].take()?;
        self.free.push(index);
        self.len -= 1;
        Some(entry)
    }

    /// Mark the entry at `index` as the most recently touched.
    pub fn promote(&mut self, index: u32) {
        if self.head == index || self.get(index).is_none() {
            return;
        }
        self.unlink(index);
        self.link_front(index);
    }

    /// Remove the least recently touched entry.
    pub fn pop_back(&mut self) -> Option<Entry<K, V>> {
        if self.tail == NIL {
            return None;
        }
        self.remove(self.tail)
    }

    fn link_front(&mut self, index: u32) {
        let old_head = self.head;
        if let Some(entry) = self.entry_mut(index) {
            entry.prev = NIL;
            entry.next = old_head;
        }
        if let Some(head) = self.entry_mut(old_head) {
            head.prev = index;
        }
        self.head = index;
        if self.tail == NIL {
            self.tail = index;
        }
    }

    fn unlink(&mut self, index: u32) {
        let (prev, next) = match self.get(index) {
            Some(entry) => (entry.prev, entry.next),
            None => return,
        };

        match self.entry_mut(prev) {
            Some(p) => p.next = next,
            None => self.head = next,
        }
        match self.entry_mut(next) {
            Some(n) => n.prev = prev,
            None => self.tail = prev,
        }

        if let Some(entry) = self.entry_mut(index) {
            entry.prev = NIL;
            entry.next = NIL;
        }
    }
}
