//! Display slot allocation for mempool transactions.

use std::collections::BTreeSet;

/// Index of a display slot.
pub type SlotIndex = u8;

/// Fixed-size pool of display slots.
///
/// Simultaneous renderers need stable positions for mempool transactions, so
/// each resident transaction holds a slot from `0..capacity` for its whole
/// stay. Allocation always returns the lowest free slot, which keeps slot
/// assignment deterministic for a deterministic arrival sequence.
#[derive(Debug, Clone)]
pub struct SlotPool {
    free: BTreeSet<SlotIndex>,
    capacity: u8,
}

impl SlotPool {
    /// Create a pool with slots `0..capacity`.
    pub fn new(capacity: u8) -> Self {
        Self {
            free: (0..capacity).collect(),
            capacity,
        }
    }

    /// Allocate the lowest free slot, or `None` if the pool is exhausted.
    pub fn allocate(&mut self) -> Option<SlotIndex> {
        let slot = *self.free.iter().next()?;
        self.free.remove(&slot);
        Some(slot)
    }

    /// Return a slot to the pool.
    ///
    /// Releasing an already-free or out-of-range slot is a no-op, so release
    /// is idempotent per allocation.
    pub fn release(&mut self, slot: SlotIndex) {
        if slot < self.capacity {
            self.free.insert(slot);
        }
    }

    /// Number of slots currently free.
    pub fn available(&self) -> usize {
        self.free.len()
    }

    /// Total slot count.
    pub fn capacity(&self) -> u8 {
        self.capacity
    }

    /// Whether no slots are free.
    pub fn is_exhausted(&self) -> bool {
        self.free.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocates_lowest_free_slot() {
        let mut pool = SlotPool::new(4);
        assert_eq!(pool.allocate(), Some(0));
        assert_eq!(pool.allocate(), Some(1));
        pool.release(0);
        assert_eq!(pool.allocate(), Some(0), "freed slot is reused first");
        assert_eq!(pool.allocate(), Some(2));
    }

    #[test]
    fn test_exhaustion_returns_none() {
        let mut pool = SlotPool::new(2);
        assert_eq!(pool.allocate(), Some(0));
        assert_eq!(pool.allocate(), Some(1));
        assert!(pool.is_exhausted());
        assert_eq!(pool.allocate(), None);

        pool.release(1);
        assert_eq!(pool.allocate(), Some(1));
    }

    #[test]
    fn test_release_is_idempotent() {
        let mut pool = SlotPool::new(3);
        let slot = pool.allocate().unwrap();
        pool.release(slot);
        pool.release(slot);
        assert_eq!(pool.available(), 3, "double release must not inflate the pool");

        // Out-of-range releases are ignored.
        pool.release(200);
        assert_eq!(pool.available(), 3);
    }
}
