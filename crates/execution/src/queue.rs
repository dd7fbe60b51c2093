//! Bounded FIFO queue of accepted blocks.

use sae_types::Block;
use std::collections::VecDeque;

/// Bounded FIFO holding accepted blocks awaiting execution.
///
/// Invariants: `len() <= capacity()` at every observable instant, and a
/// block enqueued before another dequeues before it. A refused enqueue
/// returns the block to the caller, who must hold and re-offer it.
#[derive(Debug)]
pub struct ExecQueue {
    items: VecDeque<Block>,
    capacity: usize,
}

impl ExecQueue {
    /// Create a queue with the given capacity bound.
    pub fn new(capacity: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append to the tail, or hand the block back if at capacity.
    pub fn enqueue(&mut self, block: Block) -> Result<(), Block> {
        if self.items.len() >= self.capacity {
            return Err(block);
        }
        self.items.push_back(block);
        Ok(())
    }

    /// Pop the head. Used only by the executor.
    pub fn dequeue(&mut self) -> Option<Block> {
        self.items.pop_front()
    }

    /// Current length.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Whether the queue is at capacity.
    pub fn is_full(&self) -> bool {
        self.items.len() >= self.capacity
    }

    /// The configured bound.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
