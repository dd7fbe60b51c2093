//! Blocks moving through the pipeline.

use crate::{BlockId, BlockUid, Transaction};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;

/// A batch of transactions moving through the pipeline as a unit.
///
/// A block is immutable after creation with one exception: the failure set
/// is assigned lazily the first time the block executes and is never
/// recomputed afterwards. The failure outcome is a property of this run's
/// execution, not a durable fact about the block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    id: BlockId,
    uid: BlockUid,
    created_at: Duration,
    txs: Vec<Transaction>,
    failed_txs: Option<BTreeSet<usize>>,
}

impl Block {
    /// Create a block from the selected transactions.
    ///
    /// Callers guarantee `txs` is non-empty; selection never produces an
    /// empty block.
    pub fn new(id: BlockId, uid: BlockUid, created_at: Duration, txs: Vec<Transaction>) -> Self {
        debug_assert!(!txs.is_empty(), "blocks carry at least one transaction");
        Self {
            id,
            uid,
            created_at,
            txs,
            failed_txs: None,
        }
    }

    /// Display identifier.
    pub fn id(&self) -> BlockId {
        self.id
    }

    /// Globally unique token.
    pub fn uid(&self) -> BlockUid {
        self.uid
    }

    /// Simulated time at which the proposer created this block.
    pub fn created_at(&self) -> Duration {
        self.created_at
    }

    /// The transactions contained, in final (accepted) order.
    pub fn txs(&self) -> &[Transaction] {
        &self.txs
    }

    /// Number of contained transactions, the stand-in for gas cost.
    pub fn tx_count(&self) -> usize {
        self.txs.len()
    }

    /// The memoized failure set, if execution has assigned it.
    pub fn failed_txs(&self) -> Option<&BTreeSet<usize>> {
        self.failed_txs.as_ref()
    }

    /// Whether the failure set has been assigned.
    pub fn failures_assigned(&self) -> bool {
        self.failed_txs.is_some()
    }

    /// Record the per-transaction failure outcome.
    ///
    /// Only the first call takes effect; the outcome is memoized and a
    /// repeat assignment (replay, re-render) is ignored. Returns whether
    /// this call stored the set.
    pub fn assign_failed_txs(&mut self, failed: BTreeSet<usize>) -> bool {
        if self.failed_txs.is_some() {
            return false;
        }
        self.failed_txs = Some(failed);
        true
    }

    /// Whether the transaction at `index` failed. `false` until assignment.
    pub fn tx_failed(&self, index: usize) -> bool {
        self.failed_txs
            .as_ref()
            .is_some_and(|set| set.contains(&index))
    }

    /// Snapshot for the notification stream.
    pub fn snapshot(&self) -> BlockSnapshot {
        BlockSnapshot {
            id: self.id,
            uid: self.uid,
            tx_count: self.tx_count(),
            created_at: self.created_at,
            failed_txs: self.failed_txs.clone(),
        }
    }
}

/// Immutable view of a block carried on stage-transition events.
///
/// Consumers (renderers, tests) only ever see snapshots; the live block is
/// owned by exactly one stage at a time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockSnapshot {
    /// Display identifier.
    pub id: BlockId,
    /// Globally unique token.
    pub uid: BlockUid,
    /// Number of contained transactions.
    pub tx_count: usize,
    /// Creation time.
    pub created_at: Duration,
    /// Failure set, present once execution has assigned it.
    pub failed_txs: Option<BTreeSet<usize>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{TxId, TxWeight};

    fn test_block(tx_count: usize) -> Block {
        let txs = (0..tx_count)
            .map(|i| Transaction {
                id: TxId(i as u64),
                weight: TxWeight::Medium,
                slot: i as u8,
            })
            .collect();
        Block::new(BlockId(1), BlockUid(100), Duration::from_millis(250), txs)
    }

    #[test]
    fn test_failure_set_assigned_once() {
        let mut block = test_block(4);
        assert!(!block.failures_assigned());
        assert!(!block.tx_failed(2));

        let first: BTreeSet<usize> = [1, 3].into_iter().collect();
        assert!(block.assign_failed_txs(first.clone()));
        assert!(block.tx_failed(1));
        assert!(block.tx_failed(3));
        assert!(!block.tx_failed(0));

        // A second assignment must not overwrite the memoized outcome.
        let second: BTreeSet<usize> = [0].into_iter().collect();
        assert!(!block.assign_failed_txs(second));
        assert_eq!(block.failed_txs(), Some(&first));
    }

    #[test]
    fn test_snapshot_carries_failures() {
        let mut block = test_block(3);
        assert_eq!(block.snapshot().failed_txs, None);

        block.assign_failed_txs([0].into_iter().collect());
        let snap = block.snapshot();
        assert_eq!(snap.tx_count, 3);
        assert_eq!(snap.uid, BlockUid(100));
        assert_eq!(snap.failed_txs, Some([0].into_iter().collect()));
    }
}
