//! Notifications delivered to external subscribers.

use sae_types::{BlockId, BlockSnapshot, BlockUid, SlotIndex, Stage, TxId, TxWeight};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A notification on the external event stream.
///
/// This is the entire public surface the core exposes to consumers:
/// renderers subscribe to this stream and need nothing else. Every variant
/// carries the simulated time at which it occurred.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineEvent {
    /// A block moved to a new stage.
    BlockTransition {
        /// The stage entered.
        stage: Stage,
        /// Snapshot of the block at transition time.
        block: BlockSnapshot,
        /// Simulated time of the transition.
        at: Duration,
    },

    /// A transaction entered the mempool and took a display slot.
    TxAdmitted {
        /// The transaction id.
        id: TxId,
        /// Display weight.
        weight: TxWeight,
        /// Display slot held while resident.
        slot: SlotIndex,
        /// Simulated admission time.
        at: Duration,
    },

    /// A transaction left the mempool (selected into a block); its slot is
    /// free again.
    TxRemoved {
        /// The transaction id.
        id: TxId,
        /// The released slot.
        slot: SlotIndex,
        /// Simulated removal time.
        at: Duration,
    },

    /// A per-transaction progress step fired.
    ///
    /// The executor raises these sequentially during execution (renderers
    /// show a fill effect); the synchronous engine raises them during its
    /// proposing fill phase with `failed` always false.
    TxProgress {
        /// The block being processed.
        block: BlockUid,
        /// Index of the transaction within the block.
        index: usize,
        /// Whether this transaction's memoized outcome is failure.
        failed: bool,
        /// Simulated time of the step.
        at: Duration,
    },

    /// A settlement epoch flushed atomically.
    ///
    /// Every member settles together; per-member `Settled` transitions are
    /// emitted alongside with the same timestamp.
    EpochFlushed {
        /// Ids of every block in the flushed epoch, in execution order.
        members: Vec<BlockId>,
        /// Simulated flush time.
        at: Duration,
    },
}

impl PipelineEvent {
    /// Simulated time at which this notification occurred.
    pub fn at(&self) -> Duration {
        match self {
            PipelineEvent::BlockTransition { at, .. }
            | PipelineEvent::TxAdmitted { at, .. }
            | PipelineEvent::TxRemoved { at, .. }
            | PipelineEvent::TxProgress { at, .. }
            | PipelineEvent::EpochFlushed { at, .. } => *at,
        }
    }

    /// Get the notification type name for telemetry.
    pub fn type_name(&self) -> &'static str {
        match self {
            PipelineEvent::BlockTransition { .. } => "BlockTransition",
            PipelineEvent::TxAdmitted { .. } => "TxAdmitted",
            PipelineEvent::TxRemoved { .. } => "TxRemoved",
            PipelineEvent::TxProgress { .. } => "TxProgress",
            PipelineEvent::EpochFlushed { .. } => "EpochFlushed",
        }
    }
}
