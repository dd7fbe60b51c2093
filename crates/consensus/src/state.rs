//! Proposer/acceptor state machine.

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use sae_core::{Action, PipelineEvent, ProposerConfig, TimerId};
use sae_types::{Block, BlockId, BlockUid, Stage, Transaction};
use std::time::Duration;
use tracing::{debug, info, trace};

/// Where the current proposal cycle stands.
///
/// # State Machine Flow
///
/// 1. **Proposal Timer** → if idle and the mempool has enough transactions,
///    create a candidate block and start the dwell
/// 2. **Dwell Timer** → the candidate becomes accepted; order is final
/// 3. **Next Proposal Timer** → the accepted block is offered to the queue;
///    only a successful handoff frees the proposer for a new candidate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    /// No block in flight.
    Idle,
    /// A candidate block is dwelling before acceptance.
    Proposing,
    /// An accepted block awaits handoff to the execution queue.
    Accepted,
}

/// Proposer/acceptor state machine.
///
/// Owns the single in-flight block between creation and queue handoff.
/// Acceptance order is final: after the dwell elapses no re-ordering is
/// possible, and a full queue stalls the proposer rather than dropping the
/// accepted block (the DoS-resistance invariant of the modeled protocol).
#[derive(Debug)]
pub struct ConsensusState {
    config: ProposerConfig,

    phase: Phase,

    /// The in-flight block; `Some` in `Proposing` and `Accepted`.
    in_flight: Option<Block>,

    /// Next block display id; monotonic.
    next_block_id: u64,

    /// Next block uid; monotonic, shared namespace with nothing else.
    next_block_uid: u64,

    /// Current time.
    now: Duration,

    /// Handoffs refused by a full queue (each is re-offered later).
    stalled_handoffs: u64,

    /// Cycles skipped because the mempool was below threshold.
    skipped_cycles: u64,
}

impl ConsensusState {
    /// Create a new proposer.
    pub fn new(config: ProposerConfig) -> Self {
        Self {
            config,
            phase: Phase::Idle,
            in_flight: None,
            next_block_id: 0,
            next_block_uid: 0,
            now: Duration::ZERO,
            stalled_handoffs: 0,
            skipped_cycles: 0,
        }
    }

    /// Schedule the first proposal cycle.
    pub fn start(&self) -> Vec<Action> {
        vec![Action::SetTimer {
            id: TimerId::Proposal,
            duration: self.config.cadence,
        }]
    }

    /// Reschedule the cadence timer.
    ///
    /// Called by the composer at the top of every proposal cycle so the
    /// cadence keeps running regardless of what the cycle does.
    pub fn reschedule(&self) -> Action {
        Action::SetTimer {
            id: TimerId::Proposal,
            duration: self.config.cadence,
        }
    }

    /// Current cycle phase.
    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    /// Whether a new candidate may form this cycle.
    pub fn is_idle(&self) -> bool {
        self.phase == Phase::Idle
    }

    /// Number of handoffs refused by a full queue.
    pub fn stalled_handoffs(&self) -> u64 {
        self.stalled_handoffs
    }

    /// Number of cycles skipped below the mempool threshold.
    pub fn skipped_cycles(&self) -> u64 {
        self.skipped_cycles
    }

    /// Pick how many transactions to select from a mempool of `mempool_len`.
    ///
    /// The caller guarantees `mempool_len >= config.min_txs`.
    pub fn select_count(&self, mempool_len: usize, rng: &mut ChaCha8Rng) -> usize {
        select_count(&self.config, mempool_len, rng)
    }

    /// Whether the mempool holds enough transactions to propose.
    pub fn can_propose(&self, mempool_len: usize) -> bool {
        mempool_len >= self.config.min_txs
    }

    /// Record a skipped cycle (mempool below threshold).
    pub fn note_skipped(&mut self) {
        self.skipped_cycles += 1;
        trace!("proposal cycle skipped, mempool below threshold");
    }

    /// Take the accepted block for a handoff attempt.
    ///
    /// Moves the cycle to idle optimistically; a refused handoff must be
    /// returned via [`ConsensusState::restore`] in the same tick.
    pub fn take_accepted(&mut self) -> Option<Block> {
        if self.phase != Phase::Accepted {
            return None;
        }
        self.phase = Phase::Idle;
        self.in_flight.take()
    }

    /// Put a refused handoff back; the proposer stays stalled on it.
    pub fn restore(&mut self, block: Block) {
        debug_assert!(self.in_flight.is_none());
        debug!(
            block_id = %block.id(),
            "queue full, consensus stalls on accepted block"
        );
        self.stalled_handoffs += 1;
        self.in_flight = Some(block);
        self.phase = Phase::Accepted;
    }

    /// Create a candidate block from the selected transactions and start
    /// the acceptance dwell.
    pub fn begin_proposal(&mut self, txs: Vec<Transaction>) -> Vec<Action> {
        debug_assert!(self.is_idle(), "a cycle is already in flight");
        debug_assert!(!txs.is_empty());

        let block = Block::new(
            BlockId(self.next_block_id),
            BlockUid(self.next_block_uid),
            self.now,
            txs,
        );
        self.next_block_id += 1;
        self.next_block_uid += 1;

        info!(
            block_id = %block.id(),
            tx_count = block.tx_count(),
            "proposed block"
        );

        let actions = vec![
            Action::Emit {
                event: PipelineEvent::BlockTransition {
                    stage: Stage::Proposed,
                    block: block.snapshot(),
                    at: self.now,
                },
            },
            Action::SetTimer {
                id: TimerId::AcceptDwell,
                duration: self.config.accept_dwell,
            },
        ];

        self.in_flight = Some(block);
        self.phase = Phase::Proposing;
        actions
    }

    /// Handle the dwell timer: the candidate becomes accepted and its
    /// transaction order is final.
    pub fn on_accept_dwell(&mut self) -> Vec<Action> {
        if self.phase != Phase::Proposing {
            // A stale dwell after teardown-adjacent races; nothing to do.
            return vec![];
        }
        self.phase = Phase::Accepted;

        let Some(snapshot) = self.in_flight.as_ref().map(|b| b.snapshot()) else {
            return vec![];
        };

        debug!(block_id = %snapshot.id, "block accepted, order final");

        vec![Action::Emit {
            event: PipelineEvent::BlockTransition {
                stage: Stage::Accepted,
                block: snapshot,
                at: self.now,
            },
        }]
    }

    /// Update simulated time.
    pub fn set_time(&mut self, now: Duration) {
        self.now = now;
    }
}

/// Pick a selection count for a block.
///
/// Uniform in `[select_min, select_max]`, capped by
/// `min(mempool_len, max_block_txs)`; with `greedy_probability`, take the
/// entire (small) mempool instead. Shared with the synchronous engine so
/// both variants select identically.
pub fn select_count(config: &ProposerConfig, mempool_len: usize, rng: &mut ChaCha8Rng) -> usize {
    let cap = mempool_len.min(config.max_block_txs);
    if mempool_len <= config.select_max && rng.gen::<f64>() < config.greedy_probability {
        return cap;
    }
    rng.gen_range(config.select_min..=config.select_max).min(cap)
}
