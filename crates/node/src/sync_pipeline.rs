//! Strict engine.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sae_core::{Action, Event, PipelineConfig, PipelineEvent, StateMachine, TimerId};
use sae_mempool::MempoolState;
use sae_types::{Block, BlockId, BlockUid, Stage, Transaction};
use std::collections::BTreeSet;
use std::time::Duration;
use tracing::{debug, info};

/// Where the in-flight block is in its strictly sequential life.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SyncPhase {
    /// No block in flight; the next cycle tick may start one.
    Idle,
    /// Transactions are being placed into the block one at a time;
    /// `next_index` is the next one to place.
    Filling { next_index: usize },
    /// The fixed-duration execution is running.
    Executing,
    /// Waiting out the acceptance delay.
    Accepting,
    /// Waiting out the settlement delay.
    Settling,
}

/// The strict pipeline: one block at a time through every stage.
///
/// There is no queue and no settlement epoch; each block fully settles
/// before the cycle timer may start the next one. Cycle ticks that land
/// while a block is in flight are refused, which is exactly the throughput
/// cost the streaming engine exists to contrast against.
///
/// The stage order here is proposing, executing, accepted, settled:
/// a strictly serial chain executes the candidate before final acceptance,
/// because nothing else can happen in the meantime anyway.
pub struct SyncPipeline {
    config: PipelineConfig,
    mempool: MempoolState,
    phase: SyncPhase,
    current: Option<Block>,
    next_block_id: u64,
    next_block_uid: u64,
    rng: ChaCha8Rng,
    now: Duration,

    /// Cycle ticks refused because a block was still in flight.
    refused_cycles: u64,
    /// Blocks fully settled so far.
    settled_blocks: u64,
}

impl std::fmt::Debug for SyncPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncPipeline")
            .field("mempool_len", &self.mempool.len())
            .field("phase", &self.phase)
            .field("now", &self.now)
            .finish()
    }
}

impl SyncPipeline {
    pub fn new(config: &PipelineConfig, seed: u64) -> Self {
        Self {
            config: config.clone(),
            mempool: MempoolState::new(config.producer.clone()),
            phase: SyncPhase::Idle,
            current: None,
            next_block_id: 0,
            next_block_uid: 0,
            rng: ChaCha8Rng::seed_from_u64(seed),
            now: Duration::ZERO,
            refused_cycles: 0,
            settled_blocks: 0,
        }
    }

    /// Arm the producer and the cycle timer.
    pub fn start(&mut self) -> Vec<Action> {
        let mut actions = self.mempool.start(&mut self.rng);
        actions.push(Action::SetTimer {
            id: TimerId::SyncCycle,
            duration: self.config.sync.cadence,
        });
        actions
    }

    /// Cycle tick: start a block, or refuse because one is in flight.
    fn on_cycle_timer(&mut self) -> Vec<Action> {
        let mut actions = vec![Action::SetTimer {
            id: TimerId::SyncCycle,
            duration: self.config.sync.cadence,
        }];

        if self.phase != SyncPhase::Idle {
            // Strict mutual exclusion: the previous block has not settled.
            self.refused_cycles += 1;
            debug!(
                phase = ?self.phase,
                refused = self.refused_cycles,
                "cycle refused, block in flight"
            );
            return actions;
        }

        let proposer = &self.config.proposer;
        if self.mempool.len() < proposer.min_txs {
            return actions;
        }

        let count = sae_consensus::select_count(proposer, self.mempool.len(), &mut self.rng);
        let (txs, removals) = self.mempool.take(count);
        actions.extend(removals);
        actions.extend(self.begin_block(txs));
        actions
    }

    fn begin_block(&mut self, txs: Vec<Transaction>) -> Vec<Action> {
        let block = Block::new(
            BlockId(self.next_block_id),
            BlockUid(self.next_block_uid),
            self.now,
            txs,
        );
        self.next_block_id += 1;
        self.next_block_uid += 1;

        info!(block_id = %block.id(), tx_count = block.tx_count(), "strict cycle started");

        let actions = vec![
            Action::Emit {
                event: PipelineEvent::BlockTransition {
                    stage: Stage::Proposed,
                    block: block.snapshot(),
                    at: self.now,
                },
            },
            Action::SetTimer {
                id: TimerId::SyncStep,
                duration: self.config.sync.fill_step,
            },
        ];

        self.current = Some(block);
        self.phase = SyncPhase::Filling { next_index: 0 };
        actions
    }

    /// Phase advance: one fill step, or the end of a fixed delay.
    fn on_step_timer(&mut self) -> Vec<Action> {
        let Some(block) = self.current.as_mut() else {
            return vec![];
        };

        match self.phase {
            SyncPhase::Idle => vec![],

            SyncPhase::Filling { next_index } => {
                // Placement progress only; nothing can fail before execution.
                let mut actions = vec![Action::Emit {
                    event: PipelineEvent::TxProgress {
                        block: block.uid(),
                        index: next_index,
                        failed: false,
                        at: self.now,
                    },
                }];

                if next_index + 1 < block.tx_count() {
                    self.phase = SyncPhase::Filling {
                        next_index: next_index + 1,
                    };
                    actions.push(Action::SetTimer {
                        id: TimerId::SyncStep,
                        duration: self.config.sync.fill_step,
                    });
                    return actions;
                }

                // Block is full: execute it, for a fixed duration regardless
                // of how many transactions it carries.
                let failed: BTreeSet<usize> = (0..block.tx_count())
                    .filter(|_| self.rng.gen::<f64>() < self.config.executor.failure_probability)
                    .collect();
                block.assign_failed_txs(failed);
                self.phase = SyncPhase::Executing;
                actions.push(Action::Emit {
                    event: PipelineEvent::BlockTransition {
                        stage: Stage::Executing,
                        block: block.snapshot(),
                        at: self.now,
                    },
                });
                actions.push(Action::SetTimer {
                    id: TimerId::SyncStep,
                    duration: self.config.sync.exec_duration,
                });
                actions
            }

            SyncPhase::Executing => {
                self.phase = SyncPhase::Accepting;
                vec![
                    Action::Emit {
                        event: PipelineEvent::BlockTransition {
                            stage: Stage::Executed,
                            block: block.snapshot(),
                            at: self.now,
                        },
                    },
                    Action::SetTimer {
                        id: TimerId::SyncStep,
                        duration: self.config.sync.accept_delay,
                    },
                ]
            }

            SyncPhase::Accepting => {
                self.phase = SyncPhase::Settling;
                vec![
                    Action::Emit {
                        event: PipelineEvent::BlockTransition {
                            stage: Stage::Accepted,
                            block: block.snapshot(),
                            at: self.now,
                        },
                    },
                    Action::SetTimer {
                        id: TimerId::SyncStep,
                        duration: self.config.sync.settle_delay,
                    },
                ]
            }

            SyncPhase::Settling => {
                let snapshot = block.snapshot();
                self.current = None;
                self.phase = SyncPhase::Idle;
                self.settled_blocks += 1;
                info!(block_id = %snapshot.id, "strict cycle settled");
                vec![Action::Emit {
                    event: PipelineEvent::BlockTransition {
                        stage: Stage::Settled,
                        block: snapshot,
                        at: self.now,
                    },
                }]
            }
        }
    }

    /// Whether a block is currently in flight.
    pub fn is_in_flight(&self) -> bool {
        self.current.is_some()
    }

    /// Cycle ticks refused so far.
    pub fn refused_cycles(&self) -> u64 {
        self.refused_cycles
    }

    /// Blocks fully settled so far.
    pub fn settled_blocks(&self) -> u64 {
        self.settled_blocks
    }

    /// The mempool stage.
    pub fn mempool(&self) -> &MempoolState {
        &self.mempool
    }
}

impl StateMachine for SyncPipeline {
    fn handle(&mut self, event: Event) -> Vec<Action> {
        match event {
            Event::ArrivalTimer => self.mempool.on_arrival_timer(&mut self.rng),
            Event::SyncCycleTimer => self.on_cycle_timer(),
            Event::SyncStepTimer => self.on_step_timer(),
            // Streaming-engine events are not ours.
            Event::ProposalTimer
            | Event::AcceptDwellTimer
            | Event::ExecStepTimer
            | Event::SettlementTimer
            | Event::ExecutorKick
            | Event::SettlementCheck => vec![],
        }
    }

    fn set_time(&mut self, now: Duration) {
        self.now = now;
        self.mempool.set_time(now);
    }
}
