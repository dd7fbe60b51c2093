//! Single-slot executor.

use crate::ExecQueue;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use sae_core::{Action, Event, ExecutorConfig, PipelineEvent, TimerId};
use sae_types::{Block, Stage};
use std::collections::BTreeSet;
use std::time::Duration;
use tracing::{debug, info, instrument, trace};

/// Outcome of offering an accepted block to the queue.
#[derive(Debug)]
pub enum EnqueueOutcome {
    /// The block was queued; actions carry the `Queued` transition.
    Enqueued,
    /// The queue is full; the block comes back to the caller, who stalls
    /// and re-offers it later.
    Rejected(Block),
}

/// The block currently occupying the execution slot.
#[derive(Debug)]
struct InFlight {
    block: Block,
    /// Index of the next per-transaction step to fire.
    next_index: usize,
    /// Interval between steps, fixed for the block's whole execution.
    step: Duration,
}

/// Executor state machine.
///
/// Single-flight: at most one block executes at any instant. When idle and
/// the queue is non-empty, execution starts immediately on a kick; there is
/// no artificial delay between blocks. Execution duration is
/// `per_tx_time x tx_count`, with `per_tx_time` shrinking when the backlog
/// exceeds the speed-up threshold.
#[derive(Debug)]
pub struct ExecutorState {
    config: ExecutorConfig,
    queue: ExecQueue,
    current: Option<InFlight>,

    /// A paused executor never dequeues; drives the renderer's pause
    /// control and back-pressure tests.
    paused: bool,

    now: Duration,

    /// Blocks fully executed so far.
    executed_blocks: u64,
}

impl ExecutorState {
    /// Create a new executor with the given queue capacity.
    pub fn new(config: ExecutorConfig, queue_capacity: usize) -> Self {
        Self {
            config,
            queue: ExecQueue::new(queue_capacity),
            current: None,
            paused: false,
            now: Duration::ZERO,
            executed_blocks: 0,
        }
    }

    /// Offer an accepted block to the queue.
    ///
    /// On success the actions carry the `Queued` transition and an executor
    /// kick so execution starts in the same tick if the slot is free.
    pub fn try_enqueue(&mut self, block: Block) -> (EnqueueOutcome, Vec<Action>) {
        let snapshot = block.snapshot();
        match self.queue.enqueue(block) {
            Ok(()) => {
                trace!(block_id = %snapshot.id, queue_len = self.queue.len(), "block queued");
                let actions = vec![
                    Action::Emit {
                        event: PipelineEvent::BlockTransition {
                            stage: Stage::Queued,
                            block: snapshot,
                            at: self.now,
                        },
                    },
                    Action::EnqueueInternal {
                        event: Event::ExecutorKick,
                    },
                ];
                (EnqueueOutcome::Enqueued, actions)
            }
            Err(block) => {
                debug!(
                    block_id = %block.id(),
                    queue_len = self.queue.len(),
                    capacity = self.queue.capacity(),
                    "queue full, enqueue refused"
                );
                (EnqueueOutcome::Rejected(block), vec![])
            }
        }
    }

    /// Try to start executing the queue head.
    ///
    /// No-op while paused, while a block already occupies the slot, or when
    /// the queue is empty.
    #[instrument(skip(self, rng), fields(queue_len = self.queue.len(), paused = self.paused))]
    pub fn kick(&mut self, rng: &mut ChaCha8Rng) -> Vec<Action> {
        if self.paused || self.current.is_some() {
            return vec![];
        }
        let Some(mut block) = self.queue.dequeue() else {
            return vec![];
        };

        // First execution assigns the failure outcome; memoized on the
        // block, never recomputed on replay.
        if !block.failures_assigned() {
            let failed: BTreeSet<usize> = (0..block.tx_count())
                .filter(|_| rng.gen::<f64>() < self.config.failure_probability)
                .collect();
            block.assign_failed_txs(failed);
        }

        let per_tx = if self.queue.len() > self.config.speedup_backlog_threshold {
            // Backlog pressure: the executor catches up faster under load.
            self.config.per_tx_time.mul_f64(self.config.speedup_factor)
        } else {
            self.config.per_tx_time
        };

        info!(
            block_id = %block.id(),
            tx_count = block.tx_count(),
            backlog = self.queue.len(),
            per_tx_ms = per_tx.as_millis() as u64,
            "execution started"
        );

        let actions = vec![
            Action::Emit {
                event: PipelineEvent::BlockTransition {
                    stage: Stage::Executing,
                    block: block.snapshot(),
                    at: self.now,
                },
            },
            Action::SetTimer {
                id: TimerId::ExecStep,
                duration: per_tx,
            },
        ];

        self.current = Some(InFlight {
            block,
            next_index: 0,
            step: per_tx,
        });
        actions
    }

    /// Handle a per-transaction step.
    ///
    /// Emits the progress sub-event for the current index; on the last one
    /// the block completes and is returned for settlement handoff, and a
    /// kick is raised so the next block starts with no idle gap.
    pub fn on_exec_step(&mut self) -> (Vec<Action>, Option<Block>) {
        let Some(current) = self.current.as_mut() else {
            return (vec![], None);
        };

        let index = current.next_index;
        let failed = current.block.tx_failed(index);
        let mut actions = vec![Action::Emit {
            event: PipelineEvent::TxProgress {
                block: current.block.uid(),
                index,
                failed,
                at: self.now,
            },
        }];
        current.next_index += 1;

        if current.next_index < current.block.tx_count() {
            actions.push(Action::SetTimer {
                id: TimerId::ExecStep,
                duration: current.step,
            });
            return (actions, None);
        }

        // Last step: the block is fully executed.
        let finished = self.current.take().map(|c| c.block);
        let Some(block) = finished else {
            return (actions, None);
        };
        self.executed_blocks += 1;

        info!(
            block_id = %block.id(),
            failed_txs = block.failed_txs().map(|s| s.len()).unwrap_or(0),
            "execution complete"
        );

        actions.push(Action::Emit {
            event: PipelineEvent::BlockTransition {
                stage: Stage::Executed,
                block: block.snapshot(),
                at: self.now,
            },
        });
        actions.push(Action::EnqueueInternal {
            event: Event::ExecutorKick,
        });

        (actions, Some(block))
    }

    /// Pause the executor: no further dequeues until resumed. The step
    /// currently in flight still finishes.
    pub fn pause(&mut self) {
        self.paused = true;
    }

    /// Resume a paused executor; returns the kick that restarts draining.
    pub fn resume(&mut self) -> Vec<Action> {
        if !self.paused {
            return vec![];
        }
        self.paused = false;
        vec![Action::EnqueueInternal {
            event: Event::ExecutorKick,
        }]
    }

    /// Whether the executor is paused.
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Whether a block currently occupies the execution slot.
    pub fn is_executing(&self) -> bool {
        self.current.is_some()
    }

    /// Current queue length.
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// The configured queue bound.
    pub fn queue_capacity(&self) -> usize {
        self.queue.capacity()
    }

    /// Blocks fully executed so far.
    pub fn executed_blocks(&self) -> u64 {
        self.executed_blocks
    }

    /// Update simulated time.
    pub fn set_time(&mut self, now: Duration) {
        self.now = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use sae_types::{BlockId, BlockUid, Transaction, TxId, TxWeight};

    fn block(id: u64, tx_count: usize) -> Block {
        let txs = (0..tx_count)
            .map(|i| Transaction {
                id: TxId(id * 100 + i as u64),
                weight: TxWeight::Light,
                slot: i as u8,
            })
            .collect();
        Block::new(BlockId(id), BlockUid(id), Duration::ZERO, txs)
    }

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(42)
    }

    fn drive_to_completion(executor: &mut ExecutorState) -> Block {
        loop {
            let (_, finished) = executor.on_exec_step();
            if let Some(block) = finished {
                return block;
            }
        }
    }

    #[test]
    fn test_single_flight() {
        let mut executor = ExecutorState::new(ExecutorConfig::default(), 4);
        let mut rng = rng();

        executor.try_enqueue(block(0, 2));
        executor.try_enqueue(block(1, 2));

        let actions = executor.kick(&mut rng);
        assert!(executor.is_executing());
        assert!(actions.iter().any(|a| matches!(
            a,
            Action::Emit {
                event: PipelineEvent::BlockTransition {
                    stage: Stage::Executing,
                    ..
                }
            }
        )));

        // A second kick while the slot is occupied does nothing.
        assert!(executor.kick(&mut rng).is_empty());
        assert_eq!(executor.queue_len(), 1);
    }

    #[test]
    fn test_steps_cover_every_tx_then_complete() {
        let mut executor = ExecutorState::new(ExecutorConfig::default(), 4);
        let mut rng = rng();

        executor.try_enqueue(block(0, 3));
        executor.kick(&mut rng);

        let (actions, finished) = executor.on_exec_step();
        assert!(finished.is_none());
        assert!(matches!(
            actions[0],
            Action::Emit {
                event: PipelineEvent::TxProgress { index: 0, .. }
            }
        ));

        let (_, finished) = executor.on_exec_step();
        assert!(finished.is_none());

        let (actions, finished) = executor.on_exec_step();
        let block = finished.expect("third step completes a 3-tx block");
        assert_eq!(block.id(), BlockId(0));
        assert!(!executor.is_executing());
        assert!(actions.iter().any(|a| matches!(
            a,
            Action::Emit {
                event: PipelineEvent::BlockTransition {
                    stage: Stage::Executed,
                    ..
                }
            }
        )));
        assert!(actions.iter().any(|a| matches!(
            a,
            Action::EnqueueInternal {
                event: Event::ExecutorKick
            }
        )));
    }

    #[test]
    fn test_failure_set_assigned_once_and_memoized() {
        let config = ExecutorConfig {
            failure_probability: 1.0,
            ..Default::default()
        };
        let mut executor = ExecutorState::new(config, 4);
        let mut rng = rng();

        // A block with a pre-assigned (empty) failure set keeps it even
        // though the configured probability is 1.0.
        let mut pre_assigned = block(0, 2);
        pre_assigned.assign_failed_txs(BTreeSet::new());
        executor.try_enqueue(pre_assigned);
        executor.kick(&mut rng);
        let done = drive_to_completion(&mut executor);
        assert_eq!(done.failed_txs(), Some(&BTreeSet::new()));

        // A fresh block gets every index marked failed.
        executor.try_enqueue(block(1, 3));
        executor.kick(&mut rng);
        let done = drive_to_completion(&mut executor);
        assert_eq!(
            done.failed_txs(),
            Some(&[0, 1, 2].into_iter().collect::<BTreeSet<_>>())
        );
    }

    #[test]
    fn test_backlog_speeds_up_execution() {
        let config = ExecutorConfig {
            per_tx_time: Duration::from_millis(200),
            speedup_backlog_threshold: 1,
            speedup_factor: 0.5,
            ..Default::default()
        };
        let mut executor = ExecutorState::new(config, 8);
        let mut rng = rng();

        for id in 0..4 {
            executor.try_enqueue(block(id, 1));
        }

        // Backlog after dequeue is 3 > 1: the step timer shrinks.
        let actions = executor.kick(&mut rng);
        let step = actions.iter().find_map(|a| match a {
            Action::SetTimer {
                id: TimerId::ExecStep,
                duration,
            } => Some(*duration),
            _ => None,
        });
        assert_eq!(step, Some(Duration::from_millis(100)));
    }

    #[test]
    fn test_paused_executor_never_dequeues() {
        let mut executor = ExecutorState::new(ExecutorConfig::default(), 4);
        let mut rng = rng();

        executor.pause();
        executor.try_enqueue(block(0, 1));
        assert!(executor.kick(&mut rng).is_empty());
        assert_eq!(executor.queue_len(), 1);

        let actions = executor.resume();
        assert!(matches!(
            actions[0],
            Action::EnqueueInternal {
                event: Event::ExecutorKick
            }
        ));
        executor.kick(&mut rng);
        assert!(executor.is_executing());
    }

    #[test]
    fn test_refused_offers_stay_reofferable() {
        let mut executor = ExecutorState::new(ExecutorConfig::default(), 2);
        executor.pause();

        // Five offers against a capacity-2 queue that never drains: exactly
        // two land, three come back intact.
        let mut refused = Vec::new();
        for id in 0..5 {
            let (outcome, actions) = executor.try_enqueue(block(id, 1));
            match outcome {
                EnqueueOutcome::Enqueued => assert!(!actions.is_empty()),
                EnqueueOutcome::Rejected(b) => {
                    assert!(actions.is_empty(), "a refused offer emits nothing");
                    refused.push(b);
                }
            }
        }
        assert_eq!(executor.queue_len(), 2);
        assert_eq!(
            refused.iter().map(|b| b.id()).collect::<Vec<_>>(),
            vec![BlockId(2), BlockId(3), BlockId(4)]
        );

        // Once the queue drains, the refused blocks go through unchanged.
        let mut rng = rng();
        executor.resume();
        executor.kick(&mut rng);
        drive_to_completion(&mut executor);
        let (outcome, _) = executor.try_enqueue(refused.remove(0));
        assert!(matches!(outcome, EnqueueOutcome::Enqueued));
        assert_eq!(executor.queue_len(), 2);
    }
}
