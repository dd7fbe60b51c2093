//! Streaming engine.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use sae_consensus::ConsensusState;
use sae_core::{Action, Event, PipelineConfig, StateMachine};
use sae_execution::{EnqueueOutcome, ExecutorState};
use sae_mempool::MempoolState;
use sae_settlement::SettlementState;
use std::time::Duration;
use tracing::debug;

/// The streaming pipeline: producer, proposer, bounded queue, single-slot
/// executor, and deferred settlement, all overlapping.
///
/// Each stage is its own state machine; this type routes events to the
/// stage that owns them and moves blocks across stage boundaries. All
/// routing runs on a single thread, so a block is owned by exactly one
/// stage at every observable instant.
pub struct AsyncPipeline {
    mempool: MempoolState,
    consensus: ConsensusState,
    executor: ExecutorState,
    settlement: SettlementState,
    rng: ChaCha8Rng,
    now: Duration,
}

impl std::fmt::Debug for AsyncPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncPipeline")
            .field("mempool_len", &self.mempool.len())
            .field("consensus", &self.consensus.phase())
            .field("queue_len", &self.executor.queue_len())
            .field("settlement_pending", &self.settlement.pending())
            .field("now", &self.now)
            .finish()
    }
}

impl AsyncPipeline {
    /// Build the engine with every stage seeded from the same RNG stream.
    pub fn new(config: &PipelineConfig, seed: u64) -> Self {
        Self {
            mempool: MempoolState::new(config.producer.clone()),
            consensus: ConsensusState::new(config.proposer.clone()),
            executor: ExecutorState::new(config.executor.clone(), config.queue_capacity),
            settlement: SettlementState::new(config.settlement.clone()),
            rng: ChaCha8Rng::seed_from_u64(seed),
            now: Duration::ZERO,
        }
    }

    /// Arm every stage's initial timer.
    pub fn start(&mut self) -> Vec<Action> {
        let mut actions = self.mempool.start(&mut self.rng);
        actions.extend(self.consensus.start());
        actions.extend(self.settlement.start());
        actions
    }

    /// Offer the accepted block (if any) to the execution queue.
    ///
    /// Runs at the top of each cadence tick. A refused offer puts the block
    /// back where it was; the proposer stays stalled and the offer repeats
    /// on the next tick. Nothing is dropped.
    fn try_handoff(&mut self) -> Vec<Action> {
        let Some(block) = self.consensus.take_accepted() else {
            return vec![];
        };
        match self.executor.try_enqueue(block) {
            (EnqueueOutcome::Enqueued, actions) => actions,
            (EnqueueOutcome::Rejected(block), _) => {
                debug!(block_id = %block.id(), "handoff stalled, queue full");
                self.consensus.restore(block);
                vec![]
            }
        }
    }

    /// Cadence tick: hand off first, then maybe propose.
    ///
    /// Handoff before proposal means a freed queue slot and a new proposal
    /// can happen in the same tick, but a stalled proposer never starts a
    /// second block.
    fn on_proposal_timer(&mut self) -> Vec<Action> {
        let mut actions = vec![self.consensus.reschedule()];
        actions.extend(self.try_handoff());

        if !self.consensus.is_idle() {
            return actions;
        }
        if !self.consensus.can_propose(self.mempool.len()) {
            self.consensus.note_skipped();
            return actions;
        }

        let count = self.consensus.select_count(self.mempool.len(), &mut self.rng);
        let (txs, removals) = self.mempool.take(count);
        actions.extend(removals);
        actions.extend(self.consensus.begin_proposal(txs));
        actions
    }

    fn on_exec_step(&mut self) -> Vec<Action> {
        let (mut actions, finished) = self.executor.on_exec_step();
        if let Some(block) = finished {
            actions.extend(self.settlement.on_block_executed(block));
        }
        actions
    }

    /// Pause the executor; queued blocks stay queued.
    pub fn pause_executor(&mut self) {
        self.executor.pause();
    }

    /// Resume the executor; returns the kick that restarts draining.
    pub fn resume_executor(&mut self) -> Vec<Action> {
        self.executor.resume()
    }

    /// The mempool stage.
    pub fn mempool(&self) -> &MempoolState {
        &self.mempool
    }

    /// The proposer/acceptor stage.
    pub fn consensus(&self) -> &ConsensusState {
        &self.consensus
    }

    /// The queue/executor stage.
    pub fn executor(&self) -> &ExecutorState {
        &self.executor
    }

    /// The settlement stage.
    pub fn settlement(&self) -> &SettlementState {
        &self.settlement
    }
}

impl StateMachine for AsyncPipeline {
    fn handle(&mut self, event: Event) -> Vec<Action> {
        match event {
            Event::ArrivalTimer => self.mempool.on_arrival_timer(&mut self.rng),
            Event::ProposalTimer => self.on_proposal_timer(),
            Event::AcceptDwellTimer => {
                // Acceptance doubles as a settlement check point. The block
                // itself stays with the acceptor until the next cadence
                // tick; consensus runs ahead of execution by exactly one
                // block, not more.
                let mut actions = self.consensus.on_accept_dwell();
                actions.push(Action::EnqueueInternal {
                    event: Event::SettlementCheck,
                });
                actions
            }
            Event::ExecStepTimer => self.on_exec_step(),
            Event::ExecutorKick => self.executor.kick(&mut self.rng),
            Event::SettlementTimer => self.settlement.on_timer(),
            Event::SettlementCheck => self.settlement.check(),
            // Strict-engine timers are not ours.
            Event::SyncCycleTimer | Event::SyncStepTimer => vec![],
        }
    }

    fn set_time(&mut self, now: Duration) {
        self.now = now;
        self.mempool.set_time(now);
        self.consensus.set_time(now);
        self.executor.set_time(now);
        self.settlement.set_time(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sae_core::{PipelineEvent, TimerId};
    use sae_types::Stage;

    fn config() -> PipelineConfig {
        PipelineConfig::default()
    }

    fn emitted(actions: &[Action]) -> Vec<&PipelineEvent> {
        actions
            .iter()
            .filter_map(|a| match a {
                Action::Emit { event } => Some(event),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_start_arms_every_stage_timer() {
        let mut pipeline = AsyncPipeline::new(&config(), 7);
        let actions = pipeline.start();

        let timer_ids: Vec<TimerId> = actions
            .iter()
            .filter_map(|a| match a {
                Action::SetTimer { id, .. } => Some(*id),
                _ => None,
            })
            .collect();
        assert_eq!(
            timer_ids,
            vec![TimerId::Arrival, TimerId::Proposal, TimerId::Settlement]
        );
    }

    #[test]
    fn test_proposal_skipped_below_threshold() {
        let mut pipeline = AsyncPipeline::new(&config(), 7);
        pipeline.start();

        // Empty mempool: only the cadence reschedule comes back.
        let actions = pipeline.handle(Event::ProposalTimer);
        assert_eq!(actions.len(), 1);
        assert!(matches!(
            actions[0],
            Action::SetTimer {
                id: TimerId::Proposal,
                ..
            }
        ));
        assert_eq!(pipeline.consensus().skipped_cycles(), 1);
    }

    #[test]
    fn test_proposal_fires_once_mempool_filled() {
        let mut pipeline = AsyncPipeline::new(&config(), 7);
        pipeline.start();

        // Drive arrivals until the proposer threshold is met.
        while pipeline.mempool.len() < 4 {
            pipeline.handle(Event::ArrivalTimer);
        }

        let actions = pipeline.handle(Event::ProposalTimer);
        let events = emitted(&actions);
        assert!(events.iter().any(|e| matches!(
            e,
            PipelineEvent::BlockTransition {
                stage: Stage::Proposed,
                ..
            }
        )));
        assert!(events
            .iter()
            .any(|e| matches!(e, PipelineEvent::TxRemoved { .. })));
        assert!(!pipeline.consensus().is_idle());
    }

    #[test]
    fn test_accepted_block_enqueues_on_next_cycle() {
        let mut pipeline = AsyncPipeline::new(&config(), 7);
        pipeline.start();
        while pipeline.mempool.len() < 4 {
            pipeline.handle(Event::ArrivalTimer);
        }
        pipeline.handle(Event::ProposalTimer);

        // Acceptance alone: the block stays with the acceptor.
        let actions = pipeline.handle(Event::AcceptDwellTimer);
        let events = emitted(&actions);
        assert!(events.iter().any(|e| matches!(
            e,
            PipelineEvent::BlockTransition {
                stage: Stage::Accepted,
                ..
            }
        )));
        assert!(!events.iter().any(|e| matches!(
            e,
            PipelineEvent::BlockTransition {
                stage: Stage::Queued,
                ..
            }
        )));
        assert!(!pipeline.consensus().is_idle());
        assert_eq!(pipeline.executor().queue_len(), 0);

        // The next cadence tick pushes it onto the queue, freeing the
        // proposer, and the kick starts execution.
        let actions = pipeline.handle(Event::ProposalTimer);
        assert!(emitted(&actions).iter().any(|e| matches!(
            e,
            PipelineEvent::BlockTransition {
                stage: Stage::Queued,
                ..
            }
        )));

        let actions = pipeline.handle(Event::ExecutorKick);
        assert!(pipeline.executor().is_executing());
        assert!(emitted(&actions).iter().any(|e| matches!(
            e,
            PipelineEvent::BlockTransition {
                stage: Stage::Executing,
                ..
            }
        )));
    }

    #[test]
    fn test_queue_full_stalls_proposer() {
        let cfg = PipelineConfig::default().with_queue_capacity(1);
        let mut pipeline = AsyncPipeline::new(&cfg, 7);
        pipeline.start();
        pipeline.pause_executor();

        // First block: propose, accept, enqueue on the following cycle.
        while pipeline.mempool.len() < 4 {
            pipeline.handle(Event::ArrivalTimer);
        }
        pipeline.handle(Event::ProposalTimer);
        pipeline.handle(Event::AcceptDwellTimer);

        // Second block proposed on the same tick that enqueues the first.
        while pipeline.mempool.len() < 4 {
            pipeline.handle(Event::ArrivalTimer);
        }
        pipeline.handle(Event::ProposalTimer);
        pipeline.handle(Event::AcceptDwellTimer);
        assert_eq!(pipeline.executor().queue_len(), 1);

        // Capacity-1 queue with a paused executor: the second handoff
        // stalls and no new proposal starts.
        let actions = pipeline.handle(Event::ProposalTimer);
        assert_eq!(pipeline.consensus().stalled_handoffs(), 1);
        assert!(!pipeline.consensus().is_idle());
        assert!(!emitted(&actions).iter().any(|e| matches!(
            e,
            PipelineEvent::BlockTransition {
                stage: Stage::Proposed,
                ..
            }
        )));

        // Draining the queue lets the stalled block through on the next tick.
        pipeline.resume_executor();
        pipeline.handle(Event::ExecutorKick);
        let actions = pipeline.handle(Event::ProposalTimer);
        assert!(emitted(&actions).iter().any(|e| matches!(
            e,
            PipelineEvent::BlockTransition {
                stage: Stage::Queued,
                ..
            }
        )));
    }
}
