//! Epoch accumulator and atomic flush.

use sae_core::{Action, PipelineEvent, SettlementConfig, TimerId};
use sae_types::{Block, Stage};
use std::time::Duration;
use tracing::{debug, info};

/// Settlement batcher state machine.
///
/// The epoch clock starts when the first member arrives, not when the
/// previous epoch flushed; an empty epoch has no age and never flushes.
/// A flush settles every member at the same instant. There is no partial
/// flush.
#[derive(Debug)]
pub struct SettlementState {
    config: SettlementConfig,
    /// When the current epoch opened; `None` while the epoch is empty.
    started_at: Option<Duration>,
    members: Vec<Block>,
    now: Duration,

    /// Epochs flushed so far.
    flushed_epochs: u64,
    /// Blocks settled so far.
    settled_blocks: u64,
}

impl SettlementState {
    pub fn new(config: SettlementConfig) -> Self {
        Self {
            config,
            started_at: None,
            members: Vec::new(),
            now: Duration::ZERO,
            flushed_epochs: 0,
            settled_blocks: 0,
        }
    }

    /// Arm the periodic flush check.
    pub fn start(&mut self) -> Vec<Action> {
        vec![Action::SetTimer {
            id: TimerId::Settlement,
            duration: self.config.check_interval,
        }]
    }

    /// Admit a fully executed block into the open epoch.
    ///
    /// The first member opens the epoch and starts its clock.
    pub fn on_block_executed(&mut self, block: Block) -> Vec<Action> {
        if self.started_at.is_none() {
            self.started_at = Some(self.now);
            debug!(opened_at_ms = self.now.as_millis() as u64, "epoch opened");
        }
        debug!(
            block_id = %block.id(),
            epoch_size = self.members.len() + 1,
            "block joined settlement epoch"
        );
        self.members.push(block);
        // Acceptance-driven check alongside the periodic one.
        self.check()
    }

    /// Periodic flush-check timer: reschedule, then check.
    pub fn on_timer(&mut self) -> Vec<Action> {
        let mut actions = vec![Action::SetTimer {
            id: TimerId::Settlement,
            duration: self.config.check_interval,
        }];
        actions.extend(self.check());
        actions
    }

    /// Flush the epoch if it is old enough.
    ///
    /// Either every member settles, or none do.
    pub fn check(&mut self) -> Vec<Action> {
        let Some(started_at) = self.started_at else {
            return vec![];
        };
        if self.members.is_empty() || self.now.saturating_sub(started_at) < self.config.tau {
            return vec![];
        }

        let members = std::mem::take(&mut self.members);
        self.started_at = None;
        self.flushed_epochs += 1;
        self.settled_blocks += members.len() as u64;

        info!(
            epoch = self.flushed_epochs,
            members = members.len(),
            age_ms = (self.now - started_at).as_millis() as u64,
            "epoch flushed"
        );

        let mut actions: Vec<Action> = members
            .iter()
            .map(|block| Action::Emit {
                event: PipelineEvent::BlockTransition {
                    stage: Stage::Settled,
                    block: block.snapshot(),
                    at: self.now,
                },
            })
            .collect();
        actions.push(Action::Emit {
            event: PipelineEvent::EpochFlushed {
                members: members.iter().map(|b| b.id()).collect(),
                at: self.now,
            },
        });
        actions
    }

    /// Members of the open epoch.
    pub fn pending(&self) -> usize {
        self.members.len()
    }

    /// Blocks settled so far.
    pub fn settled_blocks(&self) -> u64 {
        self.settled_blocks
    }

    /// Epochs flushed so far.
    pub fn flushed_epochs(&self) -> u64 {
        self.flushed_epochs
    }

    /// Update simulated time.
    pub fn set_time(&mut self, now: Duration) {
        self.now = now;
    }
}
