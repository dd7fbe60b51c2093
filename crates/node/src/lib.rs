//! Pipeline engines.
//!
//! Two engines implement the same [`StateMachine`] contract over the same
//! event vocabulary: the streaming engine overlaps its stages through a
//! bounded queue, the strict engine runs one block through every stage
//! before the next may start. The runner drives either without knowing
//! which it holds.

mod async_pipeline;
mod sync_pipeline;

pub use async_pipeline::AsyncPipeline;
pub use sync_pipeline::SyncPipeline;

use sae_core::{Action, Event, PipelineConfig, StateMachine};
use std::str::FromStr;
use std::time::Duration;

/// Which engine variant to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineKind {
    /// Streaming engine: stages overlap, decoupled by the execution queue.
    Async,
    /// Strict engine: one block at a time through every stage.
    Sync,
}

impl FromStr for EngineKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "async" | "streaming" => Ok(Self::Async),
            "sync" | "strict" => Ok(Self::Sync),
            other => Err(format!("unknown engine '{other}' (expected async or sync)")),
        }
    }
}

impl std::fmt::Display for EngineKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Async => write!(f, "async"),
            Self::Sync => write!(f, "sync"),
        }
    }
}

/// An engine of either kind, behind one dispatch point.
#[derive(Debug)]
pub enum Pipeline {
    Async(AsyncPipeline),
    Sync(SyncPipeline),
}

impl Pipeline {
    /// Build the selected engine from the shared configuration and seed.
    pub fn new(kind: EngineKind, config: &PipelineConfig, seed: u64) -> Self {
        match kind {
            EngineKind::Async => Self::Async(AsyncPipeline::new(config, seed)),
            EngineKind::Sync => Self::Sync(SyncPipeline::new(config, seed)),
        }
    }

    /// Produce the initial timer actions.
    pub fn start(&mut self) -> Vec<Action> {
        match self {
            Self::Async(p) => p.start(),
            Self::Sync(p) => p.start(),
        }
    }

    /// Pause the executor. No-op for the strict engine, which has no
    /// independent execution slot to pause.
    pub fn pause_executor(&mut self) {
        if let Self::Async(p) = self {
            p.pause_executor();
        }
    }

    /// Resume a paused executor.
    pub fn resume_executor(&mut self) -> Vec<Action> {
        match self {
            Self::Async(p) => p.resume_executor(),
            Self::Sync(_) => vec![],
        }
    }
}

impl StateMachine for Pipeline {
    fn handle(&mut self, event: Event) -> Vec<Action> {
        match self {
            Self::Async(p) => p.handle(event),
            Self::Sync(p) => p.handle(event),
        }
    }

    fn set_time(&mut self, now: Duration) {
        match self {
            Self::Async(p) => p.set_time(now),
            Self::Sync(p) => p.set_time(now),
        }
    }
}
