//! Core event/action model for the SAE pipeline simulation.
//!
//! This crate provides the plumbing shared by both engines:
//!
//! - [`Event`]: All possible inputs to the pipeline state machines
//! - [`Action`]: All possible outputs from the pipeline state machines
//! - [`EventPriority`]: Ordering priority for events at the same timestamp
//! - [`PipelineEvent`]: Notifications delivered to external subscribers
//! - [`StateMachine`]: The trait both engines implement
//! - [`PipelineConfig`]: Configuration for every stage
//!
//! # Architecture
//!
//! The core is built on a simple event-driven model:
//!
//! ```text
//! Events → StateMachine::handle() → Actions
//! ```
//!
//! The state machines are:
//! - **Synchronous**: No async, no .await
//! - **Deterministic**: Same state + event = same actions
//! - **Pure-ish**: Mutate self, but perform no I/O
//!
//! All timing is handled by the runner, which delivers timer events,
//! executes the returned actions, and forwards emitted notifications to
//! subscribers. Because every mutation happens inside a single `handle`
//! call, check-then-act sequences (queue full? then push) are atomic per
//! tick by construction.

mod action;
mod config;
mod event;
mod notify;
mod traits;

pub use action::Action;
pub use config::{
    ConfigError, ExecutorConfig, PipelineConfig, ProducerConfig, ProposerConfig, SettlementConfig,
    SyncConfig,
};
pub use event::{Event, EventPriority};
pub use notify::PipelineEvent;
pub use traits::StateMachine;

/// Identifies a timer for setting and cancellation.
///
/// One timer of each id may be outstanding per engine; setting an id again
/// replaces the pending occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerId {
    /// Next producer arrival.
    Arrival,
    /// Proposer cadence tick.
    Proposal,
    /// Proposing → accepted dwell.
    AcceptDwell,
    /// Next per-transaction execution step.
    ExecStep,
    /// Periodic settlement check.
    Settlement,
    /// Synchronous engine cycle tick.
    SyncCycle,
    /// Synchronous engine phase advance.
    SyncStep,
}
