//! Proposer/acceptor stage.
//!
//! Drives the `idle → proposing → accepted` cycle on a fixed cadence and
//! hands accepted blocks to the execution queue with back-pressure: a
//! rejected handoff stalls the proposer instead of dropping the block.

mod state;

pub use state::{select_count, ConsensusState, Phase};
