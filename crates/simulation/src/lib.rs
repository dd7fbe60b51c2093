//! Deterministic discrete-event simulation of the pipeline engines.
//!
//! Simulated time is a counter, not a clock: the runner pops the earliest
//! scheduled event, jumps time to it, hands it to the engine, and executes
//! the actions that come back. Given the same configuration and seed, a run
//! is reproducible event for event.

mod event_queue;
mod runner;

pub use event_queue::EventKey;
pub use runner::{SimulationRunner, SimulationStats};
