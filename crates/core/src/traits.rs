//! State machine traits.

use crate::{Action, Event};
use std::time::Duration;

/// A complete pipeline engine: consumes events, produces actions.
///
/// Implementations are synchronous and deterministic; given the same state
/// and event they return the same actions. The runner owns time and delivers
/// it via [`StateMachine::set_time`] before each `handle` call.
pub trait StateMachine {
    /// Process an event and return the resulting actions.
    fn handle(&mut self, event: Event) -> Vec<Action>;

    /// Update the machine's view of simulated time.
    fn set_time(&mut self, now: Duration);
}
