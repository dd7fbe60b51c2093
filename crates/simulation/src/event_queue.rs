//! Deterministic event ordering.

use sae_core::{Event, EventPriority};
use std::time::Duration;

/// Total order over scheduled events.
///
/// Events sort by time, then priority (internal events before timers at the
/// same instant, so a consequence is observed before the next cause), then
/// insertion sequence as the final tie-break. The derived `Ord` relies on
/// this exact field order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct EventKey {
    /// Simulated time at which the event fires.
    pub time: Duration,
    /// Priority class within the instant.
    pub priority: EventPriority,
    /// Insertion order, unique per runner.
    pub sequence: u64,
}

impl EventKey {
    /// Build a key for `event` firing at `time`.
    pub fn new(time: Duration, event: &Event, sequence: u64) -> Self {
        Self {
            time,
            priority: event.priority(),
            sequence,
        }
    }
}
