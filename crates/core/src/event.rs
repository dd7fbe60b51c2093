//! Event types for the deterministic state machines.

/// Priority levels for event ordering within the same timestamp.
///
/// Events at the same simulation time are processed in priority order.
/// Lower values = higher priority (processed first).
///
/// This ensures causality is preserved: internal events (consequences of
/// processing an event) are handled before new timer inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum EventPriority {
    /// Internal events: consequences of prior event processing.
    /// Processed first to maintain causality.
    Internal = 0,

    /// Timer events: scheduled via `Action::SetTimer`.
    Timer = 1,
}

/// All possible events a pipeline engine can receive.
///
/// Events are **passive data** - they describe something that happened.
/// The state machine processes events and returns actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // ═══════════════════════════════════════════════════════════════════════
    // Timers (priority: Timer)
    // ═══════════════════════════════════════════════════════════════════════
    /// Time for the producer to emit new transactions.
    ArrivalTimer,

    /// Proposer cadence tick: hand off the accepted block, then maybe
    /// propose a new one.
    ProposalTimer,

    /// The proposing dwell elapsed: the candidate block becomes accepted.
    AcceptDwellTimer,

    /// Next per-transaction step of the currently executing block.
    ExecStepTimer,

    /// Periodic settlement epoch check.
    SettlementTimer,

    /// Synchronous engine cycle tick: try to start the next block.
    SyncCycleTimer,

    /// Synchronous engine phase advance (fill step, execution end, ...).
    SyncStepTimer,

    // ═══════════════════════════════════════════════════════════════════════
    // Internal Events (priority: Internal)
    // ═══════════════════════════════════════════════════════════════════════
    /// The executor should attempt to dequeue and start the next block.
    ///
    /// Raised after an enqueue, an execution completion, or a resume, so
    /// that execution starts as soon as a block is available with no
    /// artificial delay.
    ExecutorKick,

    /// The settlement epoch should be checked now.
    ///
    /// Raised on block acceptance: settlement piggybacks on the next
    /// accepted block in the modeled system, in addition to its periodic
    /// timer.
    SettlementCheck,
}

impl Event {
    /// Get the priority for this event type.
    ///
    /// Events at the same timestamp are processed in priority order,
    /// ensuring causality is preserved.
    pub fn priority(&self) -> EventPriority {
        match self {
            Event::ExecutorKick | Event::SettlementCheck => EventPriority::Internal,

            Event::ArrivalTimer
            | Event::ProposalTimer
            | Event::AcceptDwellTimer
            | Event::ExecStepTimer
            | Event::SettlementTimer
            | Event::SyncCycleTimer
            | Event::SyncStepTimer => EventPriority::Timer,
        }
    }

    /// Get the event type name for telemetry.
    pub fn type_name(&self) -> &'static str {
        match self {
            Event::ArrivalTimer => "ArrivalTimer",
            Event::ProposalTimer => "ProposalTimer",
            Event::AcceptDwellTimer => "AcceptDwellTimer",
            Event::ExecStepTimer => "ExecStepTimer",
            Event::SettlementTimer => "SettlementTimer",
            Event::SyncCycleTimer => "SyncCycleTimer",
            Event::SyncStepTimer => "SyncStepTimer",
            Event::ExecutorKick => "ExecutorKick",
            Event::SettlementCheck => "SettlementCheck",
        }
    }
}
