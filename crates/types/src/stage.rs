//! Pipeline stages.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The ordered set of pipeline stages a block moves through.
///
/// A block occupies exactly one stage at any instant and transitions are
/// monotonic: no stage is revisited. Multiple blocks may share `Queued` or
/// `Executed` simultaneously; every other stage holds at most one block in
/// the asynchronous engine.
///
/// The synchronous engine reuses the same names but in its own order
/// (`Proposed → Executing → Accepted → Settled`), since execution precedes
/// acceptance under full serialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Stage {
    /// Resident in the mempool (transactions only have this stage implicitly).
    Mempool,
    /// Selected into a candidate block by the proposer.
    Proposed,
    /// Transaction order is final.
    Accepted,
    /// Waiting in the bounded FIFO for the executor.
    Queued,
    /// Being executed (at most one block at a time).
    Executing,
    /// Execution complete, waiting for the settlement epoch to flush.
    Executed,
    /// Settled as part of an atomic epoch flush. Terminal.
    Settled,
}

impl Stage {
    /// Position in the asynchronous pipeline ordering, for monotonicity checks.
    pub fn index(&self) -> u8 {
        match self {
            Stage::Mempool => 0,
            Stage::Proposed => 1,
            Stage::Accepted => 2,
            Stage::Queued => 3,
            Stage::Executing => 4,
            Stage::Executed => 5,
            Stage::Settled => 6,
        }
    }

    /// Whether this is the terminal stage.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Settled)
    }

    /// Stable name for logging and telemetry.
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Mempool => "mempool",
            Stage::Proposed => "proposed",
            Stage::Accepted => "accepted",
            Stage::Queued => "queued",
            Stage::Executing => "executing",
            Stage::Executed => "executed",
            Stage::Settled => "settled",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
