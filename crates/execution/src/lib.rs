//! Execution stage: bounded FIFO queue and single-slot executor.
//!
//! The queue decouples the acceptance rate from the execution rate;
//! `enqueue` refuses work at capacity (back-pressure, never a silent drop)
//! and the executor drains it strictly FIFO, one block at a time.

mod queue;
mod state;

pub use queue::ExecQueue;
pub use state::{EnqueueOutcome, ExecutorState};
