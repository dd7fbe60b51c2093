//! Settlement stage: deferred batch finality.
//!
//! Executed blocks accumulate in an epoch; once the epoch has been open for
//! at least τ, every member settles in a single atomic flush. The delay is
//! deliberate: settlement batches finality, it does not chase execution.

mod state;

pub use state::SettlementState;
