//! Producer stage: synthetic transaction arrivals into a bounded mempool.

mod state;

pub use state::MempoolState;
