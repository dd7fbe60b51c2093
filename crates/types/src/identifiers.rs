//! Identifier newtypes.
//!
//! All identifiers are issued monotonically by their owning stage and are
//! never reused within a run.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Transaction identifier.
///
/// Issued monotonically by the producer. An id is issued at most once and
/// never reused, even after the transaction leaves the mempool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TxId(pub u64);

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tx-{}", self.0)
    }
}

/// Block display identifier.
///
/// Monotonic per run; what a renderer labels the block with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BlockId(pub u64);

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "block-{}", self.0)
    }
}

/// Globally unique block token.
///
/// Distinct from [`BlockId`]: the uid is the correlation key for events
/// (progress sub-events, stage transitions) and is unique across both
/// engines within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BlockUid(pub u64);

impl fmt::Display for BlockUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "uid-{}", self.0)
    }
}
