//! Core types for the SAE pipeline simulation.
//!
//! This crate provides the foundational types used throughout the
//! simulation:
//!
//! - **Identifiers**: [`TxId`], [`BlockId`], [`BlockUid`]
//! - **Domain types**: [`Transaction`], [`Block`], [`Stage`]
//! - **Display plumbing**: [`SlotPool`] for stable renderer positions
//!
//! # Design Philosophy
//!
//! This crate is self-contained with minimal dependencies. It does not depend
//! on any other workspace crates, making it the foundation layer.

mod block;
mod identifiers;
mod slot;
mod stage;
mod transaction;

pub use block::{Block, BlockSnapshot};
pub use identifiers::{BlockId, BlockUid, TxId};
pub use slot::{SlotIndex, SlotPool};
pub use stage::Stage;
pub use transaction::{Transaction, TxWeight};
