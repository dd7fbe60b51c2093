//! Transactions resident in the mempool.

use crate::{SlotIndex, TxId};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Opaque display weight for a transaction.
///
/// Chosen at creation and never interpreted by the core; renderers use it
/// to vary visual size only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TxWeight {
    Light,
    Medium,
    Heavy,
}

impl TxWeight {
    /// Sample a weight uniformly.
    pub fn sample<R: Rng>(rng: &mut R) -> Self {
        match rng.gen_range(0..3) {
            0 => TxWeight::Light,
            1 => TxWeight::Medium,
            _ => TxWeight::Heavy,
        }
    }
}

/// A synthetic transaction.
///
/// Exists only while resident in the mempool; it is destroyed (moved into a
/// block) when the proposer selects it. The `slot` is the display position
/// held while resident and is released on exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Monotonic identifier, never reused.
    pub id: TxId,
    /// Opaque display tag.
    pub weight: TxWeight,
    /// Display slot held while in the mempool.
    pub slot: SlotIndex,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_weight_sampling_is_deterministic() {
        let mut rng1 = ChaCha8Rng::seed_from_u64(7);
        let mut rng2 = ChaCha8Rng::seed_from_u64(7);

        for _ in 0..32 {
            assert_eq!(TxWeight::sample(&mut rng1), TxWeight::sample(&mut rng2));
        }
    }

    #[test]
    fn test_weight_sampling_covers_variants() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let mut seen = [false; 3];
        for _ in 0..64 {
            match TxWeight::sample(&mut rng) {
                TxWeight::Light => seen[0] = true,
                TxWeight::Medium => seen[1] = true,
                TxWeight::Heavy => seen[2] = true,
            }
        }
        assert!(seen.iter().all(|s| *s));
    }
}
