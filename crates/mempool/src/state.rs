//! Mempool state.

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use sae_core::{Action, PipelineEvent, ProducerConfig, TimerId};
use sae_types::{SlotPool, Transaction, TxId, TxWeight};
use std::collections::VecDeque;
use std::time::Duration;
use tracing::{debug, instrument, trace};

/// Producer state machine.
///
/// Emits synthetic transactions into a bounded mempool at randomized
/// intervals and batch sizes, and hands them to the proposer on selection.
/// A full mempool (or an exhausted slot pool) throttles arrivals for the
/// tick; nothing is dropped and nothing errors.
#[derive(Debug)]
pub struct MempoolState {
    config: ProducerConfig,

    /// Resident transactions in arrival order; selection takes from the
    /// front.
    pool: VecDeque<Transaction>,

    /// Display slots held by resident transactions.
    slots: SlotPool,

    /// Next transaction id; monotonic, never reused.
    next_tx_id: u64,

    /// Current time.
    now: Duration,

    /// Arrival ticks on which at least one transaction was throttled.
    throttled_ticks: u64,
}

impl MempoolState {
    /// Create a new producer.
    pub fn new(config: ProducerConfig) -> Self {
        let slots = SlotPool::new(config.mempool_capacity);
        Self {
            config,
            pool: VecDeque::new(),
            slots,
            next_tx_id: 0,
            now: Duration::ZERO,
            throttled_ticks: 0,
        }
    }

    /// Schedule the first arrival.
    pub fn start(&mut self, rng: &mut ChaCha8Rng) -> Vec<Action> {
        vec![Action::SetTimer {
            id: TimerId::Arrival,
            duration: self.sample_delay(rng),
        }]
    }

    /// Handle an arrival tick: admit a batch if there is room, then
    /// reschedule.
    #[instrument(skip(self, rng), fields(pool_len = self.pool.len()))]
    pub fn on_arrival_timer(&mut self, rng: &mut ChaCha8Rng) -> Vec<Action> {
        let mut actions = vec![Action::SetTimer {
            id: TimerId::Arrival,
            duration: self.sample_delay(rng),
        }];

        let batch = rng.gen_range(self.config.batch_min..=self.config.batch_max);
        let mut admitted = 0usize;

        for _ in 0..batch {
            if self.pool.len() >= self.config.mempool_capacity as usize {
                // Organic arrival throttling, not a failure.
                self.throttled_ticks += 1;
                trace!(pool_len = self.pool.len(), "mempool full, skipping arrival");
                break;
            }
            let Some(slot) = self.slots.allocate() else {
                self.throttled_ticks += 1;
                break;
            };

            let tx = Transaction {
                id: TxId(self.next_tx_id),
                weight: TxWeight::sample(rng),
                slot,
            };
            self.next_tx_id += 1;

            actions.push(Action::Emit {
                event: PipelineEvent::TxAdmitted {
                    id: tx.id,
                    weight: tx.weight,
                    slot,
                    at: self.now,
                },
            });
            self.pool.push_back(tx);
            admitted += 1;
        }

        if admitted > 0 {
            debug!(
                admitted,
                pool_len = self.pool.len(),
                "transactions arrived"
            );
        }

        actions
    }

    /// Remove the `n` oldest transactions for block creation.
    ///
    /// Removal is atomic with block creation: the caller builds the block
    /// from the returned transactions in the same tick, so no transaction
    /// can be double-assigned. Slots are released and exit notifications
    /// emitted here.
    pub fn take(&mut self, n: usize) -> (Vec<Transaction>, Vec<Action>) {
        let n = n.min(self.pool.len());
        let mut taken = Vec::with_capacity(n);
        let mut actions = Vec::with_capacity(n);

        for _ in 0..n {
            // n is capped by pool length above
            let Some(tx) = self.pool.pop_front() else {
                break;
            };
            self.slots.release(tx.slot);
            actions.push(Action::Emit {
                event: PipelineEvent::TxRemoved {
                    id: tx.id,
                    slot: tx.slot,
                    at: self.now,
                },
            });
            taken.push(tx);
        }

        (taken, actions)
    }

    /// Number of resident transactions.
    pub fn len(&self) -> usize {
        self.pool.len()
    }

    /// Whether the mempool is empty.
    pub fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }

    /// Number of arrival ticks that were throttled by capacity.
    pub fn throttled_ticks(&self) -> u64 {
        self.throttled_ticks
    }

    /// Update simulated time.
    pub fn set_time(&mut self, now: Duration) {
        self.now = now;
    }

    fn sample_delay(&self, rng: &mut ChaCha8Rng) -> Duration {
        if self.config.min_delay == self.config.max_delay {
            return self.config.min_delay;
        }
        let min = self.config.min_delay.as_secs_f64();
        let max = self.config.max_delay.as_secs_f64();
        Duration::from_secs_f64(rng.gen_range(min..max))
    }
}
