//! Configuration for both pipeline engines.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Configuration validation error.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    /// An interval's lower bound exceeds its upper bound.
    #[error("{field}: min {min:?} exceeds max {max:?}")]
    InvertedRange {
        field: &'static str,
        min: Duration,
        max: Duration,
    },

    /// A count range is inverted.
    #[error("{field}: min {min} exceeds max {max}")]
    InvertedCountRange {
        field: &'static str,
        min: usize,
        max: usize,
    },

    /// A capacity or duration that must be positive is zero.
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    /// A probability lies outside `[0, 1]`.
    #[error("{field} must be within [0, 1], got {value}")]
    Probability { field: &'static str, value: f64 },
}

/// Producer (mempool arrival) configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProducerConfig {
    /// Lower bound on the inter-arrival delay.
    pub min_delay: Duration,
    /// Upper bound on the inter-arrival delay.
    pub max_delay: Duration,
    /// Minimum transactions per arrival tick.
    pub batch_min: usize,
    /// Maximum transactions per arrival tick.
    pub batch_max: usize,
    /// Maximum resident mempool size; also the display slot pool size.
    pub mempool_capacity: u8,
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            min_delay: Duration::from_millis(400),
            max_delay: Duration::from_millis(1200),
            batch_min: 1,
            batch_max: 2,
            mempool_capacity: 18,
        }
    }
}

/// Proposer/acceptor configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposerConfig {
    /// Fixed cadence at which proposal cycles run.
    pub cadence: Duration,
    /// Minimum mempool residency before a block forms; below this the cycle
    /// skips (not an error).
    pub min_txs: usize,
    /// Lower bound of the uniform selection count.
    pub select_min: usize,
    /// Upper bound of the uniform selection count.
    pub select_max: usize,
    /// Hard cap on transactions per block.
    pub max_block_txs: usize,
    /// Probability of taking the entire mempool while it is small.
    pub greedy_probability: f64,
    /// Dwell between proposing and accepted; order is final afterwards.
    pub accept_dwell: Duration,
}

impl Default for ProposerConfig {
    fn default() -> Self {
        Self {
            cadence: Duration::from_millis(1500),
            min_txs: 4,
            select_min: 4,
            select_max: 12,
            max_block_txs: 16,
            greedy_probability: 0.1,
            accept_dwell: Duration::from_millis(600),
        }
    }
}

/// Executor configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Execution time per contained transaction (the gas stand-in).
    pub per_tx_time: Duration,
    /// Queue backlog above which the executor speeds up.
    pub speedup_backlog_threshold: usize,
    /// Multiplier applied to `per_tx_time` while catching up.
    pub speedup_factor: f64,
    /// Independent per-transaction failure probability, assigned once at
    /// first execution.
    pub failure_probability: f64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            per_tx_time: Duration::from_millis(250),
            speedup_backlog_threshold: 3,
            speedup_factor: 0.5,
            failure_probability: 0.15,
        }
    }
}

/// Settlement batcher configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettlementConfig {
    /// Minimum elapsed time since the epoch opened before it may flush (τ).
    pub tau: Duration,
    /// Periodic check interval; checks also run on block acceptance.
    pub check_interval: Duration,
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self {
            tau: Duration::from_millis(5000),
            check_interval: Duration::from_millis(1000),
        }
    }
}

/// Synchronous engine configuration.
///
/// The strict variant has its own fixed timings: execution duration is
/// independent of gas, and each phase advance is a single delay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Cycle cadence; a cycle is refused while a block is in flight.
    pub cadence: Duration,
    /// Delay between per-transaction fill steps during proposing.
    pub fill_step: Duration,
    /// Fixed execution duration, independent of transaction count.
    pub exec_duration: Duration,
    /// Delay between execution end and acceptance.
    pub accept_delay: Duration,
    /// Delay between acceptance and settlement.
    pub settle_delay: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            cadence: Duration::from_millis(1000),
            fill_step: Duration::from_millis(150),
            exec_duration: Duration::from_millis(1200),
            accept_delay: Duration::from_millis(300),
            settle_delay: Duration::from_millis(800),
        }
    }
}

/// Complete configuration for a pipeline engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Producer settings.
    pub producer: ProducerConfig,
    /// Proposer/acceptor settings.
    pub proposer: ProposerConfig,
    /// Bounded FIFO capacity between acceptance and execution.
    pub queue_capacity: usize,
    /// Executor settings.
    pub executor: ExecutorConfig,
    /// Settlement settings.
    pub settlement: SettlementConfig,
    /// Synchronous engine settings.
    pub sync: SyncConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            producer: ProducerConfig::default(),
            proposer: ProposerConfig::default(),
            queue_capacity: 8,
            executor: ExecutorConfig::default(),
            settlement: SettlementConfig::default(),
            sync: SyncConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Set the producer configuration.
    pub fn with_producer(mut self, producer: ProducerConfig) -> Self {
        self.producer = producer;
        self
    }

    /// Set the proposer configuration.
    pub fn with_proposer(mut self, proposer: ProposerConfig) -> Self {
        self.proposer = proposer;
        self
    }

    /// Set the execution queue capacity.
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Set the executor configuration.
    pub fn with_executor(mut self, executor: ExecutorConfig) -> Self {
        self.executor = executor;
        self
    }

    /// Set the settlement configuration.
    pub fn with_settlement(mut self, settlement: SettlementConfig) -> Self {
        self.settlement = settlement;
        self
    }

    /// Set the synchronous engine configuration.
    pub fn with_sync(mut self, sync: SyncConfig) -> Self {
        self.sync = sync;
        self
    }

    /// Validate every field relation.
    ///
    /// Called once when a simulation starts; stage logic assumes a valid
    /// configuration afterwards.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.producer.min_delay > self.producer.max_delay {
            return Err(ConfigError::InvertedRange {
                field: "producer.delay",
                min: self.producer.min_delay,
                max: self.producer.max_delay,
            });
        }
        if self.producer.min_delay.is_zero() {
            return Err(ConfigError::Zero {
                field: "producer.min_delay",
            });
        }
        if self.producer.batch_min > self.producer.batch_max {
            return Err(ConfigError::InvertedCountRange {
                field: "producer.batch",
                min: self.producer.batch_min,
                max: self.producer.batch_max,
            });
        }
        if self.producer.batch_min == 0 {
            return Err(ConfigError::Zero {
                field: "producer.batch_min",
            });
        }
        if self.producer.mempool_capacity == 0 {
            return Err(ConfigError::Zero {
                field: "producer.mempool_capacity",
            });
        }

        if self.proposer.cadence.is_zero() {
            return Err(ConfigError::Zero {
                field: "proposer.cadence",
            });
        }
        if self.proposer.select_min > self.proposer.select_max {
            return Err(ConfigError::InvertedCountRange {
                field: "proposer.select",
                min: self.proposer.select_min,
                max: self.proposer.select_max,
            });
        }
        if self.proposer.min_txs == 0 || self.proposer.max_block_txs == 0 {
            return Err(ConfigError::Zero {
                field: "proposer.min_txs/max_block_txs",
            });
        }
        check_probability(
            "proposer.greedy_probability",
            self.proposer.greedy_probability,
        )?;

        if self.queue_capacity == 0 {
            return Err(ConfigError::Zero {
                field: "queue_capacity",
            });
        }

        if self.executor.per_tx_time.is_zero() {
            return Err(ConfigError::Zero {
                field: "executor.per_tx_time",
            });
        }
        check_probability(
            "executor.failure_probability",
            self.executor.failure_probability,
        )?;
        check_probability("executor.speedup_factor", self.executor.speedup_factor)?;

        if self.settlement.tau.is_zero() {
            return Err(ConfigError::Zero {
                field: "settlement.tau",
            });
        }
        if self.settlement.check_interval.is_zero() {
            return Err(ConfigError::Zero {
                field: "settlement.check_interval",
            });
        }

        if self.sync.cadence.is_zero() || self.sync.fill_step.is_zero() {
            return Err(ConfigError::Zero {
                field: "sync.cadence/fill_step",
            });
        }

        Ok(())
    }
}

fn check_probability(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(ConfigError::Probability { field, value });
    }
    Ok(())
}
