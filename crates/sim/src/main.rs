//! Pipeline Simulation CLI
//!
//! Runs the streaming or strict engine for a stretch of simulated time and
//! prints a stage-by-stage summary. Given the same seed, produces identical
//! results every run.
//!
//! # Example
//!
//! ```bash
//! # One simulated hour of the streaming engine
//! sae-sim --duration 3600 --seed 7
//!
//! # Contrast against the strict engine
//! sae-sim --engine sync --duration 3600 --seed 7
//!
//! # Dump the raw notification log as JSON lines
//! sae-sim --duration 60 --dump-events
//! ```

use clap::Parser;
use sae_core::{PipelineConfig, PipelineEvent};
use sae_node::EngineKind;
use sae_simulation::SimulationRunner;
use sae_types::Stage;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Deterministic pipeline simulator.
#[derive(Parser, Debug)]
#[command(name = "sae-sim")]
#[command(version, about, long_about = None)]
struct Args {
    /// Engine to run: async (streaming) or sync (strict)
    #[arg(short, long, default_value = "async")]
    engine: EngineKind,

    /// Simulated duration in seconds
    #[arg(short, long, default_value = "300")]
    duration: u64,

    /// Random seed for deterministic simulation
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Proposer cadence in milliseconds
    #[arg(long)]
    cadence_ms: Option<u64>,

    /// Execution queue capacity
    #[arg(long)]
    queue_capacity: Option<usize>,

    /// Settlement delay τ in milliseconds
    #[arg(long)]
    tau_ms: Option<u64>,

    /// Print every notification as a JSON line before the summary
    #[arg(long)]
    dump_events: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();

    let mut config = PipelineConfig::default();
    if let Some(ms) = args.cadence_ms {
        config.proposer.cadence = Duration::from_millis(ms);
    }
    if let Some(capacity) = args.queue_capacity {
        config.queue_capacity = capacity;
    }
    if let Some(ms) = args.tau_ms {
        config.settlement.tau = Duration::from_millis(ms);
    }

    info!(
        engine = %args.engine,
        duration_secs = args.duration,
        seed = args.seed,
        "starting simulation"
    );

    let mut runner = match SimulationRunner::start(args.engine, config, args.seed) {
        Ok(runner) => runner,
        Err(err) => {
            eprintln!("invalid configuration: {err}");
            std::process::exit(1);
        }
    };
    runner.run_until(Duration::from_secs(args.duration));
    runner.stop();

    let events = runner.take_events();
    if args.dump_events {
        for event in &events {
            match serde_json::to_string(event) {
                Ok(line) => println!("{line}"),
                Err(err) => eprintln!("serialization failed: {err}"),
            }
        }
    }

    print_summary(&args, &events, &runner);
}

fn print_summary(args: &Args, events: &[PipelineEvent], runner: &SimulationRunner) {
    let count_stage = |stage: Stage| {
        events
            .iter()
            .filter(|e| {
                matches!(e, PipelineEvent::BlockTransition { stage: s, .. } if *s == stage)
            })
            .count()
    };
    let admitted = events
        .iter()
        .filter(|e| matches!(e, PipelineEvent::TxAdmitted { .. }))
        .count();
    let failed_txs: usize = events
        .iter()
        .filter(
            |e| matches!(e, PipelineEvent::TxProgress { failed, .. } if *failed),
        )
        .count();
    let epochs = events
        .iter()
        .filter(|e| matches!(e, PipelineEvent::EpochFlushed { .. }))
        .count();
    let stats = runner.stats();

    println!("\n=== Simulation Complete ({} engine) ===", args.engine);
    println!("Simulated time:   {:.1}s", runner.now().as_secs_f64());
    println!("Txs admitted:     {admitted}");
    println!("Blocks proposed:  {}", count_stage(Stage::Proposed));
    println!("Blocks executed:  {}", count_stage(Stage::Executed));
    println!("Blocks settled:   {}", count_stage(Stage::Settled));
    println!("Failed txs:       {failed_txs}");
    println!("Epochs flushed:   {epochs}");
    println!("Events processed: {}", stats.events_processed);
    println!("Timers set:       {}", stats.timers_set);
    println!("Timers cancelled: {}", stats.timers_cancelled);
}
