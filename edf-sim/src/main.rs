/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::Parser;
use rand::rngs::SmallRng;
use rand::{RngCore, SeedableRng};
use tracing::{error, info, warn};

use edf_sim::config::{ConfigManager, SimulationConfig};
use edf_sim::hyperperiod::HyperperiodCalculator;
use edf_sim::run_log::RunLog;
use edf_sim::scheduler::Scheduler;
use edf_sim::task::Tick;
use edf_sim::workload::{self, dispatch, roster};

// ── CLI argument definition ───────────────────────────────────────────────────

/// Partitioned EDF scheduling simulator.
///
/// Example:
///   edf-sim --config demos/simulation.yaml --partition 50 --log-out run.json
#[derive(Debug, Parser)]
#[command(
    name = "edf-sim",
    about = "Partitioned EDF simulator with slack reclamation and task migration",
    long_about = None,
)]
struct Cli {
    /// Path to the YAML simulation configuration file.
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Target utilisation per processor.
    #[arg(short = 'u', long = "utilization")]
    utilization: Option<f64>,

    /// Number of tasks to generate.
    #[arg(short = 'n', long = "tasks")]
    tasks: Option<usize>,

    /// Number of processors.
    #[arg(short = 'p', long = "processors")]
    processors: Option<usize>,

    /// Scheduling upper bound in ticks (defaults to the hyperperiod).
    #[arg(short = 'b', long = "upper-bound")]
    upper_bound: Option<Tick>,

    /// Partition length in ticks; enables migration between partitions.
    #[arg(short = 't', long = "partition")]
    partition: Option<Tick>,

    /// Seed for workload generation.
    #[arg(short = 's', long = "seed")]
    seed: Option<u64>,

    /// Write the generated task roster to this CSV file.
    #[arg(short = 'r', long = "roster")]
    roster: Option<PathBuf>,

    /// Write the run log to this JSON file.
    #[arg(short = 'o', long = "log-out")]
    log_out: Option<PathBuf>,
}

impl Cli {
    /// Apply command-line overrides on top of `config`.
    fn apply(&self, config: &mut SimulationConfig) {
        if let Some(u) = self.utilization {
            config.utilization = u;
        }
        if let Some(n) = self.tasks {
            config.task_count = n;
        }
        if let Some(p) = self.processors {
            config.processor_count = p;
        }
        if self.upper_bound.is_some() {
            config.scheduling_upper_bound = self.upper_bound;
        }
        if self.partition.is_some() {
            config.time_partition = self.partition;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        if self.roster.is_some() {
            config.roster_csv = self.roster.clone();
        }
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    // Initialise structured logging.
    // Level is controlled by the RUST_LOG env-var (e.g. RUST_LOG=debug).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    info!(config = ?cli.config, partition = ?cli.partition, seed = ?cli.seed, "edf-sim starting up...");

    if let Err(e) = run(&cli) {
        error!("Simulation failed: {:#}", e);
        process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    // ── Load configuration ────────────────────────────────────────────────────
    let mut manager = ConfigManager::new();
    match &cli.config {
        Some(path) => manager.load_from_file(path)?,
        None => warn!("No configuration file provided, using default simulation settings"),
    }
    let mut config = manager.into_config();
    cli.apply(&mut config);
    config.validate().context("Invalid configuration after CLI overrides")?;

    // ── Generate workload ─────────────────────────────────────────────────────
    let seed = config.seed.unwrap_or_else(|| rand::thread_rng().next_u64());
    let mut rng = SmallRng::seed_from_u64(seed);
    info!(
        seed,
        aggregate_utilization = config.aggregate_utilization(),
        task_count = config.task_count,
        processor_count = config.processor_count,
        "Generating workload"
    );

    let utilizations =
        workload::uunifast_discard(&mut rng, config.aggregate_utilization(), config.task_count)?;
    let tasks = workload::generate_tasks(&mut rng, &utilizations, config.execution_time)?;

    if let Some(path) = &config.roster_csv {
        roster::save_roster(path, &tasks)?;
    }

    // ── Dispatch and simulate ─────────────────────────────────────────────────
    let groups = dispatch::dispatch(&utilizations, config.processor_count)?;
    let processors = dispatch::assign(tasks, &groups, &config.frequency_bounds());

    let mut scheduler = Scheduler::with_calculator(
        processors,
        config.scheduling_upper_bound,
        config.time_partition,
        HyperperiodCalculator::with_limit(config.hyperperiod_limit),
    )?;
    let log = scheduler.schedule();

    report(&log);

    if let Some(path) = &cli.log_out {
        let json = log.to_json_pretty().context("Failed to serialise run log")?;
        std::fs::write(path, json)
            .with_context(|| format!("Cannot write run log: {}", path.display()))?;
        info!(path = %path.display(), "Run log written");
    }
    Ok(())
}

fn report(log: &RunLog) {
    for summary in log.summaries() {
        info!(
            processor = summary.processor,
            segments = summary.segments,
            busy_time = summary.busy_time,
            makespan = summary.makespan,
            completed = summary.completed,
            deadline_misses = summary.deadline_misses,
            "Processor summary"
        );
    }
    for m in &log.migrations {
        info!(
            window = m.window,
            task = m.task_id,
            from = m.from,
            to = m.to,
            gap = m.gap,
            "Migration"
        );
    }
}
