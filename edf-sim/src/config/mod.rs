/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Simulation configuration loading and validation.
//!
//! The expected YAML structure is:
//! ```yaml
//! utilization: 0.3            # per processor; aggregate = utilization × processor_count
//! task_count: 100
//! processor_count: 8
//! seed: 42                    # optional
//! execution_time: { min: 1, max: 20 }
//! processors:                 # optional; one entry per processor
//!   - { min_f: 0.5, max_f: 1.0 }
//! scheduling_upper_bound: 200 # optional; defaults to the hyperperiod
//! time_partition: 20          # optional; absent = full-horizon mode
//! hyperperiod_limit: 10000000 # optional
//! roster_csv: tasks.csv       # optional
//! ```
//!
//! Every key is optional; missing values fall back to
//! [`SimulationConfig::default`].  Unknown keys are rejected so typos do not
//! silently fall back to defaults.

use std::path::{Path, PathBuf};

use anyhow::{bail, ensure, Context, Result};
use serde::Deserialize;
use tracing::{debug, info};

use crate::hyperperiod::DEFAULT_HYPERPERIOD_LIMIT;
use crate::processor::FrequencyBounds;
use crate::task::Tick;
use crate::workload::ExecutionTimeRange;

// ── Private YAML deserialization types ────────────────────────────────────────

/// Maps directly onto the YAML file layout.
///
/// Kept private; callers work with [`SimulationConfig`] / [`ConfigManager`].
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SimulationConfigFile {
    utilization: Option<f64>,
    task_count: Option<usize>,
    processor_count: Option<usize>,
    seed: Option<u64>,
    execution_time: Option<ExecutionTimeRange>,
    #[serde(default)]
    processors: Vec<FrequencyBounds>,
    scheduling_upper_bound: Option<Tick>,
    time_partition: Option<Tick>,
    hyperperiod_limit: Option<Tick>,
    roster_csv: Option<PathBuf>,
}

// ── Public data structures ────────────────────────────────────────────────────

/// Everything one simulation run needs.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    /// Target utilisation per processor.
    pub utilization: f64,
    pub task_count: usize,
    pub processor_count: usize,

    /// Workload seed.  `None` draws one from the OS.
    pub seed: Option<u64>,
    pub execution_time: ExecutionTimeRange,

    /// Per-processor clock bounds.  Empty means every processor runs at a
    /// fixed full clock.
    pub processors: Vec<FrequencyBounds>,
    pub scheduling_upper_bound: Option<Tick>,
    pub time_partition: Option<Tick>,
    pub hyperperiod_limit: Tick,
    pub roster_csv: Option<PathBuf>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            utilization: 0.3,
            task_count: 100,
            processor_count: 8,
            seed: None,
            execution_time: ExecutionTimeRange::default(),
            processors: Vec::new(),
            scheduling_upper_bound: None,
            time_partition: None,
            hyperperiod_limit: DEFAULT_HYPERPERIOD_LIMIT,
            roster_csv: None,
        }
    }
}

impl SimulationConfig {
    /// Parse a YAML document.  Does not validate.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let file: SimulationConfigFile =
            serde_yaml::from_str(content).context("Failed to parse simulation YAML")?;
        let defaults = Self::default();
        Ok(Self {
            utilization: file.utilization.unwrap_or(defaults.utilization),
            task_count: file.task_count.unwrap_or(defaults.task_count),
            processor_count: file.processor_count.unwrap_or(defaults.processor_count),
            seed: file.seed,
            execution_time: file.execution_time.unwrap_or(defaults.execution_time),
            processors: file.processors,
            scheduling_upper_bound: file.scheduling_upper_bound,
            time_partition: file.time_partition,
            hyperperiod_limit: file.hyperperiod_limit.unwrap_or(defaults.hyperperiod_limit),
            roster_csv: file.roster_csv,
        })
    }

    /// Utilisation the workload generator distributes over all tasks.
    pub fn aggregate_utilization(&self) -> f64 {
        self.utilization * self.processor_count as f64
    }

    /// Clock bounds for processor `1..=processor_count`, in order.
    pub fn frequency_bounds(&self) -> Vec<FrequencyBounds> {
        if self.processors.is_empty() {
            vec![FrequencyBounds::FULL; self.processor_count]
        } else {
            self.processors.clone()
        }
    }

    /// Reject values no simulation can run with.
    ///
    /// # Errors
    /// Names the first offending field.
    pub fn validate(&self) -> Result<()> {
        ensure!(self.task_count > 0, "task_count must be at least 1");
        ensure!(self.processor_count > 0, "processor_count must be at least 1");
        ensure!(
            self.utilization.is_finite() && self.utilization > 0.0,
            "utilization must be positive, got {}",
            self.utilization
        );
        ensure!(
            self.aggregate_utilization() <= self.task_count as f64,
            "aggregate utilization {} cannot be split over {} tasks of at most 1.0",
            self.aggregate_utilization(),
            self.task_count
        );
        ensure!(
            self.execution_time.min >= 1 && self.execution_time.min < self.execution_time.max,
            "execution_time range [{}, {}) is empty or starts at 0",
            self.execution_time.min,
            self.execution_time.max
        );
        if !self.processors.is_empty() && self.processors.len() != self.processor_count {
            bail!(
                "processors lists {} entries but processor_count is {}",
                self.processors.len(),
                self.processor_count
            );
        }
        for (i, bounds) in self.processors.iter().enumerate() {
            ensure!(
                bounds.is_valid(),
                "processor {} has invalid frequency bounds min_f={} max_f={}",
                i + 1,
                bounds.min_f,
                bounds.max_f
            );
        }
        ensure!(self.time_partition != Some(0), "time_partition must be at least 1");
        ensure!(self.hyperperiod_limit > 0, "hyperperiod_limit must be at least 1");
        if let Some(bound) = self.scheduling_upper_bound {
            ensure!(
                bound <= self.hyperperiod_limit,
                "scheduling_upper_bound {} exceeds hyperperiod_limit {}",
                bound,
                self.hyperperiod_limit
            );
        }
        Ok(())
    }
}

// ── ConfigManager ─────────────────────────────────────────────────────────────

/// Loads and holds the simulation configuration.
#[derive(Debug, Default)]
pub struct ConfigManager {
    config: SimulationConfig,

    /// Set to `true` after a successful [`load_from_file`](Self::load_from_file).
    loaded: bool,
}

impl ConfigManager {
    /// Manager holding the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate `path`, replacing the held configuration.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened, the YAML is invalid or
    /// a value fails [`SimulationConfig::validate`].  The previous
    /// configuration is kept in that case.
    pub fn load_from_file(&mut self, path: &Path) -> Result<()> {
        info!("Loading simulation configuration from: {}", path.display());

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot open configuration file: {}", path.display()))?;

        let config = SimulationConfig::from_yaml_str(&content)
            .with_context(|| format!("Failed to parse YAML file: {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid configuration in {}", path.display()))?;

        debug!(?config, "Parsed configuration");
        info!(
            utilization = config.utilization,
            task_count = config.task_count,
            processor_count = config.processor_count,
            time_partition = ?config.time_partition,
            "Configuration loaded"
        );

        self.config = config;
        self.loaded = true;
        Ok(())
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut SimulationConfig {
        &mut self.config
    }

    pub fn into_config(self) -> SimulationConfig {
        self.config
    }

    /// Returns `true` after a successful call to [`load_from_file`](Self::load_from_file).
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
