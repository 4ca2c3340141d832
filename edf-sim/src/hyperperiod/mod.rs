/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Hyperperiod calculation, job generation and slack accounting.
//!
//! The hyperperiod of a processor is the Least Common Multiple (LCM) of the
//! periods of the tasks assigned to it: the window after which its workload
//! repeats.  Everything the EDF stepper consumes per processor is derived
//! here:
//!
//! | Quantity | Definition |
//! |----------|------------|
//! | hyperperiod | `lcm(periods)`, folded from `1` |
//! | horizon | scheduling upper bound if given, else the hyperperiod |
//! | jobs | one instance per multiple of the period in `0..=horizon` |
//! | slack time | `hyperperiod − Σ (hyperperiod / period + 1) × execution_time` |
//!
//! Hyperperiod and slack must be recomputed every time a processor's task set
//! changes, i.e. after each migration.

pub mod math;

use tracing::{debug, warn};

use crate::task::{Instance, Task, Tick};
use math::lcm_fold;

// ── Constants ─────────────────────────────────────────────────────────────────

/// Default upper limit on a computed hyperperiod, in ticks.
///
/// Randomly generated periods can produce astronomically large LCMs; the
/// limit turns those into an error instead of an endless simulation.
pub const DEFAULT_HYPERPERIOD_LIMIT: Tick = 10_000_000;

// ── Error type ────────────────────────────────────────────────────────────────

/// Errors that can occur during hyperperiod calculation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HyperperiodError {
    /// A task with a zero period was found.
    ZeroPeriod { task: u32 },

    /// LCM calculation overflowed `u64`.
    Overflow { a: u64, b: u64 },

    /// The calculated hyperperiod exceeded the configured limit.
    TooLarge { value: Tick, limit: Tick },
}

impl std::fmt::Display for HyperperiodError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HyperperiodError::ZeroPeriod { task } => {
                write!(f, "task {task} has a zero period")
            }
            HyperperiodError::Overflow { a, b } => {
                write!(f, "LCM overflow computing lcm({a}, {b})")
            }
            HyperperiodError::TooLarge { value, limit } => {
                write!(f, "hyperperiod {value} exceeds limit {limit} ticks")
            }
        }
    }
}

impl std::error::Error for HyperperiodError {}

// ── HyperperiodInfo ───────────────────────────────────────────────────────────

/// Calculated hyperperiod for one task set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HyperperiodInfo {
    /// LCM of all task periods (`1` for an empty set).
    pub hyperperiod: Tick,

    /// Unique periods present in the set (sorted, deduplicated).
    pub unique_periods: Vec<Tick>,

    /// Number of tasks that contributed.
    pub task_count: usize,
}

// ── HyperperiodCalculator ─────────────────────────────────────────────────────

/// Computes hyperperiods against a configurable upper limit.
///
/// # Example
/// ```rust
/// use edf_sim::hyperperiod::HyperperiodCalculator;
/// use edf_sim::task::{Criticality, Task};
///
/// let tasks = vec![
///     Task::with_timing(1, 3, 1, Criticality::Hard),
///     Task::with_timing(2, 4, 1, Criticality::Soft),
/// ];
/// let info = HyperperiodCalculator::new().calculate(tasks.iter()).unwrap();
/// assert_eq!(info.hyperperiod, 12);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct HyperperiodCalculator {
    limit: Tick,
}

impl HyperperiodCalculator {
    /// Calculator with [`DEFAULT_HYPERPERIOD_LIMIT`].
    pub fn new() -> Self {
        Self {
            limit: DEFAULT_HYPERPERIOD_LIMIT,
        }
    }

    pub fn with_limit(limit: Tick) -> Self {
        Self { limit }
    }

    pub fn limit(&self) -> Tick {
        self.limit
    }

    /// Calculate the hyperperiod of `tasks`.
    ///
    /// # Errors
    /// * [`HyperperiodError::ZeroPeriod`] – a task has `period == 0`.
    /// * [`HyperperiodError::Overflow`] – LCM computation exceeded `u64`.
    /// * [`HyperperiodError::TooLarge`] – result exceeds the configured limit.
    pub fn calculate<'a, I>(&self, tasks: I) -> Result<HyperperiodInfo, HyperperiodError>
    where
        I: IntoIterator<Item = &'a Task>,
    {
        let mut periods = Vec::new();
        let mut task_count = 0usize;
        for task in tasks {
            if task.period == 0 {
                return Err(HyperperiodError::ZeroPeriod { task: task.id });
            }
            periods.push(task.period);
            task_count += 1;
        }

        periods.sort_unstable();
        periods.dedup();

        let hyperperiod = lcm_fold(periods.iter().copied())?;

        if hyperperiod > self.limit {
            warn!(
                hyperperiod,
                limit = self.limit,
                "Hyperperiod exceeds configured limit"
            );
            return Err(HyperperiodError::TooLarge {
                value: hyperperiod,
                limit: self.limit,
            });
        }

        debug!(
            task_count,
            unique_count = periods.len(),
            hyperperiod,
            "Calculated hyperperiod"
        );

        Ok(HyperperiodInfo {
            hyperperiod,
            unique_periods: periods,
            task_count,
        })
    }
}

impl Default for HyperperiodCalculator {
    fn default() -> Self {
        Self::new()
    }
}

// ── Job generation ────────────────────────────────────────────────────────────

/// Replace `task.instances` with one instance per multiple of the period in
/// `0..=horizon`, numbered from `0`.
///
/// Regenerating for an unchanged task and horizon yields identical
/// arrival/deadline sequences.  Sequence numbers stop at `u32::MAX`.
pub fn generate_jobs(task: &mut Task, horizon: Tick) {
    task.instances.clear();
    if task.period == 0 {
        return;
    }
    let last = u32::try_from(horizon / task.period).unwrap_or_else(|_| {
        warn!(task = task.id, horizon, "Instance numbers exhausted, truncating job generation");
        u32::MAX
    });
    for number in 0..=last {
        let instance = Instance::new(task, number);
        task.instances.push(instance);
    }
}

/// Generate jobs for every task in `tasks` up to `horizon`.
pub fn generate_all<'a, I>(tasks: I, horizon: Tick) -> usize
where
    I: IntoIterator<Item = &'a mut Task>,
{
    let mut total = 0usize;
    for task in tasks {
        generate_jobs(task, horizon);
        total += task.instances.len();
    }
    debug!(horizon, instances = total, "Generated jobs");
    total
}

// ── Slack ─────────────────────────────────────────────────────────────────────

/// Slack time of a task set over one hyperperiod.
///
/// The job count per task is inclusive of the release at the hyperperiod
/// itself, matching [`generate_jobs`] with `horizon == hyperperiod`.  A
/// result `≤ 0` means the processor has no reclaimable slack.
pub fn slack_time<'a, I>(hyperperiod: Tick, tasks: I) -> i64
where
    I: IntoIterator<Item = &'a Task>,
{
    let demand: i128 = tasks
        .into_iter()
        .filter(|t| t.period > 0)
        .map(|t| i128::from(hyperperiod / t.period + 1) * i128::from(t.execution_time))
        .sum();
    let slack = i128::from(hyperperiod) - demand;
    slack.clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64
}

// ── Tests ─────────────────────────────────────────────────────────────────────
