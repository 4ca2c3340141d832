/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Synthetic workload: utilisation sets, task generation, dispatch and the
//! persisted roster.
//!
//! ```text
//! uunifast_discard(U, n) ──► [u_1 … u_n] ──► generate_tasks ──► Vec<Task>
//!                                                                  │
//!                                 dispatch::dispatch (greedy bins) ◄┘
//!                                                                  │
//!                                 dispatch::assign ──► Vec<Processor>
//! ```
//!
//! Randomness comes from a caller-supplied [`rand::Rng`], so a seeded
//! `SmallRng` reproduces the same workload on every run.

pub mod dispatch;
pub mod roster;

use std::path::PathBuf;

use rand::Rng;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::task::{Criticality, Task, TaskId, Tick};

/// Attempts before UUniFast-discard gives up on a target.
pub const MAX_UUNIFAST_ATTEMPTS: usize = 10_000;

// ── Error type ────────────────────────────────────────────────────────────────

/// Errors raised while building a workload.
#[derive(Debug, Error)]
pub enum WorkloadError {
    /// The aggregate target cannot be split into `count` values in `(0, 1]`.
    #[error("target utilization {total} cannot be split over {count} tasks of at most 1.0")]
    InvalidTarget { total: f64, count: usize },

    /// Every drawn set had a value outside `(0, 1]`.
    #[error("no valid utilization set after {attempts} attempts")]
    Exhausted { attempts: usize },

    /// The execution-time range is empty or admits zero.
    #[error("execution time range [{min}, {max}) is empty or starts at 0")]
    InvalidExecutionRange { min: Tick, max: Tick },

    /// Dispatch was asked for zero processors.
    #[error("cannot dispatch tasks over zero processors")]
    NoBins,

    /// The roster file could not be written.
    #[error("failed to write task roster {}", .path.display())]
    Roster {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

// ── ExecutionTimeRange ────────────────────────────────────────────────────────

/// Half-open range `[min, max)` execution times are drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ExecutionTimeRange {
    pub min: Tick,
    pub max: Tick,
}

impl Default for ExecutionTimeRange {
    fn default() -> Self {
        Self { min: 1, max: 20 }
    }
}

// ── UUniFast-discard ──────────────────────────────────────────────────────────

/// One UUniFast draw: `count` values summing to `total`, unbounded above.
fn uunifast<R: Rng + ?Sized>(rng: &mut R, total: f64, count: usize) -> Vec<f64> {
    let mut utilizations = Vec::with_capacity(count);
    let mut sum = total;
    for i in 1..count {
        let next = sum * rng.gen::<f64>().powf(1.0 / (count - i) as f64);
        utilizations.push(sum - next);
        sum = next;
    }
    utilizations.push(sum);
    utilizations
}

/// Draw `count` utilisations in `(0, 1]` summing to `total`.
///
/// Sets with any value outside `(0, 1]` are discarded and redrawn, up to
/// [`MAX_UUNIFAST_ATTEMPTS`] times.
///
/// # Errors
/// * [`WorkloadError::InvalidTarget`] when `count == 0`, `total ≤ 0` or
///   `total > count`.
/// * [`WorkloadError::Exhausted`] when no draw was valid.
pub fn uunifast_discard<R: Rng + ?Sized>(
    rng: &mut R,
    total: f64,
    count: usize,
) -> Result<Vec<f64>, WorkloadError> {
    if count == 0 || !(total > 0.0 && total <= count as f64) {
        return Err(WorkloadError::InvalidTarget { total, count });
    }

    for attempt in 1..=MAX_UUNIFAST_ATTEMPTS {
        let set = uunifast(rng, total, count);
        if set.iter().all(|&u| u > 0.0 && u <= 1.0) {
            debug!(total, count, attempt, "UUniFast-discard accepted set");
            return Ok(set);
        }
    }
    Err(WorkloadError::Exhausted {
        attempts: MAX_UUNIFAST_ATTEMPTS,
    })
}

// ── Task generation ───────────────────────────────────────────────────────────

/// Build one task per utilisation, numbered from `1`.
///
/// Execution time is drawn from `range`, the period is
/// `floor(execution_time / utilization)` and the criticality is a fair coin.
///
/// # Errors
/// [`WorkloadError::InvalidExecutionRange`] when `range` is empty or
/// starts at `0`.
pub fn generate_tasks<R: Rng + ?Sized>(
    rng: &mut R,
    utilizations: &[f64],
    range: ExecutionTimeRange,
) -> Result<Vec<Task>, WorkloadError> {
    if range.min == 0 || range.min >= range.max {
        return Err(WorkloadError::InvalidExecutionRange {
            min: range.min,
            max: range.max,
        });
    }
    let tasks = utilizations
        .iter()
        .zip(1..)
        .map(|(&utilization, id): (&f64, TaskId)| {
            let execution_time = rng.gen_range(range.min..range.max);
            let criticality = if rng.gen_bool(0.5) {
                Criticality::Hard
            } else {
                Criticality::Soft
            };
            Task::new(id, utilization, execution_time, criticality)
        })
        .collect();
    Ok(tasks)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn rng() -> SmallRng {
        SmallRng::seed_from_u64(0x5eed)
    }

    // ── uunifast_discard ──────────────────────────────────────────────────────

    #[test]
    fn set_sums_to_target_and_stays_in_unit_interval() {
        let set = uunifast_discard(&mut rng(), 2.4, 100).unwrap();
        assert_eq!(set.len(), 100);
        assert!((set.iter().sum::<f64>() - 2.4).abs() < 1e-9);
        assert!(set.iter().all(|&u| u > 0.0 && u <= 1.0));
    }

    #[test]
    fn heavy_target_still_respects_upper_bound() {
        let set = uunifast_discard(&mut rng(), 3.0, 5).unwrap();
        assert!(set.iter().all(|&u| u <= 1.0));
        assert!((set.iter().sum::<f64>() - 3.0).abs() < 1e-9);
    }

    #[test]
    fn same_seed_gives_same_set() {
        let a = uunifast_discard(&mut rng(), 1.5, 10).unwrap();
        let b = uunifast_discard(&mut rng(), 1.5, 10).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn single_task_takes_whole_target() {
        assert_eq!(uunifast_discard(&mut rng(), 0.7, 1).unwrap(), vec![0.7]);
    }

    #[test]
    fn impossible_targets_are_rejected() {
        assert!(matches!(
            uunifast_discard(&mut rng(), 3.5, 3),
            Err(WorkloadError::InvalidTarget { count: 3, .. })
        ));
        assert!(matches!(
            uunifast_discard(&mut rng(), 0.5, 0),
            Err(WorkloadError::InvalidTarget { .. })
        ));
        assert!(matches!(
            uunifast_discard(&mut rng(), 0.0, 4),
            Err(WorkloadError::InvalidTarget { .. })
        ));
    }

    #[test]
    fn saturated_target_exhausts_attempts() {
        // Two values of exactly 1.0 are never drawn
        assert!(matches!(
            uunifast_discard(&mut rng(), 2.0, 2),
            Err(WorkloadError::Exhausted { .. })
        ));
    }

    // ── generate_tasks ────────────────────────────────────────────────────────

    #[test]
    fn tasks_are_numbered_from_one() {
        let tasks = generate_tasks(&mut rng(), &[0.2, 0.3, 0.1], ExecutionTimeRange::default()).unwrap();
        assert_eq!(tasks.iter().map(|t| t.id).collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn execution_time_and_period_follow_utilization() {
        let range = ExecutionTimeRange { min: 3, max: 7 };
        let utils = [0.05, 0.5, 1.0, 0.33];
        for task in generate_tasks(&mut rng(), &utils, range).unwrap() {
            assert!((3..7).contains(&task.execution_time));
            let expected = (task.execution_time as f64 / task.utilization).floor() as Tick;
            assert_eq!(task.period, expected);
            assert!(task.period >= task.execution_time);
        }
    }

    #[test]
    fn both_criticalities_appear_in_a_large_set() {
        let utils = vec![0.01; 64];
        let tasks = generate_tasks(&mut rng(), &utils, ExecutionTimeRange::default()).unwrap();
        assert!(tasks.iter().any(|t| t.criticality == Criticality::Hard));
        assert!(tasks.iter().any(|t| t.criticality == Criticality::Soft));
    }

    #[test]
    fn empty_or_zero_based_range_is_rejected() {
        for (min, max) in [(5, 5), (7, 3), (0, 4)] {
            let range = ExecutionTimeRange { min, max };
            assert!(matches!(
                generate_tasks(&mut rng(), &[0.5], range),
                Err(WorkloadError::InvalidExecutionRange { .. })
            ));
        }
    }
}
