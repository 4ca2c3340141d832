/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! EDF schedulability check for one processor.
//!
//! # Status: advisory
//!
//! The bound is **computed and logged** for every processor before the
//! simulation starts.  It is a **warning only**: an overloaded processor is
//! still simulated, and its deadline misses show up in the run log as
//! negative `slack_time`.
//!
//! # Theory
//! **Liu & Layland (1973)**: under preemptive EDF, a set of independent
//! periodic tasks with implicit deadlines is schedulable on one processor
//! if and only if
//!
//! $$U = \sum_{i=1}^{n} \frac{C_i}{T_i} \leq 1$$
//!
//! Unlike the Rate Monotonic bound the EDF bound does not depend on `n`.
//! `U` is computed from execution time and the floored period, so it can be
//! slightly above the declared utilisation sum.

use crate::task::Task;

/// Exact EDF utilisation bound on one processor.
pub const EDF_UTILIZATION_BOUND: f64 = 1.0;

/// Float slack on the bound comparison.
const BOUND_TOLERANCE: f64 = 1e-9;

// ── Public API ────────────────────────────────────────────────────────────────

/// `Σ execution_time / period` over `tasks`.  Zero-period tasks contribute
/// nothing.
pub fn edf_utilization<'a, I>(tasks: I) -> f64
where
    I: IntoIterator<Item = &'a Task>,
{
    tasks
        .into_iter()
        .filter(|t| t.period > 0)
        .map(|t| t.execution_time as f64 / t.period as f64)
        .sum()
}

/// Check whether `tasks` are EDF-schedulable on one processor.
///
/// Returns `None` if the task set is schedulable, or `Some(total_utilisation)`
/// if the bound is exceeded.  The caller should warn; nothing is rejected.
pub fn check_edf_bound<'a, I>(tasks: I) -> Option<f64>
where
    I: IntoIterator<Item = &'a Task>,
{
    let total = edf_utilization(tasks);
    (total > EDF_UTILIZATION_BOUND + BOUND_TOLERANCE).then_some(total)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::Criticality;

    fn task_with_timing(period: u64, exec: u64) -> Task {
        Task::with_timing(1, period, exec, Criticality::Hard)
    }

    #[test]
    fn classic_three_task_set_is_feasible() {
        //   A: T=10, C=3 → 0.30
        //   B: T=20, C=5 → 0.25
        //   C: T=50, C=8 → 0.16
        let tasks = [
            task_with_timing(10, 3),
            task_with_timing(20, 5),
            task_with_timing(50, 8),
        ];
        assert!(check_edf_bound(&tasks).is_none());
    }

    #[test]
    fn set_above_rate_monotonic_bound_is_still_edf_feasible() {
        // U = 0.95 fails Liu & Layland for RM (0.78 for n = 3) but not EDF
        let tasks = [
            task_with_timing(20, 7),
            task_with_timing(20, 6),
            task_with_timing(20, 6),
        ];
        assert!(check_edf_bound(&tasks).is_none());
    }

    #[test]
    fn overloaded_set_exceeds_bound() {
        let tasks = [task_with_timing(5, 3), task_with_timing(5, 3)];
        let u = check_edf_bound(&tasks).expect("overloaded set");
        assert!((u - 1.2).abs() < 1e-9, "utilization should be 1.2, got {u}");
    }

    #[test]
    fn boundary_exactly_at_bound_is_feasible() {
        let tasks = [task_with_timing(4, 2), task_with_timing(8, 2), task_with_timing(8, 2)];
        assert!(check_edf_bound(&tasks).is_none(), "U == 1 is schedulable (≤, not <)");
    }

    #[test]
    fn floored_period_raises_utilization() {
        // Declared 0.3 with C = 2 gives T = 6, so the real share is 1/3
        let task = Task::new(1, 0.3, 2, Criticality::Soft);
        assert!((edf_utilization([&task]) - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn zero_period_and_empty_sets_contribute_nothing() {
        let none: [Task; 0] = [];
        assert_eq!(edf_utilization(&none), 0.0);
        assert_eq!(edf_utilization([&task_with_timing(0, 5)]), 0.0);
        assert!(check_edf_bound(&none).is_none());
    }
}
