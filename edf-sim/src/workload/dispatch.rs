/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Initial task-to-processor assignment.
//!
//! Constant-bin-count greedy packing: tasks are taken in decreasing
//! utilisation order and each goes to the bin with the smallest running sum.
//! The result only approximately balances load; partitioned runs correct it
//! through migration.

use tracing::{debug, info};

use crate::processor::{FrequencyBounds, Processor, ProcessorId};
use crate::task::Task;
use crate::workload::WorkloadError;

/// Split task indices `0..utilizations.len()` into `bins` groups.
///
/// Ties are broken by lower task index, then lower bin index.  Each group is
/// returned in ascending index order.
///
/// # Errors
/// [`WorkloadError::NoBins`] when `bins == 0`.
pub fn dispatch(utilizations: &[f64], bins: usize) -> Result<Vec<Vec<usize>>, WorkloadError> {
    if bins == 0 {
        return Err(WorkloadError::NoBins);
    }

    let mut order: Vec<usize> = (0..utilizations.len()).collect();
    order.sort_by(|&a, &b| utilizations[b].total_cmp(&utilizations[a]).then(a.cmp(&b)));

    let mut groups = vec![Vec::new(); bins];
    let mut sums = vec![0.0_f64; bins];
    for index in order {
        let bin = sums
            .iter()
            .enumerate()
            .min_by(|(i, a), (j, b)| a.total_cmp(b).then(i.cmp(j)))
            .map(|(i, _)| i)
            .unwrap_or(0);
        sums[bin] += utilizations[index];
        groups[bin].push(index);
    }

    for (bin, group) in groups.iter_mut().enumerate() {
        group.sort_unstable();
        debug!(bin, tasks = group.len(), utilization = sums[bin], "Dispatched bin");
    }
    Ok(groups)
}

/// Move `tasks` onto processors `1..=groups.len()` following `groups`.
///
/// Processor `i + 1` gets `bounds[i]`, or a full-speed clock when `bounds`
/// is shorter.  Indices outside `tasks` or repeated indices are ignored.
pub fn assign(tasks: Vec<Task>, groups: &[Vec<usize>], bounds: &[FrequencyBounds]) -> Vec<Processor> {
    let mut slots: Vec<Option<Task>> = tasks.into_iter().map(Some).collect();

    let processors: Vec<Processor> = groups
        .iter()
        .enumerate()
        .map(|(i, group)| {
            let owned: Vec<Task> = group
                .iter()
                .filter_map(|&index| slots.get_mut(index).and_then(Option::take))
                .collect();
            let id = (i + 1) as ProcessorId;
            Processor::new(id, owned, bounds.get(i).copied().unwrap_or_default())
        })
        .collect();

    for p in &processors {
        info!(
            processor = p.id,
            task_count = p.tasks.len(),
            utilization = p.total_utilization(),
            min_f = p.frequency.min_f,
            max_f = p.frequency.max_f,
            "Processor assigned"
        );
    }
    processors
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::Criticality;

    #[test]
    fn zero_bins_is_an_error() {
        assert!(matches!(dispatch(&[0.5], 0), Err(WorkloadError::NoBins)));
    }

    #[test]
    fn every_index_lands_in_exactly_one_bin() {
        let utils = [0.3, 0.1, 0.25, 0.05, 0.2, 0.15, 0.4];
        let groups = dispatch(&utils, 3).unwrap();
        let mut all: Vec<usize> = groups.iter().flatten().copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..utils.len()).collect::<Vec<_>>());
    }

    #[test]
    fn greedy_packing_balances_sums() {
        // 0.5 → b0, 0.375 → b1, 0.25 → b2, 0.1875 → b2, 0.125 → b1, 0.0625 → b2
        let utils = [0.5, 0.125, 0.25, 0.0625, 0.375, 0.1875];
        let groups = dispatch(&utils, 3).unwrap();
        assert_eq!(groups, vec![vec![0], vec![1, 4], vec![2, 3, 5]]);
    }

    #[test]
    fn more_bins_than_tasks_leaves_empty_bins() {
        let groups = dispatch(&[0.6, 0.1], 4).unwrap();
        assert_eq!(groups, vec![vec![0], vec![1], vec![], vec![]]);
    }

    #[test]
    fn equal_utilizations_fill_bins_in_order() {
        let groups = dispatch(&[0.2, 0.2, 0.2, 0.2], 2).unwrap();
        assert_eq!(groups, vec![vec![0, 2], vec![1, 3]]);
    }

    #[test]
    fn assign_builds_numbered_processors() {
        let tasks = vec![
            Task::with_timing(1, 10, 6, Criticality::Hard),
            Task::with_timing(2, 10, 1, Criticality::Soft),
            Task::with_timing(3, 10, 2, Criticality::Hard),
        ];
        let bounds = [FrequencyBounds::new(0.5, 1.0)];
        let processors = assign(tasks, &[vec![0], vec![1, 2]], &bounds);

        assert_eq!(processors.len(), 2);
        assert_eq!(processors[0].id, 1);
        assert_eq!(processors[0].tasks.keys().copied().collect::<Vec<_>>(), vec![1]);
        assert_eq!(processors[0].frequency, FrequencyBounds::new(0.5, 1.0));
        assert_eq!(processors[1].tasks.keys().copied().collect::<Vec<_>>(), vec![2, 3]);
        assert_eq!(processors[1].frequency, FrequencyBounds::FULL);
    }

    #[test]
    fn assign_ignores_repeated_indices() {
        let tasks = vec![Task::with_timing(1, 10, 1, Criticality::Hard)];
        let processors = assign(tasks, &[vec![0], vec![0, 5]], &[]);
        assert_eq!(processors[0].tasks.len(), 1);
        assert!(processors[1].tasks.is_empty());
    }
}
