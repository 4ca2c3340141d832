/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Feedback-driven task migration between partitions.
//!
//! At every partition boundary the processors are ordered by the utilisation
//! they measured over the window that just ended and paired from both ends:
//!
//! ```text
//! sorted ascending:   p_a   p_b   p_c   p_d   p_e
//!                      │     │           │     │
//!                      │     └─ pair 1 ──┘     │       (p_c unpaired)
//!                      └────── pair 0 ─────────┘
//! receiver = lower end, donor = upper end
//! ```
//!
//! Per pair, the donor's tasks are sorted by `(utilization, id)`.  A gap
//! above [`MIGRATION_GAP_THRESHOLD`] moves up to two tasks scanning from the
//! heaviest; otherwise up to one task scanning from the lightest.  The scan
//! skips a candidate when
//!
//! * it owns the donor's running instance, or the instance whose stretched
//!   segment still occupies the donor across the boundary, or
//! * the receiver's summed task utilisation would exceed
//!   [`RECEIVER_CAPACITY`].
//!
//! After a round both processors of every pair that moved a task recompute
//! hyperperiod and slack.  A receiver whose new hyperperiod exceeds the
//! limit keeps the task and runs without slack reclamation.
//!
//! # Receiver-only feasibility
//! Only the receiver side is checked.  The donor may stay overloaded and a
//! move may even widen the gap; `donor_side_is_never_checked` pins this
//! behaviour.

use tracing::{debug, info, warn};

use crate::hyperperiod::HyperperiodCalculator;
use crate::processor::{Processor, ProcessorSnapshot};
use crate::run_log::MigrationRecord;
use crate::task::{Task, TaskId};

// ── Constants ─────────────────────────────────────────────────────────────────

/// Utilisation gap above which a pair moves two tasks instead of one.
pub const MIGRATION_GAP_THRESHOLD: f64 = 0.2;

/// Upper bound on a receiver's summed task utilisation after a move.
pub const RECEIVER_CAPACITY: f64 = 1.0;

/// Float slack on the capacity comparison so `0.4 + 0.6` still fits.
const CAPACITY_TOLERANCE: f64 = 1e-9;

// ── Pairing ───────────────────────────────────────────────────────────────────

/// One donor/receiver pair, by index into the processor slice.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProcessorPair {
    pub receiver: usize,
    pub donor: usize,

    /// `utilization(donor) − utilization(receiver)`, never negative.
    pub gap: f64,
}

/// Pair the i-th lowest utilisation with the i-th highest for
/// `i < utilizations.len() / 2`.
///
/// The sort is stable, so processors with equal utilisation keep slice order.
pub fn pair_processors(utilizations: &[f64]) -> Vec<ProcessorPair> {
    let mut order: Vec<usize> = (0..utilizations.len()).collect();
    order.sort_by(|&a, &b| utilizations[a].total_cmp(&utilizations[b]));

    let n = order.len();
    (0..n / 2)
        .map(|i| {
            let receiver = order[i];
            let donor = order[n - 1 - i];
            ProcessorPair {
                receiver,
                donor,
                gap: utilizations[donor] - utilizations[receiver],
            }
        })
        .collect()
}

// ── Task selection ────────────────────────────────────────────────────────────

/// End of the donor's utilisation-sorted task list the scan starts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanDirection {
    FromHeaviest,
    FromLightest,
}

/// How much a pair with `gap` tries to move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MigrationPlan {
    pub direction: ScanDirection,
    pub tasks: usize,
}

impl MigrationPlan {
    pub fn for_gap(gap: f64) -> Self {
        if gap > MIGRATION_GAP_THRESHOLD {
            Self {
                direction: ScanDirection::FromHeaviest,
                tasks: 2,
            }
        } else {
            Self {
                direction: ScanDirection::FromLightest,
                tasks: 1,
            }
        }
    }
}

/// Pick the tasks `donor` hands to `receiver` under `plan`.
///
/// Returns an empty list when nothing is eligible.
pub fn select_tasks(donor: &Processor, receiver: &Processor, plan: MigrationPlan) -> Vec<TaskId> {
    let busy_tasks: Vec<TaskId> = donor
        .snapshot()
        .map(|s| s.running.into_iter().chain(s.stalled).map(|key| key.task_id).collect())
        .unwrap_or_default();

    let mut candidates: Vec<&Task> = donor.tasks.values().collect();
    candidates.sort_by(|a, b| {
        a.utilization
            .total_cmp(&b.utilization)
            .then(a.id.cmp(&b.id))
    });
    if plan.direction == ScanDirection::FromHeaviest {
        candidates.reverse();
    }

    let mut chosen = Vec::new();
    let mut receiver_util = receiver.total_utilization();

    for candidate in candidates {
        if chosen.len() >= plan.tasks {
            break;
        }
        if busy_tasks.contains(&candidate.id) {
            debug!(task = candidate.id, donor = donor.id, "Skipping running task");
            continue;
        }
        if receiver_util + candidate.utilization > RECEIVER_CAPACITY + CAPACITY_TOLERANCE {
            debug!(
                task = candidate.id,
                receiver = receiver.id,
                utilization = receiver_util + candidate.utilization,
                "Skipping task: receiver would be overloaded"
            );
            continue;
        }

        receiver_util += candidate.utilization;
        chosen.push(candidate.id);
    }
    chosen
}

// ── Transfer ──────────────────────────────────────────────────────────────────

/// Move `task_id` with its instances and its queue / ready entries from
/// `donor` to `receiver`.  Returns `false` if the donor does not own it.
///
/// Timing is not refreshed here; see [`rebalance`].
pub fn transfer(donor: &mut Processor, receiver: &mut Processor, task_id: TaskId) -> bool {
    let Some(task) = donor.tasks.remove(&task_id) else {
        return false;
    };
    receiver.tasks.insert(task_id, task);

    if let Some(from) = donor.saved.as_mut() {
        let queue = from.queue.take_task(task_id);
        let ready = from.ready.take_task(task_id);
        let to = receiver.saved.get_or_insert_with(ProcessorSnapshot::default);
        to.queue.absorb(queue);
        to.ready.absorb(ready);
    }
    true
}

/// Two distinct mutable elements of one slice.
fn pair_mut<T>(items: &mut [T], a: usize, b: usize) -> (&mut T, &mut T) {
    debug_assert_ne!(a, b);
    if a < b {
        let (left, right) = items.split_at_mut(b);
        (&mut left[a], &mut right[0])
    } else {
        let (left, right) = items.split_at_mut(a);
        (&mut right[0], &mut left[b])
    }
}

fn refresh(processor: &mut Processor, calculator: &HyperperiodCalculator) {
    if let Err(e) = processor.refresh_timing(calculator) {
        warn!(
            processor = processor.id,
            error = %e,
            "Hyperperiod unavailable after migration; slack reclamation disabled"
        );
    }
}

// ── Rebalance ─────────────────────────────────────────────────────────────────

/// Run one migration round over `processors` using the utilisation stored in
/// each snapshot.  `window` is the index of the window about to start.
pub fn rebalance(
    processors: &mut [Processor],
    window: usize,
    calculator: &HyperperiodCalculator,
) -> Vec<MigrationRecord> {
    let utilizations: Vec<f64> = processors
        .iter()
        .map(|p| p.snapshot().map_or(0.0, |s| s.utilization))
        .collect();

    let mut records = Vec::new();
    for pair in pair_processors(&utilizations) {
        let (donor, receiver) = pair_mut(processors, pair.donor, pair.receiver);
        let plan = MigrationPlan::for_gap(pair.gap);
        let chosen = select_tasks(donor, receiver, plan);

        if chosen.is_empty() {
            debug!(
                window,
                donor = donor.id,
                receiver = receiver.id,
                gap = pair.gap,
                "No eligible task for pair"
            );
            continue;
        }

        for task_id in chosen {
            if !transfer(donor, receiver, task_id) {
                continue;
            }
            info!(
                window,
                task = task_id,
                from = donor.id,
                to = receiver.id,
                gap = pair.gap,
                "Migrated task"
            );
            records.push(MigrationRecord {
                window,
                task_id,
                from: donor.id,
                to: receiver.id,
                gap: pair.gap,
            });
        }

        refresh(donor, calculator);
        refresh(receiver, calculator);
    }
    records
}

// ── Tests ─────────────────────────────────────────────────────────────────────
