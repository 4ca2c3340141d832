/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Core task data structures for the EDF simulator.
//!
//! Two types model the static and the dynamic side of a periodic workload:
//!
//! ```text
//! Task (static descriptor) ──(job generation)──► Instance × n  (one per release)
//!   id, utilization, period,                       arrival = number × period
//!   execution_time, criticality                    deadline = arrival + period
//! ```
//!
//! # Ownership model
//! A `Task` **owns** the `Vec<Instance>` spawned for the current horizon; the
//! instance at index `n` is the one with sequence number `n`.  Everything else
//! in the simulator (queues, ready sets, the running slot, the run log) refers
//! to an instance through its [`InstanceKey`], the `(task_id, number)` pair,
//! never through a reference.  Set membership stays valid when a task and its
//! instances migrate to another processor.

use std::fmt;

use serde::Serialize;

/// Discrete simulation time.  One tick is the smallest schedulable unit.
pub type Tick = u64;

/// Task identifier, unique within one simulation run.
pub type TaskId = u32;

// ── Criticality ───────────────────────────────────────────────────────────────

/// Criticality tag carried for downstream reporting.
///
/// Has no effect on scheduling decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Criticality {
    #[default]
    Hard,
    Soft,
}

impl Criticality {
    /// Label used in the CSV roster and in logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Criticality::Hard => "HARD",
            Criticality::Soft => "SOFT",
        }
    }
}

impl fmt::Display for Criticality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── InstanceKey ───────────────────────────────────────────────────────────────

/// Stable identity of a job instance.
///
/// The derived `Ord` sorts by task id first, then by sequence number.  The
/// EDF queue relies on this order to break deadline ties deterministically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct InstanceKey {
    pub task_id: TaskId,
    pub number: u32,
}

impl InstanceKey {
    pub fn new(task_id: TaskId, number: u32) -> Self {
        Self { task_id, number }
    }
}

impl fmt::Display for InstanceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}#{}", self.task_id, self.number)
    }
}

// ── Instance (job) ────────────────────────────────────────────────────────────

/// One periodic release of a [`Task`].
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    /// Back-reference to the owning task (by id, not by pointer).
    pub task_id: TaskId,

    /// Sequence number within the task, starting at 0.
    pub number: u32,

    /// Release time: `number × period`.
    pub arrival: Tick,

    /// Absolute deadline: `arrival + period`.
    pub deadline: Tick,

    /// Work still to do.  Starts at the task's execution time and reaches
    /// zero exactly once.
    pub remaining_time: Tick,

    /// Tick at which the instance was first dispatched.  `None` until then.
    pub first_run_time: Option<Tick>,

    /// Set once the first-dispatch record has been written to the run log.
    pub(crate) first_run_reported: bool,
}

impl Instance {
    /// Build instance `number` of `task`.  Times saturate at `Tick::MAX`.
    pub fn new(task: &Task, number: u32) -> Self {
        let arrival = Tick::from(number).saturating_mul(task.period);
        Self {
            task_id: task.id,
            number,
            arrival,
            deadline: arrival.saturating_add(task.period),
            remaining_time: task.execution_time,
            first_run_time: None,
            first_run_reported: false,
        }
    }

    pub fn key(&self) -> InstanceKey {
        InstanceKey::new(self.task_id, self.number)
    }

    pub fn is_complete(&self) -> bool {
        self.remaining_time == 0
    }
}

// ── Task ──────────────────────────────────────────────────────────────────────

/// Static periodic task descriptor.
///
/// # Lifecycle
/// Created once when the workload is dispatched.  Afterwards only two things
/// change: `instances` (cleared and rebuilt by job generation) and the
/// processor that owns the task (on migration).
#[derive(Debug, Clone, Default)]
pub struct Task {
    pub id: TaskId,

    /// Declared utilisation in `(0, 1]`.  This is the value the migration
    /// feasibility check sums.
    pub utilization: f64,

    /// Period in ticks: `floor(execution_time / utilization)`.
    pub period: Tick,

    /// Worst-case execution time in ticks.
    pub execution_time: Tick,

    pub criticality: Criticality,

    /// Instances spawned for the current horizon, indexed by sequence number.
    pub instances: Vec<Instance>,
}

impl Task {
    /// Build a task from its utilisation; the period is derived and floored.
    ///
    /// A utilisation outside `(0, 1]` yields a period of `0`, which
    /// [`Scheduler::new`](crate::scheduler::Scheduler::new) rejects.
    pub fn new(
        id: TaskId,
        utilization: f64,
        execution_time: Tick,
        criticality: Criticality,
    ) -> Self {
        let period = if utilization > 0.0 && utilization.is_finite() {
            (execution_time as f64 / utilization).floor() as Tick
        } else {
            0
        };
        Self {
            id,
            utilization,
            period,
            execution_time,
            criticality,
            instances: Vec::new(),
        }
    }

    /// Build a task from explicit timing; utilisation is `execution_time / period`.
    pub fn with_timing(
        id: TaskId,
        period: Tick,
        execution_time: Tick,
        criticality: Criticality,
    ) -> Self {
        let utilization = if period == 0 {
            0.0
        } else {
            execution_time as f64 / period as f64
        };
        Self {
            id,
            utilization,
            period,
            execution_time,
            criticality,
            instances: Vec::new(),
        }
    }

    /// Look up an instance by key.  Returns `None` for a key of another task
    /// or a number outside the current horizon.
    pub fn instance(&self, key: InstanceKey) -> Option<&Instance> {
        if key.task_id != self.id {
            return None;
        }
        self.instances.get(key.number as usize)
    }

    pub fn instance_mut(&mut self, key: InstanceKey) -> Option<&mut Instance> {
        if key.task_id != self.id {
            return None;
        }
        self.instances.get_mut(key.number as usize)
    }

    /// Row for the persisted roster:
    /// `[ID, Execution Time, Period, Criticality, Utilization]`.
    pub fn csv_row(&self) -> [String; 5] {
        [
            self.id.to_string(),
            self.execution_time.to_string(),
            self.period.to_string(),
            self.criticality.to_string(),
            self.utilization.to_string(),
        ]
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
