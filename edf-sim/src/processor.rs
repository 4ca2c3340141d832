/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Processor model: assigned tasks, frequency bounds, derived timing and the
//! state saved between partitions.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::hyperperiod::{self, HyperperiodCalculator, HyperperiodError};
use crate::scheduler::job_set::JobSet;
use crate::scheduler::slack::SlackProfile;
use crate::task::{Instance, InstanceKey, Task, TaskId, Tick};

/// Processor identifier (1-based, matching dispatch order).
pub type ProcessorId = u32;

// ── FrequencyBounds ───────────────────────────────────────────────────────────

/// Supported clock range as fractions of the nominal frequency.
///
/// Valid bounds satisfy `0 < min_f ≤ max_f ≤ 1`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrequencyBounds {
    pub min_f: f64,
    pub max_f: f64,
}

impl FrequencyBounds {
    /// Fixed full-speed clock.  Slack reclamation can never stretch a segment.
    pub const FULL: FrequencyBounds = FrequencyBounds {
        min_f: 1.0,
        max_f: 1.0,
    };

    pub fn new(min_f: f64, max_f: f64) -> Self {
        Self { min_f, max_f }
    }

    /// Lowest permitted scaling factor, `min_f / max_f`.
    pub fn min_ratio(&self) -> f64 {
        self.min_f / self.max_f
    }

    pub fn is_valid(&self) -> bool {
        self.min_f > 0.0 && self.min_f <= self.max_f && self.max_f <= 1.0
    }
}

impl Default for FrequencyBounds {
    fn default() -> Self {
        Self::FULL
    }
}

// ── ProcessorSnapshot ─────────────────────────────────────────────────────────

/// Live scheduling state carried from one partition to the next.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessorSnapshot {
    /// Busy fraction measured over the window that just ended.
    pub utilization: f64,

    /// Admitted, unfinished instances ordered by deadline.
    pub queue: JobSet,

    /// Not-yet-released instances ordered by arrival.
    pub ready: JobSet,

    /// Instance that held the processor at the window boundary.
    pub running: Option<InstanceKey>,

    /// Ticks of a stretched segment not yet spent when the window closed.
    pub stall: Tick,

    /// Instance whose stretched segment is still occupying the processor.
    pub stalled: Option<InstanceKey>,
}

// ── Processor ─────────────────────────────────────────────────────────────────

/// One simulated processor.
///
/// Tasks are kept in a `BTreeMap` so every iteration over them is ordered by
/// task id, which keeps the simulation deterministic.
#[derive(Debug, Clone)]
pub struct Processor {
    pub id: ProcessorId,
    pub tasks: BTreeMap<TaskId, Task>,
    pub frequency: FrequencyBounds,
    hyperperiod: Tick,
    slack_time: i64,
    pub(crate) saved: Option<ProcessorSnapshot>,
}

impl Processor {
    /// Create a processor owning `tasks`.  Timing stays zeroed until
    /// [`refresh_timing`](Self::refresh_timing) is called.
    pub fn new(id: ProcessorId, tasks: Vec<Task>, frequency: FrequencyBounds) -> Self {
        Self {
            id,
            tasks: tasks.into_iter().map(|t| (t.id, t)).collect(),
            frequency,
            hyperperiod: 0,
            slack_time: 0,
            saved: None,
        }
    }

    pub fn hyperperiod(&self) -> Tick {
        self.hyperperiod
    }

    pub fn slack_time(&self) -> i64 {
        self.slack_time
    }

    /// State saved at the last partition boundary, if any.
    pub fn snapshot(&self) -> Option<&ProcessorSnapshot> {
        self.saved.as_ref()
    }

    /// Recompute hyperperiod and slack time for the current task set.
    ///
    /// On error both are reset to `0`: the timing is unknown and slack
    /// reclamation stays off until the next successful refresh.
    pub fn refresh_timing(
        &mut self,
        calculator: &HyperperiodCalculator,
    ) -> Result<Tick, HyperperiodError> {
        let info = match calculator.calculate(self.tasks.values()) {
            Ok(info) => info,
            Err(e) => {
                self.hyperperiod = 0;
                self.slack_time = 0;
                return Err(e);
            }
        };
        self.hyperperiod = info.hyperperiod;
        self.slack_time = hyperperiod::slack_time(info.hyperperiod, self.tasks.values());
        debug!(
            processor = self.id,
            hyperperiod = self.hyperperiod,
            slack_time = self.slack_time,
            "Refreshed processor timing"
        );
        Ok(self.hyperperiod)
    }

    /// Generate jobs for every task up to `horizon`.  Returns the instance count.
    pub fn generate_jobs(&mut self, horizon: Tick) -> usize {
        hyperperiod::generate_all(self.tasks.values_mut(), horizon)
    }

    /// Sum of the declared utilisations of all assigned tasks.
    pub fn total_utilization(&self) -> f64 {
        self.tasks.values().map(|t| t.utilization).sum()
    }

    pub fn slack_profile(&self) -> SlackProfile {
        SlackProfile {
            hyperperiod: self.hyperperiod,
            slack_time: self.slack_time,
            frequency: self.frequency,
        }
    }

    pub fn instance(&self, key: InstanceKey) -> Option<&Instance> {
        self.tasks.get(&key.task_id)?.instance(key)
    }

    pub fn instance_mut(&mut self, key: InstanceKey) -> Option<&mut Instance> {
        self.tasks.get_mut(&key.task_id)?.instance_mut(key)
    }

    /// Initial scheduling state: instances released at `0` are queued, all
    /// others wait in the ready set, and the earliest deadline runs.
    pub fn fresh_snapshot(&self) -> ProcessorSnapshot {
        let mut queue = JobSet::new();
        let mut ready = JobSet::new();
        for inst in self.tasks.values().flat_map(|t| t.instances.iter()) {
            if inst.arrival == 0 {
                queue.insert(inst.deadline, inst.key());
            } else {
                ready.insert(inst.arrival, inst.key());
            }
        }
        let running = queue.earliest();
        ProcessorSnapshot {
            utilization: 0.0,
            queue,
            ready,
            running,
            stall: 0,
            stalled: None,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
