/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Append-only record of executed segments.
//!
//! One [`RunLogSegment`] is written per uninterrupted execution span on one
//! processor.  The log is the simulator's only output; Gantt rendering,
//! makespan bars and waiting/slack statistics are computed from it
//! downstream (the binary exports it as JSON).

use std::collections::BTreeMap;

use serde::Serialize;

use crate::processor::ProcessorId;
use crate::task::{Criticality, InstanceKey, TaskId, Tick};

// ── RunLogSegment ─────────────────────────────────────────────────────────────

/// First-dispatch data, emitted once per instance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FirstRun {
    pub first_run_time: Tick,
    pub arrival: Tick,
}

/// One execution span.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunLogSegment {
    pub instance_number: u32,
    pub task_id: TaskId,
    pub criticality: Criticality,
    pub start_time: Tick,

    /// End of the span on the wall clock.  Equals `nominal_end` unless the
    /// segment was stretched by slack reclamation.
    pub end_time: f64,

    /// End of the span at full clock speed.
    pub nominal_end: Tick,

    /// Present only on the segment in which the instance was first dispatched.
    #[serde(flatten)]
    pub first_run: Option<FirstRun>,

    /// `deadline − end_time`; present only on the segment that completed the
    /// instance.  Negative means the deadline was missed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slack_time: Option<f64>,

    pub has_slack: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub added_slack: Option<f64>,
}

impl RunLogSegment {
    pub fn key(&self) -> InstanceKey {
        InstanceKey::new(self.task_id, self.instance_number)
    }

    /// Length at full clock speed.
    pub fn nominal_duration(&self) -> Tick {
        self.nominal_end - self.start_time
    }

    /// Length on the wall clock.
    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time as f64
    }

    /// `true` if this segment completed its instance.
    pub fn completes_instance(&self) -> bool {
        self.slack_time.is_some()
    }
}

// ── MigrationRecord ───────────────────────────────────────────────────────────

/// A task moved between processors at a partition boundary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MigrationRecord {
    /// Index of the window that starts right after the move.
    pub window: usize,
    pub task_id: TaskId,
    pub from: ProcessorId,
    pub to: ProcessorId,

    /// Measured utilisation gap between donor and receiver.
    pub gap: f64,
}

// ── RunLog ────────────────────────────────────────────────────────────────────

/// Per-processor aggregate, as logged by the binary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessorSummary {
    pub processor: ProcessorId,
    pub segments: usize,
    pub busy_time: Tick,
    pub makespan: f64,
    pub completed: usize,
    pub deadline_misses: usize,
}

/// Everything one simulation run produced.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunLog {
    /// Ordered segments per processor.
    pub segments: BTreeMap<ProcessorId, Vec<RunLogSegment>>,

    /// Migrations in the order they happened.
    pub migrations: Vec<MigrationRecord>,
}

impl RunLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_processor(&self, processor: ProcessorId) -> &[RunLogSegment] {
        self.segments
            .get(&processor)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Total nominal busy time of `processor`.
    pub fn busy_time(&self, processor: ProcessorId) -> Tick {
        self.for_processor(processor)
            .iter()
            .map(RunLogSegment::nominal_duration)
            .sum()
    }

    /// Nominal busy time of segments starting in `[start, end)`.
    pub fn busy_time_between(&self, processor: ProcessorId, start: Tick, end: Tick) -> Tick {
        self.for_processor(processor)
            .iter()
            .filter(|s| s.start_time >= start && s.start_time < end)
            .map(RunLogSegment::nominal_duration)
            .sum()
    }

    /// Latest wall-clock end time on `processor` (`0.0` if it never ran).
    pub fn makespan(&self, processor: ProcessorId) -> f64 {
        self.for_processor(processor)
            .iter()
            .map(|s| s.end_time)
            .fold(0.0, f64::max)
    }

    pub fn summaries(&self) -> Vec<ProcessorSummary> {
        self.segments
            .iter()
            .map(|(&processor, segments)| ProcessorSummary {
                processor,
                segments: segments.len(),
                busy_time: self.busy_time(processor),
                makespan: self.makespan(processor),
                completed: segments.iter().filter(|s| s.completes_instance()).count(),
                deadline_misses: segments
                    .iter()
                    .filter(|s| s.slack_time.is_some_and(|slack| slack < 0.0))
                    .count(),
            })
            .collect()
    }

    /// Pretty JSON for downstream visualisation.
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(task_id: TaskId, start: Tick, end: Tick) -> RunLogSegment {
        RunLogSegment {
            instance_number: 0,
            task_id,
            criticality: Criticality::Hard,
            start_time: start,
            end_time: end as f64,
            nominal_end: end,
            first_run: None,
            slack_time: None,
            has_slack: false,
            added_slack: None,
        }
    }

    fn sample_log() -> RunLog {
        let mut log = RunLog::new();
        let mut completed = segment(2, 4, 6);
        completed.slack_time = Some(-1.0);
        let mut stretched = segment(1, 6, 8);
        stretched.end_time = 9.5;
        stretched.has_slack = true;
        stretched.added_slack = Some(1.5);
        stretched.slack_time = Some(2.5);
        log.segments
            .insert(1, vec![segment(1, 0, 3), completed, stretched]);
        log
    }

    #[test]
    fn busy_time_uses_nominal_lengths() {
        let log = sample_log();
        assert_eq!(log.busy_time(1), 3 + 2 + 2);
        assert_eq!(log.busy_time(9), 0);
    }

    #[test]
    fn busy_time_between_filters_on_start() {
        let log = sample_log();
        assert_eq!(log.busy_time_between(1, 0, 5), 5);
        assert_eq!(log.busy_time_between(1, 5, 10), 2);
    }

    #[test]
    fn makespan_uses_wall_clock_end() {
        assert!((sample_log().makespan(1) - 9.5).abs() < 1e-12);
        assert_eq!(RunLog::new().makespan(1), 0.0);
    }

    #[test]
    fn summaries_count_completions_and_misses() {
        let summary = &sample_log().summaries()[0];
        assert_eq!(summary.segments, 3);
        assert_eq!(summary.completed, 2);
        assert_eq!(summary.deadline_misses, 1);
    }

    #[test]
    fn json_omits_absent_optional_fields() {
        let mut log = RunLog::new();
        let mut first = segment(1, 0, 2);
        first.first_run = Some(FirstRun {
            first_run_time: 0,
            arrival: 0,
        });
        log.segments.insert(1, vec![first, segment(1, 2, 4)]);

        let value: serde_json::Value = serde_json::from_str(&log.to_json_pretty().unwrap()).unwrap();
        let segs = &value["segments"]["1"];
        assert_eq!(segs[0]["first_run_time"], 0);
        assert_eq!(segs[0]["criticality"], "HARD");
        assert!(segs[1].get("first_run_time").is_none());
        assert!(segs[1].get("slack_time").is_none());
    }
}
