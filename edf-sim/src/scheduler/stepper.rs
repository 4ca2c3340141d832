/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Tick-driven preemptive EDF stepper for one processor and one time window.
//!
//! The running instance executes during `[t, t + 1)`.  Each tick:
//!
//! 1. the running instance (if any) loses one unit of `remaining_time`; at
//!    zero it is retired from the queue;
//! 2. time advances by one and every instance released at or before the new
//!    time moves from the ready set to the queue;
//! 3. the earliest-deadline queued instance is selected.  If it differs from
//!    the running one, the open segment `[segment_start, t + 1)` is closed,
//!    passed through the slack reclaimer and appended to the run log.  Any
//!    ticks added by stretching are spent (still admitting arrivals) before
//!    the next dispatch, which re-selects against the updated queue.
//!
//! Admitting arrivals before selecting lets a job released at `t` start at
//! `t`.  Idle ticks produce no segment.
//!
//! All mutable scheduling state lives in a [`StepContext`] that the caller
//! builds per processor and per window and passes in by value; nothing is
//! shared between processors.

use tracing::{debug, trace};

use crate::processor::{Processor, ProcessorSnapshot};
use crate::run_log::{FirstRun, RunLogSegment};
use crate::scheduler::job_set::JobSet;
use crate::scheduler::slack::{self, SlackProfile};
use crate::task::{InstanceKey, Tick};

// ── StepContext ───────────────────────────────────────────────────────────────

/// Mutable per-processor scheduling state for one window.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepContext {
    pub time: Tick,

    /// Admitted, unfinished instances ordered by deadline.
    pub queue: JobSet,

    /// Unreleased instances ordered by arrival.
    pub ready: JobSet,

    /// `None` while idle or while a stretched segment is being spent.
    pub running: Option<InstanceKey>,

    /// Start tick of the open segment of `running`.
    pub segment_start: Tick,

    /// Ticks of a stretched segment still to be spent.
    pub stall: Tick,

    /// Owner of the stretched segment while `stall > 0`.
    pub stalled: Option<InstanceKey>,
}

impl StepContext {
    /// Restore saved state at the start of a window beginning at `time`.
    pub fn resume(snapshot: ProcessorSnapshot, time: Tick) -> Self {
        Self {
            time,
            queue: snapshot.queue,
            ready: snapshot.ready,
            running: snapshot.running,
            segment_start: time,
            stall: snapshot.stall,
            stalled: snapshot.stalled,
        }
    }

    /// Save state at a window boundary together with the measured utilisation.
    pub fn into_snapshot(self, utilization: f64) -> ProcessorSnapshot {
        ProcessorSnapshot {
            utilization,
            queue: self.queue,
            ready: self.ready,
            running: self.running,
            stall: self.stall,
            stalled: self.stalled,
        }
    }
}

// ── Termination ───────────────────────────────────────────────────────────────

/// When a call to [`EdfStepper::run`] returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Full-horizon mode: run until `horizon` is reached **and** no work is
    /// left (queue, ready set and running slot all empty).
    Drain { horizon: Tick },

    /// Partitioned mode: run until exactly `end`, idle or not.
    WindowEnd(Tick),
}

impl Termination {
    /// Latest tick the stepper may advance to.
    fn limit(self) -> Tick {
        match self {
            Termination::Drain { .. } => Tick::MAX,
            Termination::WindowEnd(end) => end,
        }
    }
}

/// What one window produced besides log segments.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowOutcome {
    pub context: StepContext,

    /// Nominal busy ticks logged during the window.
    pub busy: Tick,
}

// ── EdfStepper ────────────────────────────────────────────────────────────────

/// Drives one [`StepContext`] on one processor, appending to `log`.
pub struct EdfStepper<'a> {
    processor: &'a mut Processor,
    profile: SlackProfile,
    log: &'a mut Vec<RunLogSegment>,
    ctx: StepContext,
    busy: Tick,
}

impl<'a> EdfStepper<'a> {
    pub fn new(
        processor: &'a mut Processor,
        ctx: StepContext,
        log: &'a mut Vec<RunLogSegment>,
    ) -> Self {
        let profile = processor.slack_profile();
        Self {
            processor,
            profile,
            log,
            ctx,
            busy: 0,
        }
    }

    /// Step until `termination` holds.
    pub fn run(mut self, termination: Termination) -> WindowOutcome {
        let limit = termination.limit();

        self.admit();
        self.spend_stall(limit);
        if self.ctx.stall == 0 {
            self.dispatch();
        }

        while !self.finished(termination) {
            let completed = self.execute_tick();
            self.advance();
            if completed || self.ctx.queue.earliest() != self.ctx.running {
                self.switch(completed, limit);
            }
        }

        if let Termination::WindowEnd(_) = termination {
            self.cut_at_window_end();
        }

        WindowOutcome {
            context: self.ctx,
            busy: self.busy,
        }
    }

    fn finished(&self, termination: Termination) -> bool {
        match termination {
            Termination::WindowEnd(end) => self.ctx.time >= end,
            Termination::Drain { horizon } => {
                self.ctx.time >= horizon
                    && self.ctx.queue.is_empty()
                    && self.ctx.ready.is_empty()
                    && self.ctx.running.is_none()
                    && self.ctx.stall == 0
            }
        }
    }

    /// Run the current instance for one tick.  Returns `true` if it completed.
    fn execute_tick(&mut self) -> bool {
        let Some(key) = self.ctx.running else {
            return false;
        };
        let Some(inst) = self.processor.instance_mut(key) else {
            debug!(processor = self.processor.id, instance = %key, "running instance not owned by processor");
            self.ctx.running = None;
            return false;
        };

        inst.remaining_time = inst.remaining_time.saturating_sub(1);
        if inst.remaining_time > 0 {
            return false;
        }
        let deadline = inst.deadline;
        self.ctx.queue.remove(deadline, key);
        trace!(processor = self.processor.id, instance = %key, time = self.ctx.time + 1, "completed");
        true
    }

    fn advance(&mut self) {
        self.ctx.time += 1;
        self.admit();
    }

    /// Move every instance released at or before `time` into the queue.
    fn admit(&mut self) {
        for (_, key) in self.ctx.ready.take_due(self.ctx.time) {
            if let Some(inst) = self.processor.instance(key) {
                self.ctx.queue.insert(inst.deadline, key);
            }
        }
    }

    /// Close the running segment (if any) at the current time, spend the
    /// stretch, then dispatch.
    fn switch(&mut self, completed: bool, limit: Tick) {
        if let Some(key) = self.ctx.running.take() {
            let end = self.ctx.time;
            self.ctx.stall = self.close_segment(key, end, completed, true);
            if self.ctx.stall > 0 {
                self.ctx.stalled = Some(key);
            }
            self.spend_stall(limit);
        }
        if self.ctx.stall == 0 {
            self.dispatch();
        }
    }

    fn spend_stall(&mut self, limit: Tick) {
        while self.ctx.stall > 0 && self.ctx.time < limit {
            self.advance();
            self.ctx.stall -= 1;
        }
        if self.ctx.stall == 0 {
            self.ctx.stalled = None;
        }
    }

    /// Select the earliest-deadline instance and open a segment for it.
    fn dispatch(&mut self) {
        self.ctx.running = self.ctx.queue.earliest();
        self.ctx.segment_start = self.ctx.time;
        if let Some(key) = self.ctx.running {
            let time = self.ctx.time;
            if let Some(inst) = self.processor.instance_mut(key) {
                inst.first_run_time.get_or_insert(time);
            }
            trace!(processor = self.processor.id, instance = %key, time, "dispatched");
        }
    }

    /// Partition boundary: log the open segment without reclamation.  The
    /// instance stays in the running slot and resumes next window.
    fn cut_at_window_end(&mut self) {
        if let Some(key) = self.ctx.running {
            let end = self.ctx.time;
            self.close_segment(key, end, false, false);
            self.ctx.segment_start = end;
        }
    }

    /// Append the segment `[segment_start, end)` of `key` to the log and
    /// return the ticks added by stretching it.
    fn close_segment(&mut self, key: InstanceKey, end: Tick, completed: bool, reclaim: bool) -> Tick {
        let start = self.ctx.segment_start;
        let run_time = end.saturating_sub(start);
        if run_time == 0 {
            return 0;
        }

        let reclamation = if reclaim {
            slack::reclaim(&self.profile, run_time)
        } else {
            None
        };

        let Some(task) = self.processor.tasks.get_mut(&key.task_id) else {
            return 0;
        };
        let criticality = task.criticality;
        let Some(inst) = task.instance_mut(key) else {
            return 0;
        };

        let end_time = match &reclamation {
            Some(r) => start as f64 + r.stretched_run_time,
            None => end as f64,
        };

        let first_run = if inst.first_run_reported {
            None
        } else {
            inst.first_run_reported = true;
            inst.first_run_time.map(|first_run_time| FirstRun {
                first_run_time,
                arrival: inst.arrival,
            })
        };

        let slack_time = completed.then(|| inst.deadline as f64 - end_time);

        self.log.push(RunLogSegment {
            instance_number: key.number,
            task_id: key.task_id,
            criticality,
            start_time: start,
            end_time,
            nominal_end: end,
            first_run,
            slack_time,
            has_slack: reclamation.is_some(),
            added_slack: reclamation.map(|r| r.added_slack),
        });
        self.busy += run_time;

        if let Some(r) = &reclamation {
            debug!(
                processor = self.processor.id,
                instance = %key,
                run_time,
                ratio = r.ratio,
                added_time = r.added_time,
                "segment stretched"
            );
        }

        reclamation.map_or(0, |r| r.added_time)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hyperperiod::HyperperiodCalculator;
    use crate::processor::FrequencyBounds;
    use crate::task::{Criticality, Task};

    fn processor(tasks: Vec<Task>, frequency: FrequencyBounds, horizon: Tick) -> Processor {
        let mut p = Processor::new(1, tasks, frequency);
        p.refresh_timing(&HyperperiodCalculator::new()).unwrap();
        p.generate_jobs(horizon);
        p
    }

    fn fresh(p: &Processor) -> StepContext {
        StepContext::resume(p.fresh_snapshot(), 0)
    }

    fn spans(log: &[RunLogSegment]) -> Vec<(u32, u32, Tick, Tick)> {
        log.iter()
            .map(|s| (s.task_id, s.instance_number, s.start_time, s.nominal_end))
            .collect()
    }

    // ── dispatch order ────────────────────────────────────────────────────────

    #[test]
    fn preempts_on_earlier_deadline_arrival() {
        // T1: period 10, exec 6.  T2: period 3, exec 1 (arrives 0, 3, 6, 9)
        let tasks = vec![
            Task::with_timing(1, 10, 6, Criticality::Hard),
            Task::with_timing(2, 3, 1, Criticality::Soft),
        ];
        let mut p = processor(tasks, FrequencyBounds::FULL, 9);
        let ctx = fresh(&p);
        let mut log = Vec::new();
        EdfStepper::new(&mut p, ctx, &mut log).run(Termination::WindowEnd(9));

        assert_eq!(
            spans(&log),
            vec![
                (2, 0, 0, 1),
                (1, 0, 1, 3),
                (2, 1, 3, 4),
                (1, 0, 4, 6),
                (2, 2, 6, 7),
                (1, 0, 7, 9),
            ]
        );
    }

    #[test]
    fn equal_deadlines_run_lowest_task_id_first() {
        let tasks = vec![
            Task::with_timing(7, 6, 2, Criticality::Hard),
            Task::with_timing(3, 6, 2, Criticality::Hard),
        ];
        let mut p = processor(tasks, FrequencyBounds::FULL, 0);
        let ctx = fresh(&p);
        let mut log = Vec::new();
        EdfStepper::new(&mut p, ctx, &mut log).run(Termination::Drain { horizon: 0 });

        assert_eq!(spans(&log), vec![(3, 0, 0, 2), (7, 0, 2, 4)]);
    }

    #[test]
    fn late_arrival_with_equal_deadline_and_higher_id_does_not_preempt() {
        // T1#0 (dl 4) runs; T2#0 arrives at 1 with deadline 4 as well
        let mut t2 = Task::with_timing(2, 3, 1, Criticality::Soft);
        crate::hyperperiod::generate_jobs(&mut t2, 0);
        t2.instances[0].arrival = 1;
        t2.instances[0].deadline = 4;
        let tasks = vec![Task::with_timing(1, 4, 3, Criticality::Hard)];
        let mut p = processor(tasks, FrequencyBounds::FULL, 0);
        p.tasks.insert(2, t2);

        let ctx = fresh(&p);
        let mut log = Vec::new();
        EdfStepper::new(&mut p, ctx, &mut log).run(Termination::Drain { horizon: 0 });

        assert_eq!(spans(&log), vec![(1, 0, 0, 3), (2, 0, 3, 4)]);
    }

    // ── per-instance emission ─────────────────────────────────────────────────

    #[test]
    fn first_run_and_slack_are_emitted_once_per_instance() {
        let tasks = vec![
            Task::with_timing(1, 10, 6, Criticality::Hard),
            Task::with_timing(2, 3, 1, Criticality::Soft),
        ];
        let mut p = processor(tasks, FrequencyBounds::FULL, 9);
        let ctx = fresh(&p);
        let mut log = Vec::new();
        EdfStepper::new(&mut p, ctx, &mut log).run(Termination::Drain { horizon: 9 });

        let t1: Vec<&RunLogSegment> = log.iter().filter(|s| s.task_id == 1 && s.instance_number == 0).collect();
        assert_eq!(t1.iter().filter(|s| s.first_run.is_some()).count(), 1);
        assert_eq!(t1.iter().filter(|s| s.slack_time.is_some()).count(), 1);
        assert_eq!(
            t1[0].first_run,
            Some(FirstRun {
                first_run_time: 1,
                arrival: 0
            })
        );
        let last = t1.last().unwrap();
        // T1#0 finishes at 9 against deadline 10
        assert_eq!(last.slack_time, Some(1.0));
    }

    #[test]
    fn remaining_time_reaches_exactly_zero() {
        let tasks = vec![Task::with_timing(1, 5, 2, Criticality::Hard)];
        let mut p = processor(tasks, FrequencyBounds::FULL, 10);
        let ctx = fresh(&p);
        let mut log = Vec::new();
        let out = EdfStepper::new(&mut p, ctx, &mut log).run(Termination::Drain { horizon: 10 });

        assert!(p.tasks[&1].instances.iter().all(|i| i.remaining_time == 0));
        assert!(out.context.queue.is_empty());
        assert_eq!(out.busy, 6);
    }

    // ── windows ───────────────────────────────────────────────────────────────

    #[test]
    fn idle_window_runs_to_end_without_segments() {
        let tasks = vec![Task::with_timing(1, 20, 2, Criticality::Hard)];
        let mut p = processor(tasks, FrequencyBounds::FULL, 20);
        let ctx = StepContext::resume(p.fresh_snapshot(), 0);
        let mut log = Vec::new();
        let out = EdfStepper::new(&mut p, ctx, &mut log).run(Termination::WindowEnd(2));
        assert_eq!(out.context.time, 2);

        let ctx = StepContext::resume(out.context.into_snapshot(1.0), 2);
        let out = EdfStepper::new(&mut p, ctx, &mut log).run(Termination::WindowEnd(10));
        assert_eq!(out.context.time, 10);
        assert_eq!(out.busy, 0);
        assert_eq!(log.len(), 1, "only the first window logged work");
    }

    #[test]
    fn window_end_cuts_open_segment_and_resumes() {
        let tasks = vec![Task::with_timing(1, 10, 5, Criticality::Hard)];
        let mut p = processor(tasks, FrequencyBounds::FULL, 10);
        let mut log = Vec::new();

        let ctx = fresh(&p);
        let out = EdfStepper::new(&mut p, ctx, &mut log).run(Termination::WindowEnd(3));
        assert_eq!(out.context.running, Some(InstanceKey::new(1, 0)));
        assert_eq!(out.busy, 3);

        let ctx = StepContext::resume(out.context.into_snapshot(1.0), 3);
        EdfStepper::new(&mut p, ctx, &mut log).run(Termination::WindowEnd(6));

        assert_eq!(spans(&log), vec![(1, 0, 0, 3), (1, 0, 3, 5)]);
        assert!(log[0].first_run.is_some());
        assert!(log[1].first_run.is_none());
        assert!(log[0].slack_time.is_none());
        assert_eq!(log[1].slack_time, Some(5.0));
    }

    // ── slack reclamation ─────────────────────────────────────────────────────

    #[test]
    fn stretched_segment_delays_next_dispatch() {
        // H = 20, demand = 2 × 2 + 2 × 2 = 8 → slack 12, scope = ceil(20/12) = 2
        // T1#0 runs 0..2 → 1 unit → ratio max(2/3, 0.5) → stretched 3 → 1 added tick
        let tasks = vec![
            Task::with_timing(1, 20, 2, Criticality::Hard),
            Task::with_timing(2, 20, 2, Criticality::Soft),
        ];
        let mut p = processor(tasks, FrequencyBounds::new(0.5, 1.0), 20);
        assert_eq!(p.slack_time(), 12);
        let ctx = fresh(&p);
        let mut log = Vec::new();
        EdfStepper::new(&mut p, ctx, &mut log).run(Termination::WindowEnd(10));

        assert!(log[0].has_slack);
        assert!((log[0].end_time - 3.0).abs() < 1e-9);
        assert_eq!(log[0].nominal_end, 2);
        assert_eq!(log[1].task_id, 2);
        assert_eq!(log[1].start_time, 3, "next segment starts after the stretch");
    }

    #[test]
    fn arrival_during_stall_is_queued_and_wins_next_dispatch() {
        // Same stretch as above: T1#0 0–2 occupies the clock until 3.  T3#0
        // is released at 3 with deadline 10, ahead of T2#0 (deadline 20).
        let tasks = vec![
            Task::with_timing(1, 20, 2, Criticality::Hard),
            Task::with_timing(2, 20, 2, Criticality::Soft),
        ];
        let mut p = processor(tasks, FrequencyBounds::new(0.5, 1.0), 20);
        let mut t3 = Task::with_timing(3, 20, 1, Criticality::Hard);
        crate::hyperperiod::generate_jobs(&mut t3, 0);
        t3.instances[0].arrival = 3;
        t3.instances[0].deadline = 10;
        p.tasks.insert(3, t3);
        let late = InstanceKey::new(3, 0);

        let mut log = Vec::new();
        let ctx = fresh(&p);
        assert!(!ctx.queue.contains_key(late));
        let out = EdfStepper::new(&mut p, ctx, &mut log).run(Termination::WindowEnd(3));
        assert_eq!(out.context.stall, 0);
        assert!(out.context.stalled.is_none());
        assert!(out.context.queue.contains_key(late));
        assert_eq!(out.context.running, Some(late));

        let ctx = StepContext::resume(out.context.into_snapshot(1.0), 3);
        EdfStepper::new(&mut p, ctx, &mut log).run(Termination::WindowEnd(10));
        assert_eq!(spans(&log)[..3].to_vec(), vec![(1, 0, 0, 2), (3, 0, 3, 4), (2, 0, 4, 6)]);
    }

    #[test]
    fn stall_crossing_window_end_carries_over() {
        let tasks = vec![
            Task::with_timing(1, 20, 2, Criticality::Hard),
            Task::with_timing(2, 20, 2, Criticality::Soft),
        ];
        let mut p = processor(tasks, FrequencyBounds::new(0.5, 1.0), 20);
        let mut log = Vec::new();

        let ctx = fresh(&p);
        let out = EdfStepper::new(&mut p, ctx, &mut log).run(Termination::WindowEnd(2));
        assert_eq!(out.context.stall, 1);
        assert!(out.context.running.is_none());
        assert_eq!(out.context.stalled, Some(InstanceKey::new(1, 0)));

        let ctx = StepContext::resume(out.context.into_snapshot(1.0), 2);
        EdfStepper::new(&mut p, ctx, &mut log).run(Termination::WindowEnd(10));
        assert_eq!(log[1].start_time, 3);
    }

    #[test]
    fn full_clock_disables_stretching() {
        let tasks = vec![
            Task::with_timing(1, 20, 2, Criticality::Hard),
            Task::with_timing(2, 20, 2, Criticality::Soft),
        ];
        let mut p = processor(tasks, FrequencyBounds::FULL, 20);
        let ctx = fresh(&p);
        let mut log = Vec::new();
        EdfStepper::new(&mut p, ctx, &mut log).run(Termination::WindowEnd(10));
        assert!(log.iter().all(|s| !s.has_slack && s.added_slack.is_none()));
        assert_eq!(spans(&log), vec![(1, 0, 0, 2), (2, 0, 2, 4)]);
    }
}
