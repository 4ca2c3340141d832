/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Partition coordinator for the multi-processor EDF simulation.
//!
//! [`Scheduler`] owns the dispatched processors and drives one of two modes:
//!
//! | Mode | Trigger | Behaviour |
//! |---|---|---|
//! | Full horizon | `time_partition == None` | Each processor runs alone from `0` to its horizon (upper bound or own hyperperiod), then drains the work released up to it |
//! | Partitioned | `time_partition == Some(p)` | All processors step window by window; between windows a migration round rebalances load |
//!
//! ```text
//! window 0          window 1          window 2
//! ├── step all ──┤  ├── step all ──┤  ├── step all ──┤
//!                ▲                 ▲
//!          snapshot + rebalance   snapshot + rebalance
//! ```
//!
//! Processors never share mutable state while stepping; migration is the only
//! phase that touches two processors at once and runs strictly between
//! windows.
//!
//! # Example
//! ```rust
//! use edf_sim::processor::{FrequencyBounds, Processor};
//! use edf_sim::scheduler::Scheduler;
//! use edf_sim::task::{Criticality, Task};
//!
//! let tasks = vec![
//!     Task::with_timing(1, 4, 2, Criticality::Hard),
//!     Task::with_timing(2, 8, 2, Criticality::Soft),
//! ];
//! let cpu = Processor::new(1, tasks, FrequencyBounds::FULL);
//! let mut scheduler = Scheduler::new(vec![cpu], None, None).unwrap();
//! let log = scheduler.schedule();
//! assert_eq!(log.for_processor(1)[0].nominal_end, 2);
//! ```

pub mod error;
pub mod feasibility;
pub mod job_set;
pub mod migration;
pub mod slack;
pub mod stepper;

pub use error::SimulationError;

use std::collections::BTreeSet;

use tracing::{debug, info, warn};

use crate::hyperperiod::math::div_ceil;
use crate::hyperperiod::HyperperiodCalculator;
use crate::processor::Processor;
use crate::run_log::RunLog;
use crate::task::Tick;

use feasibility::{check_edf_bound, EDF_UTILIZATION_BOUND};
use stepper::{EdfStepper, StepContext, Termination};

// ── Scheduler ─────────────────────────────────────────────────────────────────

/// Simulation driver for a fixed set of processors.
///
/// Construction validates every precondition and computes each processor's
/// hyperperiod and slack; [`schedule`](Self::schedule) then never fails.
pub struct Scheduler {
    /// Dispatched processors, in dispatch order.  Migration moves tasks
    /// between them but never adds or removes a processor.
    processors: Vec<Processor>,

    /// Explicit horizon.  `None` means "use the hyperperiod".
    scheduling_upper_bound: Option<Tick>,

    /// Window length.  `None` selects full-horizon mode.
    time_partition: Option<Tick>,

    /// Reused after every migration to refresh processor timing.
    calculator: HyperperiodCalculator,
}

impl Scheduler {
    /// Validate `processors` and compute their timing with the default
    /// hyperperiod limit.
    ///
    /// # Errors
    /// Any precondition violation, see [`SimulationError`].
    pub fn new(
        processors: Vec<Processor>,
        scheduling_upper_bound: Option<Tick>,
        time_partition: Option<Tick>,
    ) -> Result<Self, SimulationError> {
        Self::with_calculator(
            processors,
            scheduling_upper_bound,
            time_partition,
            HyperperiodCalculator::new(),
        )
    }

    /// Same as [`new`](Self::new) with an explicit hyperperiod calculator.
    ///
    /// Checks run in this order and the first violation is returned:
    ///
    /// 1. at least one processor, `time_partition != Some(0)`, upper bound
    ///    within the calculator's limit;
    /// 2. per-processor frequency bounds and per-task timing, unique task ids;
    /// 3. hyperperiods, fatal only without an upper bound.
    ///
    /// # Errors
    /// Any precondition violation, see [`SimulationError`].
    pub fn with_calculator(
        mut processors: Vec<Processor>,
        scheduling_upper_bound: Option<Tick>,
        time_partition: Option<Tick>,
        calculator: HyperperiodCalculator,
    ) -> Result<Self, SimulationError> {
        // ── Preconditions ─────────────────────────────────────────────────────
        if processors.is_empty() {
            return Err(SimulationError::NoProcessors);
        }
        if time_partition == Some(0) {
            return Err(SimulationError::ZeroPartition);
        }
        if let Some(bound) = scheduling_upper_bound {
            if bound > calculator.limit() {
                return Err(SimulationError::UpperBoundTooLarge {
                    bound,
                    limit: calculator.limit(),
                });
            }
        }
        Self::validate(&processors)?;

        // ── Timing ────────────────────────────────────────────────────────────
        // The hyperperiod is only required as a horizon; with an explicit
        // upper bound a failure just disables slack reclamation.
        for p in processors.iter_mut() {
            if let Err(source) = p.refresh_timing(&calculator) {
                if scheduling_upper_bound.is_none() {
                    return Err(SimulationError::Hyperperiod {
                        processor: p.id,
                        source,
                    });
                }
                warn!(
                    processor = p.id,
                    error = %source,
                    "Hyperperiod unavailable; slack reclamation disabled"
                );
            }
            info!(
                processor = p.id,
                task_count = p.tasks.len(),
                hyperperiod = p.hyperperiod(),
                slack_time = p.slack_time(),
                utilization = p.total_utilization(),
                "Processor ready"
            );
        }

        Self::run_edf_bound_check(&processors);

        Ok(Self {
            processors,
            scheduling_upper_bound,
            time_partition,
            calculator,
        })
    }

    /// Processors with their current task assignment.
    ///
    /// After a partitioned run this reflects every migration performed.
    pub fn processors(&self) -> &[Processor] {
        &self.processors
    }

    /// Consume the scheduler and hand back its processors.
    pub fn into_processors(self) -> Vec<Processor> {
        self.processors
    }

    // ── Public entry point ────────────────────────────────────────────────────

    /// Run the simulation and return the log.
    ///
    /// Jobs are regenerated and all saved partition state is discarded first.
    /// Task assignments changed by migration in an earlier call are kept.
    pub fn schedule(&mut self) -> RunLog {
        info!(
            processor_count = self.processors.len(),
            upper_bound = ?self.scheduling_upper_bound,
            time_partition = ?self.time_partition,
            "=== Scheduler::schedule() ==="
        );

        let log = match self.time_partition {
            None => self.run_full_horizon(),
            Some(partition) => self.run_partitioned(partition),
        };

        info!(
            segments = log.segments.values().map(Vec::len).sum::<usize>(),
            migrations = log.migrations.len(),
            "=== Simulation complete ==="
        );
        log
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Mode 1: full horizon
    // ─────────────────────────────────────────────────────────────────────────

    /// Run every processor alone from `0` until its horizon has passed and
    /// all work released up to it has drained.
    ///
    /// The horizon is the upper bound if set, else the processor's own
    /// hyperperiod.  Processors do not interact in this mode.
    fn run_full_horizon(&mut self) -> RunLog {
        let mut log = RunLog::new();
        for p in self.processors.iter_mut() {
            let horizon = self.scheduling_upper_bound.unwrap_or(p.hyperperiod());
            p.generate_jobs(horizon);
            p.saved = None;

            let ctx = StepContext::resume(p.fresh_snapshot(), 0);
            let segments = log.segments.entry(p.id).or_default();
            let outcome = EdfStepper::new(p, ctx, segments).run(Termination::Drain { horizon });

            info!(
                processor = p.id,
                horizon,
                end = outcome.context.time,
                busy = outcome.busy,
                "Processor simulated"
            );
        }
        log
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Mode 2: partitioned with migration
    // ─────────────────────────────────────────────────────────────────────────

    /// Step all processors window by window up to a common horizon.
    ///
    /// The horizon is the upper bound if set, else the largest processor
    /// hyperperiod.  Windows are `[k·P, min((k+1)·P, H))`; the last may be
    /// short.  Before every window but the first, one migration round runs on
    /// the utilisation measured in the window that just ended.  Work still
    /// pending at `H` is not drained.
    fn run_partitioned(&mut self, partition: Tick) -> RunLog {
        let horizon = self.scheduling_upper_bound.unwrap_or_else(|| {
            self.processors
                .iter()
                .map(Processor::hyperperiod)
                .max()
                .unwrap_or(0)
        });
        for p in self.processors.iter_mut() {
            p.generate_jobs(horizon);
            p.saved = None;
        }

        let windows = div_ceil(horizon, partition) as usize;
        info!(horizon, partition, windows, "Partitioned run");

        let mut log = RunLog::new();
        for p in &self.processors {
            log.segments.entry(p.id).or_default();
        }

        for window in 0..windows {
            let start = window as Tick * partition;
            let end = (start + partition).min(horizon);

            if window > 0 {
                let records = migration::rebalance(&mut self.processors, window, &self.calculator);
                log.migrations.extend(records);
            }

            for p in self.processors.iter_mut() {
                let snapshot = p.saved.take().unwrap_or_else(|| p.fresh_snapshot());
                let ctx = StepContext::resume(snapshot, start);
                let segments = log.segments.entry(p.id).or_default();
                let outcome = EdfStepper::new(p, ctx, segments).run(Termination::WindowEnd(end));

                let utilization = outcome.busy as f64 / (end - start) as f64;
                debug!(
                    window,
                    processor = p.id,
                    start,
                    end,
                    busy = outcome.busy,
                    utilization,
                    "Window complete"
                );
                p.saved = Some(outcome.context.into_snapshot(utilization));
            }
        }
        log
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Validation
    // ─────────────────────────────────────────────────────────────────────────

    /// Per-processor and per-task checks.
    ///
    /// # Errors
    /// The first invalid frequency bound, utilisation, execution time,
    /// period or duplicate task id found, in processor then task-id order.
    fn validate(processors: &[Processor]) -> Result<(), SimulationError> {
        let mut seen = BTreeSet::new();
        for p in processors {
            if !p.frequency.is_valid() {
                return Err(SimulationError::InvalidFrequency {
                    processor: p.id,
                    min_f: p.frequency.min_f,
                    max_f: p.frequency.max_f,
                });
            }
            for task in p.tasks.values() {
                if !(task.utilization > 0.0 && task.utilization <= 1.0) {
                    return Err(SimulationError::InvalidUtilization {
                        task: task.id,
                        utilization: task.utilization,
                    });
                }
                if task.execution_time == 0 {
                    return Err(SimulationError::InvalidExecutionTime { task: task.id });
                }
                if task.period == 0 {
                    return Err(SimulationError::InvalidPeriod { task: task.id });
                }
                if !seen.insert(task.id) {
                    return Err(SimulationError::DuplicateTask { task: task.id });
                }
            }
        }
        Ok(())
    }

    /// Warn about every processor whose task set exceeds the EDF bound.
    ///
    /// Advisory only: overloaded processors still run and simply miss
    /// deadlines.
    fn run_edf_bound_check(processors: &[Processor]) {
        for p in processors {
            if let Some(total_u) = check_edf_bound(p.tasks.values()) {
                warn!(
                    processor = p.id,
                    utilization = total_u,
                    bound = EDF_UTILIZATION_BOUND,
                    task_count = p.tasks.len(),
                    "task set is not EDF-schedulable; expect deadline misses"
                );
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
