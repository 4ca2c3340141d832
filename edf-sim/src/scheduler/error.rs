/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Structured error types for the simulator.
//!
//! Only precondition violations are fatal.  Everything detected here is
//! reported by [`Scheduler::new`](super::Scheduler::new) before any instance
//! is stepped.  A hyperperiod failure counts only when no scheduling upper
//! bound is given.  Local failures during a run (an infeasible migration pair,
//! an empty queue) are recovered in place and never surface as an error.

use thiserror::Error;

use crate::hyperperiod::HyperperiodError;
use crate::processor::ProcessorId;
use crate::task::{TaskId, Tick};

/// Top-level error type of the scheduler.
#[derive(Debug, Error)]
pub enum SimulationError {
    /// The processor list was empty.
    #[error("no processors provided")]
    NoProcessors,

    /// A task's derived period is zero.
    #[error("task {task} has a non-positive period")]
    InvalidPeriod { task: TaskId },

    /// A task's execution time is zero.
    #[error("task {task} has a zero execution time")]
    InvalidExecutionTime { task: TaskId },

    /// A task's utilisation lies outside `(0, 1]`.
    #[error("task {task} has utilization {utilization} outside (0, 1]")]
    InvalidUtilization { task: TaskId, utilization: f64 },

    /// A processor's frequency bounds violate `0 < min_f ≤ max_f ≤ 1`.
    #[error("processor {processor} has invalid frequency bounds min_f={min_f} max_f={max_f}")]
    InvalidFrequency {
        processor: ProcessorId,
        min_f: f64,
        max_f: f64,
    },

    /// Two tasks share an id.
    #[error("task id {task} is assigned more than once")]
    DuplicateTask { task: TaskId },

    /// `time_partition` was set to zero.
    #[error("time partition must be at least one tick")]
    ZeroPartition,

    /// The scheduling upper bound is above the hyperperiod limit.
    #[error("scheduling upper bound {bound} exceeds limit {limit} ticks")]
    UpperBoundTooLarge { bound: Tick, limit: Tick },

    /// A processor's hyperperiod could not be computed and no upper bound
    /// was given.
    #[error("hyperperiod of processor {processor}: {source}")]
    Hyperperiod {
        processor: ProcessorId,
        #[source]
        source: HyperperiodError,
    },
}
