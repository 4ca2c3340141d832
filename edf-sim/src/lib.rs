/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! edf-sim – partitioned EDF scheduling simulator
//!
//! Module layout:
//!
//! ```text
//! lib.rs
//! ├── task            – Task, Instance, InstanceKey, Criticality
//! ├── processor       – Processor, FrequencyBounds, ProcessorSnapshot
//! ├── hyperperiod/    – LCM / GCD helpers, job generation, slack time
//! ├── scheduler/      – partition coordinator
//! │   ├── stepper     – tick-driven EDF stepper
//! │   ├── slack       – slack reclamation
//! │   ├── migration   – load-feedback task migration
//! │   ├── job_set     – deadline / arrival ordered key sets
//! │   └── feasibility – EDF utilisation bound (warning only)
//! ├── run_log         – executed segments and migrations
//! ├── config/         – YAML simulation configuration
//! └── workload/       – UUniFast-discard, dispatcher, CSV roster
//! ```

pub mod config;
pub mod hyperperiod;
pub mod processor;
pub mod run_log;
pub mod scheduler;
pub mod task;
pub mod workload;
