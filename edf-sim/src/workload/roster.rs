/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Persisted task roster: one CSV row per generated task.
//!
//! Written once after generation and never read back by the simulator.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use tracing::info;

use crate::task::Task;
use crate::workload::WorkloadError;

/// Column names, in row order.
pub const ROSTER_HEADER: [&str; 5] = ["ID", "Execution Time", "Period", "Criticality", "Utilization"];

/// Write the header and one row per task to `writer`.
pub fn write_roster<W: Write>(mut writer: W, tasks: &[Task]) -> io::Result<()> {
    writeln!(writer, "{}", ROSTER_HEADER.join(","))?;
    for task in tasks {
        writeln!(writer, "{}", task.csv_row().join(","))?;
    }
    writer.flush()
}

/// Create (or truncate) `path` and write the roster to it.
///
/// # Errors
/// [`WorkloadError::Roster`] on any I/O failure.
pub fn save_roster(path: &Path, tasks: &[Task]) -> Result<(), WorkloadError> {
    let to_roster_error = |source| WorkloadError::Roster {
        path: path.to_path_buf(),
        source,
    };
    let file = File::create(path).map_err(to_roster_error)?;
    write_roster(BufWriter::new(file), tasks).map_err(to_roster_error)?;
    info!(path = %path.display(), tasks = tasks.len(), "Task roster written");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
