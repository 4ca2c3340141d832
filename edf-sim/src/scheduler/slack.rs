/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Dynamic slack reclamation.
//!
//! When a segment closes, the processor's idle capacity over its hyperperiod
//! may be spent to run that segment at a lower clock.  One slack unit is
//! earned per `slack_scope = ceil(hyperperiod / slack_time)` ticks of nominal
//! run time; the segment is then slowed by
//!
//! ```text
//! ratio = max(run_time / (run_time + slack_count), min_f / max_f)
//! ```
//!
//! and occupies `ceil(run_time / ratio)` ticks of wall time instead of
//! `run_time`.  The floor on `ratio` keeps the clock at or above the
//! processor's minimum supported fraction of its maximum.

use crate::hyperperiod::math::div_ceil;
use crate::processor::FrequencyBounds;
use crate::task::Tick;

/// Tolerance applied before rounding the stretched length up, so a ratio of
/// exactly `rt / (rt + n)` yields `rt + n` ticks and not one more.
const ROUNDING_TOLERANCE: f64 = 1e-9;

/// Per-processor inputs to the reclaimer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlackProfile {
    pub hyperperiod: Tick,
    pub slack_time: i64,
    pub frequency: FrequencyBounds,
}

/// Result of stretching one segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reclamation {
    /// Slack units earned by the segment.
    pub slack_count: Tick,

    /// Effective frequency-scaling factor, never below `min_f / max_f`.
    pub ratio: f64,

    /// Nominal run time divided by `ratio`.
    pub stretched_run_time: f64,

    /// Extra whole ticks the stretched segment occupies.
    pub added_time: Tick,

    /// `stretched_run_time − run_time`.
    pub added_slack: f64,
}

/// Decide whether a segment of `run_time` ticks is stretched.
///
/// Returns `None` when the processor has no slack (`slack_time ≤ 0`), when
/// the segment is too short to earn one slack unit, or when the bounded
/// ratio leaves the clock at full speed.
pub fn reclaim(profile: &SlackProfile, run_time: Tick) -> Option<Reclamation> {
    if profile.slack_time <= 0 || run_time == 0 || profile.hyperperiod == 0 {
        return None;
    }

    let slack_scope = div_ceil(profile.hyperperiod, profile.slack_time as u64);
    let slack_count = run_time / slack_scope;
    if slack_count < 1 {
        return None;
    }

    let rt = run_time as f64;
    let ratio = (rt / (rt + slack_count as f64)).max(profile.frequency.min_ratio());
    if ratio >= 1.0 {
        return None;
    }

    let stretched_run_time = rt / ratio;
    let wall = (stretched_run_time - ROUNDING_TOLERANCE).ceil() as Tick;

    Some(Reclamation {
        slack_count,
        ratio,
        stretched_run_time,
        added_time: wall.saturating_sub(run_time),
        added_slack: stretched_run_time - rt,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
