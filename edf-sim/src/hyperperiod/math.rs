/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Integer helpers behind the hyperperiod: GCD, overflow-checked LCM and
//! ceiling division.

use super::HyperperiodError;

/// Greatest common divisor (Euclid).  `gcd(x, 0) == x`.
pub fn gcd(a: u64, b: u64) -> u64 {
    let (mut x, mut y) = (a, b);
    while y > 0 {
        (x, y) = (y, x % y);
    }
    x
}

/// Least common multiple of two periods.
///
/// A zero operand yields `0`.  Fails with [`HyperperiodError::Overflow`]
/// when the product does not fit in `u64`.
pub fn lcm(a: u64, b: u64) -> Result<u64, HyperperiodError> {
    match (a, b) {
        (0, _) | (_, 0) => Ok(0),
        _ => (a / gcd(a, b))
            .checked_mul(b)
            .ok_or(HyperperiodError::Overflow { a, b }),
    }
}

/// LCM of a whole sequence, folded from `1`.
pub fn lcm_fold<I>(periods: I) -> Result<u64, HyperperiodError>
where
    I: IntoIterator<Item = u64>,
{
    periods.into_iter().try_fold(1, lcm)
}

/// `ceil(a / b)`; `b` must be non-zero.
pub fn div_ceil(a: u64, b: u64) -> u64 {
    debug_assert!(b > 0, "div_ceil by zero");
    a / b + u64::from(a % b != 0)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
