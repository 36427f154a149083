// Copyright 2026 the Viewport Truth Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Monotonic host time in microsecond ticks.
//!
//! Browser-like hosts hand out timestamps as fractional milliseconds
//! (`performance.now()`, `Date.now()`, the `requestAnimationFrame` argument).
//! [`HostTime`] stores them as integral microseconds so that snapshot
//! timestamps and debounce arithmetic are exact and totally ordered.
//!
//! [`Duration`] is expressed in the same tick units as [`HostTime`].

use core::fmt;
use core::ops::{Add, Sub};

/// Microseconds per millisecond.
const MICROS_PER_MILLI: u64 = 1_000;

/// Converts fractional milliseconds to whole microsecond ticks.
///
/// Negative, NaN and infinite inputs map to zero; values beyond the `u64`
/// range saturate.
#[expect(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "input is checked finite and non-negative; `as` saturates above u64::MAX"
)]
fn millis_to_ticks(ms: f64) -> u64 {
    if !ms.is_finite() || ms <= 0.0 {
        return 0;
    }
    libm::round(ms * MICROS_PER_MILLI as f64) as u64
}

/// A point in time expressed as monotonic microsecond ticks.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct HostTime(pub u64);

impl HostTime {
    /// Returns the raw tick value.
    #[inline]
    #[must_use]
    pub const fn ticks(self) -> u64 {
        self.0
    }

    /// Creates a [`HostTime`] from a fractional millisecond timestamp such as
    /// the value returned by `performance.now()`.
    #[inline]
    #[must_use]
    pub fn from_millis_f64(ms: f64) -> Self {
        Self(millis_to_ticks(ms))
    }

    /// Returns this time as fractional milliseconds.
    #[inline]
    #[must_use]
    pub fn as_millis_f64(self) -> f64 {
        self.0 as f64 / MICROS_PER_MILLI as f64
    }

    /// Returns the duration between `self` and an earlier time, or zero if
    /// `earlier` is after `self`.
    #[inline]
    #[must_use]
    pub const fn saturating_duration_since(self, earlier: Self) -> Duration {
        Duration(self.0.saturating_sub(earlier.0))
    }

    /// Checked addition of a duration.
    #[inline]
    #[must_use]
    pub const fn checked_add(self, duration: Duration) -> Option<Self> {
        match self.0.checked_add(duration.0) {
            Some(t) => Some(Self(t)),
            None => None,
        }
    }
}

impl Add<Duration> for HostTime {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Duration) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl Sub for HostTime {
    type Output = Duration;

    #[inline]
    fn sub(self, rhs: Self) -> Duration {
        self.saturating_duration_since(rhs)
    }
}

impl fmt::Debug for HostTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HostTime({}µs)", self.0)
    }
}

/// A duration in microsecond ticks.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Duration(pub u64);

impl Duration {
    /// A zero-length duration.
    pub const ZERO: Self = Self(0);

    /// Creates a duration from whole milliseconds.
    #[inline]
    #[must_use]
    pub const fn from_millis(ms: u64) -> Self {
        Self(ms.saturating_mul(MICROS_PER_MILLI))
    }

    /// Creates a duration from fractional milliseconds.
    ///
    /// Negative and non-finite inputs yield [`Duration::ZERO`].
    #[inline]
    #[must_use]
    pub fn from_millis_f64(ms: f64) -> Self {
        Self(millis_to_ticks(ms))
    }

    /// Returns the raw tick value.
    #[inline]
    #[must_use]
    pub const fn ticks(self) -> u64 {
        self.0
    }

    /// Returns this duration as fractional milliseconds.
    #[inline]
    #[must_use]
    pub fn as_millis_f64(self) -> f64 {
        self.0 as f64 / MICROS_PER_MILLI as f64
    }

    /// Saturating addition.
    #[inline]
    #[must_use]
    pub const fn saturating_add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }

    /// Saturating subtraction.
    #[inline]
    #[must_use]
    pub const fn saturating_sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }
}

impl Add for Duration {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        self.saturating_add(rhs)
    }
}

impl fmt::Debug for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Duration({}µs)", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn millis_conversion_keeps_sub_millisecond_precision() {
        let t = HostTime::from_millis_f64(16.667);
        assert_eq!(t.ticks(), 16_667, "fractional ms rounds to whole µs");
        assert!((t.as_millis_f64() - 16.667).abs() < 1e-9);
    }

    #[test]
    fn bad_millis_map_to_zero() {
        assert_eq!(HostTime::from_millis_f64(f64::NAN), HostTime(0));
        assert_eq!(HostTime::from_millis_f64(-5.0), HostTime(0));
        assert_eq!(Duration::from_millis_f64(f64::INFINITY), Duration::ZERO);
    }

    #[test]
    fn duration_from_whole_millis() {
        assert_eq!(Duration::from_millis(150).ticks(), 150_000);
        assert_eq!(Duration::from_millis(u64::MAX), Duration(u64::MAX));
    }

    #[test]
    fn host_time_duration_ops() {
        let t = HostTime(1000);
        let d = Duration(200);
        assert_eq!((t + d).ticks(), 1200);
        assert_eq!(t - HostTime(400), Duration(600));
        assert_eq!(t - HostTime(1500), Duration::ZERO, "subtraction saturates");
        assert_eq!(HostTime(u64::MAX).checked_add(Duration(1)), None);
    }
}
