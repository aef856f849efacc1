//! Time handling for the animation core.
//!
//! `AnimationTime` stores nanoseconds in a `u64` so timestamps are totally
//! ordered and serde-friendly; all arithmetic is saturating. Progress is
//! always computed from elapsed wall time, never from accumulated per-tick
//! deltas, so variable frame rates cannot drift a running animation.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::AnimationError;

/// A moment (or span) in animation time, in nanoseconds.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Eq, Ord, Hash, Serialize, Deserialize, Default)]
pub struct AnimationTime(u64);

impl AnimationTime {
    /// Create animation time from nanoseconds.
    #[inline]
    pub const fn from_nanos(nanoseconds: u64) -> Self {
        Self(nanoseconds)
    }

    /// Create animation time from milliseconds.
    #[inline]
    pub fn from_millis(milliseconds: f64) -> Result<Self, AnimationError> {
        Self::from_seconds(milliseconds / 1000.0)
    }

    /// Create animation time from seconds. Negative or non-finite input is
    /// an `InvalidTime` error.
    #[inline]
    pub fn from_seconds(seconds: f64) -> Result<Self, AnimationError> {
        if seconds < 0.0 || !seconds.is_finite() {
            return Err(AnimationError::InvalidTime { time: seconds });
        }
        Ok(Self((seconds * 1_000_000_000.0) as u64))
    }

    /// Zero time.
    #[inline]
    pub const fn zero() -> Self {
        Self(0)
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Get time in seconds.
    #[inline]
    pub fn as_seconds(&self) -> f64 {
        self.0 as f64 / 1_000_000_000.0
    }

    /// Get time in milliseconds.
    #[inline]
    pub fn as_millis(&self) -> f64 {
        self.0 as f64 / 1_000_000.0
    }

    /// Get time in nanoseconds.
    #[inline]
    pub fn as_nanos(&self) -> u64 {
        self.0
    }

    /// Saturating difference against an earlier time.
    #[inline]
    pub fn duration_since(&self, earlier: AnimationTime) -> AnimationTime {
        Self(self.0.saturating_sub(earlier.0))
    }

    /// Clamp time into `[min, max]`.
    #[inline]
    pub fn clamp(&self, min: AnimationTime, max: AnimationTime) -> Self {
        if self.0 < min.0 {
            min
        } else if self.0 > max.0 {
            max
        } else {
            *self
        }
    }
}

impl std::ops::Add for AnimationTime {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }
}

impl std::ops::AddAssign for AnimationTime {
    fn add_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_add(other.0);
    }
}

impl std::ops::Sub for AnimationTime {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }
}

impl std::ops::SubAssign for AnimationTime {
    fn sub_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_sub(other.0);
    }
}

impl From<Duration> for AnimationTime {
    fn from(duration: Duration) -> Self {
        AnimationTime::from_nanos(duration.as_nanos() as u64)
    }
}

impl From<AnimationTime> for Duration {
    fn from(time: AnimationTime) -> Self {
        Duration::from_nanos(time.0)
    }
}

/// A half-open-ish time window `[start, end]` used for timeline item
/// activation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: AnimationTime,
    pub end: AnimationTime,
}

impl TimeRange {
    /// Create a new time range. `start` must not exceed `end`.
    #[inline]
    pub fn new(start: AnimationTime, end: AnimationTime) -> Result<Self, AnimationError> {
        if start > end {
            return Err(AnimationError::InvalidTime {
                time: start.as_seconds() - end.as_seconds(),
            });
        }
        Ok(Self { start, end })
    }

    /// Create a range from zero to the given duration.
    #[inline]
    pub fn from_duration(duration: AnimationTime) -> Self {
        Self {
            start: AnimationTime::zero(),
            end: duration,
        }
    }

    /// Get the duration of this range.
    #[inline]
    pub fn duration(&self) -> AnimationTime {
        self.end - self.start
    }

    /// Check if a time is within this range (inclusive).
    #[inline]
    pub fn contains(&self, time: AnimationTime) -> bool {
        time >= self.start && time <= self.end
    }

    /// Normalize a time within this range to `[0, 1]`.
    #[inline]
    pub fn normalize(&self, time: AnimationTime) -> f32 {
        let span = self.duration().as_seconds();
        if span == 0.0 {
            return 0.0;
        }
        (((time.as_seconds() - self.start.as_seconds()) / span).clamp(0.0, 1.0)) as f32
    }

    /// Extend the range to include the given time.
    #[inline]
    pub fn extend_to_include(&mut self, time: AnimationTime) {
        if time < self.start {
            self.start = time;
        }
        if time > self.end {
            self.end = time;
        }
    }
}
