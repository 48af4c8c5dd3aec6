//! Linear scales and time ranges
//!
//! Handles transformation between data space (minutes relative to the latest
//! sample, watts) and screen space (pixel coordinates).

extern crate alloc;
use alloc::vec::Vec;

use crate::storage::{MILLIS_PER_MINUTE, relative_minutes};

use super::constants::{MAX_TICKS, MIN_DOMAIN_SPAN_MIN};
use super::{ChartError, ChartResult};

/// Closed range of absolute timestamps in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start_ms: i64,
    pub end_ms: i64,
}

impl TimeRange {
    /// Create a range, rejecting empty or inverted ones
    pub fn new(start_ms: i64, end_ms: i64) -> ChartResult<Self> {
        if start_ms >= end_ms {
            return Err(ChartError::InvalidDomain);
        }
        Ok(Self { start_ms, end_ms })
    }

    /// Range that may be degenerate (a single sample's extent)
    pub const fn spanning(start_ms: i64, end_ms: i64) -> Self {
        if start_ms <= end_ms {
            Self { start_ms, end_ms }
        } else {
            Self {
                start_ms: end_ms,
                end_ms: start_ms,
            }
        }
    }

    pub fn span_ms(&self) -> i64 {
        self.end_ms - self.start_ms
    }

    pub fn contains(&self, timestamp: i64) -> bool {
        (self.start_ms..=self.end_ms).contains(&timestamp)
    }

    /// Linear interpolation between two ranges, `t` in `0.0..=1.0`
    pub fn lerp(&self, to: &TimeRange, t: f32) -> TimeRange {
        let t = t.clamp(0.0, 1.0) as f64;
        let mix = |a: i64, b: i64| a + ((b - a) as f64 * t) as i64;
        TimeRange::spanning(mix(self.start_ms, to.start_ms), mix(self.end_ms, to.end_ms))
    }

    /// The range in minutes relative to `latest`
    pub fn relative_to(&self, latest: i64) -> (f32, f32) {
        (
            relative_minutes(self.start_ms, latest),
            relative_minutes(self.end_ms, latest),
        )
    }
}

/// Continuous linear map from a data domain onto a pixel range
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearScale {
    domain: (f32, f32),
    range: (f32, f32),
}

impl LinearScale {
    /// Create a scale. A zero-width domain is widened to avoid division by zero.
    pub fn new(domain: (f32, f32), range: (f32, f32)) -> Self {
        let (d0, mut d1) = domain;
        let span = if d1 > d0 { d1 - d0 } else { d0 - d1 };
        if span < MIN_DOMAIN_SPAN_MIN {
            d1 = d0 + MIN_DOMAIN_SPAN_MIN;
        }
        Self {
            domain: (d0, d1),
            range,
        }
    }

    pub fn domain(&self) -> (f32, f32) {
        self.domain
    }

    pub fn range(&self) -> (f32, f32) {
        self.range
    }

    /// Map a data value to screen space
    pub fn apply(&self, value: f32) -> f32 {
        let (d0, d1) = self.domain;
        let (r0, r1) = self.range;
        r0 + (value - d0) / (d1 - d0) * (r1 - r0)
    }

    /// Map a screen coordinate back to data space
    pub fn invert(&self, position: f32) -> f32 {
        let (d0, d1) = self.domain;
        let (r0, r1) = self.range;
        if r1 == r0 {
            return d0;
        }
        d0 + (position - r0) / (r1 - r0) * (d1 - d0)
    }

    /// Round tick values covering the domain, roughly `count` of them.
    ///
    /// Steps are 1, 2 or 5 times a power of ten.
    pub fn ticks(&self, count: usize) -> Vec<f32> {
        let (lo, hi) = if self.domain.0 <= self.domain.1 {
            self.domain
        } else {
            (self.domain.1, self.domain.0)
        };

        let mut ticks = Vec::new();
        if count == 0 || !(hi - lo).is_finite() {
            return ticks;
        }

        let step = tick_step(lo, hi, count);
        let first = ceil_f32(lo / step) as i64;
        let last = floor_f32(hi / step) as i64;

        for k in first..=last {
            if ticks.len() >= MAX_TICKS {
                break;
            }
            ticks.push(k as f32 * step);
        }
        ticks
    }

    /// Step between ticks produced by [`Self::ticks`]
    pub fn tick_step(&self, count: usize) -> f32 {
        let (lo, hi) = self.domain;
        tick_step(lo.min(hi), lo.max(hi), count.max(1))
    }
}

/// Relative minutes back to a millisecond offset
pub(super) fn minutes_to_ms(minutes: f32) -> i64 {
    (minutes * MILLIS_PER_MINUTE as f32) as i64
}

fn tick_step(lo: f32, hi: f32, count: usize) -> f32 {
    let raw = ((hi - lo) / count as f32).max(f32::EPSILON);

    let mut magnitude = 1.0_f32;
    while magnitude * 10.0 <= raw {
        magnitude *= 10.0;
    }
    while magnitude > raw {
        magnitude /= 10.0;
    }

    // Thresholds are sqrt(50), sqrt(10) and sqrt(2)
    let residual = raw / magnitude;
    let factor = if residual >= 7.071 {
        10.0
    } else if residual >= 3.162 {
        5.0
    } else if residual >= 1.414 {
        2.0
    } else {
        1.0
    };
    factor * magnitude
}

fn floor_f32(value: f32) -> f32 {
    let truncated = value as i64 as f32;
    if truncated > value {
        truncated - 1.0
    } else {
        truncated
    }
}

fn ceil_f32(value: f32) -> f32 {
    let truncated = value as i64 as f32;
    if truncated < value {
        truncated + 1.0
    } else {
        truncated
    }
}
