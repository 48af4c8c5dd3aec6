//! In-memory telemetry storage
//!
//! Samples arrive from the telemetry source in increasing timestamp order and
//! are kept in a [`SampleStore`] until they fall outside the maximum retention
//! window. Nothing here is persisted.

pub mod sample_store;
pub mod wire;

pub use sample_store::{AppendReport, SampleStore, SharedStore, Window};
pub use wire::{WireError, WireResult};

extern crate alloc;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

pub const MILLIS_PER_SEC: i64 = 1000;
pub const SECS_PER_MIN: i64 = 60;
pub const MINS_PER_HOUR: i64 = 60;

/// Milliseconds in one minute
pub const MILLIS_PER_MINUTE: i64 = SECS_PER_MIN * MILLIS_PER_SEC;

/// Milliseconds in one hour
pub const MILLIS_PER_HOUR: i64 = MINS_PER_HOUR * MILLIS_PER_MINUTE;

/// Largest retention the store keeps, independent of the displayed duration
pub const MAX_RETENTION_HOURS: u32 = 24;

/// Displayed duration used until the user picks another one
pub const DEFAULT_RETENTION_HOURS: u32 = 1;

/// Identifier of one monitored plug
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChannelId(String);

impl ChannelId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ChannelId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One telemetry record: a timestamp and the power drawn by each plug.
///
/// Channel entries keep the order the source listed them in, which is the
/// order used for the channel schema when no name listing is available.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// Source clock in milliseconds
    pub timestamp: i64,
    channels: Vec<(ChannelId, f32)>,
}

impl Sample {
    /// Create a sample without any channel values
    pub fn new(timestamp: i64) -> Self {
        Self {
            timestamp,
            channels: Vec::new(),
        }
    }

    /// Builder-style channel insertion
    pub fn with_channel(mut self, channel: impl Into<ChannelId>, watts: f32) -> Self {
        self.set(channel.into(), watts);
        self
    }

    /// Set a channel value, replacing an existing entry with the same id
    pub fn set(&mut self, channel: ChannelId, watts: f32) {
        match self.channels.iter_mut().find(|(id, _)| *id == channel) {
            Some(entry) => entry.1 = watts,
            None => self.channels.push((channel, watts)),
        }
    }

    /// Value of a channel, `None` when the sample does not carry it
    pub fn value(&self, channel: &ChannelId) -> Option<f32> {
        self.channels
            .iter()
            .find(|(id, _)| id == channel)
            .map(|(_, watts)| *watts)
    }

    /// Value of a channel, treating a missing entry as zero
    pub fn value_or_zero(&self, channel: &ChannelId) -> f32 {
        self.value(channel).unwrap_or(0.0)
    }

    pub fn channels(&self) -> impl Iterator<Item = (&ChannelId, f32)> {
        self.channels.iter().map(|(id, watts)| (id, *watts))
    }

    pub fn channel_ids(&self) -> impl Iterator<Item = &ChannelId> {
        self.channels.iter().map(|(id, _)| id)
    }

    /// Sum of every channel value carried by this sample
    pub fn total(&self) -> f32 {
        self.channels.iter().map(|(_, watts)| *watts).sum()
    }
}

impl From<&String> for ChannelId {
    fn from(value: &String) -> Self {
        Self::new(value.clone())
    }
}

impl From<String> for ChannelId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Minutes between `timestamp` and `latest`; zero at the latest sample and
/// negative before it.
pub fn relative_minutes(timestamp: i64, latest: i64) -> f32 {
    (timestamp - latest) as f32 / MILLIS_PER_MINUTE as f32
}

/// Duration of history shown by the chart, in whole hours
///
/// The duration control hands the core a plain number of hours; anything
/// outside `1..=MAX_RETENTION_HOURS` is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RetentionWindow {
    hours: u32,
}

impl RetentionWindow {
    pub const ONE_HOUR: Self = Self { hours: 1 };
    pub const SIX_HOURS: Self = Self { hours: 6 };
    pub const TWELVE_HOURS: Self = Self { hours: 12 };
    pub const ONE_DAY: Self = Self { hours: 24 };

    /// The retention the store trims to
    pub const MAX: Self = Self {
        hours: MAX_RETENTION_HOURS,
    };

    /// Validate a duration coming from the duration control
    pub const fn from_hours(hours: u32) -> Option<Self> {
        if hours == 0 || hours > MAX_RETENTION_HOURS {
            None
        } else {
            Some(Self { hours })
        }
    }

    pub const fn hours(self) -> u32 {
        self.hours
    }

    /// Get the duration of this window in milliseconds
    pub const fn duration_ms(self) -> i64 {
        self.hours as i64 * MILLIS_PER_HOUR
    }
}

impl Default for RetentionWindow {
    fn default() -> Self {
        Self {
            hours: DEFAULT_RETENTION_HOURS,
        }
    }
}

impl fmt::Display for RetentionWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}h", self.hours)
    }
}
