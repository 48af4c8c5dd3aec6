//! Dashboard configuration
//!
//! Loaded from a JSON document in which every section and field is optional.

use embassy_time::Duration;
use embedded_graphics::primitives::Rectangle;
use serde::{Deserialize, Serialize};
use thiserror_no_std::Error;

use crate::chart::ChartLayout;
use crate::chart::constants::{
    DEFAULT_VALUE_AXIS_MAX_W, DEFAULT_X_TICK_COUNT, DEFAULT_X_TICK_COUNT_ZOOMED,
    DEFAULT_Y_TICK_COUNT, MAX_TICK_COUNT,
};
use crate::poll::DEFAULT_POLL_INTERVAL_MS;
use crate::storage::{DEFAULT_RETENTION_HOURS, MAX_RETENTION_HOURS, RetentionWindow};
use crate::zoom::{DEFAULT_IDLE_RESET_MS, DEFAULT_TRANSITION_MS, ZoomController};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration JSON: {0}")]
    Parse(serde_json::Error),

    #[error("Retention of {hours} hours is outside 1..={max}")]
    Retention { hours: u32, max: u32 },

    #[error("Poll interval must be non-zero")]
    PollInterval,

    #[error("Value axis maximum must be positive")]
    ValueAxis,

    #[error("Tick count {count} is outside 1..={max}")]
    TickCount { count: usize, max: usize },
}

/// Dashboard settings; every section and field is optional in the JSON
#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(default)]
pub struct DashboardConfig {
    pub poll: PollConfig,
    pub retention: RetentionConfig,
    pub interaction: InteractionConfig,
    pub chart: ChartConfig,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct PollConfig {
    pub interval_ms: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct RetentionConfig {
    /// Duration shown at startup
    pub default_hours: u32,
    /// History kept in memory
    pub max_hours: u32,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            default_hours: DEFAULT_RETENTION_HOURS,
            max_hours: MAX_RETENTION_HOURS,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct InteractionConfig {
    pub idle_reset_ms: u64,
    pub transition_ms: u64,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            idle_reset_ms: DEFAULT_IDLE_RESET_MS,
            transition_ms: DEFAULT_TRANSITION_MS,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ChartConfig {
    pub value_axis_max: f32,
    pub x_ticks: usize,
    pub x_ticks_zoomed: usize,
    pub y_ticks: usize,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            value_axis_max: DEFAULT_VALUE_AXIS_MAX_W,
            x_ticks: DEFAULT_X_TICK_COUNT,
            x_ticks_zoomed: DEFAULT_X_TICK_COUNT_ZOOMED,
            y_ticks: DEFAULT_Y_TICK_COUNT,
        }
    }
}

impl DashboardConfig {
    /// Parse and validate a JSON document
    pub fn from_json(bytes: &[u8]) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_slice(bytes).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.default_retention()?;
        self.max_retention()?;
        if self.poll.interval_ms == 0 {
            return Err(ConfigError::PollInterval);
        }
        if !(self.chart.value_axis_max > 0.0) {
            return Err(ConfigError::ValueAxis);
        }
        for count in [
            self.chart.x_ticks,
            self.chart.x_ticks_zoomed,
            self.chart.y_ticks,
        ] {
            if !(1..=MAX_TICK_COUNT).contains(&count) {
                return Err(ConfigError::TickCount {
                    count,
                    max: MAX_TICK_COUNT,
                });
            }
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll.interval_ms)
    }

    pub fn default_retention(&self) -> Result<RetentionWindow, ConfigError> {
        retention(self.retention.default_hours)
    }

    pub fn max_retention(&self) -> Result<RetentionWindow, ConfigError> {
        retention(self.retention.max_hours)
    }

    pub fn zoom(&self) -> ZoomController {
        ZoomController::new(
            Duration::from_millis(self.interaction.idle_reset_ms),
            Duration::from_millis(self.interaction.transition_ms),
        )
    }

    /// Chart layout filling `bounds`
    pub fn layout(&self, bounds: Rectangle) -> ChartLayout {
        ChartLayout::new(bounds)
            .with_value_axis_max(self.chart.value_axis_max)
            .with_tick_counts(
                self.chart.x_ticks,
                self.chart.x_ticks_zoomed,
                self.chart.y_ticks,
            )
    }
}

fn retention(hours: u32) -> Result<RetentionWindow, ConfigError> {
    RetentionWindow::from_hours(hours).ok_or(ConfigError::Retention {
        hours,
        max: MAX_RETENTION_HOURS,
    })
}
