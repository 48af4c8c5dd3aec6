//! Constants for chart layout and rendering
//!
//! All magic numbers are defined here with descriptive names and units.

/// Upper bound of the value axis in watts (the axis never auto-scales)
pub const DEFAULT_VALUE_AXIS_MAX_W: f32 = 100.0;

/// Number of ticks requested for the time axis at full extent
pub const DEFAULT_X_TICK_COUNT: usize = 10;

/// Number of ticks requested for the time axis once zoomed
pub const DEFAULT_X_TICK_COUNT_ZOOMED: usize = 5;

/// Number of ticks requested for the value axis
pub const DEFAULT_Y_TICK_COUNT: usize = 10;

/// Upper bound on generated ticks, whatever the request
pub const MAX_TICKS: usize = 32;

/// Largest tick count a layout may request. Nice steps yield at most
/// `1.414 * count + 1` ticks, which stays under [`MAX_TICKS`].
pub const MAX_TICK_COUNT: usize = 20;

/// Maximum length of formatted labels (characters)
pub const MAX_LABEL_LENGTH: usize = 32;

/// Minimum domain width in minutes (prevents division by zero)
pub const MIN_DOMAIN_SPAN_MIN: f32 = 0.001;

pub const DEFAULT_MARGIN_TOP_PX: u32 = 30;
pub const DEFAULT_MARGIN_RIGHT_PX: u32 = 20;
pub const DEFAULT_MARGIN_BOTTOM_PX: u32 = 36;
pub const DEFAULT_MARGIN_LEFT_PX: u32 = 36;

/// Length of axis tick marks in pixels
pub const TICK_LENGTH_PX: i32 = 4;

/// Gap between a tick mark and its label in pixels
pub const TICK_LABEL_GAP_PX: i32 = 3;

/// Vertical offset of the time axis title below the plot area
pub const X_AXIS_TITLE_OFFSET_PX: i32 = 30;

/// Vertical offset of the value axis title above the plot area
pub const Y_AXIS_TITLE_OFFSET_PX: i32 = 12;

/// Focus marker radius in pixels
pub const FOCUS_MARKER_RADIUS_PX: u32 = 3;

/// Horizontal gap between a focus marker and its label
pub const FOCUS_LABEL_OFFSET_PX: i32 = 6;

/// Legend swatch edge length in pixels
pub const LEGEND_SWATCH_PX: u32 = 10;

/// Distance between legend rows in pixels
pub const LEGEND_ROW_GAP_PX: u32 = 5;

/// Horizontal inset of the legend from the plot's left edge
pub const LEGEND_INSET_X_PX: i32 = 20;

/// Opacity of layers that are not highlighted from the legend (~0.1)
pub const DIMMED_LAYER_OPACITY: u8 = 26;

/// Text shown when there is nothing to plot
pub const EMPTY_PLACEHOLDER: &str = "No data available";

pub const X_AXIS_TITLE: &str = "Time (minutes)";
pub const Y_AXIS_TITLE: &str = "Power Consumption (Watts)";
