//! Stacked power chart
//!
//! Everything between the sample store and the pixels:
//!
//! - [`StackBuilder`] turns a window of samples into cumulative layers
//! - [`NearestSampleIndex`] resolves a cursor time to the closest sample
//! - [`LinearScale`] maps data space to screen space and back
//! - [`ChartView`] builds a declarative [`Scene`] from all of the above
//! - [`Scene::draw`] renders that scene onto any embedded-graphics target
//!
//! The scene is rebuilt from scratch on every update; nothing here keeps
//! time-series state of its own.

use thiserror_no_std::Error;

pub mod constants;
mod nearest;
pub mod palette;
mod render;
mod scale;
mod scene;
mod stack;
mod view;

pub use nearest::NearestSampleIndex;
pub use scale::{LinearScale, TimeRange};
pub use scene::{
    AreaElement, Axis, AxisOrientation, FocusMarker, LabelText, LegendEntry, Scene, TextLabel,
    Tick,
};
pub use stack::{StackBuilder, StackedLayer, StackedPoint};
pub use view::{ChartInput, ChartLayout, ChartMargin, ChartView};

/// Error types for chart operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChartError {
    /// The window holds no samples
    #[error("Window holds no samples")]
    EmptyWindow,

    /// Domain has zero or negative width
    #[error("Invalid domain (start >= end)")]
    InvalidDomain,
}

/// Result type for chart operations
pub type ChartResult<T> = Result<T, ChartError>;
