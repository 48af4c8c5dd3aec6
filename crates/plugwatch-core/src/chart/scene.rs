//! Declarative description of one chart frame
//!
//! A [`Scene`] is plain data: screen-space geometry, colors and labels. It is
//! produced by [`super::ChartView`] and drawn by [`Scene::draw`].

use core::fmt;

use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;
use embedded_graphics::text::Alignment;

extern crate alloc;
use alloc::vec::Vec;

use crate::storage::ChannelId;

use super::constants::MAX_LABEL_LENGTH;
use super::scale::{LinearScale, minutes_to_ms};

/// Fixed-capacity label text
pub type LabelText = heapless::String<MAX_LABEL_LENGTH>;

/// Format a label, truncating silently once capacity is reached
pub(super) fn label(args: fmt::Arguments<'_>) -> LabelText {
    let mut writer = Truncating {
        text: LabelText::new(),
        full: false,
    };
    let _ = fmt::write(&mut writer, args);
    writer.text
}

/// Pushes whole characters until the first one that does not fit
struct Truncating {
    text: LabelText,
    full: bool,
}

impl fmt::Write for Truncating {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for c in s.chars() {
            if self.full {
                break;
            }
            self.full = self.text.push(c).is_err();
        }
        Ok(())
    }
}

/// A positioned piece of text
#[derive(Debug, Clone, PartialEq)]
pub struct TextLabel {
    pub text: LabelText,
    /// Baseline anchor of the text
    pub position: Point,
    pub alignment: Alignment,
    pub color: Rgb565,
}

impl TextLabel {
    pub fn new(text: LabelText, position: Point, alignment: Alignment, color: Rgb565) -> Self {
        Self {
            text,
            position,
            alignment,
            color,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisOrientation {
    /// Along the bottom of the plot area
    Horizontal,
    /// Along the left of the plot area
    Vertical,
}

/// A tick mark and its label
#[derive(Debug, Clone, PartialEq)]
pub struct Tick {
    /// Screen coordinate along the axis (x for horizontal, y for vertical)
    pub position: i32,
    pub label: LabelText,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Axis {
    pub orientation: AxisOrientation,
    /// Start of the axis line
    pub origin: Point,
    /// Length of the axis line in pixels
    pub length: u32,
    pub ticks: Vec<Tick>,
    pub title: TextLabel,
    pub color: Rgb565,
}

impl Axis {
    /// End point of the axis line
    pub fn end(&self) -> Point {
        match self.orientation {
            AxisOrientation::Horizontal => self.origin + Point::new(self.length as i32, 0),
            AxisOrientation::Vertical => self.origin - Point::new(0, self.length as i32),
        }
    }
}

/// Filled band of one stacked layer
///
/// `upper` and `lower` are paired point by point, ordered left to right.
#[derive(Debug, Clone, PartialEq)]
pub struct AreaElement {
    pub channel: ChannelId,
    /// Fill color with any dimming already applied
    pub color: Rgb565,
    pub upper: Vec<Point>,
    pub lower: Vec<Point>,
}

/// Hover marker at the cumulative height of one channel
#[derive(Debug, Clone, PartialEq)]
pub struct FocusMarker {
    pub channel: ChannelId,
    pub center: Point,
    /// Instantaneous value of the channel, e.g. `"12.5W"`
    pub label: TextLabel,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LegendEntry {
    pub channel: ChannelId,
    pub swatch: Rectangle,
    pub color: Rgb565,
    pub label: TextLabel,
    /// Swatch and label together, used for pointer hit-testing
    pub hit_area: Rectangle,
}

/// Everything needed to draw one frame
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    /// Full drawing area
    pub bounds: Rectangle,
    /// Area inside the margins where data is plotted
    pub plot_area: Rectangle,
    pub background: Rgb565,
    /// Horizontal scale in minutes relative to `latest_ms`
    pub x_scale: Option<LinearScale>,
    /// Timestamp the time axis is relative to
    pub latest_ms: Option<i64>,
    pub axes: Vec<Axis>,
    pub areas: Vec<AreaElement>,
    pub focus: Vec<FocusMarker>,
    /// Vertical guide through the hovered sample
    pub focus_line: Option<(Point, Point)>,
    pub legend: Vec<LegendEntry>,
    pub brush: Option<Rectangle>,
    /// Set when there is nothing to plot
    pub placeholder: Option<TextLabel>,
}

impl Scene {
    /// A scene with nothing but its background
    pub fn empty(bounds: Rectangle, plot_area: Rectangle, background: Rgb565) -> Self {
        Self {
            bounds,
            plot_area,
            background,
            x_scale: None,
            latest_ms: None,
            axes: Vec::new(),
            areas: Vec::new(),
            focus: Vec::new(),
            focus_line: None,
            legend: Vec::new(),
            brush: None,
            placeholder: None,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.placeholder.is_some()
    }

    /// Absolute timestamp under the screen column `x`
    pub fn time_at(&self, x: i32) -> Option<i64> {
        let scale = self.x_scale?;
        let latest = self.latest_ms?;
        Some(latest + minutes_to_ms(scale.invert(x as f32)))
    }

    /// Clamp a screen column to the plot area's first and last columns
    pub fn clamp_to_plot(&self, x: i32) -> i32 {
        let left = self.plot_area.top_left.x;
        let right = left + self.plot_area.size.width.saturating_sub(1) as i32;
        x.clamp(left, right)
    }

    /// Whether `point` lies inside the plot area
    pub fn in_plot(&self, point: Point) -> bool {
        self.plot_area.contains(point)
    }

    /// Legend entry under `point`, if any
    pub fn legend_hit(&self, point: Point) -> Option<&ChannelId> {
        self.legend
            .iter()
            .find(|entry| entry.hit_area.contains(point))
            .map(|entry| &entry.channel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MILLIS_PER_MINUTE;

    #[test]
    fn test_label_truncates_at_capacity() {
        let long = "Living room entertainment center + TV";
        let text = label(format_args!("{}", long));
        assert_eq!(text.len(), MAX_LABEL_LENGTH);
        assert_eq!(text.as_str(), &long[..MAX_LABEL_LENGTH]);

        // A multi-byte character that would straddle capacity is dropped whole
        let text = label(format_args!("{}é", "x".repeat(MAX_LABEL_LENGTH - 1)));
        assert_eq!(text.len(), MAX_LABEL_LENGTH - 1);
        assert_eq!(label(format_args!("{}W", 12.5)).as_str(), "12.5W");
    }

    #[test]
    fn test_clamp_to_plot() {
        let bounds = Rectangle::new(Point::zero(), Size::new(320, 240));
        let plot = Rectangle::new(Point::new(40, 10), Size::new(260, 200));
        let scene = Scene::empty(bounds, plot, Rgb565::WHITE);
        assert_eq!(scene.clamp_to_plot(0), 40);
        assert_eq!(scene.clamp_to_plot(120), 120);
        assert_eq!(scene.clamp_to_plot(319), 299);
    }

    #[test]
    fn test_time_at_inverts_scale() {
        let area = Rectangle::new(Point::new(0, 0), Size::new(100, 50));
        let mut scene = Scene::empty(area, area, Rgb565::WHITE);
        assert_eq!(scene.time_at(10), None);

        scene.x_scale = Some(LinearScale::new((-10.0, 0.0), (0.0, 100.0)));
        scene.latest_ms = Some(1_000_000);
        assert_eq!(scene.time_at(100), Some(1_000_000));
        assert_eq!(scene.time_at(50), Some(1_000_000 - 5 * MILLIS_PER_MINUTE));
    }

    #[test]
    fn test_axis_end() {
        let axis = Axis {
            orientation: AxisOrientation::Vertical,
            origin: Point::new(10, 100),
            length: 80,
            ticks: Vec::new(),
            title: TextLabel::new(LabelText::new(), Point::zero(), Alignment::Left, Rgb565::BLACK),
            color: Rgb565::BLACK,
        };
        assert_eq!(axis.end(), Point::new(10, 20));
    }
}
