//! Scene construction
//!
//! [`ChartView::render`] is a pure function of its [`ChartInput`]: the same
//! window, layers, domain and pointer state always yield the same [`Scene`].

use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;
use embedded_graphics::text::Alignment;

extern crate alloc;
use alloc::vec::Vec;

use crate::storage::{ChannelId, MILLIS_PER_MINUTE, Window};

use super::constants::{
    DEFAULT_MARGIN_BOTTOM_PX, DEFAULT_MARGIN_LEFT_PX, DEFAULT_MARGIN_RIGHT_PX,
    DEFAULT_MARGIN_TOP_PX, DEFAULT_VALUE_AXIS_MAX_W, DEFAULT_X_TICK_COUNT,
    DEFAULT_X_TICK_COUNT_ZOOMED, DEFAULT_Y_TICK_COUNT, DIMMED_LAYER_OPACITY, EMPTY_PLACEHOLDER,
    FOCUS_LABEL_OFFSET_PX, LEGEND_INSET_X_PX, LEGEND_ROW_GAP_PX, LEGEND_SWATCH_PX,
    X_AXIS_TITLE, X_AXIS_TITLE_OFFSET_PX, Y_AXIS_TITLE, Y_AXIS_TITLE_OFFSET_PX,
};
use super::nearest::NearestSampleIndex;
use super::palette::{
    COLOR_AXIS, COLOR_BACKGROUND, COLOR_FOCUS, COLOR_PLACEHOLDER, channel_color, with_opacity,
};
use super::scale::{LinearScale, TimeRange};
use super::scene::{
    AreaElement, Axis, AxisOrientation, FocusMarker, LegendEntry, Scene, TextLabel, Tick, label,
};
use super::stack::StackedLayer;

/// Width of one character of the label font
const GLYPH_WIDTH_PX: u32 = 6;

/// Space around the plot area for axes, titles and labels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChartMargin {
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
    pub left: u32,
}

impl Default for ChartMargin {
    fn default() -> Self {
        Self {
            top: DEFAULT_MARGIN_TOP_PX,
            right: DEFAULT_MARGIN_RIGHT_PX,
            bottom: DEFAULT_MARGIN_BOTTOM_PX,
            left: DEFAULT_MARGIN_LEFT_PX,
        }
    }
}

impl ChartMargin {
    pub const fn new(top: u32, right: u32, bottom: u32, left: u32) -> Self {
        Self {
            top,
            right,
            bottom,
            left,
        }
    }

    pub const fn uniform(margin: u32) -> Self {
        Self::new(margin, margin, margin, margin)
    }
}

/// Screen geometry and axis settings of the chart
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartLayout {
    pub bounds: Rectangle,
    pub margin: ChartMargin,
    /// Top of the value axis in watts
    pub value_axis_max: f32,
    pub x_ticks: usize,
    pub x_ticks_zoomed: usize,
    pub y_ticks: usize,
}

impl ChartLayout {
    pub fn new(bounds: Rectangle) -> Self {
        Self {
            bounds,
            margin: ChartMargin::default(),
            value_axis_max: DEFAULT_VALUE_AXIS_MAX_W,
            x_ticks: DEFAULT_X_TICK_COUNT,
            x_ticks_zoomed: DEFAULT_X_TICK_COUNT_ZOOMED,
            y_ticks: DEFAULT_Y_TICK_COUNT,
        }
    }

    pub fn with_margin(mut self, margin: ChartMargin) -> Self {
        self.margin = margin;
        self
    }

    pub fn with_value_axis_max(mut self, watts: f32) -> Self {
        self.value_axis_max = watts;
        self
    }

    pub fn with_tick_counts(mut self, x_ticks: usize, x_ticks_zoomed: usize, y_ticks: usize) -> Self {
        self.x_ticks = x_ticks;
        self.x_ticks_zoomed = x_ticks_zoomed;
        self.y_ticks = y_ticks;
        self
    }

    /// Bounds minus margins
    pub fn plot_area(&self) -> Rectangle {
        let top_left = Point::new(
            self.bounds.top_left.x + self.margin.left as i32,
            self.bounds.top_left.y + self.margin.top as i32,
        );

        let width = self
            .bounds
            .size
            .width
            .saturating_sub(self.margin.left + self.margin.right);
        let height = self
            .bounds
            .size
            .height
            .saturating_sub(self.margin.top + self.margin.bottom);

        Rectangle::new(top_left, Size::new(width, height))
    }
}

/// Everything a frame depends on
#[derive(Debug, Clone, Copy)]
pub struct ChartInput<'a> {
    pub window: Window<'a>,
    /// Stacked layers built from `window`, bottom first
    pub layers: &'a [StackedLayer],
    /// Displayed time domain in absolute milliseconds
    pub domain: TimeRange,
    /// Whether `domain` comes from a brush selection
    pub zoomed: bool,
    /// Pointer position on the time axis
    pub hover_ms: Option<i64>,
    /// Legend entry under the pointer
    pub highlighted: Option<&'a ChannelId>,
    /// Screen columns of an in-progress brush gesture
    pub brush: Option<(i32, i32)>,
}

/// Builds scenes for a fixed layout
#[derive(Debug, Clone, Copy)]
pub struct ChartView {
    layout: ChartLayout,
}

impl ChartView {
    pub fn new(layout: ChartLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &ChartLayout {
        &self.layout
    }

    pub fn render(&self, input: &ChartInput<'_>) -> Scene {
        let plot = self.layout.plot_area();
        let mut scene = Scene::empty(self.layout.bounds, plot, COLOR_BACKGROUND);

        let Some(latest) = input.window.latest() else {
            scene.placeholder = Some(TextLabel::new(
                label(format_args!("{}", EMPTY_PLACEHOLDER)),
                plot.center(),
                Alignment::Center,
                COLOR_PLACEHOLDER,
            ));
            return scene;
        };
        let latest_ms = latest.timestamp;

        let (left, top, right, bottom) = edges(&plot);
        let x_scale = LinearScale::new(
            input.domain.relative_to(latest_ms),
            (left as f32, right as f32),
        );
        let y_scale = LinearScale::new(
            (0.0, self.layout.value_axis_max),
            (bottom as f32, top as f32),
        );
        scene.x_scale = Some(x_scale);
        scene.latest_ms = Some(latest_ms);

        let x_ticks = if input.zoomed {
            self.layout.x_ticks_zoomed
        } else {
            self.layout.x_ticks
        };
        scene.axes.push(self.time_axis(&x_scale, &plot, x_ticks));
        scene.axes.push(self.value_axis(&y_scale, &plot));

        let visible = input.domain.relative_to(latest_ms);
        scene.areas = input
            .layers
            .iter()
            .map(|layer| area(layer, visible, &x_scale, &y_scale, input.highlighted))
            .collect();

        if let Some(hover_ms) = input.hover_ms {
            self.focus(&mut scene, input, hover_ms, &x_scale, &y_scale);
        }

        scene.legend = legend(input.layers, &plot);

        if let Some((start, end)) = input.brush {
            let x0 = start.min(end).clamp(left, right);
            let x1 = start.max(end).clamp(left, right);
            scene.brush = Some(Rectangle::with_corners(
                Point::new(x0, top),
                Point::new(x1, bottom),
            ));
        }

        scene
    }

    fn time_axis(&self, scale: &LinearScale, plot: &Rectangle, count: usize) -> Axis {
        let (left, _, right, bottom) = edges(plot);
        let step = scale.tick_step(count);
        let ticks = scale
            .ticks(count)
            .into_iter()
            .map(|minutes| Tick {
                position: scale.apply(minutes) as i32,
                label: if step >= 1.0 {
                    label(format_args!("{}", minutes as i64))
                } else {
                    label(format_args!("{:.1}", minutes))
                },
            })
            .collect();

        Axis {
            orientation: AxisOrientation::Horizontal,
            origin: Point::new(left, bottom),
            length: (right - left) as u32,
            ticks,
            title: TextLabel::new(
                label(format_args!("{}", X_AXIS_TITLE)),
                Point::new((left + right) / 2, bottom + X_AXIS_TITLE_OFFSET_PX),
                Alignment::Center,
                COLOR_AXIS,
            ),
            color: COLOR_AXIS,
        }
    }

    fn value_axis(&self, scale: &LinearScale, plot: &Rectangle) -> Axis {
        let (left, top, _, bottom) = edges(plot);
        let ticks = scale
            .ticks(self.layout.y_ticks)
            .into_iter()
            .map(|watts| Tick {
                position: scale.apply(watts) as i32,
                label: label(format_args!("{}", watts)),
            })
            .collect();

        Axis {
            orientation: AxisOrientation::Vertical,
            origin: Point::new(left, bottom),
            length: (bottom - top) as u32,
            ticks,
            title: TextLabel::new(
                label(format_args!("{}", Y_AXIS_TITLE)),
                Point::new(self.layout.bounds.top_left.x + 2, top - Y_AXIS_TITLE_OFFSET_PX),
                Alignment::Left,
                COLOR_AXIS,
            ),
            color: COLOR_AXIS,
        }
    }

    /// One marker per channel at its cumulative height at the nearest sample
    fn focus(
        &self,
        scene: &mut Scene,
        input: &ChartInput<'_>,
        hover_ms: i64,
        x_scale: &LinearScale,
        y_scale: &LinearScale,
    ) {
        let Ok(sample) = NearestSampleIndex::new(input.window).nearest(hover_ms) else {
            return;
        };
        let Some(latest_ms) = scene.latest_ms else {
            return;
        };

        let minutes = (sample.timestamp - latest_ms) as f32 / MILLIS_PER_MINUTE as f32;
        let x = x_scale.apply(minutes) as i32;
        let (_, top, _, bottom) = edges(&scene.plot_area);
        scene.focus_line = Some((Point::new(x, top), Point::new(x, bottom)));

        let mut cumulative = 0.0;
        for layer in input.layers {
            let watts = sample.value_or_zero(&layer.channel);
            cumulative += watts;
            let center = Point::new(x, y_scale.apply(cumulative) as i32);
            scene.focus.push(FocusMarker {
                channel: layer.channel.clone(),
                center,
                label: TextLabel::new(
                    label(format_args!("{}W", watts)),
                    center + Point::new(FOCUS_LABEL_OFFSET_PX, 3),
                    Alignment::Left,
                    COLOR_FOCUS,
                ),
            });
        }
    }
}

/// Left, top, right and bottom pixel columns/rows inside `plot`
fn edges(plot: &Rectangle) -> (i32, i32, i32, i32) {
    let left = plot.top_left.x;
    let top = plot.top_left.y;
    let right = left + plot.size.width.saturating_sub(1) as i32;
    let bottom = top + plot.size.height.saturating_sub(1) as i32;
    (left, top, right, bottom)
}

fn area(
    layer: &StackedLayer,
    visible: (f32, f32),
    x_scale: &LinearScale,
    y_scale: &LinearScale,
    highlighted: Option<&ChannelId>,
) -> AreaElement {
    let color = channel_color(layer.color_index);
    let color = match highlighted {
        Some(channel) if *channel != layer.channel => {
            with_opacity(color, COLOR_BACKGROUND, DIMMED_LAYER_OPACITY)
        }
        _ => color,
    };

    // Keep one point past each edge so the band reaches the plot border
    let points = &layer.points;
    let minutes = |relative_ms: i64| relative_ms as f32 / MILLIS_PER_MINUTE as f32;
    let first = points
        .partition_point(|p| minutes(p.relative_ms) < visible.0)
        .saturating_sub(1);
    let last = (points.partition_point(|p| minutes(p.relative_ms) <= visible.1) + 1).min(points.len());

    let mut upper = Vec::with_capacity(last.saturating_sub(first));
    let mut lower = Vec::with_capacity(last.saturating_sub(first));
    for point in points.get(first..last).unwrap_or(&[]) {
        let x = x_scale.apply(minutes(point.relative_ms)) as i32;
        upper.push(Point::new(x, y_scale.apply(point.top) as i32));
        lower.push(Point::new(x, y_scale.apply(point.baseline) as i32));
    }

    AreaElement {
        channel: layer.channel.clone(),
        color,
        upper,
        lower,
    }
}

fn legend(layers: &[StackedLayer], plot: &Rectangle) -> Vec<LegendEntry> {
    let row_pitch = (LEGEND_SWATCH_PX + LEGEND_ROW_GAP_PX) as i32;
    let x = plot.top_left.x + LEGEND_INSET_X_PX;

    layers
        .iter()
        .enumerate()
        .map(|(row, layer)| {
            let y = plot.top_left.y + LEGEND_ROW_GAP_PX as i32 + row as i32 * row_pitch;
            let swatch = Rectangle::new(
                Point::new(x, y),
                Size::new(LEGEND_SWATCH_PX, LEGEND_SWATCH_PX),
            );
            let text = label(format_args!("{}", layer.channel));
            let text_x = x + LEGEND_SWATCH_PX as i32 + LEGEND_ROW_GAP_PX as i32;
            let text_width = text.len() as u32 * GLYPH_WIDTH_PX;
            let hit_area = Rectangle::new(
                swatch.top_left,
                Size::new(
                    LEGEND_SWATCH_PX + LEGEND_ROW_GAP_PX + text_width,
                    LEGEND_SWATCH_PX,
                ),
            );

            LegendEntry {
                channel: layer.channel.clone(),
                swatch,
                color: channel_color(layer.color_index),
                label: TextLabel::new(
                    text,
                    Point::new(text_x, y + LEGEND_SWATCH_PX as i32 - 1),
                    Alignment::Left,
                    COLOR_AXIS,
                ),
                hit_area,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::StackBuilder;
    use crate::chart::palette::CHANNEL_PALETTE;
    use crate::storage::Sample;
    use alloc::vec;

    fn samples() -> Vec<Sample> {
        vec![
            Sample::new(0).with_channel("a", 10.0).with_channel("b", 5.0),
            Sample::new(60_000)
                .with_channel("a", 12.0)
                .with_channel("b", 4.0),
            Sample::new(120_000)
                .with_channel("a", 11.0)
                .with_channel("b", 6.0),
        ]
    }

    fn channels() -> Vec<ChannelId> {
        vec![ChannelId::from("a"), ChannelId::from("b")]
    }

    fn view() -> ChartView {
        ChartView::new(ChartLayout::new(Rectangle::new(
            Point::zero(),
            Size::new(320, 240),
        )))
    }

    fn render(hover_ms: Option<i64>, highlighted: Option<&ChannelId>) -> Scene {
        let data = samples();
        let channels = channels();
        let window = Window::new(&data);
        let layers = StackBuilder::new(&channels).build(&window);
        let input = ChartInput {
            window,
            layers: &layers,
            domain: TimeRange::spanning(0, 120_000),
            zoomed: false,
            hover_ms,
            highlighted,
            brush: None,
        };
        view().render(&input)
    }

    #[test]
    fn test_plot_area_respects_margins() {
        let layout = ChartLayout::new(Rectangle::new(Point::new(10, 10), Size::new(200, 100)))
            .with_margin(ChartMargin::uniform(10));
        assert_eq!(
            layout.plot_area(),
            Rectangle::new(Point::new(20, 20), Size::new(180, 80))
        );
    }

    #[test]
    fn test_long_channel_name_is_truncated_in_legend() {
        let name = "Living room entertainment center + TV";
        let data = vec![Sample::new(0).with_channel(name, 10.0)];
        let channels = vec![ChannelId::from(name)];
        let window = Window::new(&data);
        let layers = StackBuilder::new(&channels).build(&window);
        let input = ChartInput {
            window,
            layers: &layers,
            domain: TimeRange::spanning(0, 60_000),
            zoomed: false,
            hover_ms: None,
            highlighted: None,
            brush: None,
        };
        let scene = view().render(&input);
        assert_eq!(
            scene.legend[0].label.text.as_str(),
            "Living room entertainment center"
        );
    }

    #[test]
    fn test_empty_window_renders_placeholder() {
        let input = ChartInput {
            window: Window::new(&[]),
            layers: &[],
            domain: TimeRange::spanning(0, 1),
            zoomed: false,
            hover_ms: Some(0),
            highlighted: None,
            brush: None,
        };
        let scene = view().render(&input);

        assert!(scene.is_placeholder());
        assert!(scene.areas.is_empty());
        assert!(scene.axes.is_empty());
        assert_eq!(
            scene.placeholder.unwrap().text.as_str(),
            EMPTY_PLACEHOLDER
        );
    }

    #[test]
    fn test_areas_span_domain_and_stack() {
        let scene = render(None, None);
        let plot = scene.plot_area;
        let (left, _, right, bottom) = edges(&plot);

        assert_eq!(scene.areas.len(), 2);
        let bottom_layer = &scene.areas[0];
        assert_eq!(bottom_layer.upper.len(), 3);
        assert_eq!(bottom_layer.upper[0].x, left);
        assert_eq!(bottom_layer.upper[2].x, right);
        assert!(bottom_layer.lower.iter().all(|p| p.y == bottom));

        // The second layer rests on the first
        assert_eq!(scene.areas[1].lower, bottom_layer.upper);
        assert_eq!(scene.areas[0].color, CHANNEL_PALETTE[0]);
        assert_eq!(scene.areas[1].color, CHANNEL_PALETTE[1]);
    }

    #[test]
    fn test_axes_and_titles() {
        let scene = render(None, None);
        let time = &scene.axes[0];
        let value = &scene.axes[1];

        assert_eq!(time.title.text.as_str(), X_AXIS_TITLE);
        assert_eq!(value.title.text.as_str(), Y_AXIS_TITLE);

        let labels: Vec<&str> = value.ticks.iter().map(|t| t.label.as_str()).collect();
        assert_eq!(labels.first(), Some(&"0"));
        assert_eq!(labels.last(), Some(&"100"));
        assert_eq!(labels.len(), 11);

        // Two minutes of data get sub-minute steps
        assert!(time.ticks.iter().any(|t| t.label.as_str() == "-2.0"));
        assert!(time.ticks.iter().any(|t| t.label.as_str() == "0.0"));
    }

    #[test]
    fn test_hover_places_markers_at_cumulative_height() {
        let scene = render(Some(70_000), None);
        assert_eq!(scene.focus.len(), 2);

        let labels: Vec<&str> = scene.focus.iter().map(|m| m.label.text.as_str()).collect();
        assert_eq!(labels, vec!["12W", "4W"]);

        let upper = &scene.areas[1].upper[1];
        assert_eq!(scene.focus[1].center, *upper);
        assert!(scene.focus_line.is_some());
    }

    #[test]
    fn test_legend_highlight_dims_other_layers() {
        let highlighted = ChannelId::from("b");
        let scene = render(None, Some(&highlighted));

        assert_ne!(scene.areas[0].color, CHANNEL_PALETTE[0]);
        assert_eq!(scene.areas[1].color, CHANNEL_PALETTE[1]);
        assert_eq!(scene.legend.len(), 2);
        assert_eq!(scene.legend[1].swatch.top_left.y - scene.legend[0].swatch.top_left.y, 15);

        let inside = scene.legend[1].swatch.center();
        assert_eq!(scene.legend_hit(inside), Some(&highlighted));
    }

    #[test]
    fn test_brush_is_normalized_and_clamped() {
        let data = samples();
        let channels = channels();
        let window = Window::new(&data);
        let layers = StackBuilder::new(&channels).build(&window);
        let input = ChartInput {
            window,
            layers: &layers,
            domain: TimeRange::spanning(0, 120_000),
            zoomed: false,
            hover_ms: None,
            highlighted: None,
            brush: Some((200, -50)),
        };
        let scene = view().render(&input);

        let brush = scene.brush.unwrap();
        assert_eq!(brush.top_left.x, scene.plot_area.top_left.x);
        assert_eq!(brush.bottom_right().map(|p| p.x), Some(200));
    }

    #[test]
    fn test_zoomed_domain_trims_points() {
        let data: Vec<Sample> = (0..60)
            .map(|minute| Sample::new(minute * MILLIS_PER_MINUTE).with_channel("a", 1.0))
            .collect();
        let channels = vec![ChannelId::from("a")];
        let window = Window::new(&data);
        let layers = StackBuilder::new(&channels).build(&window);
        let input = ChartInput {
            window,
            layers: &layers,
            domain: TimeRange::spanning(10 * MILLIS_PER_MINUTE, 20 * MILLIS_PER_MINUTE),
            zoomed: true,
            hover_ms: None,
            highlighted: None,
            brush: None,
        };
        let scene = view().render(&input);

        // Minutes 9..=21
        assert_eq!(scene.areas[0].upper.len(), 13);
        assert!(scene.axes[0].ticks.len() <= 6);
    }
}
