//! Scene rendering onto embedded-graphics targets

use embedded_graphics::mono_font::{MonoTextStyle, ascii::FONT_6X10};
use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{Circle, Line, PrimitiveStyle};
use embedded_graphics::text::{Alignment, Text};

use super::constants::{FOCUS_MARKER_RADIUS_PX, TICK_LABEL_GAP_PX, TICK_LENGTH_PX};
use super::palette::{COLOR_BRUSH, COLOR_FOCUS};
use super::scene::{AreaElement, Axis, AxisOrientation, Scene, TextLabel};

/// Approximate cap height of the label font, used to center text on ticks
const FONT_ASCENT_PX: i32 = 7;

impl Scene {
    /// Draw the whole scene, background first
    pub fn draw<D: DrawTarget<Color = Rgb565>>(&self, display: &mut D) -> Result<(), D::Error> {
        self.bounds
            .into_styled(PrimitiveStyle::with_fill(self.background))
            .draw(display)?;

        if let Some(placeholder) = &self.placeholder {
            draw_text(placeholder, display)?;
            return Ok(());
        }

        {
            let mut plot = display.clipped(&self.plot_area);
            for area in &self.areas {
                draw_area(area, &mut plot)?;
            }

            if let Some(brush) = self.brush {
                brush
                    .into_styled(PrimitiveStyle::with_stroke(COLOR_BRUSH, 1))
                    .draw(&mut plot)?;
            }

            if let Some((from, to)) = self.focus_line {
                Line::new(from, to)
                    .into_styled(PrimitiveStyle::with_stroke(COLOR_BRUSH, 1))
                    .draw(&mut plot)?;
            }
        }

        for axis in &self.axes {
            draw_axis(axis, display)?;
        }

        for marker in &self.focus {
            Circle::with_center(marker.center, FOCUS_MARKER_RADIUS_PX * 2 + 1)
                .into_styled(PrimitiveStyle::with_stroke(COLOR_FOCUS, 1))
                .draw(display)?;
            draw_text(&marker.label, display)?;
        }

        for entry in &self.legend {
            entry
                .swatch
                .into_styled(PrimitiveStyle::with_fill(entry.color))
                .draw(display)?;
            draw_text(&entry.label, display)?;
        }

        Ok(())
    }
}

/// Fill a band column by column between its upper and lower edges
fn draw_area<D: DrawTarget<Color = Rgb565>>(
    area: &AreaElement,
    display: &mut D,
) -> Result<(), D::Error> {
    let style = PrimitiveStyle::with_stroke(area.color, 1);

    if let ([upper], [lower]) = (area.upper.as_slice(), area.lower.as_slice()) {
        return Line::new(*upper, *lower).into_styled(style).draw(display);
    }

    for (upper, lower) in area.upper.windows(2).zip(area.lower.windows(2)) {
        let (x0, x1) = (upper[0].x, upper[1].x);
        let dx = (x1 - x0).max(1) as f32;

        for x in x0.min(x1)..=x0.max(x1) {
            let t = (x - x0) as f32 / dx;
            let y_upper = upper[0].y + ((upper[1].y - upper[0].y) as f32 * t) as i32;
            let y_lower = lower[0].y + ((lower[1].y - lower[0].y) as f32 * t) as i32;
            if y_lower > y_upper {
                Line::new(Point::new(x, y_upper), Point::new(x, y_lower))
                    .into_styled(style)
                    .draw(display)?;
            }
        }
    }

    Ok(())
}

fn draw_axis<D: DrawTarget<Color = Rgb565>>(axis: &Axis, display: &mut D) -> Result<(), D::Error> {
    let line_style = PrimitiveStyle::with_stroke(axis.color, 1);
    let text_style = MonoTextStyle::new(&FONT_6X10, axis.color);

    Line::new(axis.origin, axis.end())
        .into_styled(line_style)
        .draw(display)?;

    for tick in &axis.ticks {
        match axis.orientation {
            AxisOrientation::Horizontal => {
                let x = tick.position;
                let y = axis.origin.y;
                Line::new(Point::new(x, y), Point::new(x, y + TICK_LENGTH_PX))
                    .into_styled(line_style)
                    .draw(display)?;
                let label_y = y + TICK_LENGTH_PX + TICK_LABEL_GAP_PX + FONT_ASCENT_PX;
                Text::with_alignment(
                    &tick.label,
                    Point::new(x, label_y),
                    text_style,
                    Alignment::Center,
                )
                .draw(display)?;
            }
            AxisOrientation::Vertical => {
                let x = axis.origin.x;
                let y = tick.position;
                Line::new(Point::new(x - TICK_LENGTH_PX, y), Point::new(x, y))
                    .into_styled(line_style)
                    .draw(display)?;
                let label_x = x - TICK_LENGTH_PX - TICK_LABEL_GAP_PX;
                Text::with_alignment(
                    &tick.label,
                    Point::new(label_x, y + FONT_ASCENT_PX / 2),
                    text_style,
                    Alignment::Right,
                )
                .draw(display)?;
            }
        }
    }

    draw_text(&axis.title, display)
}

fn draw_text<D: DrawTarget<Color = Rgb565>>(
    label: &TextLabel,
    display: &mut D,
) -> Result<(), D::Error> {
    let style = MonoTextStyle::new(&FONT_6X10, label.color);
    Text::with_alignment(&label.text, label.position, style, label.alignment).draw(display)?;
    Ok(())
}
