//! Chart colors
//!
//! RGB565 format: R(5 bits), G(6 bits), B(5 bits).
//! Convert from 8-bit RGB: R>>3, G>>2, B>>3

use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;

/// Channel colors, assigned by channel index and cycled past the end
pub const CHANNEL_PALETTE: [Rgb565; 6] = [
    Rgb565::new(180 >> 3, 77 >> 2, 100 >> 3),  // #B44D64
    Rgb565::new(251 >> 3, 148 >> 2, 107 >> 3), // #FB946B
    Rgb565::new(255 >> 3, 188 >> 2, 114 >> 3), // #FFBC72
    Rgb565::new(242 >> 3, 217 >> 2, 177 >> 3), // #F2D9B1
    Rgb565::new(16 >> 3, 31 >> 2, 92 >> 3),    // #101F5C
    Rgb565::new(49 >> 3, 108 >> 2, 166 >> 3),  // #316CA6
];

/// Chart background
pub const COLOR_BACKGROUND: Rgb565 = Rgb565::WHITE;

/// Axis lines, ticks and tick labels
pub const COLOR_AXIS: Rgb565 = Rgb565::BLACK;

/// Focus markers and their labels
pub const COLOR_FOCUS: Rgb565 = Rgb565::BLACK;

/// In-progress brush selection
pub const COLOR_BRUSH: Rgb565 = Rgb565::new(119 >> 3, 119 >> 2, 119 >> 3);

/// Placeholder text for an empty chart
pub const COLOR_PLACEHOLDER: Rgb565 = Rgb565::new(16, 32, 16);

/// Color of the channel at `index` in the stacking order
pub const fn channel_color(index: usize) -> Rgb565 {
    CHANNEL_PALETTE[index % CHANNEL_PALETTE.len()]
}

/// Blend `color` over `background` with the given opacity (255 = opaque)
pub fn with_opacity(color: Rgb565, background: Rgb565, opacity: u8) -> Rgb565 {
    if opacity == u8::MAX {
        return color;
    }
    lerp_color(background, color, opacity as f32 / 255.0)
}

fn lerp_color(start: Rgb565, end: Rgb565, t: f32) -> Rgb565 {
    let t = t.clamp(0.0, 1.0);
    let (r0, g0, b0) = rgb565_to_rgb888(start);
    let (r1, g1, b1) = rgb565_to_rgb888(end);

    let r = r0 as f32 + (r1 as f32 - r0 as f32) * t;
    let g = g0 as f32 + (g1 as f32 - g0 as f32) * t;
    let b = b0 as f32 + (b1 as f32 - b0 as f32) * t;

    rgb888_to_rgb565(r as u8, g as u8, b as u8)
}

fn rgb565_to_rgb888(color: Rgb565) -> (u8, u8, u8) {
    let raw = color.into_storage();
    let r5 = ((raw >> 11) & 0x1f) as u8;
    let g6 = ((raw >> 5) & 0x3f) as u8;
    let b5 = (raw & 0x1f) as u8;

    let r8 = (r5 << 3) | (r5 >> 2);
    let g8 = (g6 << 2) | (g6 >> 4);
    let b8 = (b5 << 3) | (b5 >> 2);

    (r8, g8, b8)
}

fn rgb888_to_rgb565(r8: u8, g8: u8, b8: u8) -> Rgb565 {
    Rgb565::new(r8 >> 3, g8 >> 2, b8 >> 3)
}
