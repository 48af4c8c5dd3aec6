//! Cumulative per-channel layers
//!
//! Channel order is stacking order: the first channel sits on the time axis,
//! each following one rests on the sum of those below it.

extern crate alloc;
use alloc::vec::Vec;

use crate::storage::{ChannelId, Window};

/// One band of a stacked layer at a single sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StackedPoint {
    /// Offset from the window's latest sample in milliseconds (<= 0)
    pub relative_ms: i64,
    /// Sum of every lower channel
    pub baseline: f32,
    /// `baseline` plus this channel's value
    pub top: f32,
}

impl StackedPoint {
    /// The channel's own contribution
    pub fn value(&self) -> f32 {
        self.top - self.baseline
    }
}

/// Stacked series for one channel
#[derive(Debug, Clone, PartialEq)]
pub struct StackedLayer {
    pub channel: ChannelId,
    /// Position in the stacking order, also the palette index
    pub color_index: usize,
    pub points: Vec<StackedPoint>,
}

/// Builds stacked layers for a fixed channel ordering
#[derive(Debug, Clone, Copy)]
pub struct StackBuilder<'a> {
    channels: &'a [ChannelId],
}

impl<'a> StackBuilder<'a> {
    pub fn new(channels: &'a [ChannelId]) -> Self {
        Self { channels }
    }

    /// Stack every sample in the window, bottom layer first.
    ///
    /// An empty window yields layers without points.
    pub fn build(&self, window: &Window<'_>) -> Vec<StackedLayer> {
        let mut layers: Vec<StackedLayer> = self
            .channels
            .iter()
            .enumerate()
            .map(|(color_index, channel)| StackedLayer {
                channel: channel.clone(),
                color_index,
                points: Vec::with_capacity(window.len()),
            })
            .collect();

        let Some(latest) = window.latest().map(|sample| sample.timestamp) else {
            return layers;
        };

        for sample in window.samples() {
            let relative_ms = sample.timestamp - latest;
            let mut baseline = 0.0;
            for layer in layers.iter_mut() {
                let top = baseline + sample.value_or_zero(&layer.channel);
                layer.points.push(StackedPoint {
                    relative_ms,
                    baseline,
                    top,
                });
                baseline = top;
            }
        }

        layers
    }
}
