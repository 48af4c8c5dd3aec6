//! Brush-driven zoom of the time axis
//!
//! A brush gesture produces a pixel range on the plot. A usable range becomes
//! the displayed domain; a cleared or degenerate one schedules a reset back to
//! the full extent once the pointer has been idle for a while. Both changes
//! are animated.

use embassy_time::{Duration, Instant};
use log::{debug, info};

use crate::chart::{Scene, TimeRange};

/// Delay before a cleared selection resets the zoom
pub const DEFAULT_IDLE_RESET_MS: u64 = 350;

/// Length of a domain transition
pub const DEFAULT_TRANSITION_MS: u64 = 1000;

/// Redraw interval while a transition runs
pub const TRANSITION_FRAME_MS: u64 = 33;

/// Cancellable one-shot deadline
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IdleReset {
    deadline: Option<Instant>,
}

impl IdleReset {
    pub const fn new() -> Self {
        Self { deadline: None }
    }

    /// Schedule (or reschedule) the reset `idle` after `now`
    pub fn arm(&mut self, now: Instant, idle: Duration) {
        self.deadline = Some(now + idle);
    }

    /// Drop a pending reset; returns whether one was pending
    pub fn cancel(&mut self) -> bool {
        self.deadline.take().is_some()
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Fire once the deadline has passed. Firing disarms.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

/// Animated change of the displayed domain
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DomainTransition {
    from: TimeRange,
    to: TimeRange,
    started: Instant,
    duration: Duration,
}

impl DomainTransition {
    pub fn new(from: TimeRange, to: TimeRange, started: Instant, duration: Duration) -> Self {
        Self {
            from,
            to,
            started,
            duration,
        }
    }

    pub fn target(&self) -> TimeRange {
        self.to
    }

    /// Progress in `0.0..=1.0`, before easing
    pub fn progress(&self, now: Instant) -> f32 {
        let total = self.duration.as_millis();
        if total == 0 {
            return 1.0;
        }
        let elapsed = now.saturating_duration_since(self.started).as_millis();
        (elapsed as f32 / total as f32).min(1.0)
    }

    /// Domain shown at `now`
    pub fn at(&self, now: Instant) -> TimeRange {
        self.from.lerp(&self.to, ease_cubic_in_out(self.progress(now)))
    }

    pub fn is_finished(&self, now: Instant) -> bool {
        self.progress(now) >= 1.0
    }
}

/// Cubic ease-in-out over `0.0..=1.0`
pub fn ease_cubic_in_out(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        let u = 2.0 * t - 2.0;
        0.5 * u * u * u + 1.0
    }
}

/// Screen columns covered by a brush gesture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrushSelection {
    pub start_x: i32,
    pub end_x: i32,
}

impl BrushSelection {
    pub const fn new(start_x: i32, end_x: i32) -> Self {
        Self { start_x, end_x }
    }

    /// Left and right columns regardless of drag direction
    pub fn normalized(&self) -> (i32, i32) {
        (self.start_x.min(self.end_x), self.start_x.max(self.end_x))
    }

    pub fn width(&self) -> u32 {
        self.start_x.abs_diff(self.end_x)
    }
}

/// Owns the selected domain, the idle reset and the running transition
#[derive(Debug, Clone)]
pub struct ZoomController {
    selected: Option<TimeRange>,
    reset: IdleReset,
    transition: Option<DomainTransition>,
    idle: Duration,
    transition_duration: Duration,
}

impl Default for ZoomController {
    fn default() -> Self {
        Self::new(
            Duration::from_millis(DEFAULT_IDLE_RESET_MS),
            Duration::from_millis(DEFAULT_TRANSITION_MS),
        )
    }
}

impl ZoomController {
    pub fn new(idle: Duration, transition_duration: Duration) -> Self {
        Self {
            selected: None,
            reset: IdleReset::new(),
            transition: None,
            idle,
            transition_duration,
        }
    }

    /// The domain picked by the last brush selection, if any
    pub fn selected(&self) -> Option<TimeRange> {
        self.selected
    }

    pub fn is_zoomed(&self) -> bool {
        self.selected.is_some()
    }

    pub fn reset_pending(&self) -> bool {
        self.reset.is_armed()
    }

    pub fn is_animating(&self) -> bool {
        self.transition.is_some()
    }

    /// A new gesture began; any pending reset is cancelled
    pub fn on_brush_start(&mut self) {
        if self.reset.cancel() {
            debug!("Zoom reset cancelled by new selection");
        }
    }

    /// A gesture ended with `selection` (or was cleared).
    ///
    /// The selection is inverted through the horizontal scale of `scene`.
    /// Returns true when the displayed domain starts changing.
    pub fn on_select(
        &mut self,
        selection: Option<BrushSelection>,
        scene: &Scene,
        full: Option<TimeRange>,
        now: Instant,
    ) -> bool {
        let Some(range) = selection.and_then(|selection| invert(selection, scene)) else {
            self.reset.arm(now, self.idle);
            debug!("Selection cleared, zoom reset armed");
            return false;
        };

        self.reset.cancel();
        let from = full.map(|full| self.displayed_domain(full, now));
        self.selected = Some(range);
        if let Some(from) = from {
            self.transition = Some(DomainTransition::new(
                from,
                range,
                now,
                self.transition_duration,
            ));
        }
        info!(
            "Zoomed to {} ms .. {} ms ({} s)",
            range.start_ms,
            range.end_ms,
            range.span_ms() / 1000
        );
        true
    }

    /// Advance timers; returns true when a redraw is due
    pub fn tick(&mut self, now: Instant, full: Option<TimeRange>) -> bool {
        if self.reset.poll(now) {
            info!("Zoom reset to full extent");
            let from = full.map(|full| self.displayed_domain(full, now));
            self.selected = None;
            self.transition = match (from, full) {
                (Some(from), Some(to)) => Some(DomainTransition::new(
                    from,
                    to,
                    now,
                    self.transition_duration,
                )),
                _ => None,
            };
            return true;
        }

        match self.transition {
            Some(transition) => {
                if transition.is_finished(now) {
                    self.transition = None;
                }
                true
            }
            None => false,
        }
    }

    /// Drop zoom, pending reset and transition at once
    pub fn clear(&mut self) {
        self.selected = None;
        self.reset.cancel();
        self.transition = None;
    }

    /// Domain to display at `now` given the full extent of the data
    pub fn displayed_domain(&self, full: TimeRange, now: Instant) -> TimeRange {
        match (&self.transition, self.selected) {
            (Some(transition), _) if !transition.is_finished(now) => transition.at(now),
            (_, Some(selected)) => selected,
            _ => full,
        }
    }

    /// Next instant the controller needs attention
    pub fn next_deadline(&self, now: Instant) -> Option<Instant> {
        let frame = self
            .transition
            .map(|_| now + Duration::from_millis(TRANSITION_FRAME_MS));
        match (self.reset.deadline(), frame) {
            (Some(reset), Some(frame)) => Some(reset.min(frame)),
            (reset, frame) => reset.or(frame),
        }
    }
}

fn invert(selection: BrushSelection, scene: &Scene) -> Option<TimeRange> {
    let (left, right) = selection.normalized();
    let (left, right) = (scene.clamp_to_plot(left), scene.clamp_to_plot(right));
    if left == right {
        return None;
    }
    let start = scene.time_at(left)?;
    let end = scene.time_at(right)?;
    TimeRange::new(start, end).ok()
}
