//! Dashboard task
//!
//! Owns the view state and the current scene. Work arrives as
//! [`DashboardRequest`]s over a channel: data updates from the poll task and
//! pointer/duration input from the UI. Every handled request that changes
//! what is shown rebuilds the scene from the store.

use embassy_futures::select::{Either, select};
use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::channel::{Channel, Receiver};
use embassy_time::{Instant, Timer};
use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;
use log::{debug, error, info, warn};

use crate::chart::{ChartInput, ChartLayout, ChartView, Scene, StackBuilder, TimeRange};
use crate::storage::{ChannelId, RetentionWindow, SharedStore};
use crate::zoom::{BrushSelection, ZoomController};

/// Capacity of the dashboard request queue
pub const DASHBOARD_QUEUE_CAPACITY: usize = 8;

/// Request queue feeding [`Dashboard::run`]
pub type DashboardChannel<M> = Channel<M, DashboardRequest, DASHBOARD_QUEUE_CAPACITY>;

/// Work for the dashboard task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DashboardRequest {
    /// The store received new samples
    DataUpdated,
    /// The duration control picked a new number of hours
    SetRetention(u32),
    /// Pointer moved (not dragging)
    PointerMove(Point),
    /// Pointer left the chart
    PointerLeave,
    /// A brush drag started at this point
    BrushStart(Point),
    BrushMove(Point),
    BrushEnd(Point),
    /// Force a redraw of the current scene
    Redraw,
    /// Stop [`Dashboard::run`]
    Shutdown,
}

impl DashboardRequest {
    /// Pointer motion, where only the latest position matters
    pub fn is_motion(&self) -> bool {
        matches!(self, Self::PointerMove(_) | Self::BrushMove(_))
    }
}

/// Collapses runs of pointer motion into their last position.
///
/// Input sources can emit far more motion events per frame than the request
/// queue holds; coalescing them keeps room for gesture boundaries such as
/// [`DashboardRequest::BrushEnd`].
#[derive(Debug, Default)]
pub struct MotionCoalescer {
    pending: Option<DashboardRequest>,
}

impl MotionCoalescer {
    pub const fn new() -> Self {
        Self { pending: None }
    }

    /// Feed one request; returns the requests ready to send, in order
    pub fn push(&mut self, request: DashboardRequest) -> [Option<DashboardRequest>; 2] {
        if request.is_motion() {
            self.pending = Some(request);
            [None, None]
        } else {
            [self.pending.take(), Some(request)]
        }
    }

    /// Release the motion held back from the current run
    pub fn flush(&mut self) -> Option<DashboardRequest> {
        self.pending.take()
    }
}

/// Interactive state, owned by the dashboard alone
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewState {
    /// Domain of the last built scene
    pub domain: Option<TimeRange>,
    /// Displayed duration
    pub retention: RetentionWindow,
    /// Pointer position on the time axis
    pub hover_ms: Option<i64>,
    /// Legend entry under the pointer
    pub highlighted: Option<ChannelId>,
    /// In-progress brush gesture
    pub brush: Option<BrushSelection>,
}

pub struct Dashboard<'s, M: RawMutex> {
    store: &'s SharedStore<M>,
    view: ChartView,
    zoom: ZoomController,
    state: ViewState,
    scene: Scene,
    needs_redraw: bool,
}

impl<'s, M: RawMutex> Dashboard<'s, M> {
    pub fn new(store: &'s SharedStore<M>, layout: ChartLayout, zoom: ZoomController) -> Self {
        let view = ChartView::new(layout);
        let scene = Scene::empty(
            layout.bounds,
            layout.plot_area(),
            crate::chart::palette::COLOR_BACKGROUND,
        );

        Self {
            store,
            view,
            zoom,
            state: ViewState::default(),
            scene,
            needs_redraw: true,
        }
    }

    /// Start with a displayed duration other than the default
    pub fn with_retention(mut self, retention: RetentionWindow) -> Self {
        self.state.retention = retention;
        self
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn zoom(&self) -> &ZoomController {
        &self.zoom
    }

    pub fn needs_redraw(&self) -> bool {
        self.needs_redraw
    }

    /// Apply one request at `now`
    pub fn handle(&mut self, request: DashboardRequest, now: Instant) {
        let changed = match request {
            DashboardRequest::DataUpdated => true,
            DashboardRequest::SetRetention(hours) => self.set_retention(hours),
            DashboardRequest::PointerMove(point) => self.pointer_move(point),
            DashboardRequest::PointerLeave => {
                let changed = self.state.hover_ms.is_some() || self.state.highlighted.is_some();
                self.state.hover_ms = None;
                self.state.highlighted = None;
                changed
            }
            DashboardRequest::BrushStart(point) => {
                if !self.scene.in_plot(point) {
                    return;
                }
                self.zoom.on_brush_start();
                self.state.brush = Some(BrushSelection::new(point.x, point.x));
                true
            }
            DashboardRequest::BrushMove(point) => match self.state.brush.as_mut() {
                Some(brush) => {
                    brush.end_x = point.x;
                    true
                }
                None => false,
            },
            DashboardRequest::BrushEnd(point) => {
                let Some(mut brush) = self.state.brush.take() else {
                    return;
                };
                brush.end_x = point.x;
                let selection = (brush.width() > 0).then_some(brush);
                let full = self.full_extent();
                self.zoom.on_select(selection, &self.scene, full, now);
                true
            }
            DashboardRequest::Redraw => {
                self.needs_redraw = true;
                false
            }
            DashboardRequest::Shutdown => false,
        };

        if changed {
            self.rebuild(now);
        }
    }

    /// Advance the idle reset and any running transition
    pub fn tick(&mut self, now: Instant) {
        let full = self.full_extent();
        if self.zoom.tick(now, full) {
            self.rebuild(now);
        }
    }

    /// Next instant [`Self::tick`] has work to do
    pub fn next_deadline(&self, now: Instant) -> Option<Instant> {
        self.zoom.next_deadline(now)
    }

    /// Rebuild the scene from the store and the view state
    pub fn rebuild(&mut self, now: Instant) {
        let retention = self.state.retention;
        let zoom = &self.zoom;
        let state = &self.state;
        let view = &self.view;

        let (scene, domain) = self.store.lock(|cell| {
            let store = cell.borrow();
            let window = store.window(retention);
            let layers = StackBuilder::new(store.channels()).build(&window);

            let domain = window
                .extent()
                .map(|(start, end)| zoom.displayed_domain(TimeRange::spanning(start, end), now));

            let input = ChartInput {
                window,
                layers: &layers,
                domain: domain.unwrap_or(TimeRange::spanning(0, 0)),
                zoomed: zoom.is_zoomed(),
                hover_ms: state.hover_ms,
                highlighted: state.highlighted.as_ref(),
                brush: state.brush.map(|b| (b.start_x, b.end_x)),
            };
            (view.render(&input), domain)
        });

        self.scene = scene;
        self.state.domain = domain;
        self.needs_redraw = true;
    }

    /// Draw the scene if anything changed since the last draw.
    ///
    /// Returns whether the display was touched.
    pub fn draw<D>(&mut self, display: &mut D) -> Result<bool, D::Error>
    where
        D: DrawTarget<Color = Rgb565>,
    {
        if !self.needs_redraw {
            return Ok(false);
        }
        self.scene.draw(display)?;
        self.needs_redraw = false;
        Ok(true)
    }

    /// Process requests until [`DashboardRequest::Shutdown`] arrives
    pub async fn run<D, const N: usize>(
        &mut self,
        display: &mut D,
        receiver: Receiver<'_, M, DashboardRequest, N>,
    ) where
        D: DrawTarget<Color = Rgb565>,
        D::Error: core::fmt::Debug,
    {
        info!("Dashboard task started");
        self.rebuild(Instant::now());
        if let Err(e) = self.draw(display) {
            error!("Dashboard render error: {:?}", e);
        }

        loop {
            let request = match self.next_deadline(Instant::now()) {
                Some(deadline) => match select(receiver.receive(), Timer::at(deadline)).await {
                    Either::First(request) => Some(request),
                    Either::Second(()) => None,
                },
                None => Some(receiver.receive().await),
            };

            let now = Instant::now();
            match request {
                Some(DashboardRequest::Shutdown) => break,
                Some(request) => self.handle(request, now),
                None => {}
            }
            self.tick(now);

            if let Err(e) = self.draw(display) {
                error!("Dashboard render error: {:?}", e);
            }
        }

        info!("Dashboard task stopped");
    }

    fn set_retention(&mut self, hours: u32) -> bool {
        let Some(retention) = RetentionWindow::from_hours(hours) else {
            warn!("Ignoring out-of-range duration of {} hours", hours);
            return false;
        };
        if retention == self.state.retention {
            return false;
        }

        info!("Displayed duration set to {}", retention);
        self.state.retention = retention;
        self.state.brush = None;
        self.zoom.clear();
        true
    }

    fn pointer_move(&mut self, point: Point) -> bool {
        let highlighted = self.scene.legend_hit(point).cloned();
        let hover_ms = if highlighted.is_none() && self.scene.in_plot(point) {
            self.scene.time_at(point.x)
        } else {
            None
        };

        if highlighted == self.state.highlighted && hover_ms == self.state.hover_ms {
            return false;
        }
        if highlighted != self.state.highlighted {
            debug!("Legend highlight: {:?}", highlighted);
        }
        self.state.highlighted = highlighted;
        self.state.hover_ms = hover_ms;
        true
    }

    fn full_extent(&self) -> Option<TimeRange> {
        let retention = self.state.retention;
        self.store.lock(|cell| {
            cell.borrow()
                .window(retention)
                .extent()
                .map(|(start, end)| TimeRange::spanning(start, end))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use alloc::vec::Vec;
    use core::cell::RefCell;
    use core::convert::Infallible;
    use embassy_futures::block_on;
    use embassy_sync::blocking_mutex::Mutex;
    use embassy_sync::blocking_mutex::raw::NoopRawMutex;
    use embedded_graphics::primitives::Rectangle;

    use crate::storage::{MILLIS_PER_HOUR, MILLIS_PER_MINUTE, Sample, SampleStore};

    /// Counts how many frames were drawn
    struct FrameCounter {
        pixels: usize,
    }

    impl OriginDimensions for FrameCounter {
        fn size(&self) -> Size {
            Size::new(320, 240)
        }
    }

    impl DrawTarget for FrameCounter {
        type Color = Rgb565;
        type Error = Infallible;

        fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
        where
            I: IntoIterator<Item = Pixel<Self::Color>>,
        {
            self.pixels += pixels.into_iter().count();
            Ok(())
        }
    }

    /// One sample per minute over a full day
    fn day_of_samples() -> SharedStore<NoopRawMutex> {
        let mut store = SampleStore::new();
        store.append((0..=24 * 60).map(|minute| {
            Sample::new(minute * MILLIS_PER_MINUTE)
                .with_channel("Desk", 20.0)
                .with_channel("Fridge", 35.0)
        }));
        Mutex::new(RefCell::new(store))
    }

    fn layout() -> ChartLayout {
        ChartLayout::new(Rectangle::new(Point::zero(), Size::new(320, 240)))
    }

    fn at(ms: u64) -> Instant {
        Instant::from_millis(ms)
    }

    const DAY: i64 = 24 * MILLIS_PER_HOUR;

    #[test]
    fn test_default_shows_last_hour() {
        let store = day_of_samples();
        let mut dashboard = Dashboard::new(&store, layout(), ZoomController::default());
        dashboard.rebuild(at(0));

        assert_eq!(
            dashboard.state().domain,
            Some(TimeRange::spanning(DAY - MILLIS_PER_HOUR, DAY))
        );
        assert_eq!(dashboard.scene().areas.len(), 2);
    }

    #[test]
    fn test_duration_change_redraws_without_fetch() {
        let store = day_of_samples();
        let mut dashboard = Dashboard::new(&store, layout(), ZoomController::default());
        dashboard.rebuild(at(0));

        dashboard.handle(DashboardRequest::SetRetention(6), at(10));

        assert_eq!(dashboard.state().retention.hours(), 6);
        assert_eq!(
            dashboard.state().domain,
            Some(TimeRange::spanning(DAY - 6 * MILLIS_PER_HOUR, DAY))
        );
        assert_eq!(store.lock(|cell| cell.borrow().len()), 24 * 60 + 1);
    }

    #[test]
    fn test_out_of_range_duration_is_ignored() {
        let store = day_of_samples();
        let mut dashboard = Dashboard::new(&store, layout(), ZoomController::default());
        dashboard.rebuild(at(0));

        dashboard.handle(DashboardRequest::SetRetention(0), at(1));
        dashboard.handle(DashboardRequest::SetRetention(25), at(2));
        assert_eq!(dashboard.state().retention, RetentionWindow::ONE_HOUR);
    }

    #[test]
    fn test_brush_zooms_and_data_update_keeps_zoom() {
        let store = day_of_samples();
        let mut dashboard = Dashboard::new(&store, layout(), ZoomController::default());
        dashboard.rebuild(at(0));

        let plot = dashboard.scene().plot_area;
        let y = plot.center().y;
        let left = plot.top_left.x + 10;
        let right = plot.top_left.x + 100;

        dashboard.handle(DashboardRequest::BrushStart(Point::new(left, y)), at(0));
        dashboard.handle(DashboardRequest::BrushMove(Point::new(right, y)), at(10));
        assert!(dashboard.scene().brush.is_some());
        dashboard.handle(DashboardRequest::BrushEnd(Point::new(right, y)), at(20));

        assert!(dashboard.zoom().is_zoomed());
        assert!(dashboard.scene().brush.is_none());

        dashboard.tick(at(2000));
        let zoomed = dashboard.state().domain.unwrap();
        assert!(zoomed.span_ms() < MILLIS_PER_HOUR);

        store.lock(|cell| {
            cell.borrow_mut()
                .append([Sample::new(DAY + MILLIS_PER_MINUTE).with_channel("Desk", 1.0)])
        });
        dashboard.handle(DashboardRequest::DataUpdated, at(2100));
        assert_eq!(dashboard.state().domain, Some(zoomed));
    }

    #[test]
    fn test_release_in_margin_zooms_to_plot_edge() {
        let store = day_of_samples();
        let mut dashboard = Dashboard::new(&store, layout(), ZoomController::default());
        dashboard.rebuild(at(0));

        let plot = dashboard.scene().plot_area;
        let y = plot.center().y;
        let start = Point::new(plot.top_left.x + 100, y);
        let margin = Point::new(319, y);
        assert!(!dashboard.scene().in_plot(margin));

        dashboard.handle(DashboardRequest::BrushStart(start), at(0));
        dashboard.handle(DashboardRequest::BrushMove(margin), at(10));
        let drawn = dashboard.scene().brush.unwrap();
        assert_eq!(
            drawn.bottom_right().map(|p| p.x),
            plot.bottom_right().map(|p| p.x)
        );
        dashboard.handle(DashboardRequest::BrushEnd(margin), at(20));
        dashboard.tick(at(2000));

        let zoomed = dashboard.state().domain.unwrap();
        assert!((zoomed.end_ms - DAY).abs() < 1000);
        assert!(zoomed.start_ms > DAY - MILLIS_PER_HOUR);
    }

    #[test]
    fn test_fast_drag_keeps_brush_end_in_queue() {
        let channel: DashboardChannel<NoopRawMutex> = Channel::new();
        let mut coalescer = MotionCoalescer::new();

        let mut events = vec![DashboardRequest::BrushStart(Point::new(50, 100))];
        events.extend((0..20).map(|i| DashboardRequest::BrushMove(Point::new(60 + i, 100))));
        events.push(DashboardRequest::BrushEnd(Point::new(80, 100)));
        events.extend((0..20).map(|i| DashboardRequest::PointerMove(Point::new(90 + i, 100))));

        for event in events {
            for request in coalescer.push(event).into_iter().flatten() {
                channel.try_send(request).unwrap();
            }
        }
        if let Some(request) = coalescer.flush() {
            channel.try_send(request).unwrap();
        }

        let mut received = Vec::new();
        while let Ok(request) = channel.try_receive() {
            received.push(request);
        }
        assert_eq!(
            received,
            vec![
                DashboardRequest::BrushStart(Point::new(50, 100)),
                DashboardRequest::BrushMove(Point::new(79, 100)),
                DashboardRequest::BrushEnd(Point::new(80, 100)),
                DashboardRequest::PointerMove(Point::new(109, 100)),
            ]
        );
    }

    #[test]
    fn test_click_without_drag_resets_after_idle() {
        let store = day_of_samples();
        let mut dashboard = Dashboard::new(&store, layout(), ZoomController::default());
        dashboard.rebuild(at(0));
        let plot = dashboard.scene().plot_area;
        let y = plot.center().y;

        dashboard.handle(DashboardRequest::BrushStart(Point::new(plot.top_left.x + 5, y)), at(0));
        dashboard.handle(DashboardRequest::BrushEnd(Point::new(plot.top_left.x + 80, y)), at(5));
        dashboard.tick(at(1500));
        assert!(dashboard.zoom().is_zoomed());

        let click = Point::new(plot.top_left.x + 40, y);
        dashboard.handle(DashboardRequest::BrushStart(click), at(2000));
        dashboard.handle(DashboardRequest::BrushEnd(click), at(2001));
        assert!(dashboard.zoom().reset_pending());

        dashboard.tick(at(2400));
        assert!(!dashboard.zoom().is_zoomed());
        dashboard.tick(at(3500));
        assert_eq!(
            dashboard.state().domain,
            Some(TimeRange::spanning(DAY - MILLIS_PER_HOUR, DAY))
        );
    }

    #[test]
    fn test_pointer_hover_and_legend() {
        let store = day_of_samples();
        let mut dashboard = Dashboard::new(&store, layout(), ZoomController::default());
        dashboard.rebuild(at(0));

        let plot = dashboard.scene().plot_area;
        dashboard.handle(DashboardRequest::PointerMove(plot.center()), at(1));
        assert!(dashboard.state().hover_ms.is_some());
        assert_eq!(dashboard.scene().focus.len(), 2);

        let swatch = dashboard.scene().legend[1].swatch.center();
        dashboard.handle(DashboardRequest::PointerMove(swatch), at(2));
        assert_eq!(dashboard.state().highlighted, Some(ChannelId::from("Fridge")));
        assert!(dashboard.scene().focus.is_empty());

        dashboard.handle(DashboardRequest::PointerLeave, at(3));
        assert_eq!(dashboard.state().highlighted, None);
        assert_eq!(dashboard.state().hover_ms, None);
    }

    #[test]
    fn test_draw_only_when_dirty() {
        let store = day_of_samples();
        let mut dashboard = Dashboard::new(&store, layout(), ZoomController::default());
        let mut target = FrameCounter { pixels: 0 };

        dashboard.rebuild(at(0));
        assert_eq!(dashboard.draw(&mut target), Ok(true));
        assert_eq!(dashboard.draw(&mut target), Ok(false));

        dashboard.handle(DashboardRequest::Redraw, at(1));
        assert_eq!(dashboard.draw(&mut target), Ok(true));
        assert!(target.pixels > 0);
    }

    #[test]
    fn test_empty_store_shows_placeholder() {
        let store: SharedStore<NoopRawMutex> = Mutex::new(RefCell::new(SampleStore::new()));
        let mut dashboard = Dashboard::new(&store, layout(), ZoomController::default());
        dashboard.rebuild(at(0));

        assert!(dashboard.scene().is_placeholder());
        assert_eq!(dashboard.state().domain, None);
    }

    #[test]
    fn test_run_processes_queue_until_shutdown() {
        let store = day_of_samples();
        let requests: DashboardChannel<NoopRawMutex> = Channel::new();
        let mut dashboard = Dashboard::new(&store, layout(), ZoomController::default());
        let mut target = FrameCounter { pixels: 0 };

        for request in [
            DashboardRequest::SetRetention(12),
            DashboardRequest::DataUpdated,
            DashboardRequest::Shutdown,
        ] {
            assert!(requests.try_send(request).is_ok());
        }

        block_on(dashboard.run(&mut target, requests.receiver()));

        assert_eq!(dashboard.state().retention.hours(), 12);
        assert!(target.pixels > 0);
        assert!(requests.is_empty());
    }
}
