//! Desktop simulator for the plugwatch power-strip dashboard.
//!
//! Renders the plugwatch-core dashboard in an SDL2 window via
//! `embedded-graphics-simulator`. A mock power strip stands in for the
//! telemetry server and answers in the server's JSON format.
//!
//! # Controls
//!
//! | Input      | Action                              |
//! |------------|-------------------------------------|
//! | 1 2 3 4    | Show 1 h, 6 h, 12 h, 24 h           |
//! | Drag       | Zoom to the selected time range     |
//! | Click      | Clear the zoom (after a short idle) |
//! | F          | Toggle a simulated network outage   |
//! | R          | Force a redraw                      |
//! | Q / Esc    | Quit                                |
//!
//! Settings are read from `plugwatch.json` in the working directory when it
//! exists.

use std::cell::RefCell;
use std::time::{Duration, Instant as StdInstant, SystemTime, UNIX_EPOCH};

use embassy_futures::block_on;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use embassy_sync::channel::Channel;
use embassy_time::Instant;
use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;
use embedded_graphics_simulator::{
    OutputSettingsBuilder, SimulatorDisplay, SimulatorEvent, Window, sdl2::Keycode,
};
use log::{error, info, warn};

use plugwatch_core::config::DashboardConfig;
use plugwatch_core::dashboard::{
    Dashboard, DashboardChannel, DashboardRequest, MotionCoalescer,
};
use plugwatch_core::poll::{PollScheduler, Since, TelemetrySource};
use plugwatch_core::storage::wire::{
    decode_batch, decode_channel_names, encode_batch, encode_channel_names,
};
use plugwatch_core::storage::{
    ChannelId, MILLIS_PER_HOUR, MILLIS_PER_SEC, RetentionWindow, Sample, SampleStore,
    SharedStore, WireError,
};

// ---------------------------------------------------------------------------
// Display constants
// ---------------------------------------------------------------------------

const DISPLAY_WIDTH_PX: u32 = 480;
const DISPLAY_HEIGHT_PX: u32 = 320;

/// Pixel scale factor for the simulator window.
const WINDOW_SCALE: u32 = 2;

/// Target frame duration (~30 FPS).
const FRAME_DURATION: Duration = Duration::from_millis(33);

const CONFIG_PATH: &str = "plugwatch.json";

// ---------------------------------------------------------------------------
// Mock power strip
// ---------------------------------------------------------------------------

/// Plugs of the simulated strip, in the order the server lists them.
const PLUG_NAMES: [&str; 6] = ["Plug 1", "Plug 2", "Plug 3", "Plug 4", "Plug 5", "Plug 6"];

/// Time between two measurements of the strip.
const MEASUREMENT_INTERVAL_MS: i64 = 5 * MILLIS_PER_SEC;

/// Spacing of the synthetic history served on the first request.
const HISTORY_INTERVAL_MS: i64 = 60 * MILLIS_PER_SEC;

#[derive(Debug)]
enum StripError {
    /// Simulated network outage
    Offline,
    Wire(WireError),
}

impl From<WireError> for StripError {
    fn from(value: WireError) -> Self {
        Self::Wire(value)
    }
}

/// Produces plausible plug loads and serves them like the telemetry server.
struct MockPowerStrip {
    channels: Vec<ChannelId>,
    measurements: Vec<Sample>,
    offline: bool,
}

impl MockPowerStrip {
    /// Create a strip with a day of history ending at `now_ms`.
    fn new(now_ms: i64) -> Self {
        let mut strip = Self {
            channels: PLUG_NAMES.iter().copied().map(ChannelId::from).collect(),
            measurements: Vec::new(),
            offline: false,
        };

        let start = now_ms - 24 * MILLIS_PER_HOUR;
        let mut ts = start;
        while ts < now_ms {
            let sample = strip.measure(ts);
            strip.measurements.push(sample);
            ts += HISTORY_INTERVAL_MS;
        }
        strip
    }

    fn toggle_offline(&mut self) -> bool {
        self.offline = !self.offline;
        self.offline
    }

    /// Take measurements up to `now_ms`.
    fn advance(&mut self, now_ms: i64) {
        let mut next = self
            .measurements
            .last()
            .map_or(now_ms, |s| s.timestamp + MEASUREMENT_INTERVAL_MS);
        while next <= now_ms {
            let sample = self.measure(next);
            self.measurements.push(sample);
            next += MEASUREMENT_INTERVAL_MS;
        }
    }

    /// Load of each plug at `ts`, in watts.
    fn measure(&self, ts: i64) -> Sample {
        let t = ts as f64 / 1000.0;
        let loads = [
            // Fridge compressor cycling on and off
            if (t / 600.0).sin() > 0.2 { 22.0 } else { 3.0 },
            // Desk lamp, mostly evenings
            6.0 + 6.0 * (t / 7200.0).sin().max(0.0),
            // Laptop charger
            12.0 + 4.0 * (t / 900.0).cos(),
            // Router, nearly constant
            7.5 + 0.3 * (t / 37.0).sin(),
            // Monitor
            10.0 + 8.0 * (t / 3600.0).sin().max(-0.5),
            // Kettle bursts
            if (t / 1800.0).sin() > 0.97 { 18.0 } else { 0.5 },
        ];

        self.channels
            .iter()
            .zip(loads)
            .fold(Sample::new(ts), |sample, (channel, watts)| {
                sample.with_channel(channel.clone(), watts as f32)
            })
    }
}

impl TelemetrySource for MockPowerStrip {
    type Error = StripError;

    async fn fetch_since(&mut self, since: Since) -> Result<Vec<Sample>, StripError> {
        if self.offline {
            return Err(StripError::Offline);
        }
        self.advance(unix_millis());

        let after = since.wire_value();
        let start = self.measurements.partition_point(|s| s.timestamp <= after);

        // Round-trip through the server's JSON so the decoder is exercised
        let body = encode_batch(&self.measurements[start..])?;
        Ok(decode_batch(&body)?)
    }

    async fn channel_names(&mut self) -> Result<Option<Vec<ChannelId>>, StripError> {
        if self.offline {
            return Err(StripError::Offline);
        }
        let body = encode_channel_names(&self.channels)?;
        Ok(Some(decode_channel_names(&body)?))
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn unix_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

fn load_config() -> DashboardConfig {
    let bytes = match std::fs::read(CONFIG_PATH) {
        Ok(bytes) => bytes,
        Err(_) => {
            info!("No {} found, using defaults", CONFIG_PATH);
            return DashboardConfig::default();
        }
    };

    match DashboardConfig::from_json(&bytes) {
        Ok(config) => {
            info!("Loaded {}", CONFIG_PATH);
            config
        }
        Err(e) => {
            error!("Ignoring {}: {}", CONFIG_PATH, e);
            DashboardConfig::default()
        }
    }
}

/// Map a number key to a displayed duration in hours.
fn keycode_to_hours(keycode: Keycode) -> Option<u32> {
    match keycode {
        Keycode::Num1 | Keycode::Kp1 => Some(RetentionWindow::ONE_HOUR.hours()),
        Keycode::Num2 | Keycode::Kp2 => Some(RetentionWindow::SIX_HOURS.hours()),
        Keycode::Num3 | Keycode::Kp3 => Some(RetentionWindow::TWELVE_HOURS.hours()),
        Keycode::Num4 | Keycode::Kp4 => Some(RetentionWindow::ONE_DAY.hours()),
        _ => None,
    }
}

fn send(requests: &DashboardChannel<NoopRawMutex>, request: DashboardRequest) {
    if requests.try_send(request).is_err() {
        warn!("Dashboard queue full, dropping {:?}", request);
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() {
    env_logger::init();
    info!("Starting plugwatch simulator");
    info!(
        "Display: {}×{} (scale {}×)",
        DISPLAY_WIDTH_PX, DISPLAY_HEIGHT_PX, WINDOW_SCALE
    );
    info!("Keys: 1=1h  2=6h  3=12h  4=24h  F=toggle outage  R=redraw  Q=Quit");

    let config = load_config();
    // `load_config` only returns validated configs
    let default_retention = config.default_retention().unwrap_or_default();
    let max_retention = config.max_retention().unwrap_or(RetentionWindow::MAX);

    let store: SharedStore<NoopRawMutex> = Mutex::new(RefCell::new(SampleStore::new()));
    let requests: DashboardChannel<NoopRawMutex> = Channel::new();

    let mut scheduler = PollScheduler::new(MockPowerStrip::new(unix_millis()), config.poll_interval())
        .with_retention(max_retention);

    let bounds = Rectangle::new(
        Point::zero(),
        Size::new(DISPLAY_WIDTH_PX, DISPLAY_HEIGHT_PX),
    );
    let mut dashboard =
        Dashboard::new(&store, config.layout(bounds), config.zoom()).with_retention(default_retention);

    // SDL2 display and window
    let mut display = SimulatorDisplay::<Rgb565>::new(bounds.size);
    let output_settings = OutputSettingsBuilder::new().scale(WINDOW_SCALE).build();
    let mut window = Window::new("Plugwatch Simulator", &output_settings);

    // First poll before the first frame so the chart starts populated
    if block_on(scheduler.poll_once(&store)).changed() {
        let _ = requests.try_send(DashboardRequest::DataUpdated);
    }
    let mut last_poll = StdInstant::now();
    let poll_interval = Duration::from_millis(scheduler.interval().as_millis());

    // The SDL window is lazily initialized on the first `update()` call.
    // We must call `update()` once before `events()` or it will panic.
    dashboard.rebuild(Instant::now());
    if let Err(e) = dashboard.draw(&mut display) {
        error!("Draw error: {:?}", e);
    }
    window.update(&display);

    let mut dragging = false;
    let mut motion = MotionCoalescer::new();

    // -----------------------------------------------------------------------
    // Main loop
    // -----------------------------------------------------------------------
    'running: loop {
        let frame_start = StdInstant::now();

        // --- SDL events ---------------------------------------------------
        for event in window.events() {
            let request = match event {
                SimulatorEvent::Quit => Some(DashboardRequest::Shutdown),

                SimulatorEvent::KeyDown { keycode, .. } => match keycode {
                    Keycode::Q | Keycode::Escape => Some(DashboardRequest::Shutdown),
                    Keycode::R => Some(DashboardRequest::Redraw),
                    Keycode::F => {
                        let offline = scheduler.source_mut().toggle_offline();
                        info!("Power strip {}", if offline { "offline" } else { "online" });
                        None
                    }
                    other => keycode_to_hours(other).map(DashboardRequest::SetRetention),
                },

                SimulatorEvent::MouseButtonDown { point, .. } => {
                    dragging = true;
                    Some(DashboardRequest::BrushStart(point))
                }

                SimulatorEvent::MouseButtonUp { point, .. } => {
                    if dragging {
                        dragging = false;
                        Some(DashboardRequest::BrushEnd(point))
                    } else {
                        None
                    }
                }

                SimulatorEvent::MouseMove { point } => Some(if dragging {
                    DashboardRequest::BrushMove(point)
                } else {
                    DashboardRequest::PointerMove(point)
                }),

                _ => None,
            };

            if let Some(request) = request {
                for request in motion.push(request).into_iter().flatten() {
                    send(&requests, request);
                }
            }
        }
        if let Some(request) = motion.flush() {
            send(&requests, request);
        }

        // --- Polling ------------------------------------------------------
        if last_poll.elapsed() >= poll_interval {
            if block_on(scheduler.poll_once(&store)).changed() {
                let _ = requests.try_send(DashboardRequest::DataUpdated);
            }
            last_poll = StdInstant::now();
        }

        // --- Dashboard ----------------------------------------------------
        let now = Instant::now();
        while let Ok(request) = requests.try_receive() {
            if request == DashboardRequest::Shutdown {
                break 'running;
            }
            dashboard.handle(request, now);
        }
        dashboard.tick(now);

        // --- Render -------------------------------------------------------
        if let Err(e) = dashboard.draw(&mut display) {
            error!("Draw error: {:?}", e);
        }

        window.update(&display);

        // --- Frame pacing -------------------------------------------------
        let elapsed = frame_start.elapsed();
        if elapsed < FRAME_DURATION {
            std::thread::sleep(FRAME_DURATION - elapsed);
        }
    }

    let stats = scheduler.stats();
    info!(
        "Simulator exiting after {} polls ({} failed, {} samples stored)",
        stats.cycles, stats.failures, stats.samples_accepted
    );
}
