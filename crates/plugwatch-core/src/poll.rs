//! Periodic telemetry polling
//!
//! The scheduler asks the [`TelemetrySource`] for everything newer than the
//! last stored sample, appends the answer to the shared store, trims it to the
//! maximum retention and tells the dashboard to redraw. Failures are logged
//! and the cycle is skipped; the next tick simply tries again.

use embassy_futures::select::{Either, select};
use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::channel::Sender;
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Ticker};
use log::{debug, info, warn};

extern crate alloc;
use alloc::vec::Vec;

use crate::dashboard::DashboardRequest;
use crate::storage::{ChannelId, RetentionWindow, Sample, SharedStore};

/// Default time between two polls
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 5000;

/// Signalled once to stop the poll loop
pub type CancelToken<M> = Signal<M, ()>;

/// Lower bound of a telemetry request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Since {
    /// Nothing stored yet, ask for the full history
    Beginning,
    /// Ask for samples strictly newer than this timestamp
    After(i64),
}

impl Since {
    pub fn from_last(last_timestamp: Option<i64>) -> Self {
        match last_timestamp {
            Some(ts) => Since::After(ts),
            None => Since::Beginning,
        }
    }

    /// Value sent on the wire, `0` meaning "from the beginning"
    pub fn wire_value(&self) -> i64 {
        match self {
            Since::Beginning => 0,
            Since::After(ts) => *ts,
        }
    }
}

/// Source of telemetry batches, typically an HTTP client
pub trait TelemetrySource {
    type Error: core::fmt::Debug;

    /// Samples newer than `since`, in increasing timestamp order
    fn fetch_since(
        &mut self,
        since: Since,
    ) -> impl Future<Output = Result<Vec<Sample>, Self::Error>>;

    /// Channel names in stacking order, when the source can list them
    fn channel_names(
        &mut self,
    ) -> impl Future<Output = Result<Option<Vec<ChannelId>>, Self::Error>> {
        async { Ok(None) }
    }
}

/// Result of one poll cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// New samples were stored
    Updated {
        accepted: usize,
        rejected: usize,
        evicted: usize,
    },
    /// The source had nothing new
    Unchanged,
    /// The request failed; the store was not touched
    Failed,
}

impl PollOutcome {
    /// Whether the dashboard should rebuild its scene
    pub fn changed(&self) -> bool {
        matches!(self, PollOutcome::Updated { .. })
    }
}

/// Running counters of the poll loop
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollStats {
    pub cycles: u32,
    pub failures: u32,
    pub samples_accepted: usize,
    pub samples_evicted: usize,
}

pub struct PollScheduler<S> {
    source: S,
    interval: Duration,
    retention: RetentionWindow,
    schema_requested: bool,
    stats: PollStats,
}

impl<S: TelemetrySource> PollScheduler<S> {
    pub fn new(source: S, interval: Duration) -> Self {
        Self {
            source,
            interval,
            retention: RetentionWindow::MAX,
            schema_requested: false,
            stats: PollStats::default(),
        }
    }

    /// Retention the store is trimmed to after every append
    pub fn with_retention(mut self, retention: RetentionWindow) -> Self {
        self.retention = retention;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn stats(&self) -> PollStats {
        self.stats
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// Run a single poll cycle against `store`
    pub async fn poll_once<M: RawMutex>(&mut self, store: &SharedStore<M>) -> PollOutcome {
        self.stats.cycles += 1;

        if !self.schema_requested {
            self.request_schema(store).await;
        }

        let since = store.lock(|cell| Since::from_last(cell.borrow().last_timestamp()));
        let batch = match self.source.fetch_since(since).await {
            Ok(batch) => batch,
            Err(e) => {
                warn!("Telemetry fetch failed, skipping cycle: {:?}", e);
                self.stats.failures += 1;
                return PollOutcome::Failed;
            }
        };

        if batch.is_empty() {
            debug!("No new samples since {}", since.wire_value());
            return PollOutcome::Unchanged;
        }

        let (report, evicted) = store.lock(|cell| {
            let mut store = cell.borrow_mut();
            let report = store.append(batch);
            let evicted = store.trim(self.retention);
            (report, evicted)
        });

        self.stats.samples_accepted += report.accepted;
        self.stats.samples_evicted += evicted;

        if report.accepted == 0 {
            return PollOutcome::Unchanged;
        }

        debug!(
            "Stored {} samples ({} rejected, {} evicted)",
            report.accepted, report.rejected, evicted
        );
        PollOutcome::Updated {
            accepted: report.accepted,
            rejected: report.rejected,
            evicted,
        }
    }

    /// Poll immediately, then every interval, until `cancel` is signalled.
    ///
    /// Each cycle that stores samples queues a [`DashboardRequest::DataUpdated`].
    pub async fn run<M: RawMutex, const N: usize>(
        &mut self,
        store: &SharedStore<M>,
        notify: Sender<'_, M, DashboardRequest, N>,
        cancel: &CancelToken<M>,
    ) {
        info!("Poll loop started (every {} ms)", self.interval.as_millis());
        let mut ticker = Ticker::every(self.interval);

        loop {
            match select(self.poll_once(store), cancel.wait()).await {
                Either::First(outcome) => {
                    if outcome.changed() && notify.try_send(DashboardRequest::DataUpdated).is_err() {
                        debug!("Dashboard queue full, update already pending");
                    }
                }
                Either::Second(()) => break,
            }

            if let Either::Second(()) = select(ticker.next(), cancel.wait()).await {
                break;
            }
        }

        info!(
            "Poll loop stopped after {} cycles ({} failed)",
            self.stats.cycles, self.stats.failures
        );
    }

    async fn request_schema<M: RawMutex>(&mut self, store: &SharedStore<M>) {
        match self.source.channel_names().await {
            Ok(Some(names)) => {
                self.schema_requested = true;
                let count = names.len();
                if store.lock(|cell| cell.borrow_mut().set_channels(names)) {
                    info!("Channel schema fixed from listing ({} channels)", count);
                }
            }
            Ok(None) => self.schema_requested = true,
            Err(e) => warn!("Channel listing failed, retrying next cycle: {:?}", e),
        }
    }
}
