use core::cell::RefCell;

use embassy_sync::blocking_mutex::Mutex;
use log::{debug, warn};

extern crate alloc;
use alloc::vec::Vec;

use super::{ChannelId, RetentionWindow, Sample};

/// Store shared between the poll task and the dashboard task.
///
/// Borrows never span an await point, so any raw mutex works; single-executor
/// setups use `NoopRawMutex`.
pub type SharedStore<M> = Mutex<M, RefCell<SampleStore>>;

/// Outcome of a single [`SampleStore::append`] call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AppendReport {
    /// Samples stored
    pub accepted: usize,
    /// Duplicate or out-of-order samples that were dropped
    pub rejected: usize,
}

/// Ordered, deduplicated buffer of telemetry samples
///
/// Timestamps are strictly increasing. The channel schema is fixed the first
/// time it is observed, either from the source's channel listing or from the
/// keys of the first stored sample.
#[derive(Debug, Default)]
pub struct SampleStore {
    samples: Vec<Sample>,
    channels: Vec<ChannelId>,
    /// Unknown channel keys that were already reported
    ignored_channels: Vec<ChannelId>,
}

impl SampleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append samples, dropping any whose timestamp is not newer than the last
    /// stored one.
    pub fn append<I>(&mut self, batch: I) -> AppendReport
    where
        I: IntoIterator<Item = Sample>,
    {
        let mut report = AppendReport::default();

        for sample in batch {
            if let Some(last) = self.last_timestamp()
                && sample.timestamp <= last
            {
                debug!(
                    "Dropping sample at {} (last stored is {})",
                    sample.timestamp, last
                );
                report.rejected += 1;
                continue;
            }

            self.observe_schema(&sample);
            self.samples.push(sample);
            report.accepted += 1;
        }

        report
    }

    /// Evict every sample older than `latest - retention`.
    ///
    /// Returns the number of evicted samples.
    pub fn trim(&mut self, retention: RetentionWindow) -> usize {
        let Some(cutoff) = self.cutoff(retention) else {
            return 0;
        };

        let evicted = self.samples.partition_point(|s| s.timestamp < cutoff);
        if evicted > 0 {
            self.samples.drain(..evicted);
            debug!("Trimmed {} samples older than {}", evicted, cutoff);
        }
        evicted
    }

    /// Most recent sample, if any
    pub fn latest(&self) -> Option<&Sample> {
        self.samples.last()
    }

    pub fn last_timestamp(&self) -> Option<i64> {
        self.latest().map(|s| s.timestamp)
    }

    /// Trailing view covering `[latest - retention, latest]`
    pub fn window(&self, retention: RetentionWindow) -> Window<'_> {
        let start = match self.cutoff(retention) {
            Some(cutoff) => self.samples.partition_point(|s| s.timestamp < cutoff),
            None => 0,
        };
        Window::new(&self.samples[start..])
    }

    /// Channel schema in stacking order
    pub fn channels(&self) -> &[ChannelId] {
        &self.channels
    }

    /// Fix the channel schema from an explicit listing.
    ///
    /// Ignored once a schema has been observed.
    pub fn set_channels(&mut self, channels: Vec<ChannelId>) -> bool {
        if !self.channels.is_empty() || channels.is_empty() {
            return false;
        }
        self.channels = channels;
        true
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    fn cutoff(&self, retention: RetentionWindow) -> Option<i64> {
        self.last_timestamp()
            .map(|latest| latest.saturating_sub(retention.duration_ms()))
    }

    fn observe_schema(&mut self, sample: &Sample) {
        if self.channels.is_empty() {
            self.channels = sample.channel_ids().cloned().collect();
            return;
        }

        for id in sample.channel_ids() {
            if !self.channels.contains(id) && !self.ignored_channels.contains(id) {
                warn!("Ignoring channel '{}' that is not part of the schema", id);
                self.ignored_channels.push(id.clone());
            }
        }
    }
}

/// Borrowed view over a contiguous, time-ordered run of samples
#[derive(Debug, Clone, Copy)]
pub struct Window<'a> {
    samples: &'a [Sample],
}

impl<'a> Window<'a> {
    pub fn new(samples: &'a [Sample]) -> Self {
        Self { samples }
    }

    pub fn samples(&self) -> &'a [Sample] {
        self.samples
    }

    pub fn first(&self) -> Option<&'a Sample> {
        self.samples.first()
    }

    pub fn latest(&self) -> Option<&'a Sample> {
        self.samples.last()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// `(first, latest)` timestamps of the window
    pub fn extent(&self) -> Option<(i64, i64)> {
        Some((self.first()?.timestamp, self.latest()?.timestamp))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MILLIS_PER_HOUR;
    use alloc::vec;

    fn sample(timestamp: i64, a: f32, b: f32) -> Sample {
        Sample::new(timestamp).with_channel("a", a).with_channel("b", b)
    }

    fn hourly(count: i64) -> Vec<Sample> {
        (0..count)
            .map(|i| sample(i * MILLIS_PER_HOUR, i as f32, 1.0))
            .collect()
    }

    #[test]
    fn test_append_rejects_duplicates_and_out_of_order() {
        let mut store = SampleStore::new();
        let report = store.append(vec![sample(10, 1.0, 1.0), sample(20, 2.0, 2.0)]);
        assert_eq!(report, AppendReport { accepted: 2, rejected: 0 });

        let report = store.append(vec![sample(20, 9.0, 9.0), sample(5, 9.0, 9.0)]);
        assert_eq!(report, AppendReport { accepted: 0, rejected: 2 });
        assert_eq!(store.len(), 2);
        assert_eq!(store.latest(), Some(&sample(20, 2.0, 2.0)));
    }

    #[test]
    fn test_append_keeps_newer_samples_after_a_rejected_one() {
        let mut store = SampleStore::new();
        store.append(vec![sample(10, 1.0, 1.0)]);

        let report = store.append(vec![sample(10, 0.0, 0.0), sample(30, 3.0, 3.0)]);
        assert_eq!(report.accepted, 1);
        assert_eq!(store.last_timestamp(), Some(30));
    }

    #[test]
    fn test_trim_keeps_exactly_the_retention_window() {
        let mut store = SampleStore::new();
        store.append(hourly(30));

        let evicted = store.trim(RetentionWindow::MAX);
        let latest = 29 * MILLIS_PER_HOUR;
        let cutoff = latest - RetentionWindow::MAX.duration_ms();

        assert_eq!(evicted, 5);
        assert!(store.window(RetentionWindow::MAX).samples().iter().all(|s| s.timestamp >= cutoff));
        assert_eq!(store.window(RetentionWindow::MAX).first().map(|s| s.timestamp), Some(cutoff));
    }

    #[test]
    fn test_trim_on_empty_store_is_noop() {
        let mut store = SampleStore::new();
        assert_eq!(store.trim(RetentionWindow::ONE_HOUR), 0);
        assert!(store.latest().is_none());
    }

    #[test]
    fn test_window_is_suffix_of_store() {
        let mut store = SampleStore::new();
        store.append(hourly(24));

        let window = store.window(RetentionWindow::SIX_HOURS);
        assert_eq!(window.len(), 7);
        assert_eq!(
            window.extent(),
            Some((17 * MILLIS_PER_HOUR, 23 * MILLIS_PER_HOUR))
        );
        // Trimming for display never happens: the store keeps everything.
        assert_eq!(store.len(), 24);
    }

    #[test]
    fn test_schema_fixed_at_first_sample() {
        let mut store = SampleStore::new();
        store.append(vec![sample(1, 1.0, 1.0)]);
        store.append(vec![sample(2, 1.0, 1.0).with_channel("late", 5.0)]);

        let names: Vec<&str> = store.channels().iter().map(ChannelId::as_str).collect();
        assert_eq!(names, ["a", "b"]);
    }

    #[test]
    fn test_explicit_channel_listing_wins_when_first() {
        let mut store = SampleStore::new();
        assert!(store.set_channels(vec![ChannelId::from("b"), ChannelId::from("a")]));
        store.append(vec![sample(1, 1.0, 1.0)]);

        let names: Vec<&str> = store.channels().iter().map(ChannelId::as_str).collect();
        assert_eq!(names, ["b", "a"]);
        assert!(!store.set_channels(vec![ChannelId::from("c")]));
    }
}
