use crate::storage::{Sample, Window};

use super::{ChartError, ChartResult};

/// Nearest-timestamp lookup over a sorted window
#[derive(Debug, Clone, Copy)]
pub struct NearestSampleIndex<'a> {
    samples: &'a [Sample],
}

impl<'a> NearestSampleIndex<'a> {
    pub fn new(window: Window<'a>) -> Self {
        Self {
            samples: window.samples(),
        }
    }

    /// Sample closest to `query_ms`; ties go to the later sample, queries
    /// outside the window clamp to its first or last sample.
    pub fn nearest(&self, query_ms: i64) -> ChartResult<&'a Sample> {
        let samples = self.samples;
        if samples.is_empty() {
            return Err(ChartError::EmptyWindow);
        }

        let index = samples.partition_point(|sample| sample.timestamp < query_ms);
        if index == 0 {
            return Ok(&samples[0]);
        }
        if index == samples.len() {
            return Ok(&samples[index - 1]);
        }

        let before = &samples[index - 1];
        let after = &samples[index];
        if query_ms - before.timestamp < after.timestamp - query_ms {
            Ok(before)
        } else {
            Ok(after)
        }
    }
}
