// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! RAII timers that record into a histogram when dropped.

use crate::metrics::HistogramHandle;
use umbra_core::Stopwatch;

/// Records the time spent in a scope, in milliseconds, into a histogram.
///
/// The sample is recorded on drop, so early returns through `?` are measured
/// too.
pub struct ScopedMetricTimer<'a> {
    stopwatch: Stopwatch,
    histogram: Option<&'a HistogramHandle>,
}

impl<'a> ScopedMetricTimer<'a> {
    /// Starts timing into `histogram`.
    pub fn new(histogram: &'a HistogramHandle) -> Self {
        Self {
            stopwatch: Stopwatch::new(),
            histogram: Some(histogram),
        }
    }

    /// Starts timing only if a histogram is available.
    pub fn maybe(histogram: Option<&'a HistogramHandle>) -> Self {
        Self {
            stopwatch: Stopwatch::new(),
            histogram,
        }
    }
}

impl Drop for ScopedMetricTimer<'_> {
    fn drop(&mut self) {
        let Some(histogram) = self.histogram else {
            return;
        };
        if let Some(elapsed_secs) = self.stopwatch.elapsed_secs_f64() {
            if let Err(e) = histogram.observe(elapsed_secs * 1000.0) {
                log::warn!("[ScopedMetricTimer] Failed to record {}: {e}", histogram.id());
            }
        }
    }
}
