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

//! A minimal monotonic stopwatch.

use std::time::{Duration, Instant};

/// Measures wall-clock time since it was created.
///
/// The accessors return `Option` so that callers recording metrics can skip a
/// sample instead of failing if the clock ever misbehaves.
#[derive(Debug, Clone, Copy)]
pub struct Stopwatch {
    start: Instant,
}

impl Stopwatch {
    /// Starts a new stopwatch.
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Time elapsed since the stopwatch was started or last reset.
    pub fn elapsed(&self) -> Option<Duration> {
        Instant::now().checked_duration_since(self.start)
    }

    /// Elapsed time in whole milliseconds.
    pub fn elapsed_ms(&self) -> Option<u64> {
        self.elapsed()
            .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }

    /// Elapsed time in seconds, with sub-millisecond precision.
    pub fn elapsed_secs_f64(&self) -> Option<f64> {
        self.elapsed().map(|d| d.as_secs_f64())
    }

    /// Restarts the measurement from now.
    pub fn reset(&mut self) {
        self.start = Instant::now();
    }
}

impl Default for Stopwatch {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stopwatch_is_monotonic() {
        let sw = Stopwatch::new();
        let a = sw.elapsed_secs_f64().unwrap();
        let b = sw.elapsed_secs_f64().unwrap();
        assert!(b >= a);
        assert!(sw.elapsed_ms().is_some());
    }
}
