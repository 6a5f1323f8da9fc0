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

//! # Umbra Telemetry
//!
//! The metrics side of the lighting pipeline: a registry handing out typed
//! counter/gauge/histogram handles, pluggable storage backends, RAII timers,
//! and a service that reports everything to the log.

#![warn(missing_docs)]

pub mod metrics;
pub mod service;
pub mod storage;
pub mod utils;

pub use metrics::{CounterHandle, GaugeHandle, HistogramHandle, MetricsRegistry};
pub use service::{MetricSnapshot, TelemetryService};
pub use utils::timer::ScopedMetricTimer;
