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

//! The storage contract behind the metrics registry.

use std::fmt::Debug;
use umbra_core::telemetry::{Metric, MetricId, MetricType, MetricValue, MetricsError, MetricsResult};

/// Where metrics live. Implementations must be shareable across threads.
pub trait MetricsBackend: Send + Sync + Debug + 'static {
    /// Inserts or replaces a metric.
    fn put_metric(&self, metric: Metric) -> MetricsResult<()>;

    /// Returns a copy of a metric.
    fn get_metric(&self, id: &MetricId) -> MetricsResult<Metric>;

    /// Applies `update` to a stored metric in place, under the backend's lock.
    fn modify_metric(
        &self,
        id: &MetricId,
        update: &mut dyn FnMut(&mut Metric) -> MetricsResult<()>,
    ) -> MetricsResult<()>;

    /// Whether a metric is registered.
    fn contains_metric(&self, id: &MetricId) -> bool;

    /// Copies of every stored metric.
    fn list_all_metrics(&self) -> Vec<Metric>;

    /// Number of stored metrics.
    fn metric_count(&self) -> usize;

    /// Removes every metric.
    fn clear_all(&self) -> MetricsResult<()>;

    /// Adds `delta` to a counter and returns the new value.
    fn increment_counter(&self, id: &MetricId, delta: u64) -> MetricsResult<u64> {
        let mut result = 0;
        self.modify_metric(id, &mut |metric| match metric.value {
            MetricValue::Counter(ref mut value) => {
                *value = value.saturating_add(delta);
                result = *value;
                metric.touch();
                Ok(())
            }
            ref other => Err(MetricsError::TypeMismatch {
                expected: MetricType::Counter,
                found: other.metric_type(),
            }),
        })?;
        Ok(result)
    }

    /// Sets a gauge.
    fn set_gauge(&self, id: &MetricId, value: f64) -> MetricsResult<()> {
        self.modify_metric(id, &mut |metric| match metric.value {
            MetricValue::Gauge(ref mut current) => {
                *current = value;
                metric.touch();
                Ok(())
            }
            ref other => Err(MetricsError::TypeMismatch {
                expected: MetricType::Gauge,
                found: other.metric_type(),
            }),
        })
    }

    /// Records one histogram sample.
    fn record_histogram_sample(&self, id: &MetricId, sample: f64) -> MetricsResult<()> {
        self.modify_metric(id, &mut |metric| match metric.value {
            MetricValue::Histogram {
                ref mut samples,
                ref bucket_bounds,
                ref mut bucket_counts,
            } => {
                samples.push(sample);
                for (count, bound) in bucket_counts.iter_mut().zip(bucket_bounds) {
                    if sample <= *bound {
                        *count += 1;
                    }
                }
                metric.touch();
                Ok(())
            }
            ref other => Err(MetricsError::TypeMismatch {
                expected: MetricType::Histogram,
                found: other.metric_type(),
            }),
        })
    }
}
