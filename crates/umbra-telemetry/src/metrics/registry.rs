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

//! Registration of metrics and cheap typed handles to update them.

use crate::storage::{InMemoryBackend, MetricsBackend};
use std::sync::Arc;
use umbra_core::telemetry::{Metric, MetricId, MetricType, MetricsError, MetricsResult};

/// Central registry for the metrics of the lighting pipeline.
///
/// Registering returns a handle bound to the metric id; handles are cheap to
/// clone and go straight to the backend.
#[derive(Debug, Clone)]
pub struct MetricsRegistry {
    backend: Arc<dyn MetricsBackend>,
}

impl MetricsRegistry {
    /// Creates a registry with an [`InMemoryBackend`].
    pub fn new() -> Self {
        Self::with_backend(Arc::new(InMemoryBackend::new()))
    }

    /// Creates a registry over a custom backend.
    pub fn with_backend(backend: Arc<dyn MetricsBackend>) -> Self {
        Self { backend }
    }

    /// Stores `metric` unless a metric of the same type already uses its id.
    fn register(&self, metric: Metric) -> MetricsResult<MetricId> {
        let id = metric.id.clone();
        if let Ok(existing) = self.backend.get_metric(&id) {
            let expected = metric.value.metric_type();
            let found = existing.value.metric_type();
            return if expected == found {
                Ok(id)
            } else {
                Err(MetricsError::TypeMismatch { expected, found })
            };
        }
        self.backend.put_metric(metric)?;
        Ok(id)
    }

    /// Registers (or reuses) a counter.
    pub fn register_counter(
        &self,
        id: MetricId,
        description: impl Into<String>,
    ) -> MetricsResult<CounterHandle> {
        let id = self.register(Metric::new_counter(id, description))?;
        Ok(CounterHandle {
            id,
            backend: self.backend.clone(),
        })
    }

    /// Registers (or reuses) a gauge.
    pub fn register_gauge(
        &self,
        id: MetricId,
        description: impl Into<String>,
        unit: impl Into<String>,
    ) -> MetricsResult<GaugeHandle> {
        let id = self.register(Metric::new_gauge(id, description, unit))?;
        Ok(GaugeHandle {
            id,
            backend: self.backend.clone(),
        })
    }

    /// Registers (or reuses) a histogram with ascending `buckets`.
    pub fn register_histogram(
        &self,
        id: MetricId,
        description: impl Into<String>,
        unit: impl Into<String>,
        buckets: Vec<f64>,
    ) -> MetricsResult<HistogramHandle> {
        let id = self.register(Metric::new_histogram(id, description, unit, buckets))?;
        Ok(HistogramHandle {
            id,
            backend: self.backend.clone(),
        })
    }

    /// Returns a copy of a metric.
    pub fn get_metric(&self, id: &MetricId) -> MetricsResult<Metric> {
        self.backend.get_metric(id)
    }

    /// Copies of every metric in `namespace`, sorted by id for stable output.
    pub fn namespace_metrics(&self, namespace: &str) -> Vec<Metric> {
        let mut metrics: Vec<Metric> = self
            .backend
            .list_all_metrics()
            .into_iter()
            .filter(|m| m.id.namespace == namespace)
            .collect();
        metrics.sort_by_key(|m| m.id.to_string());
        metrics
    }

    /// Number of registered metrics.
    pub fn metric_count(&self) -> usize {
        self.backend.metric_count()
    }

    /// The storage backend.
    pub fn backend(&self) -> &Arc<dyn MetricsBackend> {
        &self.backend
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle to a counter.
#[derive(Debug, Clone)]
pub struct CounterHandle {
    id: MetricId,
    backend: Arc<dyn MetricsBackend>,
}

impl CounterHandle {
    /// Adds one.
    pub fn increment(&self) -> MetricsResult<u64> {
        self.backend.increment_counter(&self.id, 1)
    }

    /// Adds `amount`.
    pub fn increment_by(&self, amount: u64) -> MetricsResult<u64> {
        self.backend.increment_counter(&self.id, amount)
    }

    /// Current value.
    pub fn get(&self) -> MetricsResult<u64> {
        let metric = self.backend.get_metric(&self.id)?;
        metric
            .value
            .as_counter()
            .ok_or(MetricsError::TypeMismatch {
                expected: MetricType::Counter,
                found: metric.value.metric_type(),
            })
    }

    /// The metric id.
    pub fn id(&self) -> &MetricId {
        &self.id
    }
}

/// Handle to a gauge.
#[derive(Debug, Clone)]
pub struct GaugeHandle {
    id: MetricId,
    backend: Arc<dyn MetricsBackend>,
}

impl GaugeHandle {
    /// Sets the value.
    pub fn set(&self, value: f64) -> MetricsResult<()> {
        self.backend.set_gauge(&self.id, value)
    }

    /// Current value.
    pub fn get(&self) -> MetricsResult<f64> {
        let metric = self.backend.get_metric(&self.id)?;
        metric
            .value
            .as_gauge()
            .ok_or(MetricsError::TypeMismatch {
                expected: MetricType::Gauge,
                found: metric.value.metric_type(),
            })
    }

    /// The metric id.
    pub fn id(&self) -> &MetricId {
        &self.id
    }
}

/// Handle to a histogram.
#[derive(Debug, Clone)]
pub struct HistogramHandle {
    id: MetricId,
    backend: Arc<dyn MetricsBackend>,
}

impl HistogramHandle {
    /// Records a sample.
    pub fn observe(&self, value: f64) -> MetricsResult<()> {
        self.backend.record_histogram_sample(&self.id, value)
    }

    /// Returns a copy of the full histogram.
    pub fn get_metric(&self) -> MetricsResult<Metric> {
        self.backend.get_metric(&self.id)
    }

    /// The metric id.
    pub fn id(&self) -> &MetricId {
        &self.id
    }
}
