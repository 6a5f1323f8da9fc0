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

use crate::storage::backend::MetricsBackend;
use std::collections::HashMap;
use std::sync::RwLock;
use umbra_core::telemetry::{Metric, MetricId, MetricsError, MetricsResult};

/// Thread-safe in-memory metrics storage backed by `RwLock<HashMap>`.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    storage: RwLock<HashMap<MetricId, Metric>>,
}

impl InMemoryBackend {
    /// Creates an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copies of every metric in `namespace`.
    pub fn metrics_in_namespace(&self, namespace: &str) -> Vec<Metric> {
        match self.storage.read() {
            Ok(storage) => storage
                .values()
                .filter(|metric| metric.id.namespace == namespace)
                .cloned()
                .collect(),
            Err(_) => Vec::new(),
        }
    }
}

fn poisoned(op: &str) -> MetricsError {
    MetricsError::StorageError(format!("failed to acquire {op} lock"))
}

impl MetricsBackend for InMemoryBackend {
    fn put_metric(&self, metric: Metric) -> MetricsResult<()> {
        let mut storage = self.storage.write().map_err(|_| poisoned("write"))?;
        storage.insert(metric.id.clone(), metric);
        Ok(())
    }

    fn get_metric(&self, id: &MetricId) -> MetricsResult<Metric> {
        let storage = self.storage.read().map_err(|_| poisoned("read"))?;
        storage
            .get(id)
            .cloned()
            .ok_or_else(|| MetricsError::MetricNotFound(id.clone()))
    }

    fn modify_metric(
        &self,
        id: &MetricId,
        update: &mut dyn FnMut(&mut Metric) -> MetricsResult<()>,
    ) -> MetricsResult<()> {
        let mut storage = self.storage.write().map_err(|_| poisoned("write"))?;
        let metric = storage
            .get_mut(id)
            .ok_or_else(|| MetricsError::MetricNotFound(id.clone()))?;
        update(metric)
    }

    fn contains_metric(&self, id: &MetricId) -> bool {
        self.storage
            .read()
            .map(|storage| storage.contains_key(id))
            .unwrap_or(false)
    }

    fn list_all_metrics(&self) -> Vec<Metric> {
        self.storage
            .read()
            .map(|storage| storage.values().cloned().collect())
            .unwrap_or_default()
    }

    fn metric_count(&self) -> usize {
        self.storage.read().map(|storage| storage.len()).unwrap_or(0)
    }

    fn clear_all(&self) -> MetricsResult<()> {
        self.storage.write().map_err(|_| poisoned("write"))?.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use umbra_core::telemetry::MetricType;

    #[test]
    fn test_counter_through_backend() {
        let backend = InMemoryBackend::new();
        let id = MetricId::new("shadows", "updates");
        backend.put_metric(Metric::new_counter(id.clone(), "")).unwrap();

        assert_eq!(backend.increment_counter(&id, 2).unwrap(), 2);
        assert_eq!(backend.increment_counter(&id, 3).unwrap(), 5);
        assert_eq!(
            backend.set_gauge(&id, 1.0),
            Err(MetricsError::TypeMismatch {
                expected: MetricType::Gauge,
                found: MetricType::Counter
            })
        );
    }

    #[test]
    fn test_missing_metric() {
        let backend = InMemoryBackend::new();
        let id = MetricId::new("lighting", "nope");
        assert_eq!(
            backend.increment_counter(&id, 1),
            Err(MetricsError::MetricNotFound(id.clone()))
        );
        assert!(!backend.contains_metric(&id));
    }

    #[test]
    fn test_histogram_buckets_are_cumulative() {
        let backend = InMemoryBackend::new();
        let id = MetricId::new("shadows", "frame_ms");
        backend
            .put_metric(Metric::new_histogram(id.clone(), "", "ms", vec![1.0, 5.0]))
            .unwrap();
        backend.record_histogram_sample(&id, 0.5).unwrap();
        backend.record_histogram_sample(&id, 3.0).unwrap();
        backend.record_histogram_sample(&id, 9.0).unwrap();

        match backend.get_metric(&id).unwrap().value {
            umbra_core::telemetry::MetricValue::Histogram { bucket_counts, samples, .. } => {
                assert_eq!(bucket_counts, vec![1, 2]);
                assert_eq!(samples.len(), 3);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_namespace_filter_and_clear() {
        let backend = InMemoryBackend::new();
        backend
            .put_metric(Metric::new_counter(MetricId::new("shadows", "a"), ""))
            .unwrap();
        backend
            .put_metric(Metric::new_gauge(MetricId::new("lighting", "b"), "", "count"))
            .unwrap();
        assert_eq!(backend.metrics_in_namespace("shadows").len(), 1);
        assert_eq!(backend.metric_count(), 2);
        backend.clear_all().unwrap();
        assert_eq!(backend.list_all_metrics().len(), 0);
    }
}
