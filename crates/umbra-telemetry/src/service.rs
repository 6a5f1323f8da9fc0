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

//! The telemetry service owned by the lighting agent.

use crate::metrics::MetricsRegistry;
use serde::Serialize;
use std::time::{Duration, Instant};
use umbra_core::telemetry::{Metric, MetricValue};

/// A serializable view of one metric.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSnapshot {
    /// Formatted id, `namespace:name[labels]`.
    pub id: String,
    /// Unit of measurement.
    pub unit: String,
    /// Counter or gauge value; the mean for histograms.
    pub value: f64,
    /// Number of histogram samples, zero otherwise.
    pub samples: usize,
}

impl From<&Metric> for MetricSnapshot {
    fn from(metric: &Metric) -> Self {
        let (value, samples) = match &metric.value {
            MetricValue::Counter(v) => (*v as f64, 0),
            MetricValue::Gauge(v) => (*v, 0),
            MetricValue::Histogram { samples, .. } if samples.is_empty() => (0.0, 0),
            MetricValue::Histogram { samples, .. } => {
                (samples.iter().sum::<f64>() / samples.len() as f64, samples.len())
            }
        };
        Self {
            id: metric.id.to_string(),
            unit: metric.unit.clone(),
            value,
            samples,
        }
    }
}

/// Owns the metrics registry and periodically reports it to the log.
#[derive(Debug)]
pub struct TelemetryService {
    metrics: MetricsRegistry,
    last_report: Instant,
    report_interval: Duration,
}

impl TelemetryService {
    /// Creates a service that reports at most once per `report_interval`.
    pub fn new(report_interval: Duration) -> Self {
        Self {
            metrics: MetricsRegistry::new(),
            last_report: Instant::now(),
            report_interval,
        }
    }

    /// Called once per frame. Logs every metric at debug level when the
    /// interval has passed and returns whether it did.
    pub fn tick(&mut self) -> bool {
        if self.last_report.elapsed() < self.report_interval {
            return false;
        }
        self.last_report = Instant::now();
        if log::log_enabled!(log::Level::Debug) {
            for snapshot in self.snapshot() {
                log::debug!(
                    "[telemetry] {} = {:.3} {} ({} samples)",
                    snapshot.id,
                    snapshot.value,
                    snapshot.unit,
                    snapshot.samples
                );
            }
        }
        true
    }

    /// The registry used to create metric handles.
    pub fn metrics_registry(&self) -> &MetricsRegistry {
        &self.metrics
    }

    /// Every metric, sorted by id.
    pub fn snapshot(&self) -> Vec<MetricSnapshot> {
        let mut all: Vec<MetricSnapshot> = self
            .metrics
            .backend()
            .list_all_metrics()
            .iter()
            .map(MetricSnapshot::from)
            .collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        all
    }
}

impl Default for TelemetryService {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use umbra_core::telemetry::MetricId;

    #[test]
    fn test_snapshot_reports_histogram_mean() {
        let service = TelemetryService::default();
        let registry = service.metrics_registry();
        let h = registry
            .register_histogram(MetricId::new("shadows", "frame_ms"), "", "ms", vec![10.0])
            .unwrap();
        h.observe(1.0).unwrap();
        h.observe(3.0).unwrap();
        registry
            .register_counter(MetricId::new("lighting", "dropped"), "")
            .unwrap()
            .increment()
            .unwrap();

        let snapshot = service.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].id, "lighting:dropped");
        assert_eq!(snapshot[0].value, 1.0);
        assert_eq!(snapshot[1].value, 2.0);
        assert_eq!(snapshot[1].samples, 2);
    }

    #[test]
    fn test_tick_respects_interval() {
        let mut service = TelemetryService::new(Duration::from_secs(3600));
        assert!(!service.tick());
        let mut eager = TelemetryService::new(Duration::ZERO);
        assert!(eager.tick());
    }
}
