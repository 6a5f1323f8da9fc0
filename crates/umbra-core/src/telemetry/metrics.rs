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

//! Metric identifiers, values and errors.

use std::fmt::{self, Display};
use std::time::Instant;

/// A structured identifier for a metric: `namespace:name[labels]`.
///
/// The lighting agent registers everything under the `"lighting"` and
/// `"shadows"` namespaces; labels distinguish per-category series.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MetricId {
    /// Subsystem owning the metric (e.g. `"shadows"`).
    pub namespace: String,
    /// Metric name within the namespace (e.g. `"updates_processed"`).
    pub name: String,
    /// Key-value labels, kept sorted by key.
    pub labels: Vec<(String, String)>,
}

impl MetricId {
    /// Creates an unlabelled identifier.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            labels: Vec::new(),
        }
    }

    /// Adds a label and keeps the label list sorted so equal ids hash equally.
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.push((key.into(), value.into()));
        self.labels.sort_by(|a, b| a.0.cmp(&b.0));
        self
    }
}

impl Display for MetricId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.name)?;
        if !self.labels.is_empty() {
            let labels = self
                .labels
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join(",");
            write!(f, "[{labels}]")?;
        }
        Ok(())
    }
}

/// The kind of a metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricType {
    /// Monotonically increasing count.
    Counter,
    /// Instantaneous value that moves both ways.
    Gauge,
    /// Distribution of observed samples.
    Histogram,
}

/// The current value of a metric.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricValue {
    /// Counter value.
    Counter(u64),
    /// Gauge value.
    Gauge(f64),
    /// Histogram samples and cumulative bucket counts.
    Histogram {
        /// Every recorded sample.
        samples: Vec<f64>,
        /// Upper bound of each bucket, ascending.
        bucket_bounds: Vec<f64>,
        /// Number of samples at or below each bound.
        bucket_counts: Vec<u64>,
    },
}

impl MetricValue {
    /// Returns the [`MetricType`] of this value.
    pub fn metric_type(&self) -> MetricType {
        match self {
            MetricValue::Counter(_) => MetricType::Counter,
            MetricValue::Gauge(_) => MetricType::Gauge,
            MetricValue::Histogram { .. } => MetricType::Histogram,
        }
    }

    /// Counter value, if this is a counter.
    pub fn as_counter(&self) -> Option<u64> {
        match self {
            MetricValue::Counter(v) => Some(*v),
            _ => None,
        }
    }

    /// Gauge value, if this is a gauge.
    pub fn as_gauge(&self) -> Option<f64> {
        match self {
            MetricValue::Gauge(v) => Some(*v),
            _ => None,
        }
    }

    /// Number of samples, if this is a histogram.
    pub fn sample_count(&self) -> Option<usize> {
        match self {
            MetricValue::Histogram { samples, .. } => Some(samples.len()),
            _ => None,
        }
    }
}

/// A metric with its descriptive data.
#[derive(Debug, Clone)]
pub struct Metric {
    /// Identifier.
    pub id: MetricId,
    /// Human-readable description.
    pub description: String,
    /// Unit of measurement (`"count"`, `"ms"`, `"tiles"`...).
    pub unit: String,
    /// Last time the value changed.
    pub last_updated: Instant,
    /// Current value.
    pub value: MetricValue,
}

impl Metric {
    fn with_value(
        id: MetricId,
        description: impl Into<String>,
        unit: impl Into<String>,
        value: MetricValue,
    ) -> Self {
        Self {
            id,
            description: description.into(),
            unit: unit.into(),
            last_updated: Instant::now(),
            value,
        }
    }

    /// Creates a counter starting at zero.
    pub fn new_counter(id: MetricId, description: impl Into<String>) -> Self {
        Self::with_value(id, description, "count", MetricValue::Counter(0))
    }

    /// Creates a gauge starting at zero.
    pub fn new_gauge(id: MetricId, description: impl Into<String>, unit: impl Into<String>) -> Self {
        Self::with_value(id, description, unit, MetricValue::Gauge(0.0))
    }

    /// Creates an empty histogram with the given ascending bucket bounds.
    pub fn new_histogram(
        id: MetricId,
        description: impl Into<String>,
        unit: impl Into<String>,
        bucket_bounds: Vec<f64>,
    ) -> Self {
        let bucket_counts = vec![0; bucket_bounds.len()];
        Self::with_value(
            id,
            description,
            unit,
            MetricValue::Histogram {
                samples: Vec::new(),
                bucket_bounds,
                bucket_counts,
            },
        )
    }

    /// Marks the metric as freshly updated.
    pub fn touch(&mut self) {
        self.last_updated = Instant::now();
    }
}

/// Result alias for metric operations.
pub type MetricsResult<T> = Result<T, MetricsError>;

/// Errors raised by the metrics layer.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MetricsError {
    /// No metric is registered under this id.
    #[error("metric not found: {0}")]
    MetricNotFound(MetricId),
    /// The operation does not apply to the metric's type.
    #[error("type mismatch: expected {expected:?}, found {found:?}")]
    TypeMismatch {
        /// Type the operation needs.
        expected: MetricType,
        /// Type actually stored.
        found: MetricType,
    },
    /// The storage backend failed (e.g. a poisoned lock).
    #[error("storage error: {0}")]
    StorageError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_id_labels_are_sorted() {
        let id = MetricId::new("lighting", "visible")
            .with_label("category", "PointLightShadow")
            .with_label("api", "none");
        assert_eq!(id.labels[0].0, "api");
        assert_eq!(
            id.to_string(),
            "lighting:visible[api=none,category=PointLightShadow]"
        );
        assert_eq!(MetricId::new("shadows", "queued").to_string(), "shadows:queued");
    }

    #[test]
    fn test_metric_constructors() {
        let c = Metric::new_counter(MetricId::new("shadows", "exhausted"), "Atlas exhaustions");
        assert_eq!(c.value.as_counter(), Some(0));
        assert_eq!(c.unit, "count");

        let h = Metric::new_histogram(
            MetricId::new("shadows", "frame_ms"),
            "Scheduler time",
            "ms",
            vec![0.1, 1.0],
        );
        assert_eq!(h.value.metric_type(), MetricType::Histogram);
        assert_eq!(h.value.sample_count(), Some(0));
        assert_eq!(h.value.as_gauge(), None);
    }
}
