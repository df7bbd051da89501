//! Metric Record - one point of a metric's history

use serde::{Deserialize, Serialize};

/// Metric Record represents a single logged metric point.
///
/// A metric logged several times under the same key forms a history; points
/// are ordered by `step`, then by the order they were logged.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricRecord {
    run_id: String,
    key: String,
    value: f64,
    timestamp: i64,
    step: i64,
}

impl MetricRecord {
    /// Create a new metric point.
    ///
    /// # Arguments
    ///
    /// * `run_id` - ID of the parent run
    /// * `key` - Metric name (e.g., "loss", "accuracy")
    /// * `value` - Metric value
    /// * `timestamp` - Wall-clock time in epoch millis
    /// * `step` - Training step; 0 when the caller does not track steps
    #[must_use]
    pub fn new(
        run_id: impl Into<String>,
        key: impl Into<String>,
        value: f64,
        timestamp: i64,
        step: i64,
    ) -> Self {
        Self {
            run_id: run_id.into(),
            key: key.into(),
            value,
            timestamp,
            step,
        }
    }

    /// Get the run ID.
    #[must_use]
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Get the metric key/name.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Get the metric value.
    #[must_use]
    pub const fn value(&self) -> f64 {
        self.value
    }

    /// Get the timestamp in epoch millis.
    #[must_use]
    pub const fn timestamp(&self) -> i64 {
        self.timestamp
    }

    /// Get the step.
    #[must_use]
    pub const fn step(&self) -> i64 {
        self.step
    }
}
