//! Metric Record - append-only time-series metrics for runs

use serde::{Deserialize, Serialize};

/// Metric Record represents a single metric data point.
///
/// Metrics are never overwritten: every log call appends a record. Two
/// records may share both name and step; `sequence` (assigned by the run on
/// append, strictly increasing) tells them apart.
///
/// `step` and `timestamp` are stored exactly as the caller supplied them.
/// The timestamp is an opaque string and is never parsed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricRecord {
    name: String,
    value: f64,
    step: i64,
    timestamp: String,
    description: Option<String>,
    sequence: u64,
}

impl MetricRecord {
    /// Create a new metric record.
    ///
    /// # Arguments
    ///
    /// * `name` - Metric name/key (e.g., "loss", "accuracy")
    /// * `value` - Metric value
    /// * `step` - Training step or epoch number
    /// * `timestamp` - Caller-supplied timestamp, stored verbatim
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        value: f64,
        step: i64,
        timestamp: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            value,
            step,
            timestamp: timestamp.into(),
            description: None,
            sequence: 0,
        }
    }

    /// Attach a description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Get the metric name/key.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the metric value.
    #[must_use]
    pub const fn value(&self) -> f64 {
        self.value
    }

    /// Get the step/epoch number.
    #[must_use]
    pub const fn step(&self) -> i64 {
        self.step
    }

    /// Get the caller-supplied timestamp.
    #[must_use]
    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    /// Get the description, if any.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Position of this record among the run's metric appends.
    #[must_use]
    pub const fn sequence(&self) -> u64 {
        self.sequence
    }

    pub(crate) fn with_sequence(mut self, sequence: u64) -> Self {
        self.sequence = sequence;
        self
    }
}
