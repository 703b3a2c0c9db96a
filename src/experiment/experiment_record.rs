//! Experiment Record - named grouping of runs

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Registry-assigned experiment identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ExperimentId(pub u64);

impl fmt::Display for ExperimentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Soft lifecycle state of an experiment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ExperimentState {
    /// Active experiment.
    #[default]
    Live,
    /// Marked as retired. Informational only: still listed and still accepts runs.
    Archived,
}

/// Experiment Record represents a tracked experiment.
///
/// This is the root entity in the tracking schema. The name is unique
/// within a registry; everything except the lifecycle state, description
/// and custom properties is immutable after creation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExperimentRecord {
    experiment_id: ExperimentId,
    name: String,
    external_id: Option<String>,
    description: Option<String>,
    state: ExperimentState,
    custom_properties: BTreeMap<String, serde_json::Value>,
    created_at: DateTime<Utc>,
    last_updated_at: DateTime<Utc>,
}

impl ExperimentRecord {
    /// Create a new live experiment record with the current timestamp.
    #[must_use]
    pub fn new(experiment_id: ExperimentId, name: impl Into<String>) -> Self {
        ExperimentRecordBuilder::new(experiment_id, name).build()
    }

    /// Create a builder for constructing an experiment record with optional fields.
    #[must_use]
    pub fn builder(
        experiment_id: ExperimentId,
        name: impl Into<String>,
    ) -> ExperimentRecordBuilder {
        ExperimentRecordBuilder::new(experiment_id, name)
    }

    /// Get the experiment ID.
    #[must_use]
    pub const fn experiment_id(&self) -> ExperimentId {
        self.experiment_id
    }

    /// Get the experiment name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the caller-supplied external ID, if any.
    #[must_use]
    pub fn external_id(&self) -> Option<&str> {
        self.external_id.as_deref()
    }

    /// Get the description, if any.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Get the lifecycle state.
    #[must_use]
    pub const fn state(&self) -> ExperimentState {
        self.state
    }

    /// Get the custom properties.
    #[must_use]
    pub const fn custom_properties(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.custom_properties
    }

    /// Get the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Get the last update timestamp (bumped when runs are added or state changes).
    #[must_use]
    pub const fn last_updated_at(&self) -> DateTime<Utc> {
        self.last_updated_at
    }

    pub(crate) fn set_state(&mut self, state: ExperimentState) {
        self.state = state;
        self.touch();
    }

    pub(crate) fn touch(&mut self) {
        self.last_updated_at = Utc::now().max(self.last_updated_at);
    }
}

/// Builder for `ExperimentRecord`.
#[derive(Debug)]
pub struct ExperimentRecordBuilder {
    experiment_id: ExperimentId,
    name: String,
    external_id: Option<String>,
    description: Option<String>,
    custom_properties: BTreeMap<String, serde_json::Value>,
    created_at: DateTime<Utc>,
}

impl ExperimentRecordBuilder {
    /// Create a new builder with required fields.
    #[must_use]
    pub fn new(experiment_id: ExperimentId, name: impl Into<String>) -> Self {
        Self {
            experiment_id,
            name: name.into(),
            external_id: None,
            description: None,
            custom_properties: BTreeMap::new(),
            created_at: Utc::now(),
        }
    }

    /// Set the external ID.
    #[must_use]
    pub fn external_id(mut self, external_id: impl Into<String>) -> Self {
        self.external_id = Some(external_id.into());
        self
    }

    /// Set the description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Add a custom property.
    #[must_use]
    pub fn custom_property(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.custom_properties.insert(key.into(), value);
        self
    }

    /// Set a custom creation timestamp (useful for deserialization/testing).
    #[must_use]
    pub const fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    /// Replace the id, for records configured before their id is allocated.
    #[must_use]
    pub(crate) const fn assign_id(mut self, experiment_id: ExperimentId) -> Self {
        self.experiment_id = experiment_id;
        self
    }

    /// Build the `ExperimentRecord`.
    #[must_use]
    pub fn build(self) -> ExperimentRecord {
        ExperimentRecord {
            experiment_id: self.experiment_id,
            name: self.name,
            external_id: self.external_id,
            description: self.description,
            state: ExperimentState::Live,
            custom_properties: self.custom_properties,
            created_at: self.created_at,
            last_updated_at: self.created_at,
        }
    }
}
