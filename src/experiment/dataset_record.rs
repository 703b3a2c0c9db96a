//! Dataset Record - named references to external data, resolved to durable URIs

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::storage::S3Credentials;
use crate::{Error, Result};

/// Where a dataset's data lives.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SourceType {
    /// Local filesystem (uploaded on log)
    Local,
    /// S3-compatible object storage
    S3,
    /// Google Cloud Storage
    Gcs,
    /// Plain HTTP(S) location
    Url,
    /// Hugging Face hub
    HuggingFace,
    /// Anything else, kept verbatim
    Other(String),
}

impl SourceType {
    /// Canonical lowercase name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Local => "local",
            Self::S3 => "s3",
            Self::Gcs => "gcs",
            Self::Url => "url",
            Self::HuggingFace => "hf",
            Self::Other(s) => s,
        }
    }
}

impl From<&str> for SourceType {
    fn from(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "local" | "file" => Self::Local,
            "s3" => Self::S3,
            "gcs" | "gs" => Self::Gcs,
            "url" | "http" | "https" => Self::Url,
            "hf" | "huggingface" => Self::HuggingFace,
            _ => Self::Other(s.to_string()),
        }
    }
}

impl From<String> for SourceType {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

impl From<SourceType> for String {
    fn from(s: SourceType) -> Self {
        s.as_str().to_string()
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request to log a dataset.
///
/// Carries either an explicit `uri` or a local `file_path` (plus optional
/// `s3_auth` override). If both are set the uri wins and nothing is uploaded.
/// `schema` and `profile` are opaque documents passed through untouched.
///
/// ```rust
/// use trueno_registry::experiment::{DatasetDescriptor, SourceType};
///
/// let dataset = DatasetDescriptor::new("dataset_1", SourceType::S3)
///     .with_uri("s3://datasets/test")
///     .with_schema_json(r#"{"epochs": {}}"#)?
///     .with_profile("random_profile");
/// assert_eq!(dataset.uri(), Some("s3://datasets/test"));
/// # Ok::<(), trueno_registry::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct DatasetDescriptor {
    name: String,
    source_type: SourceType,
    uri: Option<String>,
    file_path: Option<PathBuf>,
    s3_auth: Option<S3Credentials>,
    schema: serde_json::Value,
    profile: serde_json::Value,
    description: Option<String>,
}

impl DatasetDescriptor {
    /// Create a descriptor with no source yet.
    #[must_use]
    pub fn new(name: impl Into<String>, source_type: impl Into<SourceType>) -> Self {
        Self {
            name: name.into(),
            source_type: source_type.into(),
            uri: None,
            file_path: None,
            s3_auth: None,
            schema: serde_json::Value::Null,
            profile: serde_json::Value::Null,
            description: None,
        }
    }

    /// Point at data that is already addressable.
    #[must_use]
    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    /// Point at a local file or directory to upload.
    #[must_use]
    pub fn with_file_path(mut self, path: impl AsRef<Path>) -> Self {
        self.file_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Override the ambient storage credentials for the upload.
    #[must_use]
    pub fn with_s3_auth(mut self, credentials: S3Credentials) -> Self {
        self.s3_auth = Some(credentials);
        self
    }

    /// Set the schema document.
    #[must_use]
    pub fn with_schema(mut self, schema: serde_json::Value) -> Self {
        self.schema = schema;
        self
    }

    /// Parse and set the schema from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns `Error::Other` if the string is not well-formed JSON.
    pub fn with_schema_json(mut self, schema: &str) -> Result<Self> {
        self.schema = serde_json::from_str(schema).map_err(|e| {
            Error::Other(format!("dataset {:?} schema is not valid JSON: {e}", self.name))
        })?;
        Ok(self)
    }

    /// Set the profile blob.
    #[must_use]
    pub fn with_profile(mut self, profile: impl Into<serde_json::Value>) -> Self {
        self.profile = profile.into();
        self
    }

    /// Attach a description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Dataset name (its key within the run).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared source type.
    #[must_use]
    pub const fn source_type(&self) -> &SourceType {
        &self.source_type
    }

    /// Explicit uri, if any.
    #[must_use]
    pub fn uri(&self) -> Option<&str> {
        self.uri.as_deref()
    }

    /// Local path, if any.
    #[must_use]
    pub fn file_path(&self) -> Option<&Path> {
        self.file_path.as_deref()
    }

    /// Credential override, if any.
    #[must_use]
    pub const fn s3_auth(&self) -> Option<&S3Credentials> {
        self.s3_auth.as_ref()
    }

    pub(crate) fn into_record(self, uri: String, source_type: SourceType) -> DatasetRecord {
        DatasetRecord {
            name: self.name,
            source_type,
            uri,
            schema: self.schema,
            profile: self.profile,
            description: self.description,
        }
    }
}

/// A committed dataset log. `uri` is always fully qualified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetRecord {
    name: String,
    source_type: SourceType,
    uri: String,
    schema: serde_json::Value,
    profile: serde_json::Value,
    description: Option<String>,
}

impl DatasetRecord {
    /// Get the dataset name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the source type.
    #[must_use]
    pub const fn source_type(&self) -> &SourceType {
        &self.source_type
    }

    /// Get the resolved uri.
    #[must_use]
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Get the schema document.
    #[must_use]
    pub const fn schema(&self) -> &serde_json::Value {
        &self.schema
    }

    /// Get the profile blob.
    #[must_use]
    pub const fn profile(&self) -> &serde_json::Value {
        &self.profile
    }

    /// Get the description, if any.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}
