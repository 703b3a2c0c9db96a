//! Artifact Resolver - local path / explicit uri -> durable uri

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, warn};

use super::ArtifactError;
use crate::experiment::{DatasetDescriptor, SourceType};
use crate::storage::{ObjectStore, S3Credentials};

/// Where credentials come from when a descriptor carries no `s3_auth`.
#[derive(Debug, Clone, Default)]
pub enum AmbientCredentials {
    /// Read the `AWS_*` environment variables at resolution time.
    #[default]
    Environment,
    /// Use a fixed set (or none at all).
    Fixed(Option<S3Credentials>),
}

impl AmbientCredentials {
    fn load(&self) -> Result<Option<S3Credentials>, ArtifactError> {
        match self {
            Self::Environment => S3Credentials::from_env(),
            Self::Fixed(creds) => Ok(creds.clone()),
        }
    }
}

/// Outcome of a successful resolution.
///
/// Remembers what an upload wrote so it can be
/// [`discard`](ArtifactResolver::discard)ed if the entry is never committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedArtifact {
    /// Fully-qualified location of the dataset
    pub uri: String,
    /// Source type recorded on the dataset entry
    pub source_type: SourceType,
    /// Number of objects written (0 when the uri was passed through)
    pub uploaded_objects: usize,
    credentials: Option<S3Credentials>,
    written: Vec<String>,
}

impl ResolvedArtifact {
    /// Object keys written by the upload, in upload order.
    #[must_use]
    pub fn object_keys(&self) -> &[String] {
        &self.written
    }
}

/// Turns dataset descriptors into durable URIs.
///
/// An explicit uri always wins and is passed through unchanged. A local path
/// is uploaded under `{bucket}/{prefix}/{scope}/{file or directory name}`,
/// where the caller picks a scope no earlier upload used. Rollback after a
/// failed transfer therefore only ever deletes objects this upload created.
pub struct ArtifactResolver {
    store: Arc<dyn ObjectStore>,
    ambient: AmbientCredentials,
}

impl ArtifactResolver {
    /// Create a resolver over an object store, with environment-sourced
    /// ambient credentials.
    #[must_use]
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            store,
            ambient: AmbientCredentials::Environment,
        }
    }

    /// Replace the ambient credential source.
    #[must_use]
    pub fn with_ambient_credentials(mut self, ambient: AmbientCredentials) -> Self {
        self.ambient = ambient;
        self
    }

    /// Resolve a descriptor to its final uri and source type.
    ///
    /// Uploaded objects are keyed under `scope` (empty for the bare prefix).
    ///
    /// # Errors
    ///
    /// Returns [`ArtifactError`] if no source is given, the uri is not fully
    /// qualified, credentials are missing or partial, local data cannot be
    /// read, or the upload fails. Nothing stays uploaded on failure.
    pub fn resolve(
        &self,
        descriptor: &DatasetDescriptor,
        scope: &str,
    ) -> Result<ResolvedArtifact, ArtifactError> {
        if let Some(uri) = descriptor.uri() {
            if !uri.contains("://") {
                return Err(ArtifactError::UnqualifiedUri(uri.to_string()));
            }
            return Ok(ResolvedArtifact {
                uri: uri.to_string(),
                source_type: descriptor.source_type().clone(),
                uploaded_objects: 0,
                credentials: None,
                written: Vec::new(),
            });
        }

        let path = descriptor.file_path().ok_or(ArtifactError::MissingSource)?;
        let credentials = self.credentials_for(descriptor)?;
        self.upload(path, descriptor.name(), scope, credentials)
    }

    /// Delete the objects an upload wrote. A passed-through uri is left alone.
    pub fn discard(&self, resolved: &ResolvedArtifact) {
        if let Some(credentials) = &resolved.credentials {
            debug!(uri = %resolved.uri, objects = resolved.written.len(), "discarding upload");
            self.rollback(credentials, &resolved.written);
        }
    }

    fn credentials_for(
        &self,
        descriptor: &DatasetDescriptor,
    ) -> Result<S3Credentials, ArtifactError> {
        let credentials = match descriptor.s3_auth() {
            Some(explicit) => explicit.clone(),
            None => self.ambient.load()?.ok_or(ArtifactError::MissingCredentials)?,
        };
        credentials.validate()?;
        Ok(credentials)
    }

    fn upload(
        &self,
        path: &Path,
        dataset_name: &str,
        scope: &str,
        credentials: S3Credentials,
    ) -> Result<ResolvedArtifact, ArtifactError> {
        let root_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .filter(|n| !n.is_empty())
            .unwrap_or(dataset_name);
        let scope = scope.trim_matches('/');
        let root_key = if scope.is_empty() {
            credentials.object_key(root_name)
        } else {
            credentials.object_key(&format!("{scope}/{root_name}"))
        };

        let files = collect_files(path)?;
        if files.is_empty() {
            return Err(ArtifactError::EmptySource(path.to_path_buf()));
        }

        let mut written: Vec<String> = Vec::with_capacity(files.len());
        for (file, relative) in &files {
            let key = match relative {
                Some(rel) => format!("{root_key}/{rel}"),
                None => root_key.clone(),
            };
            let result = std::fs::read(file)
                .map_err(|source| ArtifactError::Io {
                    path: file.clone(),
                    source,
                })
                .and_then(|data| {
                    self.store
                        .put(&credentials, &key, &data)
                        .map_err(ArtifactError::from)
                });

            match result {
                Ok(uri) => {
                    debug!(%uri, source = %file.display(), "uploaded dataset object");
                    written.push(key);
                }
                Err(err) => {
                    self.rollback(&credentials, &written);
                    return Err(err);
                }
            }
        }

        Ok(ResolvedArtifact {
            uri: self.store.uri_for(&credentials, &root_key),
            source_type: SourceType::from(self.store.scheme()),
            uploaded_objects: written.len(),
            credentials: Some(credentials),
            written,
        })
    }

    fn rollback(&self, credentials: &S3Credentials, written: &[String]) {
        for key in written {
            if let Err(err) = self.store.delete(credentials, key) {
                warn!(key = %key, error = %err, "failed to roll back partial dataset upload");
            }
        }
    }
}

impl std::fmt::Debug for ArtifactResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtifactResolver")
            .field("scheme", &self.store.scheme())
            .field("ambient", &self.ambient)
            .finish()
    }
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> ArtifactError {
    let path = path.to_path_buf();
    move |source| ArtifactError::Io { path, source }
}

/// Files to upload, each with its slash-separated path relative to `root`
/// (`None` when `root` itself is a file). Sorted for a stable upload order.
fn collect_files(root: &Path) -> Result<Vec<(PathBuf, Option<String>)>, ArtifactError> {
    let meta = std::fs::metadata(root).map_err(io_error(root))?;
    if meta.is_file() {
        return Ok(vec![(root.to_path_buf(), None)]);
    }

    let mut files = Vec::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        for entry in std::fs::read_dir(&dir).map_err(io_error(&dir))? {
            let entry = entry.map_err(io_error(&dir))?;
            let path = entry.path();
            if entry.file_type().map_err(io_error(&path))?.is_dir() {
                pending.push(path);
            } else {
                let relative = path
                    .strip_prefix(root)
                    .unwrap_or(path.as_path())
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect::<Vec<_>>()
                    .join("/");
                files.push((path, Some(relative)));
            }
        }
    }
    files.sort_by(|a, b| a.1.cmp(&b.1));
    Ok(files)
}
