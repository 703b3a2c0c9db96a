//! In-memory S3-style object store using `DashMap`.
//!
//! This is the default backend - objects are lost on process restart.
//! It produces `s3://bucket/key` URIs and can be locked down to a single
//! key pair to exercise credential failures.

use dashmap::DashMap;

use super::{ObjectStore, S3Credentials, TransferError};

/// In-memory object store keyed by `(bucket, key)`.
///
/// Thread-safe; concurrent uploads to distinct keys never contend on a
/// global lock.
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: DashMap<(String, String), Vec<u8>>,
    allowed_key: Option<(String, String)>,
}

impl MemoryObjectStore {
    /// Create a new store that accepts any complete credential set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Only accept the given access key id / secret pair.
    #[must_use]
    pub fn with_access_key(
        mut self,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
    ) -> Self {
        self.allowed_key = Some((access_key_id.into(), secret_access_key.into()));
        self
    }

    /// Fetch a stored object.
    #[must_use]
    pub fn get(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.objects
            .get(&(bucket.to_string(), key.to_string()))
            .map(|v| v.value().clone())
    }

    /// Keys stored in `bucket`, sorted.
    #[must_use]
    pub fn keys(&self, bucket: &str) -> Vec<String> {
        let mut keys: Vec<String> = self
            .objects
            .iter()
            .filter(|entry| entry.key().0 == bucket)
            .map(|entry| entry.key().1.clone())
            .collect();
        keys.sort();
        keys
    }

    /// Number of stored objects across all buckets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Check if the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    fn authorize(&self, credentials: &S3Credentials) -> Result<(), TransferError> {
        let denied = match &self.allowed_key {
            Some((id, secret)) => {
                credentials.access_key_id() != id || credentials.secret_access_key() != secret
            }
            None => credentials.access_key_id().is_empty(),
        };
        if denied {
            return Err(TransferError::AccessDenied {
                access_key_id: credentials.access_key_id().to_string(),
                bucket: credentials.bucket_name().to_string(),
            });
        }
        Ok(())
    }
}

impl ObjectStore for MemoryObjectStore {
    fn put(
        &self,
        credentials: &S3Credentials,
        key: &str,
        data: &[u8],
    ) -> Result<String, TransferError> {
        self.authorize(credentials)?;
        if key.is_empty() {
            return Err(TransferError::Failed {
                key: key.to_string(),
                reason: "object key is empty".to_string(),
            });
        }
        self.objects.insert(
            (credentials.bucket_name().to_string(), key.to_string()),
            data.to_vec(),
        );
        Ok(self.uri_for(credentials, key))
    }

    fn delete(&self, credentials: &S3Credentials, key: &str) -> Result<(), TransferError> {
        self.authorize(credentials)?;
        self.objects
            .remove(&(credentials.bucket_name().to_string(), key.to_string()));
        Ok(())
    }

    fn scheme(&self) -> &'static str {
        "s3"
    }
}
