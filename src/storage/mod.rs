//! Object storage capability for dataset artifacts
//!
//! The registry never talks to a storage service directly. Dataset uploads go
//! through the [`ObjectStore`] trait, which takes bytes plus a destination and
//! hands back a fully-qualified URI (or a [`TransferError`]).
//!
//! # Example
//!
//! ```rust
//! use trueno_registry::storage::{MemoryObjectStore, ObjectStore, S3Credentials};
//!
//! let store = MemoryObjectStore::new();
//! let creds = S3Credentials::new(
//!     "http://localhost:9000", "datasets", "runs", "minio", "minio123", "us-east-1",
//! );
//!
//! let uri = store.put(&creds, "runs/train.csv", b"a,b\n1,2\n").unwrap();
//! assert_eq!(uri, "s3://datasets/runs/train.csv");
//! ```

mod credentials;
mod memory;

pub use credentials::S3Credentials;
pub use memory::MemoryObjectStore;

use thiserror::Error;

/// Failure reported by an object-storage backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransferError {
    /// Backend rejected the supplied credentials
    #[error("access denied for key id {access_key_id:?} on bucket {bucket:?}")]
    AccessDenied {
        /// Access key id that was rejected
        access_key_id: String,
        /// Target bucket
        bucket: String,
    },

    /// Object could not be written or removed
    #[error("transfer of {key:?} failed: {reason}")]
    Failed {
        /// Object key within the bucket
        key: String,
        /// Backend-specific reason
        reason: String,
    },
}

/// Object storage capability consumed by the artifact resolver.
///
/// Implementations must be all-or-nothing per object: `put` either stores the
/// full payload and returns its URI, or stores nothing.
pub trait ObjectStore: Send + Sync {
    /// Store `data` under `key` in the credentials' bucket and return its URI.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError`] if the credentials are rejected or the write fails.
    fn put(&self, credentials: &S3Credentials, key: &str, data: &[u8])
        -> Result<String, TransferError>;

    /// Remove a previously stored object. Removing a missing object is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError`] if the credentials are rejected or the delete fails.
    fn delete(&self, credentials: &S3Credentials, key: &str) -> Result<(), TransferError>;

    /// URI scheme produced by this backend (e.g. `"s3"`).
    fn scheme(&self) -> &'static str;

    /// URI addressing `key` (or a key prefix) inside the credentials' bucket.
    fn uri_for(&self, credentials: &S3Credentials, key: &str) -> String {
        format!(
            "{}://{}/{}",
            self.scheme(),
            credentials.bucket_name(),
            key.trim_start_matches('/')
        )
    }
}
