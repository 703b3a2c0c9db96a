//! Artifact resolution for dataset logs
//!
//! A dataset log names its data either by an explicit URI or by a local
//! file/directory. [`ArtifactResolver`] turns either form into a durable,
//! fully-qualified URI, uploading local data through an
//! [`ObjectStore`](crate::storage::ObjectStore) when needed.
//!
//! ## Resolution order
//!
//! ```text
//! explicit uri ──────────────────────────────────────────► uri (no upload)
//! local path ─► credentials (override > ambient) ─► upload ─► s3://bucket/prefix/scope/name
//! neither ───────────────────────────────────────────────► ArtifactError::MissingSource
//! ```

mod resolver;

pub use resolver::{AmbientCredentials, ArtifactResolver, ResolvedArtifact};

use std::path::PathBuf;

use thiserror::Error;

use crate::storage::TransferError;

/// Reasons a dataset artifact could not be resolved.
///
/// None of these leave a dataset entry behind: resolution happens before
/// anything is committed to the run.
#[derive(Error, Debug)]
pub enum ArtifactError {
    /// Neither a URI nor a local path was supplied
    #[error("dataset has neither a uri nor a local file path")]
    MissingSource,

    /// Explicit URI has no scheme (looks like a bare filesystem path)
    #[error("uri {0:?} is not fully qualified; pass local data as file_path instead")]
    UnqualifiedUri(String),

    /// No override and no ambient credentials available for an upload
    #[error("no storage credentials: pass s3_auth or set the AWS_* environment variables")]
    MissingCredentials,

    /// Only part of a credential set was supplied
    #[error("incomplete storage credentials, missing: {}", missing.join(", "))]
    IncompleteCredentials {
        /// Names of the absent fields
        missing: Vec<&'static str>,
    },

    /// Credentials could not be read
    #[error("invalid storage credentials: {0}")]
    InvalidCredentials(String),

    /// Local directory contains no files to upload
    #[error("nothing to upload under {0:?}")]
    EmptySource(PathBuf),

    /// Local data could not be read
    #[error("cannot read {path:?}: {source}")]
    Io {
        /// Path that failed
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// Object store rejected or failed the upload
    #[error("upload failed: {0}")]
    Transfer(#[from] TransferError),
}
