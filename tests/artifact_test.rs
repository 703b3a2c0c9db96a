//! Artifact Resolution Tests
//!
//! Dataset logs backed by local files: credential precedence, environment
//! credentials, upload layout and rejected sources.

use std::sync::Arc;

use figment::Jail;
use trueno_registry::artifact::{AmbientCredentials, ArtifactError, ArtifactResolver};
use trueno_registry::experiment::{DatasetDescriptor, ExperimentStore, LogKind, SourceType};
use trueno_registry::storage::{MemoryObjectStore, ObjectStore, S3Credentials, TransferError};
use trueno_registry::Error;

fn credentials(access_key_id: &str) -> S3Credentials {
    S3Credentials::new(
        "http://localhost:9000",
        "datasets",
        "/team/",
        access_key_id,
        "secret",
        "us-east-1",
    )
}

fn write_file(dir: &std::path::Path, name: &str, data: &[u8]) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, data).unwrap();
    path
}

#[test]
fn test_single_file_upload_key_layout() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_file(dir.path(), "train.csv", b"x,y\n1,2\n");

    let objects = Arc::new(MemoryObjectStore::new());
    let resolver = ArtifactResolver::new(objects.clone())
        .with_ambient_credentials(AmbientCredentials::Fixed(Some(credentials("ambient"))));

    let resolved = resolver
        .resolve(&DatasetDescriptor::new("train", "local").with_file_path(&file), "")
        .unwrap();

    assert_eq!(resolved.uri, "s3://datasets/team/train.csv");
    assert_eq!(resolved.source_type, SourceType::S3);
    assert_eq!(resolved.uploaded_objects, 1);
    assert_eq!(
        objects.get("datasets", "team/train.csv").as_deref(),
        Some(&b"x,y\n1,2\n"[..])
    );
}

#[test]
fn test_explicit_credentials_override_ambient() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_file(dir.path(), "eval.csv", b"1\n");

    let objects = Arc::new(MemoryObjectStore::new().with_access_key("explicit", "secret"));
    let store = ExperimentStore::builder()
        .object_store(objects.clone())
        .ambient_credentials(AmbientCredentials::Fixed(Some(credentials("ambient"))))
        .build();
    let run = store.start_experiment_run("precedence").unwrap();

    let rejected = run.log_dataset(DatasetDescriptor::new("eval", "local").with_file_path(&file));
    assert!(matches!(
        rejected,
        Err(Error::ArtifactResolution(ArtifactError::Transfer(_)))
    ));

    let accepted = run
        .log_dataset(
            DatasetDescriptor::new("eval", "local")
                .with_file_path(&file)
                .with_s3_auth(credentials("explicit")),
        )
        .unwrap();
    // The rejected attempt used slot 0.
    assert_eq!(accepted.uri(), "s3://datasets/team/1/eval/1/eval.csv");
    assert_eq!(run.count(LogKind::Datasets), 1);
}

#[test]
fn test_environment_credentials() {
    Jail::expect_with(|jail| {
        jail.set_env("AWS_S3_ENDPOINT", "http://minio:9000");
        jail.set_env("AWS_S3_BUCKET", "env-bucket");
        jail.set_env("AWS_S3_PREFIX", "from-env");
        jail.set_env("AWS_ACCESS_KEY_ID", "env-id");
        jail.set_env("AWS_SECRET_ACCESS_KEY", "env-secret");
        jail.set_env("AWS_DEFAULT_REGION", "eu-west-1");
        jail.create_file("weights.bin", "0.1 0.2 0.3")?;

        let credentials = S3Credentials::from_env()
            .map_err(|e| figment::Error::from(e.to_string()))?
            .ok_or_else(|| figment::Error::from("no credentials".to_string()))?;
        assert_eq!(credentials.bucket_name(), "env-bucket");
        assert_eq!(credentials.s3_prefix(), "from-env");

        let store = ExperimentStore::new();
        let run = store.start_experiment_run("env").unwrap();
        let record = run
            .log_dataset(DatasetDescriptor::new("weights", "local").with_file_path("weights.bin"))
            .map_err(|e| figment::Error::from(e.to_string()))?;
        assert_eq!(record.uri(), "s3://env-bucket/from-env/1/weights/0/weights.bin");
        Ok(())
    });
}

#[test]
fn test_partial_environment_credentials_rejected() {
    Jail::expect_with(|jail| {
        jail.set_env("AWS_S3_BUCKET", "env-bucket");
        jail.set_env("AWS_ACCESS_KEY_ID", "env-id");

        match S3Credentials::from_env() {
            Err(ArtifactError::IncompleteCredentials { missing }) => {
                assert!(missing.contains(&"AWS_S3_ENDPOINT"));
                assert!(missing.contains(&"AWS_SECRET_ACCESS_KEY"));
                assert!(!missing.contains(&"AWS_S3_BUCKET"));
            }
            other => panic!("expected incomplete credentials, got {other:?}"),
        }
        Ok(())
    });
}

#[test]
fn test_unqualified_uri_rejected() {
    let store = ExperimentStore::builder()
        .ambient_credentials(AmbientCredentials::Fixed(None))
        .build();
    let run = store.start_experiment_run("uris").unwrap();

    let err = run
        .log_dataset(DatasetDescriptor::new("d", "local").with_uri("/tmp/data.csv"))
        .unwrap_err();
    assert!(matches!(
        err,
        Error::ArtifactResolution(ArtifactError::UnqualifiedUri(_))
    ));

    let err = run
        .log_dataset(DatasetDescriptor::new("d", "local"))
        .unwrap_err();
    assert!(matches!(
        err,
        Error::ArtifactResolution(ArtifactError::MissingSource)
    ));
    assert_eq!(run.log_count(), 0);
}

#[test]
fn test_missing_local_path_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let resolver = ArtifactResolver::new(Arc::new(MemoryObjectStore::new()))
        .with_ambient_credentials(AmbientCredentials::Fixed(Some(credentials("id"))));

    let missing = DatasetDescriptor::new("gone", "local").with_file_path(dir.path().join("gone"));
    let err = resolver.resolve(&missing, "").unwrap_err();
    assert!(matches!(err, ArtifactError::Io { .. }));
}

#[test]
fn test_empty_directory_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let objects = Arc::new(MemoryObjectStore::new());
    let resolver = ArtifactResolver::new(objects.clone())
        .with_ambient_credentials(AmbientCredentials::Fixed(Some(credentials("id"))));

    let err = resolver
        .resolve(&DatasetDescriptor::new("empty", "local").with_file_path(dir.path()), "")
        .unwrap_err();
    assert!(matches!(err, ArtifactError::EmptySource(_)));
    assert!(objects.is_empty());
}

#[test]
fn test_nested_directory_upload() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("corpus");
    std::fs::create_dir_all(root.join("shards")).unwrap();
    write_file(&root, "README", b"corpus");
    write_file(&root.join("shards"), "00.txt", b"a");
    write_file(&root.join("shards"), "01.txt", b"b");

    let objects = Arc::new(MemoryObjectStore::new());
    let resolver = ArtifactResolver::new(objects.clone())
        .with_ambient_credentials(AmbientCredentials::Fixed(Some(credentials("id"))));
    let resolved = resolver
        .resolve(
            &DatasetDescriptor::new("corpus", "local").with_file_path(&root),
            "sweep-3",
        )
        .unwrap();

    assert_eq!(resolved.uri, "s3://datasets/team/sweep-3/corpus");
    assert_eq!(resolved.uploaded_objects, 3);
    assert_eq!(
        objects.keys("datasets"),
        vec![
            "team/sweep-3/corpus/README",
            "team/sweep-3/corpus/shards/00.txt",
            "team/sweep-3/corpus/shards/01.txt",
        ]
    );
}

// =============================================================================
// Re-logging and shared directory names
// =============================================================================

/// Object store that refuses any key ending in `b.bin`.
struct RejectingStore {
    inner: MemoryObjectStore,
}

impl ObjectStore for RejectingStore {
    fn put(&self, c: &S3Credentials, key: &str, data: &[u8]) -> Result<String, TransferError> {
        if key.ends_with("b.bin") {
            return Err(TransferError::Failed {
                key: key.to_string(),
                reason: "quota exceeded".to_string(),
            });
        }
        self.inner.put(c, key, data)
    }

    fn delete(&self, c: &S3Credentials, key: &str) -> Result<(), TransferError> {
        self.inner.delete(c, key)
    }

    fn scheme(&self) -> &'static str {
        "s3"
    }
}

#[test]
fn test_failed_relog_keeps_committed_objects() {
    let dir = tempfile::tempdir().unwrap();
    let model = dir.path().join("model");
    std::fs::create_dir(&model).unwrap();
    write_file(&model, "a.bin", b"first");

    let objects = Arc::new(RejectingStore {
        inner: MemoryObjectStore::new(),
    });
    let store = ExperimentStore::builder()
        .object_store(objects.clone())
        .ambient_credentials(AmbientCredentials::Fixed(Some(credentials("id"))))
        .build();
    let run = store.start_experiment_run("relog").unwrap();

    let descriptor = || DatasetDescriptor::new("d", "local").with_file_path(&model);
    let committed = run.log_dataset(descriptor()).unwrap();
    let committed_keys = objects.inner.keys("datasets");

    write_file(&model, "b.bin", b"second");
    let err = run.log_dataset(descriptor()).unwrap_err();

    assert!(matches!(
        err,
        Error::ArtifactResolution(ArtifactError::Transfer(_))
    ));
    assert_eq!(run.dataset("d").unwrap(), committed);
    assert_eq!(objects.inner.keys("datasets"), committed_keys);
    let key = committed.uri().trim_start_matches("s3://datasets/");
    assert_eq!(
        objects.inner.get("datasets", &format!("{key}/a.bin")).as_deref(),
        Some(&b"first"[..])
    );
}

#[test]
fn test_runs_uploading_same_directory_do_not_collide() {
    let dir = tempfile::tempdir().unwrap();
    let model = dir.path().join("model");
    std::fs::create_dir(&model).unwrap();
    let weights = write_file(&model, "weights.bin", b"v1");

    let objects = Arc::new(MemoryObjectStore::new());
    let store = ExperimentStore::builder()
        .object_store(objects.clone())
        .ambient_credentials(AmbientCredentials::Fixed(Some(credentials("id"))))
        .build();

    let first = store.start_experiment_run("shared-dir").unwrap();
    let first_uri = first
        .log_dataset(DatasetDescriptor::new("model", "local").with_file_path(&model))
        .unwrap()
        .uri()
        .to_string();
    first.finish();

    std::fs::write(&weights, b"v2").unwrap();
    let second = store.start_experiment_run("shared-dir").unwrap();
    let second_uri = second
        .log_dataset(DatasetDescriptor::new("model", "local").with_file_path(&model))
        .unwrap()
        .uri()
        .to_string();
    second.finish();

    assert_ne!(first_uri, second_uri);
    assert_eq!(objects.len(), 2);
    let first_key = first_uri.trim_start_matches("s3://datasets/");
    assert_eq!(
        objects.get("datasets", &format!("{first_key}/weights.bin")).as_deref(),
        Some(&b"v1"[..])
    );
}
