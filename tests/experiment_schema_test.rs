//! Experiment Schema Tests
//!
//! Record types, their builders and their serialized forms.

use trueno_registry::experiment::{
    DatasetDescriptor, ExperimentId, ExperimentRecord, ExperimentState, LogKind, LogRecord,
    MetricRecord, ParamRecord, ParamValue, RunId, RunRecord, RunStatus, SourceType,
};

// =============================================================================
// ExperimentRecord Tests
// =============================================================================

#[test]
fn test_experiment_record_creation() {
    let record = ExperimentRecord::new(ExperimentId(1), "My Experiment");

    assert_eq!(record.experiment_id(), ExperimentId(1));
    assert_eq!(record.name(), "My Experiment");
    assert_eq!(record.state(), ExperimentState::Live);
    assert!(record.created_at().timestamp() > 0);
    assert!(record.external_id().is_none());
    assert!(record.custom_properties().is_empty());
}

#[test]
fn test_experiment_record_builder() {
    let record = ExperimentRecord::builder(ExperimentId(2), "Training Run")
        .external_id("jira-42")
        .description("baseline sweep")
        .custom_property("team", serde_json::json!("vision"))
        .build();

    assert_eq!(record.external_id(), Some("jira-42"));
    assert_eq!(record.description(), Some("baseline sweep"));
    assert_eq!(
        record.custom_properties().get("team"),
        Some(&serde_json::json!("vision"))
    );
}

#[test]
fn test_experiment_record_serialization() {
    let record = ExperimentRecord::new(ExperimentId(3), "Serialization Test");

    let json = serde_json::to_string(&record).expect("serialization failed");
    assert!(json.contains("\"LIVE\""));
    let deserialized: ExperimentRecord =
        serde_json::from_str(&json).expect("deserialization failed");

    assert_eq!(record, deserialized);
}

// =============================================================================
// RunRecord Tests
// =============================================================================

#[test]
fn test_run_record_lifecycle() {
    let mut run = RunRecord::new(RunId(1), ExperimentId(1), "run-a");
    assert_eq!(run.status(), RunStatus::Created);
    assert!(run.started_at().is_none());

    run.start();
    assert_eq!(run.status(), RunStatus::Running);
    assert!(run.started_at().is_some());

    assert!(run.complete(RunStatus::Finished));
    assert_eq!(run.status(), RunStatus::Finished);
    assert!(run.ended_at().is_some());
}

#[test]
fn test_run_record_completes_once() {
    let mut run = RunRecord::new(RunId(2), ExperimentId(1), "run-b");
    run.start();
    assert!(run.complete(RunStatus::Failed));
    assert!(!run.complete(RunStatus::Finished));
    assert_eq!(run.status(), RunStatus::Failed);
}

#[test]
fn test_run_status_serialization() {
    assert_eq!(
        serde_json::to_string(&RunStatus::Finished).unwrap(),
        "\"FINISHED\""
    );
    assert!(RunStatus::Failed.is_terminal());
    assert!(!RunStatus::Running.is_terminal());
}

// =============================================================================
// Log Record Tests
// =============================================================================

#[test]
fn test_param_values() {
    assert_eq!(ParamValue::from(3).as_f64(), Some(3.0));
    assert_eq!(ParamValue::from("adam").as_str(), Some("adam"));
    assert_eq!(ParamValue::from(true).as_f64(), None);

    let param = ParamRecord::new("lr", 0.01).with_description("learning rate");
    assert_eq!(param.name(), "lr");
    assert_eq!(param.value(), &ParamValue::Double(0.01));
    assert_eq!(param.description(), Some("learning rate"));
}

#[test]
fn test_metric_record_fields() {
    let metric = MetricRecord::new("loss", 0.25, 10, "1700000000").with_description("train loss");

    assert_eq!(metric.name(), "loss");
    assert!((metric.value() - 0.25).abs() < f64::EPSILON);
    assert_eq!(metric.step(), 10);
    assert_eq!(metric.timestamp(), "1700000000");
    assert_eq!(metric.description(), Some("train loss"));
}

#[test]
fn test_source_type_parsing() {
    assert_eq!(SourceType::from("s3"), SourceType::S3);
    assert_eq!(SourceType::from("HF"), SourceType::HuggingFace);
    assert_eq!(SourceType::from("local"), SourceType::Local);
    assert_eq!(
        SourceType::from("delta"),
        SourceType::Other("delta".to_string())
    );
}

#[test]
fn test_dataset_descriptor_schema_json() {
    let descriptor = DatasetDescriptor::new("iris", "url")
        .with_uri("https://example.com/iris.csv")
        .with_schema_json(r#"{"columns": ["sepal_length", "species"]}"#)
        .unwrap();
    assert_eq!(descriptor.uri(), Some("https://example.com/iris.csv"));

    let bad = DatasetDescriptor::new("iris", "url").with_schema_json("{not json");
    assert!(bad.is_err());
}

#[test]
fn test_log_record_tagged_serialization() {
    let log = LogRecord::Param(ParamRecord::new("epochs", 5));
    let json = serde_json::to_value(&log).unwrap();

    assert_eq!(json["kind"], "param");
    assert_eq!(json["name"], "epochs");
    assert_eq!(log.kind(), LogKind::Params);
    assert!(log.as_metric().is_none());
}

#[test]
fn test_log_kind_parsing() {
    for kind in LogKind::ALL {
        assert_eq!(kind.as_str().parse::<LogKind>().unwrap(), kind);
    }
    assert!("Params".parse::<LogKind>().is_err());
    assert!("artifacts".parse::<LogKind>().is_err());
}
