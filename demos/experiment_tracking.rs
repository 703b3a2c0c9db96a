//! Experiment Tracking Example
//!
//! Walks through a training run end to end: params, a metric curve, a local
//! dataset uploaded to an in-memory object store, then paged read-back.
//!
//! Run with: cargo run --example experiment_tracking
//! Set `RUST_LOG=trueno_registry=debug` to see store events.

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;
use trueno_registry::artifact::AmbientCredentials;
use trueno_registry::experiment::{DatasetDescriptor, ExperimentStore, LogKind, RunQuery};
use trueno_registry::storage::{MemoryObjectStore, S3Credentials};
use trueno_registry::{ListOptions, RegistryConfig};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== Trueno-Registry Experiment Tracking ===\n");

    let config = RegistryConfig::load(None).context("loading registry config")?;
    let objects = Arc::new(MemoryObjectStore::new());
    let store = ExperimentStore::builder()
        .object_store(objects.clone())
        .ambient_credentials(AmbientCredentials::Fixed(Some(S3Credentials::new(
            "http://localhost:9000",
            "datasets",
            "demo",
            "minio",
            "minio123",
            "us-east-1",
        ))))
        .config(config)
        .build();

    // -------------------------------------------------------------------------
    // 1. Open a run (the experiment is created on first use)
    // -------------------------------------------------------------------------
    println!("1. Starting run...");

    let run = store.start_experiment_run("resnet50-imagenet")?;
    println!("   Run: {} ({:?})", run.info().name(), run.status());

    run.log_param("model", "resnet50")?;
    run.log_param("learning_rate", 0.001)?;
    run.log_param("batch_size", 32)?;

    // -------------------------------------------------------------------------
    // 2. Simulate training with metric logging
    // -------------------------------------------------------------------------
    println!("\n2. Simulating training (10 epochs)...");

    for epoch in 0..10_i32 {
        let loss = 2.5 / (f64::from(epoch) + 1.0) + 0.1;
        let accuracy = 0.05f64.mul_add(f64::from(epoch), 0.5);
        let timestamp = chrono::Utc::now().timestamp_millis().to_string();
        run.log_metric("loss", loss, i64::from(epoch), timestamp.as_str())?;
        run.log_metric("accuracy", accuracy, i64::from(epoch), timestamp)?;
        println!("   Epoch {epoch}: loss={loss:.4}, accuracy={accuracy:.4}");
    }

    // -------------------------------------------------------------------------
    // 3. Log the evaluation dataset from a local file
    // -------------------------------------------------------------------------
    println!("\n3. Logging dataset...");

    let data_dir = std::env::temp_dir().join("trueno-registry-demo");
    std::fs::create_dir_all(&data_dir)?;
    let eval_file = data_dir.join("eval.csv");
    std::fs::write(&eval_file, "label,pixels\n3,0 0 1\n")?;

    let dataset = run.log_dataset(
        DatasetDescriptor::new("imagenet-eval", "local")
            .with_file_path(&eval_file)
            .with_schema_json(r#"{"label": "int", "pixels": "string"}"#)?
            .with_profile(serde_json::json!({"rows": 1})),
    )?;
    println!("   Uploaded to {}", dataset.uri());
    println!("   Objects in store: {}", objects.len());

    let run = run.finish();
    println!("\n4. Run finished: {:?}", run.status());

    // -------------------------------------------------------------------------
    // 5. Read it back
    // -------------------------------------------------------------------------
    println!("\n5. Reading logs back...");
    println!(
        "   params={} metrics={} datasets={}",
        run.count(LogKind::Params),
        run.count(LogKind::Metrics),
        run.count(LogKind::Datasets)
    );

    let curve: Vec<String> = run
        .metric_history("loss")
        .iter()
        .map(|m| format!("{:.3}", m.value()))
        .collect();
    println!("   Loss curve: {}", curve.join(" -> "));

    let mut logs =
        store.get_experiment_run_logs_with(run.id(), ListOptions::default().with_page_size(8))?;
    let mut total = 0;
    while logs.next_item()?.is_some() {
        total += 1;
    }
    println!("   {total} log entries over {} pages", logs.pages_fetched());

    let runs = store.get_experiment_runs(&RunQuery::by_name("resnet50-imagenet"))?;
    println!("   Runs in experiment: {}", runs.count());

    println!("\n6. MetricRecord JSON:");
    let last = run.metric("accuracy")?;
    println!("{}", serde_json::to_string_pretty(&last)?);

    println!("\n=== Experiment Tracking Complete ===");
    Ok(())
}
