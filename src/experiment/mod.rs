//! Experiment Tracking
//!
//! Experiments group runs; each run owns three keyed log collections.
//!
//! ## Schema Overview
//!
//! ```text
//! ExperimentRecord (1) ──< RunRecord (N)
//!                              │
//!                              ├──< ParamRecord (N)   [upsert by key]
//!                              ├──< MetricRecord (N)  [append, latest by key]
//!                              └──< DatasetRecord (N) [upsert by name]
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use trueno_registry::experiment::{ExperimentStore, LogKind, RunStatus};
//!
//! let store = ExperimentStore::new();
//!
//! let run = store.start_experiment_run("churn-model")?;
//! run.log_param("max_depth", 6)?;
//! run.log_metric("auc", 0.91, 0, "1700000000")?;
//! let run = run.finish();
//!
//! assert_eq!(run.status(), RunStatus::Finished);
//! assert_eq!(run.count(LogKind::Params), 1);
//! assert_eq!(run.get_log("metrics", "auc")?.name(), "auc");
//! # Ok::<(), trueno_registry::Error>(())
//! ```

mod collection;
mod dataset_record;
mod experiment_record;
mod log_record;
mod metric_record;
mod param_record;
mod run;
mod run_record;
mod store;

pub use collection::{
    Append, DatasetCollection, Keyed, LogCollection, MetricCollection, MutationPolicy,
    ParamCollection, Upsert,
};
pub use dataset_record::{DatasetDescriptor, DatasetRecord, SourceType};
pub use experiment_record::{
    ExperimentId, ExperimentRecord, ExperimentRecordBuilder, ExperimentState,
};
pub use log_record::{LogKind, LogRecord};
pub use metric_record::MetricRecord;
pub use param_record::{ParamRecord, ParamValue};
pub use run::{RunContext, RunScope};
pub use run_record::{RunId, RunRecord, RunStatus};
pub use store::{ExperimentStore, ExperimentStoreBuilder, RunQuery};
