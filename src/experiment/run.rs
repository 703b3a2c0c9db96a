//! Run Context - scoped logging API for one run
//!
//! A run is opened by [`ExperimentStore`](super::ExperimentStore), which hands
//! back a [`RunScope`]. The scope derefs to a [`RunContext`] for logging and
//! finalizes the run exactly once: explicitly through
//! [`finish`](RunScope::finish) / [`fail`](RunScope::fail), or from `Drop`
//! (FAILED while unwinding from a panic, FINISHED otherwise).
//!
//! All operations on one run are serialized by a per-run lock; distinct runs
//! never contend.

use std::ops::Deref;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{info, warn};

use super::{
    DatasetCollection, DatasetDescriptor, DatasetRecord, ExperimentId, LogKind, LogRecord,
    MetricCollection, MetricRecord, ParamCollection, ParamRecord, ParamValue, RunId, RunRecord,
    RunStatus,
};
use crate::artifact::ArtifactResolver;
use crate::{Error, Result};

#[derive(Debug)]
struct RunState {
    record: RunRecord,
    params: ParamCollection,
    metrics: MetricCollection,
    datasets: DatasetCollection,
    next_sequence: u64,
    next_upload: u64,
}

impl RunState {
    fn ensure_running(&self) -> Result<()> {
        match self.record.status() {
            RunStatus::Running => Ok(()),
            status => Err(Error::RunClosed {
                run_id: self.record.run_id().to_string(),
                status,
            }),
        }
    }
}

/// Handle to one run: logging while it is RUNNING, reading at any time.
///
/// Cheap to clone; all clones share the same run.
#[derive(Clone)]
pub struct RunContext {
    state: Arc<RwLock<RunState>>,
    resolver: Arc<ArtifactResolver>,
}

impl RunContext {
    pub(crate) fn open(mut record: RunRecord, resolver: Arc<ArtifactResolver>) -> Self {
        record.start();
        Self {
            state: Arc::new(RwLock::new(RunState {
                record,
                params: ParamCollection::new(LogKind::Params),
                metrics: MetricCollection::new(LogKind::Metrics),
                datasets: DatasetCollection::new(LogKind::Datasets),
                next_sequence: 0,
                next_upload: 0,
            })),
            resolver,
        }
    }

    /// Snapshot of the run's lifecycle metadata.
    #[must_use]
    pub fn info(&self) -> RunRecord {
        self.state.read().record.clone()
    }

    /// Run id.
    #[must_use]
    pub fn id(&self) -> RunId {
        self.state.read().record.run_id()
    }

    /// Parent experiment id.
    #[must_use]
    pub fn experiment_id(&self) -> ExperimentId {
        self.state.read().record.experiment_id()
    }

    /// Current status.
    #[must_use]
    pub fn status(&self) -> RunStatus {
        self.state.read().record.status()
    }

    /// Log (or overwrite) a parameter.
    ///
    /// # Errors
    ///
    /// Returns `Error::RunClosed` if the run has been finalized.
    pub fn log_param(&self, key: impl Into<String>, value: impl Into<ParamValue>) -> Result<()> {
        self.log_param_record(ParamRecord::new(key, value))
    }

    /// Log (or overwrite) a fully built parameter record.
    ///
    /// # Errors
    ///
    /// Returns `Error::RunClosed` if the run has been finalized.
    pub fn log_param_record(&self, param: ParamRecord) -> Result<()> {
        self.write(|state| state.params.put(param))
    }

    /// Append a metric data point. Returns the record's sequence number.
    ///
    /// # Errors
    ///
    /// Returns `Error::RunClosed` if the run has been finalized.
    pub fn log_metric(
        &self,
        key: impl Into<String>,
        value: f64,
        step: i64,
        timestamp: impl Into<String>,
    ) -> Result<u64> {
        self.log_metric_record(MetricRecord::new(key, value, step, timestamp))
    }

    /// Append a fully built metric record. Returns its sequence number.
    ///
    /// # Errors
    ///
    /// Returns `Error::RunClosed` if the run has been finalized.
    pub fn log_metric_record(&self, metric: MetricRecord) -> Result<u64> {
        self.write(|state| {
            let sequence = state.next_sequence;
            state.next_sequence += 1;
            state.metrics.put(metric.with_sequence(sequence));
            sequence
        })
    }

    /// Resolve a dataset's artifact and log (or overwrite) it under its name.
    ///
    /// Resolution (including any upload) runs outside the run lock. Each
    /// upload lands under `{run_id}/{dataset name}/{attempt}`, so a re-log
    /// never touches the objects behind the entry it replaces. Nothing is
    /// committed unless it succeeds, and an upload that finishes after the
    /// run was finalized is deleted again.
    ///
    /// # Errors
    ///
    /// Returns `Error::ArtifactResolution` if the artifact cannot be resolved
    /// (the run stays usable), or `Error::RunClosed` if the run is finalized.
    pub fn log_dataset(&self, dataset: DatasetDescriptor) -> Result<DatasetRecord> {
        let scope = self.write(|state| {
            let attempt = state.next_upload;
            state.next_upload += 1;
            format!("{}/{}/{attempt}", state.record.run_id(), dataset.name())
        })?;

        let resolved = self.resolver.resolve(&dataset, &scope)?;
        let record = dataset.into_record(resolved.uri.clone(), resolved.source_type.clone());

        let committed = record.clone();
        if let Err(err) = self.write(|state| state.datasets.put(committed)) {
            if resolved.uploaded_objects > 0 {
                warn!(
                    uri = record.uri(),
                    objects = resolved.uploaded_objects,
                    "run closed during dataset upload; discarding objects"
                );
                self.resolver.discard(&resolved);
            }
            return Err(err);
        }
        Ok(record)
    }

    /// All logs: params, then metrics, then datasets, each in insertion order.
    #[must_use]
    pub fn get_logs(&self) -> Vec<LogRecord> {
        let state = self.state.read();
        let params = state.params.iter().cloned().map(LogRecord::Param);
        let metrics = state.metrics.iter().cloned().map(LogRecord::Metric);
        let datasets = state.datasets.iter().cloned().map(LogRecord::Dataset);
        params.chain(metrics).chain(datasets).collect()
    }

    /// Total number of log records across the three kinds.
    #[must_use]
    pub fn log_count(&self) -> usize {
        let state = self.state.read();
        state.params.count() + state.metrics.count() + state.datasets.count()
    }

    /// Number of records of one kind.
    #[must_use]
    pub fn count(&self, kind: LogKind) -> usize {
        let state = self.state.read();
        match kind {
            LogKind::Params => state.params.count(),
            LogKind::Metrics => state.metrics.count(),
            LogKind::Datasets => state.datasets.count(),
        }
    }

    /// Look up a log by kind name (`"params"`, `"metrics"`, `"datasets"`).
    ///
    /// For metrics, the most recently appended record with the key wins.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownKind` for any other kind string and
    /// `Error::NotFound` if the key is absent.
    pub fn get_log(&self, kind: &str, key: &str) -> Result<LogRecord> {
        self.log_of_kind(kind.parse()?, key)
    }

    /// Look up a log by typed kind.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if the key is absent.
    pub fn log_of_kind(&self, kind: LogKind, key: &str) -> Result<LogRecord> {
        let state = self.state.read();
        Ok(match kind {
            LogKind::Params => LogRecord::Param(state.params.get(key)?.clone()),
            LogKind::Metrics => LogRecord::Metric(state.metrics.get(key)?.clone()),
            LogKind::Datasets => LogRecord::Dataset(state.datasets.get(key)?.clone()),
        })
    }

    /// Current value of a parameter.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if the key is absent.
    pub fn param(&self, key: &str) -> Result<ParamRecord> {
        self.state.read().params.get(key).cloned()
    }

    /// Most recent metric record for a key.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if the key is absent.
    pub fn metric(&self, key: &str) -> Result<MetricRecord> {
        self.state.read().metrics.get(key).cloned()
    }

    /// Current dataset record for a name.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if the name is absent.
    pub fn dataset(&self, name: &str) -> Result<DatasetRecord> {
        self.state.read().datasets.get(name).cloned()
    }

    /// Every record for a metric key, ordered by step (ties by append order).
    #[must_use]
    pub fn metric_history(&self, key: &str) -> Vec<MetricRecord> {
        let mut history: Vec<MetricRecord> = self
            .state
            .read()
            .metrics
            .iter()
            .filter(|m| m.name() == key)
            .cloned()
            .collect();
        history.sort_by_key(|m| (m.step(), m.sequence()));
        history
    }

    /// Transition to a terminal status. Returns `false` if already finalized.
    pub(crate) fn finalize(&self, status: RunStatus) -> bool {
        let mut state = self.state.write();
        let changed = state.record.complete(status);
        if changed {
            info!(
                run_id = %state.record.run_id(),
                experiment_id = %state.record.experiment_id(),
                status = ?status,
                logs = state.params.count() + state.metrics.count() + state.datasets.count(),
                "run finalized"
            );
        }
        changed
    }

    fn write<R>(&self, f: impl FnOnce(&mut RunState) -> R) -> Result<R> {
        let mut state = self.state.write();
        state.ensure_running()?;
        Ok(f(&mut state))
    }
}

impl std::fmt::Debug for RunContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("RunContext")
            .field("record", &state.record)
            .field("params", &state.params.count())
            .field("metrics", &state.metrics.count())
            .field("datasets", &state.datasets.count())
            .finish_non_exhaustive()
    }
}

/// Open run scope. Finalizes the run when consumed or dropped.
#[must_use = "dropping the scope finalizes the run immediately"]
#[derive(Debug)]
pub struct RunScope {
    run: RunContext,
    closed: bool,
}

impl RunScope {
    pub(crate) const fn new(run: RunContext) -> Self {
        Self { run, closed: false }
    }

    /// A handle that stays readable after the scope ends.
    #[must_use]
    pub fn context(&self) -> RunContext {
        self.run.clone()
    }

    /// Finalize as FINISHED.
    pub fn finish(mut self) -> RunContext {
        self.close(RunStatus::Finished);
        self.run.clone()
    }

    /// Finalize as FAILED.
    pub fn fail(mut self) -> RunContext {
        self.close(RunStatus::Failed);
        self.run.clone()
    }

    fn close(&mut self, status: RunStatus) {
        if !self.closed {
            self.closed = true;
            self.run.finalize(status);
        }
    }
}

impl Deref for RunScope {
    type Target = RunContext;

    fn deref(&self) -> &Self::Target {
        &self.run
    }
}

impl Drop for RunScope {
    fn drop(&mut self) {
        let status = if std::thread::panicking() {
            RunStatus::Failed
        } else {
            RunStatus::Finished
        };
        self.close(status);
    }
}
