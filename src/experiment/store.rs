//! Experiment Store - top-level entry point for run tracking
//!
//! Creates runs (creating their experiment on first use), and serves
//! paginated listings of experiments, runs and run logs.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::info;

use super::{
    ExperimentId, ExperimentRecord, ExperimentRecordBuilder, ExperimentState, LogRecord,
    RunContext, RunId, RunRecord, RunScope,
};
use crate::artifact::{AmbientCredentials, ArtifactResolver};
use crate::config::RegistryConfig;
use crate::cursor::{paginate, ListOptions, OrderBy, PageKey, PagedCursor, SortOrder};
use crate::storage::{MemoryObjectStore, ObjectStore};
use crate::{Error, Result};

/// Selects the experiment whose runs to list. Exactly one selector must be set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunQuery {
    experiment_name: Option<String>,
    experiment_id: Option<ExperimentId>,
}

impl RunQuery {
    /// Query with no selector yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs of the experiment with this name.
    #[must_use]
    pub fn by_name(name: impl Into<String>) -> Self {
        Self::new().experiment_name(name)
    }

    /// Runs of the experiment with this id.
    #[must_use]
    pub fn by_id(id: ExperimentId) -> Self {
        Self::new().experiment_id(id)
    }

    /// Set the name selector.
    #[must_use]
    pub fn experiment_name(mut self, name: impl Into<String>) -> Self {
        self.experiment_name = Some(name.into());
        self
    }

    /// Set the id selector.
    #[must_use]
    pub const fn experiment_id(mut self, id: ExperimentId) -> Self {
        self.experiment_id = Some(id);
        self
    }
}

#[derive(Debug)]
struct StoreInner {
    experiments: DashMap<ExperimentId, ExperimentRecord>,
    names: DashMap<String, ExperimentId>,
    runs: DashMap<RunId, RunContext>,
    next_experiment_id: AtomicU64,
    next_run_id: AtomicU64,
    resolver: Arc<ArtifactResolver>,
    config: RegistryConfig,
}

/// Run log store.
///
/// ## Design
///
/// Experiments are keyed by id with a separate name index; creation goes
/// through the name index's entry API so two concurrent first uses of a
/// name create exactly one experiment. Runs live in a concurrent map of
/// [`RunContext`] handles, each guarding its own state, so logging to
/// different runs proceeds in parallel.
///
/// Cloning the store is cheap and shares all data.
///
/// ## Example
///
/// ```rust
/// use trueno_registry::experiment::{ExperimentStore, RunQuery, RunStatus};
///
/// let store = ExperimentStore::new();
///
/// let run = store.start_experiment_run("mnist")?;
/// run.log_param("lr", 0.01)?;
/// for step in 0..3_i64 {
///     run.log_metric("loss", 1.0 / (step as f64 + 1.0), step, "0")?;
/// }
/// let run = run.finish();
///
/// assert_eq!(run.status(), RunStatus::Finished);
/// assert_eq!(run.get_logs().len(), 4);
///
/// let mut runs = store.get_experiment_runs(&RunQuery::by_name("mnist"))?;
/// assert_eq!(runs.next_item()?.map(|r| r.run_id()), Some(run.id()));
/// # Ok::<(), trueno_registry::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct ExperimentStore {
    inner: Arc<StoreInner>,
}

impl Default for ExperimentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ExperimentStore {
    /// Create an empty store backed by an in-memory object store, reading
    /// ambient storage credentials from the environment.
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Create a builder to configure storage, credentials and listing defaults.
    #[must_use]
    pub fn builder() -> ExperimentStoreBuilder {
        ExperimentStoreBuilder::default()
    }

    /// Check if the store is empty (no experiments or runs).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.experiments.is_empty() && self.inner.runs.is_empty()
    }

    /// Get the number of experiments in the store.
    #[must_use]
    pub fn experiment_count(&self) -> usize {
        self.inner.experiments.len()
    }

    /// Get the number of runs in the store.
    #[must_use]
    pub fn run_count(&self) -> usize {
        self.inner.runs.len()
    }

    /// Listing defaults in effect.
    #[must_use]
    pub fn config(&self) -> &RegistryConfig {
        &self.inner.config
    }

    /// Open a new run under `experiment_name`, creating the experiment if
    /// this is the first use of the name. The run is RUNNING on return.
    ///
    /// # Errors
    ///
    /// Returns `Error::Other` if the name is empty.
    pub fn start_experiment_run(&self, experiment_name: &str) -> Result<RunScope> {
        self.open_run(experiment_name, None)
    }

    /// Like [`start_experiment_run`](Self::start_experiment_run) with an explicit run name.
    ///
    /// # Errors
    ///
    /// Returns `Error::Other` if the experiment name is empty.
    pub fn start_named_run(&self, experiment_name: &str, run_name: &str) -> Result<RunScope> {
        self.open_run(experiment_name, Some(run_name))
    }

    /// Run `body` inside a run scope.
    ///
    /// The run finishes as FINISHED when `body` returns `Ok`, FAILED when it
    /// returns `Err` or panics. Returns the run handle together with the
    /// body's own result.
    ///
    /// # Errors
    ///
    /// Returns `Error::Other` if the run cannot be opened; the body's errors
    /// are returned inside the tuple, not here.
    pub fn run_scoped<T, E>(
        &self,
        experiment_name: &str,
        body: impl FnOnce(&RunContext) -> std::result::Result<T, E>,
    ) -> Result<(RunContext, std::result::Result<T, E>)> {
        let scope = self.start_experiment_run(experiment_name)?;
        let outcome = body(&*scope);
        let run = if outcome.is_ok() {
            scope.finish()
        } else {
            scope.fail()
        };
        Ok((run, outcome))
    }

    /// Create an experiment with extra attributes, or return the existing
    /// one with this name unchanged.
    ///
    /// # Errors
    ///
    /// Returns `Error::Other` if the name is empty.
    pub fn create_experiment(
        &self,
        name: &str,
        configure: impl FnOnce(ExperimentRecordBuilder) -> ExperimentRecordBuilder,
    ) -> Result<ExperimentRecord> {
        let id = self.get_or_create_experiment(name, configure)?;
        self.get_experiment(id)
    }

    /// Change an experiment's lifecycle state.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if no experiment has this id.
    pub fn set_experiment_state(&self, id: ExperimentId, state: ExperimentState) -> Result<()> {
        let mut experiment = self
            .inner
            .experiments
            .get_mut(&id)
            .ok_or_else(|| Error::not_found("experiment", id))?;
        experiment.set_state(state);
        Ok(())
    }

    /// Get an experiment by id.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if no experiment has this id.
    pub fn get_experiment(&self, id: ExperimentId) -> Result<ExperimentRecord> {
        self.inner
            .experiments
            .get(&id)
            .map(|e| e.value().clone())
            .ok_or_else(|| Error::not_found("experiment", id))
    }

    /// Get an experiment by name.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if no experiment has this name.
    pub fn get_experiment_by_name(&self, name: &str) -> Result<ExperimentRecord> {
        let id = self.experiment_id_for(name)?;
        self.get_experiment(id)
    }

    /// Get an experiment by external id.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if no experiment has this external id.
    pub fn get_experiment_by_external_id(&self, external_id: &str) -> Result<ExperimentRecord> {
        self.inner
            .experiments
            .iter()
            .find(|e| e.external_id() == Some(external_id))
            .map(|e| e.value().clone())
            .ok_or_else(|| Error::not_found("experiment", external_id))
    }

    /// Get a run by id, whether running or finalized.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if no run has this id.
    pub fn get_run(&self, run_id: RunId) -> Result<RunContext> {
        self.inner
            .runs
            .get(&run_id)
            .map(|r| r.value().clone())
            .ok_or_else(|| Error::not_found("run", run_id))
    }

    /// All experiments, using the configured listing defaults.
    #[must_use]
    pub fn get_experiments(&self) -> PagedCursor<ExperimentRecord> {
        self.get_experiments_with(self.inner.config.list_options())
    }

    /// All experiments with explicit listing options.
    #[must_use]
    pub fn get_experiments_with(&self, options: ListOptions) -> PagedCursor<ExperimentRecord> {
        let inner = Arc::clone(&self.inner);
        let source = move |options: &ListOptions| {
            let experiments: Vec<ExperimentRecord> =
                inner.experiments.iter().map(|e| e.value().clone()).collect();
            let order_by = options.order_by;
            paginate(experiments, options, |e| experiment_key(e, order_by))
        };
        PagedCursor::new(Arc::new(source), options)
    }

    /// Runs of one experiment, using the configured listing defaults.
    ///
    /// # Errors
    ///
    /// Returns `Error::AmbiguousQuery` unless exactly one selector is set,
    /// and `Error::NotFound` if the experiment does not exist.
    pub fn get_experiment_runs(&self, query: &RunQuery) -> Result<PagedCursor<RunRecord>> {
        self.get_experiment_runs_with(query, self.inner.config.list_options())
    }

    /// Runs of one experiment with explicit listing options.
    ///
    /// # Errors
    ///
    /// Returns `Error::AmbiguousQuery` unless exactly one selector is set,
    /// and `Error::NotFound` if the experiment does not exist.
    pub fn get_experiment_runs_with(
        &self,
        query: &RunQuery,
        options: ListOptions,
    ) -> Result<PagedCursor<RunRecord>> {
        let experiment_id = match (&query.experiment_name, query.experiment_id) {
            (Some(_), Some(_)) => {
                return Err(Error::AmbiguousQuery(
                    "pass either experiment_name or experiment_id, not both".to_string(),
                ))
            }
            (None, None) => {
                return Err(Error::AmbiguousQuery(
                    "one of experiment_name or experiment_id is required".to_string(),
                ))
            }
            (Some(name), None) => self.experiment_id_for(name)?,
            (None, Some(id)) => self.get_experiment(id)?.experiment_id(),
        };

        let inner = Arc::clone(&self.inner);
        let source = move |options: &ListOptions| {
            let runs: Vec<RunRecord> = inner
                .runs
                .iter()
                .map(|r| r.value().info())
                .filter(|r| r.experiment_id() == experiment_id)
                .collect();
            let order_by = options.order_by;
            paginate(runs, options, |r| run_key(r, order_by))
        };
        Ok(PagedCursor::new(Arc::new(source), options))
    }

    /// All logs of a run (params, metrics, datasets), using the configured page size.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if the run does not exist.
    pub fn get_experiment_run_logs(&self, run_id: RunId) -> Result<PagedCursor<LogRecord>> {
        self.get_experiment_run_logs_with(run_id, self.inner.config.list_options())
    }

    /// All logs of a run with explicit listing options. Logs are always in
    /// their fixed kind order; only the page size and token are honoured.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if the run does not exist.
    pub fn get_experiment_run_logs_with(
        &self,
        run_id: RunId,
        options: ListOptions,
    ) -> Result<PagedCursor<LogRecord>> {
        let run = self.get_run(run_id)?;
        let options = options
            .with_order_by(OrderBy::Id)
            .with_sort_order(SortOrder::Asc);
        let source = move |options: &ListOptions| {
            let logs: Vec<(u64, LogRecord)> = (0u64..).zip(run.get_logs()).collect();
            let page = paginate(logs, options, |(position, _)| position_key(*position))?;
            Ok(page.map(|(_, log)| log))
        };
        Ok(PagedCursor::new(Arc::new(source), options))
    }

    fn experiment_id_for(&self, name: &str) -> Result<ExperimentId> {
        self.inner
            .names
            .get(name)
            .map(|id| *id.value())
            .ok_or_else(|| Error::not_found("experiment", name))
    }

    fn get_or_create_experiment(
        &self,
        name: &str,
        configure: impl FnOnce(ExperimentRecordBuilder) -> ExperimentRecordBuilder,
    ) -> Result<ExperimentId> {
        if name.is_empty() {
            return Err(Error::Other("experiment name must not be empty".to_string()));
        }
        let inner = &self.inner;
        if let Some(id) = inner.names.get(name).map(|id| *id.value()) {
            return Ok(id);
        }

        // No map lock is held while user code runs.
        let builder = configure(ExperimentRecord::builder(ExperimentId(0), name));
        match inner.names.entry(name.to_string()) {
            Entry::Occupied(existing) => Ok(*existing.get()),
            Entry::Vacant(slot) => {
                let id = ExperimentId(inner.next_experiment_id.fetch_add(1, Ordering::SeqCst) + 1);
                inner.experiments.insert(id, builder.assign_id(id).build());
                slot.insert(id);
                info!(experiment_id = %id, name, "experiment created");
                Ok(id)
            }
        }
    }

    fn open_run(&self, experiment_name: &str, run_name: Option<&str>) -> Result<RunScope> {
        let experiment_id = self.get_or_create_experiment(experiment_name, |b| b)?;

        let run_id = RunId(self.inner.next_run_id.fetch_add(1, Ordering::SeqCst) + 1);
        let name = run_name.map_or_else(
            || format!("{experiment_name}-run-{run_id}"),
            str::to_string,
        );
        let run = RunContext::open(
            RunRecord::new(run_id, experiment_id, name),
            Arc::clone(&self.inner.resolver),
        );
        self.inner.runs.insert(run_id, run.clone());

        if let Some(mut experiment) = self.inner.experiments.get_mut(&experiment_id) {
            experiment.touch();
        }
        info!(%run_id, %experiment_id, experiment = experiment_name, "run started");
        Ok(RunScope::new(run))
    }
}

#[allow(clippy::cast_possible_wrap)]
fn experiment_key(experiment: &ExperimentRecord, order_by: OrderBy) -> PageKey {
    let id = experiment.experiment_id().0;
    let value = match order_by {
        OrderBy::Id => id as i64,
        OrderBy::CreateTime => experiment.created_at().timestamp_millis(),
        OrderBy::LastUpdateTime => experiment.last_updated_at().timestamp_millis(),
    };
    PageKey { value, id }
}

#[allow(clippy::cast_possible_wrap)]
fn run_key(run: &RunRecord, order_by: OrderBy) -> PageKey {
    let id = run.run_id().0;
    let started = run.started_at().map_or(0, |t| t.timestamp_millis());
    let value = match order_by {
        OrderBy::Id => id as i64,
        OrderBy::CreateTime => started,
        OrderBy::LastUpdateTime => run.ended_at().map_or(started, |t| t.timestamp_millis()),
    };
    PageKey { value, id }
}

#[allow(clippy::cast_possible_wrap)]
const fn position_key(position: u64) -> PageKey {
    PageKey {
        value: position as i64,
        id: position,
    }
}

/// Builder for `ExperimentStore`.
#[derive(Default)]
pub struct ExperimentStoreBuilder {
    object_store: Option<Arc<dyn ObjectStore>>,
    ambient: AmbientCredentials,
    config: RegistryConfig,
}

impl ExperimentStoreBuilder {
    /// Object store used for dataset uploads (default: in-memory).
    #[must_use]
    pub fn object_store(mut self, store: Arc<dyn ObjectStore>) -> Self {
        self.object_store = Some(store);
        self
    }

    /// Where credentials come from when a dataset carries no override
    /// (default: `AWS_*` environment variables).
    #[must_use]
    pub fn ambient_credentials(mut self, ambient: AmbientCredentials) -> Self {
        self.ambient = ambient;
        self
    }

    /// Listing defaults.
    #[must_use]
    pub fn config(mut self, config: RegistryConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the store.
    #[must_use]
    pub fn build(self) -> ExperimentStore {
        let object_store = self
            .object_store
            .unwrap_or_else(|| Arc::new(MemoryObjectStore::new()));
        let resolver = ArtifactResolver::new(object_store).with_ambient_credentials(self.ambient);
        ExperimentStore {
            inner: Arc::new(StoreInner {
                experiments: DashMap::new(),
                names: DashMap::new(),
                runs: DashMap::new(),
                next_experiment_id: AtomicU64::new(0),
                next_run_id: AtomicU64::new(0),
                resolver: Arc::new(resolver),
                config: self.config,
            }),
        }
    }
}

impl std::fmt::Debug for ExperimentStoreBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExperimentStoreBuilder")
            .field("object_store", &self.object_store.as_ref().map(|s| s.scheme()))
            .field("ambient", &self.ambient)
            .field("config", &self.config)
            .finish()
    }
}
