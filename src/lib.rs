//! # Trueno-Registry: Experiment Run Log Store
//!
//! **Version**: 0.1.0
//!
//! Trueno-Registry records what happened in machine-learning training runs:
//! typed parameters, step-indexed metrics and dataset references, grouped
//! into runs and experiments, with paginated retrieval.
//!
//! ## Design Principles (Toyota Way Aligned)
//!
//! - **Poka-Yoke safety**: A run scope always finalizes, even on panic
//! - **Jidoka**: Logging to a closed run stops with `RunClosed` instead of
//!   silently dropping data
//! - **Muda elimination**: Cursors fetch pages lazily and cache what they fetched
//!
//! ## Example Usage
//!
//! ```rust
//! use trueno_registry::experiment::{DatasetDescriptor, ExperimentStore};
//!
//! let store = ExperimentStore::new();
//!
//! let run = store.start_experiment_run("sentiment")?;
//! run.log_param("optimizer", "adam")?;
//! run.log_metric("accuracy", 0.87, 1, "1700000000")?;
//! run.log_dataset(
//!     DatasetDescriptor::new("imdb", "hf").with_uri("hf://datasets/imdb"),
//! )?;
//! let run = run.finish();
//!
//! let mut logs = store.get_experiment_run_logs(run.id())?;
//! while let Some(log) = logs.next_item()? {
//!     println!("{}: {}", log.kind(), log.name());
//! }
//! # Ok::<(), trueno_registry::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod artifact;
pub mod config;
pub mod cursor;
pub mod error;
pub mod experiment;
pub mod storage;

pub use config::RegistryConfig;
pub use cursor::{ListOptions, OrderBy, Page, PagedCursor, SortOrder};
pub use error::{Error, Result};
pub use experiment::{ExperimentStore, RunContext, RunQuery, RunScope};
