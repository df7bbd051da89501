//! Experiment tracking records
//!
//! Plain data structures for what a tracking server keeps, plus an in-memory
//! store over them. `MemoryTrackingClient` is built on this module.
//!
//! ## Schema Overview
//!
//! ```text
//! ExperimentRecord (1) ──< RunRecord (N)
//!                              │
//!                              ├──< ParamRecord (N)
//!                              ├──< MetricRecord (N) [time-series]
//!                              └──< ArtifactRecord (N)
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use runlog::experiment::{ExperimentRecord, ExperimentStore, MetricRecord, RunRecord, RunStatus};
//!
//! let mut store = ExperimentStore::new();
//! store.add_experiment(ExperimentRecord::new("0", "Default"));
//!
//! let mut run = RunRecord::new("run-001", "0");
//! run.complete(RunStatus::Finished, 1_700_000_000_000);
//! store.add_run(run);
//!
//! store.add_metric(MetricRecord::new("run-001", "loss", 0.5, 1_700_000_000_000, 0));
//! assert_eq!(store.get_metrics_for_run("run-001", "loss").len(), 1);
//! ```

mod artifact_record;
mod experiment_record;
mod metric_record;
mod param_record;
mod run_record;
mod store;

pub use artifact_record::ArtifactRecord;
pub use experiment_record::{ExperimentRecord, ExperimentRecordBuilder};
pub use metric_record::MetricRecord;
pub use param_record::ParamRecord;
pub use run_record::{RunRecord, RunRecordBuilder, RunStatus};
pub use store::ExperimentStore;
