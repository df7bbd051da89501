//! Tracking client seam
//!
//! `RunLogger` talks to a tracking backend only through [`TrackingClient`].
//! Two backends ship with the crate:
//!
//! - [`MlflowClient`]: blocking REST client for an MLflow tracking server
//! - [`MemoryTrackingClient`]: in-process backend for tests and dry runs
//!
//! # Example
//!
//! ```rust
//! use runlog::client::{MemoryTrackingClient, TrackingClient};
//! use runlog::tags::RunTags;
//!
//! # fn example() -> runlog::Result<()> {
//! let mut client = MemoryTrackingClient::new();
//! let experiment_id = client.create_experiment("demo", None)?;
//! let run = client.create_run(&experiment_id, &RunTags::default())?;
//! client.log_metric(&run.run_id, "loss", 0.5)?;
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

mod memory;
mod rest;

pub use memory::{MemoryTrackingClient, TrackingCall};
pub use rest::MlflowClient;

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::artifact;
pub use crate::experiment::RunStatus;
use crate::tags::RunTags;
use crate::Result;

/// Experiment as returned by a lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Experiment {
    /// Server-assigned ID.
    pub experiment_id: String,
    /// Unique name.
    pub name: String,
    /// Artifact root for runs of this experiment.
    #[serde(default)]
    pub artifact_location: Option<String>,
    /// `active` or `deleted`.
    #[serde(default)]
    pub lifecycle_stage: Option<String>,
}

impl Experiment {
    /// Whether the experiment has been soft-deleted on the server.
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.lifecycle_stage.as_deref() == Some("deleted")
    }
}

/// Identity of a created run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunInfo {
    /// Server-assigned run ID.
    pub run_id: String,
    /// Parent experiment.
    pub experiment_id: String,
    /// Root URI artifacts of this run are uploaded under.
    #[serde(default)]
    pub artifact_uri: String,
    /// Status at creation.
    pub status: RunStatus,
    /// Start time in epoch millis.
    #[serde(default)]
    pub start_time: i64,
}

/// Operations a tracking backend must provide.
///
/// Methods take `&mut self`: a client is exclusively owned by one session.
/// Failures are returned unchanged to the caller; implementations do not
/// retry.
pub trait TrackingClient {
    /// Look up an experiment by name. `Ok(None)` when it does not exist.
    fn get_experiment_by_name(&mut self, name: &str) -> Result<Option<Experiment>>;

    /// Create an experiment and return its ID.
    fn create_experiment(&mut self, name: &str, artifact_location: Option<&str>)
        -> Result<String>;

    /// Create a running run carrying `tags`.
    fn create_run(&mut self, experiment_id: &str, tags: &RunTags) -> Result<RunInfo>;

    /// Log one parameter.
    fn log_param(&mut self, run_id: &str, key: &str, value: &str) -> Result<()>;

    /// Log one metric point. Timestamp and step are the backend's defaults.
    fn log_metric(&mut self, run_id: &str, key: &str, value: f64) -> Result<()>;

    /// Upload one file into `artifact_path` under the run's artifact root.
    fn log_artifact(
        &mut self,
        run: &RunInfo,
        local_path: &Path,
        artifact_path: Option<&str>,
    ) -> Result<()>;

    /// Upload a directory tree into `artifact_path` under the run's artifact root.
    ///
    /// The default walks `local_dir` and uploads file by file, keeping the
    /// directory layout.
    fn log_artifacts(
        &mut self,
        run: &RunInfo,
        local_dir: &Path,
        artifact_path: Option<&str>,
    ) -> Result<()> {
        for file in artifact::walk_files(local_dir)? {
            let dest = artifact::join_artifact_path(artifact_path, file.relative_dir());
            self.log_artifact(run, file.path(), dest.as_deref())?;
        }
        Ok(())
    }

    /// Mark the run ended with `status`.
    fn set_terminated(&mut self, run_id: &str, status: RunStatus) -> Result<()>;
}

impl<C: TrackingClient + ?Sized> TrackingClient for &mut C {
    fn get_experiment_by_name(&mut self, name: &str) -> Result<Option<Experiment>> {
        (**self).get_experiment_by_name(name)
    }

    fn create_experiment(
        &mut self,
        name: &str,
        artifact_location: Option<&str>,
    ) -> Result<String> {
        (**self).create_experiment(name, artifact_location)
    }

    fn create_run(&mut self, experiment_id: &str, tags: &RunTags) -> Result<RunInfo> {
        (**self).create_run(experiment_id, tags)
    }

    fn log_param(&mut self, run_id: &str, key: &str, value: &str) -> Result<()> {
        (**self).log_param(run_id, key, value)
    }

    fn log_metric(&mut self, run_id: &str, key: &str, value: f64) -> Result<()> {
        (**self).log_metric(run_id, key, value)
    }

    fn log_artifact(
        &mut self,
        run: &RunInfo,
        local_path: &Path,
        artifact_path: Option<&str>,
    ) -> Result<()> {
        (**self).log_artifact(run, local_path, artifact_path)
    }

    fn log_artifacts(
        &mut self,
        run: &RunInfo,
        local_dir: &Path,
        artifact_path: Option<&str>,
    ) -> Result<()> {
        (**self).log_artifacts(run, local_dir, artifact_path)
    }

    fn set_terminated(&mut self, run_id: &str, status: RunStatus) -> Result<()> {
        (**self).set_terminated(run_id, status)
    }
}
