//! In-memory tracking backend built on `ExperimentStore`.
//!
//! Nothing leaves the process. Every call is also appended to a call log so
//! tests can assert exactly what a session forwarded, and in which order.

use std::path::Path;

use chrono::Utc;
use tracing::debug;

use super::{Experiment, RunInfo, RunStatus, TrackingClient};
use crate::artifact::{self, ArtifactRoot};
use crate::experiment::{
    ArtifactRecord, ExperimentRecord, ExperimentStore, MetricRecord, ParamRecord, RunRecord,
};
use crate::tags::RunTags;
use crate::{Error, Result};

/// One call received by a [`MemoryTrackingClient`].
#[derive(Debug, Clone, PartialEq)]
pub enum TrackingCall {
    /// `get_experiment_by_name`
    GetExperimentByName {
        /// Looked-up name
        name: String,
    },
    /// `create_experiment`
    CreateExperiment {
        /// New experiment name
        name: String,
        /// Requested artifact root
        artifact_location: Option<String>,
    },
    /// `create_run`
    CreateRun {
        /// Parent experiment
        experiment_id: String,
        /// Creation tags
        tags: RunTags,
    },
    /// `log_param`
    LogParam {
        /// Run
        run_id: String,
        /// Name
        key: String,
        /// String form of the value
        value: String,
    },
    /// `log_metric`
    LogMetric {
        /// Run
        run_id: String,
        /// Name
        key: String,
        /// Value
        value: f64,
    },
    /// `log_artifact`, once per uploaded file
    LogArtifact {
        /// Run
        run_id: String,
        /// Destination path relative to the run's artifact root
        path: String,
    },
    /// `set_terminated`
    SetTerminated {
        /// Run
        run_id: String,
        /// Final status
        status: RunStatus,
    },
}

/// In-process [`TrackingClient`].
///
/// Experiment IDs are sequential (`"1"`, `"2"`, ...). Run IDs are 32 hex
/// digits derived from a counter. Run artifact roots are
/// `<experiment artifact location or mlflow-artifacts:/<id>>/<run id>/artifacts`.
/// Artifacts are copied when that root is a local directory and only
/// recorded otherwise.
#[derive(Debug, Default)]
pub struct MemoryTrackingClient {
    store: ExperimentStore,
    calls: Vec<TrackingCall>,
    next_experiment: u64,
    next_run: u64,
}

impl MemoryTrackingClient {
    /// Create an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The underlying store.
    #[must_use]
    pub const fn store(&self) -> &ExperimentStore {
        &self.store
    }

    /// Every call received so far, in order.
    #[must_use]
    pub fn calls(&self) -> &[TrackingCall] {
        &self.calls
    }

    /// Values logged for one metric of one run, in logging order.
    #[must_use]
    pub fn metric_values(&self, run_id: &str, key: &str) -> Vec<f64> {
        self.store
            .get_metrics_for_run(run_id, key)
            .iter()
            .map(MetricRecord::value)
            .collect()
    }

    fn run(&self, run_id: &str) -> Result<&RunRecord> {
        self.store.get_run(run_id).ok_or_else(|| missing_run(run_id))
    }
}

fn missing_run(run_id: &str) -> Error {
    Error::Tracking {
        status: 404,
        error_code: "RESOURCE_DOES_NOT_EXIST".to_string(),
        message: format!("Run '{run_id}' not found"),
    }
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

impl TrackingClient for MemoryTrackingClient {
    fn get_experiment_by_name(&mut self, name: &str) -> Result<Option<Experiment>> {
        self.calls.push(TrackingCall::GetExperimentByName {
            name: name.to_string(),
        });

        Ok(self.store.get_experiment_by_name(name).map(|e| Experiment {
            experiment_id: e.experiment_id().to_string(),
            name: e.name().to_string(),
            artifact_location: e.artifact_location().map(str::to_string),
            lifecycle_stage: Some("active".to_string()),
        }))
    }

    fn create_experiment(
        &mut self,
        name: &str,
        artifact_location: Option<&str>,
    ) -> Result<String> {
        self.calls.push(TrackingCall::CreateExperiment {
            name: name.to_string(),
            artifact_location: artifact_location.map(str::to_string),
        });

        if self.store.get_experiment_by_name(name).is_some() {
            return Err(Error::Tracking {
                status: 400,
                error_code: "RESOURCE_ALREADY_EXISTS".to_string(),
                message: format!("Experiment '{name}' already exists"),
            });
        }

        self.next_experiment += 1;
        let experiment_id = self.next_experiment.to_string();
        let mut builder = ExperimentRecord::builder(experiment_id.clone(), name);
        if let Some(location) = artifact_location {
            builder = builder.artifact_location(location);
        }
        self.store.add_experiment(builder.build());

        debug!(%experiment_id, name, "created in-memory experiment");
        Ok(experiment_id)
    }

    fn create_run(&mut self, experiment_id: &str, tags: &RunTags) -> Result<RunInfo> {
        self.calls.push(TrackingCall::CreateRun {
            experiment_id: experiment_id.to_string(),
            tags: tags.clone(),
        });

        let experiment = self.store.get_experiment(experiment_id).ok_or_else(|| {
            Error::Tracking {
                status: 404,
                error_code: "RESOURCE_DOES_NOT_EXIST".to_string(),
                message: format!("Experiment '{experiment_id}' not found"),
            }
        })?;

        self.next_run += 1;
        let run_id = format!("{:032x}", self.next_run);
        let base = experiment.artifact_location().map_or_else(
            || format!("mlflow-artifacts:/{experiment_id}"),
            |l| l.trim_end_matches('/').to_string(),
        );
        let artifact_uri = format!("{base}/{run_id}/artifacts");
        let start_time = now_millis();

        let record = RunRecord::builder(run_id.clone(), experiment_id)
            .start_time(start_time)
            .artifact_uri(artifact_uri.clone())
            .tags(tags.clone())
            .build();
        self.store.add_run(record);

        Ok(RunInfo {
            run_id,
            experiment_id: experiment_id.to_string(),
            artifact_uri,
            status: RunStatus::Running,
            start_time,
        })
    }

    fn log_param(&mut self, run_id: &str, key: &str, value: &str) -> Result<()> {
        self.calls.push(TrackingCall::LogParam {
            run_id: run_id.to_string(),
            key: key.to_string(),
            value: value.to_string(),
        });
        self.run(run_id)?;
        self.store.add_param(ParamRecord::new(run_id, key, value));
        Ok(())
    }

    fn log_metric(&mut self, run_id: &str, key: &str, value: f64) -> Result<()> {
        self.calls.push(TrackingCall::LogMetric {
            run_id: run_id.to_string(),
            key: key.to_string(),
            value,
        });
        self.run(run_id)?;
        self.store
            .add_metric(MetricRecord::new(run_id, key, value, now_millis(), 0));
        Ok(())
    }

    fn log_artifact(
        &mut self,
        run: &RunInfo,
        local_path: &Path,
        artifact_path: Option<&str>,
    ) -> Result<()> {
        artifact::ensure_exists(local_path)?;
        let name = artifact::file_name(local_path)?;
        let path = artifact::join_artifact_path(artifact_path, &name).unwrap_or(name);

        self.calls.push(TrackingCall::LogArtifact {
            run_id: run.run_id.clone(),
            path: path.clone(),
        });
        let artifact_uri = self.run(&run.run_id)?.artifact_uri().to_string();

        let size_bytes = match ArtifactRoot::parse(&artifact_uri) {
            ArtifactRoot::Local(root) => artifact::copy_to_local(&root, local_path, artifact_path)?,
            ArtifactRoot::Proxied(_) | ArtifactRoot::Unsupported(_) => {
                std::fs::metadata(local_path)?.len()
            }
        };

        self.store
            .add_artifact(ArtifactRecord::new(run.run_id.as_str(), path, size_bytes));
        Ok(())
    }

    fn set_terminated(&mut self, run_id: &str, status: RunStatus) -> Result<()> {
        self.calls.push(TrackingCall::SetTerminated {
            run_id: run_id.to_string(),
            status,
        });
        let run = self
            .store
            .get_run_mut(run_id)
            .ok_or_else(|| missing_run(run_id))?;
        run.complete(status, now_millis());
        Ok(())
    }
}
