//! One-shot logging of a finished training job.
//!
//! [`log_experiment`] runs a whole session: resolve the experiment, start a
//! run, log params and metrics, upload an artifacts directory, end the run.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::artifact;
use crate::client::{RunStatus, TrackingClient};
use crate::config::TrackingConfig;
use crate::logger::{MetricValue, ParamValue, RunLogger};
use crate::{Error, Result};

/// Artifacts are uploaded under this subpath of the run's artifact root.
pub const ARTIFACTS_SUBPATH: &str = "artifacts";

/// Everything one run should record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentReport {
    /// Run name (`mlflow.runName`).
    pub run_name: String,
    /// Hyperparameters.
    #[serde(default)]
    pub params: BTreeMap<String, ParamValue>,
    /// Metrics; series are logged point by point.
    #[serde(default)]
    pub metrics: BTreeMap<String, MetricValue>,
    /// Local directory uploaded as the run's artifacts.
    pub artifact_dir: PathBuf,
}

impl ExperimentReport {
    /// Create a report with no params or metrics.
    #[must_use]
    pub fn new(run_name: impl Into<String>, artifact_dir: impl Into<PathBuf>) -> Self {
        Self {
            run_name: run_name.into(),
            params: BTreeMap::new(),
            metrics: BTreeMap::new(),
            artifact_dir: artifact_dir.into(),
        }
    }

    /// Add a parameter.
    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Add a metric.
    #[must_use]
    pub fn metric(mut self, key: impl Into<String>, value: impl Into<MetricValue>) -> Self {
        self.metrics.insert(key.into(), value.into());
        self
    }

    /// Read params from a JSON object file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] or a JSON error.
    pub fn params_from_json_file(mut self, path: &Path) -> Result<Self> {
        self.params.extend(read_json_object::<ParamValue>(path)?);
        Ok(self)
    }

    /// Read metrics from a JSON object file (`{"loss": [0.9, 0.5], "acc": 0.8}`).
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] or a JSON error.
    pub fn metrics_from_json_file(mut self, path: &Path) -> Result<Self> {
        self.metrics.extend(read_json_object::<MetricValue>(path)?);
        Ok(self)
    }
}

fn read_json_object<T: serde::de::DeserializeOwned>(path: &Path) -> Result<BTreeMap<String, T>> {
    if !path.is_file() {
        return Err(Error::NotFound {
            path: path.to_path_buf(),
        });
    }
    let text = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

/// Record `report` as a new run of the configured experiment.
///
/// The artifacts directory is checked before anything is sent to the
/// tracking server. If a logging step fails after the run was created, the
/// run is ended as `FAILED` and the logging error returned.
///
/// Returns the ID of the finished run.
///
/// # Errors
///
/// Returns [`Error::NotFound`] for a missing artifacts directory, and any
/// configuration, git, or client error.
pub fn log_experiment<C: TrackingClient>(
    client: C,
    config: TrackingConfig,
    report: &ExperimentReport,
) -> Result<String> {
    artifact::ensure_dir(&report.artifact_dir)?;

    let mut logger = RunLogger::new(client, config)?;
    let run_id = logger.start_run(&report.run_name)?.run_id().to_string();

    let logged = record(&mut logger, report);

    if let Err(e) = logged {
        // The logging error is the one returned
        if let Err(end) = logger.end_run_with_status(RunStatus::Failed) {
            warn!(error = %end, %run_id, "failed to mark run FAILED");
        }
        return Err(e);
    }

    logger.end_run()?;
    info!(%run_id, run_name = %report.run_name, "logged experiment");
    Ok(run_id)
}

fn record<C: TrackingClient>(logger: &mut RunLogger<C>, report: &ExperimentReport) -> Result<()> {
    logger.log_params(report.params.iter().map(|(k, v)| (k, v.clone())))?;
    logger.log_metrics(report.metrics.iter().map(|(k, v)| (k, v.clone())))?;
    logger.log_artifacts(&report.artifact_dir, Some(ARTIFACTS_SUBPATH))
}
