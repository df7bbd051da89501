//! Run-logging session
//!
//! A [`RunLogger`] is bound to one tracking server and one experiment for its
//! whole life. It holds at most one active run; params, metrics and artifacts
//! are forwarded to the tracking client against that run.
//!
//! ```text
//! new ──> start_run ──> log_* (any order, any count) ──> end_run
//!              ^                                            │
//!              └────────────────────────────────────────────┘
//! ```

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::artifact;
use crate::client::{RunInfo, RunStatus, TrackingClient};
use crate::config::TrackingConfig;
use crate::git::GitMetadata;
use crate::tags::RunTags;
use crate::{Error, Result};

/// A parameter value, logged in its string form.
///
/// Strings are logged as-is. Integers and booleans use their display form;
/// floats use their JSON form, so `1.0` stays `1.0`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ParamValue(String);

impl ParamValue {
    /// The string sent to the tracking server.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<serde_json::Value> for ParamValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::String(s) => Self(s),
            other => Self(other.to_string()),
        }
    }
}

macro_rules! param_from_display {
    ($($t:ty),*) => {
        $(impl From<$t> for ParamValue {
            fn from(value: $t) -> Self {
                Self(value.to_string())
            }
        })*
    };
}

param_from_display!(bool, i32, i64, u32, u64, usize);

// Same text as a float read from JSON, so whole numbers keep their `.0`.
macro_rules! param_from_float {
    ($($t:ty),*) => {
        $(impl From<$t> for ParamValue {
            fn from(value: $t) -> Self {
                let json = serde_json::to_string(&value).ok().filter(|_| value.is_finite());
                Self(json.unwrap_or_else(|| value.to_string()))
            }
        })*
    };
}

param_from_float!(f32, f64);

impl<'de> Deserialize<'de> for ParamValue {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(Self::from)
    }
}

/// A metric value: one point, or a series logged point by point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    /// A single point.
    Scalar(f64),
    /// Points logged in order under the same key.
    Series(Vec<f64>),
}

impl MetricValue {
    /// The points to log, in order.
    #[must_use]
    pub fn points(&self) -> &[f64] {
        match self {
            Self::Scalar(value) => std::slice::from_ref(value),
            Self::Series(values) => values,
        }
    }
}

impl From<f64> for MetricValue {
    fn from(value: f64) -> Self {
        Self::Scalar(value)
    }
}

impl From<f32> for MetricValue {
    fn from(value: f32) -> Self {
        Self::Scalar(f64::from(value))
    }
}

impl From<Vec<f64>> for MetricValue {
    fn from(values: Vec<f64>) -> Self {
        Self::Series(values)
    }
}

impl From<&[f64]> for MetricValue {
    fn from(values: &[f64]) -> Self {
        Self::Series(values.to_vec())
    }
}

impl<const N: usize> From<[f64; N]> for MetricValue {
    fn from(values: [f64; N]) -> Self {
        Self::Series(values.to_vec())
    }
}

/// The run a session is currently logging to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveRun {
    info: RunInfo,
    tags: RunTags,
}

impl ActiveRun {
    /// Run ID.
    #[must_use]
    pub fn run_id(&self) -> &str {
        &self.info.run_id
    }

    /// Parent experiment ID.
    #[must_use]
    pub fn experiment_id(&self) -> &str {
        &self.info.experiment_id
    }

    /// Artifact root URI of the run.
    #[must_use]
    pub fn artifact_uri(&self) -> &str {
        &self.info.artifact_uri
    }

    /// Tags the run was created with.
    #[must_use]
    pub const fn tags(&self) -> &RunTags {
        &self.tags
    }

    /// Run identity as returned by the tracking client.
    #[must_use]
    pub const fn info(&self) -> &RunInfo {
        &self.info
    }
}

/// Session bound to one tracking server and one named experiment.
///
/// The session owns its client. To keep using a client after the session,
/// pass `&mut client` (every `&mut C` is itself a [`TrackingClient`]) or call
/// [`RunLogger::into_client`].
///
/// Not safe for concurrent use: run state is mutated in place.
///
/// # Example
///
/// ```rust
/// use std::collections::BTreeMap;
/// use runlog::client::MemoryTrackingClient;
/// use runlog::{MetricValue, RunLogger, TrackingConfig};
///
/// # fn example() -> runlog::Result<()> {
/// let config = TrackingConfig::builder("http://127.0.0.1:5000", "demo")
///     .user_id("alice")
///     .build();
/// let mut logger = RunLogger::new(MemoryTrackingClient::new(), config)?;
///
/// logger.start_run("baseline")?;
/// logger.log_params([("lr", 0.01), ("epochs", 3.0)])?;
///
/// let mut metrics = BTreeMap::new();
/// metrics.insert("loss", MetricValue::from(vec![0.9, 0.5, 0.2]));
/// metrics.insert("accuracy", MetricValue::from(0.87));
/// logger.log_metrics(metrics)?;
///
/// logger.end_run()?;
/// # Ok(())
/// # }
/// # example().unwrap();
/// ```
#[derive(Debug)]
pub struct RunLogger<C: TrackingClient> {
    client: C,
    config: TrackingConfig,
    experiment_id: String,
    active: Option<ActiveRun>,
}

impl<C: TrackingClient> RunLogger<C> {
    /// Validate `config` and resolve its experiment, creating it if missing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the tracking URI or experiment
    /// name is missing, or any error from the client lookup/creation.
    pub fn new(mut client: C, config: TrackingConfig) -> Result<Self> {
        config.validate()?;
        let name = config.experiment_name();

        let experiment_id = match client.get_experiment_by_name(name)? {
            Some(experiment) => {
                if experiment.is_deleted() {
                    warn!(
                        experiment = name,
                        experiment_id = %experiment.experiment_id,
                        "reusing a deleted experiment; the server may reject new runs"
                    );
                }
                info!(experiment = name, experiment_id = %experiment.experiment_id, "using existing experiment");
                experiment.experiment_id
            }
            None => {
                let id = client.create_experiment(name, config.artifact_location())?;
                info!(experiment = name, experiment_id = %id, "created experiment");
                id
            }
        };

        Ok(Self {
            client,
            config,
            experiment_id,
            active: None,
        })
    }

    /// ID of the experiment this session logs into.
    #[must_use]
    pub fn experiment_id(&self) -> &str {
        &self.experiment_id
    }

    /// Session configuration.
    #[must_use]
    pub const fn config(&self) -> &TrackingConfig {
        &self.config
    }

    /// The active run, if any.
    #[must_use]
    pub const fn active_run(&self) -> Option<&ActiveRun> {
        self.active.as_ref()
    }

    /// Whether a run is active.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// The tracking client.
    #[must_use]
    pub const fn client(&self) -> &C {
        &self.client
    }

    /// Consume the session and return its client. An active run is left as is.
    #[must_use]
    pub fn into_client(self) -> C {
        self.client
    }

    /// Build the tags a new run named `run_name` would be created with.
    ///
    /// `mlflow.user` falls back to the login name when no user is configured.
    ///
    /// # Errors
    ///
    /// Returns [`Error::GitMetadata`] if a git directory is configured and
    /// cannot be read.
    pub fn run_tags(&self, run_name: &str) -> Result<RunTags> {
        let mut builder = RunTags::builder();
        if let Some(dir) = self.config.git_directory() {
            let git = GitMetadata::read(dir)?;
            builder = builder.git(self.config.source_type(), &git);
        }
        let user = self
            .config
            .user_id()
            .map_or_else(login_name, str::to_string);
        Ok(builder.user(&user).run_name(run_name).build())
    }

    /// Create a run in the session's experiment and make it active.
    ///
    /// Tags are assembled before anything is sent, so a git failure creates
    /// no run. A run that is still active is ended as `FINISHED` first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::GitMetadata`] or any client error.
    pub fn start_run(&mut self, run_name: &str) -> Result<&ActiveRun> {
        let tags = self.run_tags(run_name)?;

        if let Some(previous) = &self.active {
            warn!(run_id = previous.run_id(), "run still active; ending it before starting a new one");
            self.end_run()?;
        }

        let info = self.client.create_run(&self.experiment_id, &tags)?;
        info!(run_id = %info.run_id, experiment_id = %self.experiment_id, run_name, "started run");

        Ok(self.active.insert(ActiveRun { info, tags }))
    }

    fn require_run(&self) -> Result<&ActiveRun> {
        self.active.as_ref().ok_or(Error::NoActiveRun)
    }

    /// Log each parameter with one client call.
    ///
    /// All keys are checked before the first call is made.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoActiveRun`], [`Error::InvalidInput`] for an empty
    /// key, or any client error.
    pub fn log_params<I, K, V>(&mut self, params: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<ParamValue>,
    {
        let run_id = self.require_run()?.run_id().to_string();
        let params: Vec<(K, ParamValue)> = params.into_iter().map(|(k, v)| (k, v.into())).collect();
        validate_keys(params.iter().map(|(k, _)| k.as_ref()), "parameter")?;

        for (key, value) in &params {
            debug!(%run_id, key = key.as_ref(), value = value.as_str(), "log param");
            self.client.log_param(&run_id, key.as_ref(), value.as_str())?;
        }
        Ok(())
    }

    /// Log each metric point with one client call.
    ///
    /// A series produces one call per element, in order, under the same key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoActiveRun`], [`Error::InvalidInput`] for an empty
    /// key, or any client error.
    pub fn log_metrics<I, K, V>(&mut self, metrics: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<MetricValue>,
    {
        let run_id = self.require_run()?.run_id().to_string();
        let metrics: Vec<(K, MetricValue)> =
            metrics.into_iter().map(|(k, v)| (k, v.into())).collect();
        validate_keys(metrics.iter().map(|(k, _)| k.as_ref()), "metric")?;

        for (key, value) in &metrics {
            for &point in value.points() {
                debug!(%run_id, key = key.as_ref(), value = point, "log metric");
                self.client.log_metric(&run_id, key.as_ref(), point)?;
            }
        }
        Ok(())
    }

    /// Upload one file under `artifact_path` of the run's artifact root.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoActiveRun`], [`Error::NotFound`] if the file is
    /// missing, or any client error.
    pub fn log_artifact(
        &mut self,
        local_path: impl AsRef<Path>,
        artifact_path: Option<&str>,
    ) -> Result<()> {
        let info = self.require_run()?.info().clone();
        let local_path = local_path.as_ref();
        artifact::ensure_exists(local_path)?;

        info!(run_id = %info.run_id, path = %local_path.display(), artifact_path, "log artifact");
        self.client.log_artifact(&info, local_path, artifact_path)
    }

    /// Upload a directory tree under `artifact_path` of the run's artifact root.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoActiveRun`], [`Error::NotFound`] if the directory
    /// is missing, or any client error.
    pub fn log_artifacts(
        &mut self,
        local_dir: impl AsRef<Path>,
        artifact_path: Option<&str>,
    ) -> Result<()> {
        let info = self.require_run()?.info().clone();
        let local_dir = local_dir.as_ref();
        artifact::ensure_dir(local_dir)?;

        info!(run_id = %info.run_id, dir = %local_dir.display(), artifact_path, "log artifacts");
        self.client.log_artifacts(&info, local_dir, artifact_path)
    }

    /// End the active run as `FINISHED`. A no-op when no run is active.
    ///
    /// # Errors
    ///
    /// Any client error. The run is cleared from the session either way.
    pub fn end_run(&mut self) -> Result<()> {
        self.end_run_with_status(RunStatus::Finished)
    }

    /// End the active run with `status`. A no-op when no run is active.
    ///
    /// # Errors
    ///
    /// Any client error. The run is cleared from the session either way.
    pub fn end_run_with_status(&mut self, status: RunStatus) -> Result<()> {
        let Some(run) = self.active.take() else {
            debug!("end_run without an active run");
            return Ok(());
        };

        info!(run_id = run.run_id(), %status, "ending run");
        self.client.set_terminated(run.run_id(), status)
    }
}

fn validate_keys<'a>(keys: impl Iterator<Item = &'a str>, kind: &str) -> Result<()> {
    for key in keys {
        if key.trim().is_empty() {
            return Err(Error::InvalidInput(format!("{kind} name must not be empty")));
        }
    }
    Ok(())
}

fn login_name() -> String {
    ["USER", "USERNAME"]
        .into_iter()
        .find_map(|var| std::env::var(var).ok().filter(|v| !v.is_empty()))
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MemoryTrackingClient;

    fn config() -> TrackingConfig {
        TrackingConfig::builder("http://localhost:5000", "unit").build()
    }

    #[test]
    fn test_param_value_forms() {
        assert_eq!(ParamValue::from("adam").as_str(), "adam");
        assert_eq!(ParamValue::from(32_i64).as_str(), "32");
        assert_eq!(ParamValue::from(true).as_str(), "true");
        assert_eq!(ParamValue::from(serde_json::json!("sgd")).as_str(), "sgd");
        assert_eq!(ParamValue::from(serde_json::json!([1, 2])).as_str(), "[1,2]");
    }

    #[test]
    fn test_float_params_match_json_form() {
        assert_eq!(ParamValue::from(1.0_f64).as_str(), "1.0");
        assert_eq!(ParamValue::from(0.1_f32).as_str(), "0.1");
        assert_eq!(ParamValue::from(0.25_f64).as_str(), "0.25");
        assert_eq!(
            ParamValue::from(1.0_f64),
            ParamValue::from(serde_json::json!(1.0))
        );
        assert_eq!(ParamValue::from(f64::NAN).as_str(), "NaN");
        assert_eq!(ParamValue::from(1_i64).as_str(), "1");
    }

    #[test]
    fn test_metric_value_deserialize() {
        let scalar: MetricValue = serde_json::from_str("0.87").unwrap();
        let series: MetricValue = serde_json::from_str("[0.9, 0.5]").unwrap();
        assert_eq!(scalar.points(), &[0.87]);
        assert_eq!(series.points(), &[0.9, 0.5]);
    }

    #[test]
    fn test_user_tag_always_present() {
        let logger = RunLogger::new(MemoryTrackingClient::new(), config()).unwrap();
        let tags = logger.run_tags("r").unwrap();
        assert!(tags.get(crate::tags::USER).is_some_and(|u| !u.is_empty()));
    }

    #[test]
    fn test_empty_key_rejected_before_any_call() {
        let mut logger = RunLogger::new(MemoryTrackingClient::new(), config()).unwrap();
        logger.start_run("r").unwrap();
        let before = logger.client().calls().len();

        let err = logger.log_params([("lr", 1.0), ("", 2.0)]).unwrap_err();

        assert!(matches!(err, Error::InvalidInput(_)));
        assert_eq!(logger.client().calls().len(), before);
    }

    #[test]
    fn test_start_run_twice_ends_previous() {
        let mut logger = RunLogger::new(MemoryTrackingClient::new(), config()).unwrap();
        let first = logger.start_run("a").unwrap().run_id().to_string();
        let second = logger.start_run("b").unwrap().run_id().to_string();

        assert_ne!(first, second);
        let record = logger.client().store().get_run(&first).unwrap();
        assert_eq!(record.status(), RunStatus::Finished);
    }
}
