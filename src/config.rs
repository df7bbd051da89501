//! Session configuration
//!
//! A `TrackingConfig` is built once (in code, from YAML, or from YAML plus
//! environment overrides) and never mutated afterwards. The tracking URI lives
//! here rather than in process-wide state, so two sessions can point at two
//! servers.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Default HTTP request timeout, matching the MLflow client default.
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Source type recorded in the `mlflow.source.type` tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SourceType {
    /// Interactive notebook session.
    #[default]
    Notebook,
    /// Scheduled or batch job.
    Job,
    /// Packaged project.
    Project,
    /// Local script.
    Local,
}

impl SourceType {
    /// Tag value as the tracking server expects it.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Notebook => "NOTEBOOK",
            Self::Job => "JOB",
            Self::Project => "PROJECT",
            Self::Local => "LOCAL",
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NOTEBOOK" => Ok(Self::Notebook),
            "JOB" => Ok(Self::Job),
            "PROJECT" => Ok(Self::Project),
            "LOCAL" => Ok(Self::Local),
            other => Err(Error::Configuration(format!(
                "unknown source_type '{other}' (expected NOTEBOOK, JOB, PROJECT or LOCAL)"
            ))),
        }
    }
}

/// Configuration for a [`RunLogger`](crate::RunLogger) session.
///
/// `tracking_uri` and `experiment_name` are required; the session refuses to
/// start without them. Everything else has a default.
///
/// ## YAML format
///
/// ```yaml
/// tracking_uri: http://127.0.0.1:5000
/// experiment_name: purchase-invoice
/// artifact_location: s3://bucket/mlflow
/// user_id: sagemaker
/// use_git_version: /srv/checkout
/// source_type: JOB
/// ```
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingConfig {
    #[serde(default)]
    tracking_uri: String,
    #[serde(default)]
    experiment_name: String,
    #[serde(default)]
    artifact_location: Option<String>,
    #[serde(default)]
    user_id: Option<String>,
    #[serde(default)]
    use_git_version: Option<PathBuf>,
    #[serde(default)]
    source_type: SourceType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    password: Option<String>,
    #[serde(default = "default_timeout")]
    timeout_secs: u64,
}

impl fmt::Debug for TrackingConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redacted = |secret: &Option<String>| secret.as_ref().map(|_| "<redacted>");
        f.debug_struct("TrackingConfig")
            .field("tracking_uri", &self.tracking_uri)
            .field("experiment_name", &self.experiment_name)
            .field("artifact_location", &self.artifact_location)
            .field("user_id", &self.user_id)
            .field("use_git_version", &self.use_git_version)
            .field("source_type", &self.source_type)
            .field("token", &redacted(&self.token))
            .field("username", &self.username)
            .field("password", &redacted(&self.password))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

const fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl TrackingConfig {
    /// Create a builder with the two required fields.
    #[must_use]
    pub fn builder(
        tracking_uri: impl Into<String>,
        experiment_name: impl Into<String>,
    ) -> TrackingConfigBuilder {
        TrackingConfigBuilder::new(tracking_uri, experiment_name)
    }

    /// Parse a configuration from YAML text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Yaml`] if the document is malformed.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load a configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the file is missing, or a parse error.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(Error::NotFound {
                path: path.to_path_buf(),
            });
        }
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    /// Apply the standard MLflow environment variables on top of this config.
    ///
    /// | Variable | Field |
    /// |----------|-------|
    /// | `MLFLOW_TRACKING_URI` | `tracking_uri` |
    /// | `MLFLOW_EXPERIMENT_NAME` | `experiment_name` |
    /// | `MLFLOW_TRACKING_TOKEN` | `token` |
    /// | `MLFLOW_TRACKING_USERNAME` | `username` |
    /// | `MLFLOW_TRACKING_PASSWORD` | `password` |
    /// | `MLFLOW_HTTP_REQUEST_TIMEOUT` | `timeout_secs` |
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if `MLFLOW_HTTP_REQUEST_TIMEOUT` is
    /// not a whole number of seconds.
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides_from(|name| std::env::var(name).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    ///
    /// Empty values are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the timeout variable does not parse.
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(uri) = get("MLFLOW_TRACKING_URI") {
            self.tracking_uri = uri;
        }
        if let Some(name) = get("MLFLOW_EXPERIMENT_NAME") {
            self.experiment_name = name;
        }
        if let Some(token) = get("MLFLOW_TRACKING_TOKEN") {
            self.token = Some(token);
        }
        if let Some(username) = get("MLFLOW_TRACKING_USERNAME") {
            self.username = Some(username);
        }
        if let Some(password) = get("MLFLOW_TRACKING_PASSWORD") {
            self.password = Some(password);
        }
        if let Some(timeout) = get("MLFLOW_HTTP_REQUEST_TIMEOUT") {
            self.timeout_secs = timeout.trim().parse().map_err(|_| {
                Error::Configuration(format!(
                    "MLFLOW_HTTP_REQUEST_TIMEOUT must be whole seconds, got '{timeout}'"
                ))
            })?;
        }
        Ok(self)
    }

    /// Replace the tracking URI.
    #[must_use]
    pub fn with_tracking_uri(mut self, uri: impl Into<String>) -> Self {
        self.tracking_uri = uri.into();
        self
    }

    /// Replace the experiment name.
    #[must_use]
    pub fn with_experiment_name(mut self, name: impl Into<String>) -> Self {
        self.experiment_name = name.into();
        self
    }

    /// Check that the required fields are present.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] naming the first missing field.
    pub fn validate(&self) -> Result<()> {
        if self.tracking_uri.trim().is_empty() {
            return Err(Error::Configuration(
                "tracking_uri is required".to_string(),
            ));
        }
        if self.experiment_name.trim().is_empty() {
            return Err(Error::Configuration(
                "experiment_name is required".to_string(),
            ));
        }
        if self.timeout_secs == 0 {
            return Err(Error::Configuration(
                "timeout_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Tracking server URI.
    #[must_use]
    pub fn tracking_uri(&self) -> &str {
        &self.tracking_uri
    }

    /// Experiment name.
    #[must_use]
    pub fn experiment_name(&self) -> &str {
        &self.experiment_name
    }

    /// Artifact root for a newly created experiment, if any.
    #[must_use]
    pub fn artifact_location(&self) -> Option<&str> {
        self.artifact_location.as_deref()
    }

    /// User recorded in the `mlflow.user` tag.
    #[must_use]
    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    /// Repository checkout used for git provenance tags.
    #[must_use]
    pub fn git_directory(&self) -> Option<&Path> {
        self.use_git_version.as_deref()
    }

    /// Source type tag value.
    #[must_use]
    pub const fn source_type(&self) -> SourceType {
        self.source_type
    }

    /// Bearer token for the tracking server.
    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Basic-auth credentials, when both halves are set.
    #[must_use]
    pub fn basic_auth(&self) -> Option<(&str, &str)> {
        match (&self.username, &self.password) {
            (Some(user), Some(pass)) => Some((user, pass)),
            _ => None,
        }
    }

    /// HTTP request timeout in seconds.
    #[must_use]
    pub const fn timeout_secs(&self) -> u64 {
        self.timeout_secs
    }
}

/// Builder for `TrackingConfig`.
#[derive(Debug)]
pub struct TrackingConfigBuilder {
    config: TrackingConfig,
}

impl TrackingConfigBuilder {
    /// Create a new builder with required fields.
    #[must_use]
    pub fn new(tracking_uri: impl Into<String>, experiment_name: impl Into<String>) -> Self {
        Self {
            config: TrackingConfig {
                tracking_uri: tracking_uri.into(),
                experiment_name: experiment_name.into(),
                artifact_location: None,
                user_id: None,
                use_git_version: None,
                source_type: SourceType::default(),
                token: None,
                username: None,
                password: None,
                timeout_secs: DEFAULT_TIMEOUT_SECS,
            },
        }
    }

    /// Set the artifact root used when the experiment is created.
    #[must_use]
    pub fn artifact_location(mut self, location: impl Into<String>) -> Self {
        self.config.artifact_location = Some(location.into());
        self
    }

    /// Set the user recorded on runs.
    #[must_use]
    pub fn user_id(mut self, user_id: impl Into<String>) -> Self {
        self.config.user_id = Some(user_id.into());
        self
    }

    /// Enable git provenance tags from the given checkout.
    #[must_use]
    pub fn use_git_version(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.use_git_version = Some(dir.into());
        self
    }

    /// Set the source type.
    #[must_use]
    pub const fn source_type(mut self, source_type: SourceType) -> Self {
        self.config.source_type = source_type;
        self
    }

    /// Set a bearer token.
    #[must_use]
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.config.token = Some(token.into());
        self
    }

    /// Set basic-auth credentials.
    #[must_use]
    pub fn basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.config.username = Some(username.into());
        self.config.password = Some(password.into());
        self
    }

    /// Set the HTTP request timeout.
    #[must_use]
    pub const fn timeout_secs(mut self, secs: u64) -> Self {
        self.config.timeout_secs = secs;
        self
    }

    /// Build the `TrackingConfig`.
    #[must_use]
    pub fn build(self) -> TrackingConfig {
        self.config
    }
}
