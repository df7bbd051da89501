//! Run Record - execution instance of an experiment

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::tags::RunTags;

/// Status of a run, as the tracking server names it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RunStatus {
    /// Run is currently executing.
    Running,
    /// Run is queued but not yet executing.
    Scheduled,
    /// Run completed successfully.
    Finished,
    /// Run failed with an error.
    Failed,
    /// Run was killed by user or system.
    Killed,
}

impl RunStatus {
    /// Wire name of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Running => "RUNNING",
            Self::Scheduled => "SCHEDULED",
            Self::Finished => "FINISHED",
            Self::Failed => "FAILED",
            Self::Killed => "KILLED",
        }
    }

    /// Whether the run has ended.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Failed | Self::Killed)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Run Record represents a single execution of an experiment.
///
/// Times are Unix epoch milliseconds, the unit the tracking protocol uses.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunRecord {
    run_id: String,
    experiment_id: String,
    status: RunStatus,
    start_time: i64,
    end_time: Option<i64>,
    artifact_uri: String,
    tags: RunTags,
}

impl RunRecord {
    /// Create a new running record with no tags and an empty artifact root.
    #[must_use]
    pub fn new(run_id: impl Into<String>, experiment_id: impl Into<String>) -> Self {
        Self::builder(run_id, experiment_id).build()
    }

    /// Create a builder for constructing a run record with optional fields.
    #[must_use]
    pub fn builder(
        run_id: impl Into<String>,
        experiment_id: impl Into<String>,
    ) -> RunRecordBuilder {
        RunRecordBuilder::new(run_id, experiment_id)
    }

    /// Get the run ID.
    #[must_use]
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Get the parent experiment ID.
    #[must_use]
    pub fn experiment_id(&self) -> &str {
        &self.experiment_id
    }

    /// Get the current run status.
    #[must_use]
    pub const fn status(&self) -> RunStatus {
        self.status
    }

    /// Get the start time in epoch millis.
    #[must_use]
    pub const fn start_time(&self) -> i64 {
        self.start_time
    }

    /// Get the end time in epoch millis, if the run has ended.
    #[must_use]
    pub const fn end_time(&self) -> Option<i64> {
        self.end_time
    }

    /// Get the artifact root URI of the run.
    #[must_use]
    pub fn artifact_uri(&self) -> &str {
        &self.artifact_uri
    }

    /// Get the tags the run was created with.
    #[must_use]
    pub const fn tags(&self) -> &RunTags {
        &self.tags
    }

    /// End the run with the given status.
    pub fn complete(&mut self, status: RunStatus, end_time: i64) {
        self.status = status;
        self.end_time = Some(end_time);
    }
}

/// Builder for `RunRecord`.
#[derive(Debug)]
pub struct RunRecordBuilder {
    run_id: String,
    experiment_id: String,
    start_time: i64,
    artifact_uri: String,
    tags: RunTags,
}

impl RunRecordBuilder {
    /// Create a new builder with required fields.
    #[must_use]
    pub fn new(run_id: impl Into<String>, experiment_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            experiment_id: experiment_id.into(),
            start_time: 0,
            artifact_uri: String::new(),
            tags: RunTags::default(),
        }
    }

    /// Set the start time in epoch millis.
    #[must_use]
    pub const fn start_time(mut self, start_time: i64) -> Self {
        self.start_time = start_time;
        self
    }

    /// Set the artifact root URI.
    #[must_use]
    pub fn artifact_uri(mut self, uri: impl Into<String>) -> Self {
        self.artifact_uri = uri.into();
        self
    }

    /// Set the creation tags.
    #[must_use]
    pub fn tags(mut self, tags: RunTags) -> Self {
        self.tags = tags;
        self
    }

    /// Build the `RunRecord` in `Running` status.
    #[must_use]
    pub fn build(self) -> RunRecord {
        RunRecord {
            run_id: self.run_id,
            experiment_id: self.experiment_id,
            status: RunStatus::Running,
            start_time: self.start_time,
            end_time: None,
            artifact_uri: self.artifact_uri,
            tags: self.tags,
        }
    }
}
