//! Run tags
//!
//! Tags are fixed when a run is created. `RunTagsBuilder` collects them and
//! `build()` freezes the set; there is no way to add a tag to a `RunTags`
//! afterwards.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::SourceType;
use crate::git::GitMetadata;

/// `mlflow.user`
pub const USER: &str = "mlflow.user";
/// `mlflow.runName`
pub const RUN_NAME: &str = "mlflow.runName";
/// `mlflow.source.type`
pub const SOURCE_TYPE: &str = "mlflow.source.type";
/// `mlflow.source.name`
pub const SOURCE_NAME: &str = "mlflow.source.name";
/// `mlflow.source.git.repoURL`
pub const GIT_REPO_URL: &str = "mlflow.source.git.repoURL";
/// `mlflow.source.git.branch`
pub const GIT_BRANCH: &str = "mlflow.source.git.branch";
/// `mlflow.source.git.commit`
pub const GIT_COMMIT: &str = "mlflow.source.git.commit";

/// Immutable tag set attached to a run at creation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunTags {
    tags: BTreeMap<String, String>,
}

impl RunTags {
    /// Start building a tag set.
    #[must_use]
    pub fn builder() -> RunTagsBuilder {
        RunTagsBuilder::default()
    }

    /// Look up a tag value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    /// Number of tags.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    /// Whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Iterate over `(key, value)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.tags.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Builder for `RunTags`.
#[derive(Debug, Default)]
pub struct RunTagsBuilder {
    tags: BTreeMap<String, String>,
}

impl RunTagsBuilder {
    /// Set an arbitrary tag. Later values for the same key win.
    #[must_use]
    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Set `mlflow.user`.
    #[must_use]
    pub fn user(self, user_id: &str) -> Self {
        self.tag(USER, user_id)
    }

    /// Set `mlflow.runName`.
    #[must_use]
    pub fn run_name(self, run_name: &str) -> Self {
        self.tag(RUN_NAME, run_name)
    }

    /// Set the source type and git provenance tags.
    ///
    /// The remote URL doubles as the source name.
    #[must_use]
    pub fn git(self, source_type: SourceType, git: &GitMetadata) -> Self {
        self.tag(SOURCE_TYPE, source_type.as_str())
            .tag(SOURCE_NAME, git.remote_url())
            .tag(GIT_REPO_URL, git.remote_url())
            .tag(GIT_BRANCH, git.branch())
            .tag(GIT_COMMIT, git.commit())
    }

    /// Freeze the tag set.
    #[must_use]
    pub fn build(self) -> RunTags {
        RunTags { tags: self.tags }
    }
}
