//! Artifact Record - a file uploaded under a run's artifact root

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Artifact Record represents one uploaded file.
///
/// `path` is relative to the run's artifact root and always uses `/` as the
/// separator, e.g. `artifacts/model/weights.bin`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArtifactRecord {
    run_id: String,
    path: String,
    size_bytes: u64,
    logged_at: DateTime<Utc>,
}

impl ArtifactRecord {
    /// Create a new artifact record stamped with the current time.
    #[must_use]
    pub fn new(run_id: impl Into<String>, path: impl Into<String>, size_bytes: u64) -> Self {
        Self {
            run_id: run_id.into(),
            path: path.into(),
            size_bytes,
            logged_at: Utc::now(),
        }
    }

    /// Get the run ID.
    #[must_use]
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Get the run-relative artifact path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Get the artifact size in bytes.
    #[must_use]
    pub const fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    /// Get the upload timestamp.
    #[must_use]
    pub const fn logged_at(&self) -> DateTime<Utc> {
        self.logged_at
    }
}
