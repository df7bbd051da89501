//! Error types for runlog
//!
//! Every error aborts the current operation and surfaces to the caller.
//! Nothing here is retried.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Runlog error types
#[derive(Error, Debug)]
pub enum Error {
    /// Required configuration is missing or malformed
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A local file or directory does not exist
    #[error("Not found: {}", path.display())]
    NotFound {
        /// Path that was checked
        path: PathBuf,
    },

    /// The configured source-control directory is not a usable repository
    #[error("Git metadata error for {}: {message}", path.display())]
    GitMetadata {
        /// Repository directory
        path: PathBuf,
        /// What went wrong while reading it
        message: String,
    },

    /// Logging was attempted outside an active run
    #[error("No active run: call start_run before logging")]
    NoActiveRun,

    /// Caller-supplied payload rejected before any remote call
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Artifact root URI uses a scheme this client cannot write to
    #[error("Unsupported artifact store: {0}")]
    UnsupportedArtifactStore(String),

    /// Tracking server answered with a non-success status
    #[error("Tracking server error ({status} {error_code}): {message}")]
    Tracking {
        /// HTTP status code
        status: u16,
        /// Server error code (e.g. `RESOURCE_DOES_NOT_EXIST`)
        error_code: String,
        /// Server message
        message: String,
    },

    /// Transport-level HTTP failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML config parse error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    /// Whether the tracking server reported a missing resource.
    #[must_use]
    pub fn is_resource_missing(&self) -> bool {
        matches!(
            self,
            Self::Tracking { status, error_code, .. }
                if *status == 404 || error_code == "RESOURCE_DOES_NOT_EXIST"
        )
    }
}
