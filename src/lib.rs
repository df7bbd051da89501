//! # runlog: Run Logging for MLflow-Compatible Tracking Servers
//!
//! runlog wraps a tracking client in a small session object: point it at a
//! tracking server and an experiment name, start a run, log params, metrics
//! and artifacts, end the run.
//!
//! ## Design Principles
//!
//! - **Composition**: [`RunLogger`] owns a [`TrackingClient`] and exposes only
//!   the session operations, not the whole client surface
//! - **No global state**: the tracking URI lives on [`TrackingConfig`]
//! - **Tags fixed at creation**: [`RunTags`] is built, then frozen, before a
//!   run is created
//! - **No hidden recovery**: every failure reaches the caller unchanged
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use runlog::{MlflowClient, RunLogger, TrackingConfig};
//!
//! let config = TrackingConfig::builder("http://127.0.0.1:5000", "purchase-invoice")
//!     .artifact_location("mlflow-artifacts:/purchase-invoice")
//!     .user_id("sagemaker")
//!     .build();
//!
//! let client = MlflowClient::new(&config)?;
//! let mut logger = RunLogger::new(client, config)?;
//!
//! logger.start_run("tfidf-logreg")?;
//! logger.log_params([("C", 1.0), ("max_iter", 200.0)])?;
//! logger.log_metrics([("loss", vec![0.9, 0.5, 0.2])])?;
//! logger.log_artifacts("out/", Some("artifacts"))?;
//! logger.end_run()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod artifact;
pub mod client;
pub mod config;
pub mod error;
pub mod experiment;
pub mod git;
pub mod logger;
pub mod report;
pub mod tags;

pub use client::{MemoryTrackingClient, MlflowClient, RunStatus, TrackingClient};
pub use config::{SourceType, TrackingConfig};
pub use error::{Error, Result};
pub use logger::{ActiveRun, MetricValue, ParamValue, RunLogger};
pub use report::{log_experiment, ExperimentReport};
pub use tags::RunTags;
