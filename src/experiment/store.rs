//! Experiment Store - in-memory storage for experiment tracking data
//!
//! This module provides the storage layer behind `MemoryTrackingClient`,
//! keyed the way a tracking server is: experiments by ID and unique name,
//! runs by ID, and per-run params, metric histories and artifacts.

use std::collections::HashMap;

use super::{ArtifactRecord, ExperimentRecord, MetricRecord, ParamRecord, RunRecord};

/// In-memory store for experiment tracking data.
///
/// ## Design
///
/// Experiments and runs live in hash maps for O(1) lookups by ID, with a
/// secondary name index for experiments. Params, metrics and artifacts are
/// append-only vectors kept in logging order.
#[derive(Debug, Default)]
pub struct ExperimentStore {
    experiments: HashMap<String, ExperimentRecord>,
    experiment_names: HashMap<String, String>,
    runs: HashMap<String, RunRecord>,
    params: Vec<ParamRecord>,
    metrics: Vec<MetricRecord>,
    artifacts: Vec<ArtifactRecord>,
}

impl ExperimentStore {
    /// Create a new empty experiment store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.experiments.is_empty()
            && self.runs.is_empty()
            && self.params.is_empty()
            && self.metrics.is_empty()
            && self.artifacts.is_empty()
    }

    /// Get the number of experiments in the store.
    #[must_use]
    pub fn experiment_count(&self) -> usize {
        self.experiments.len()
    }

    /// Get the number of runs in the store.
    #[must_use]
    pub fn run_count(&self) -> usize {
        self.runs.len()
    }

    /// Get the number of metric points in the store.
    #[must_use]
    pub fn metric_count(&self) -> usize {
        self.metrics.len()
    }

    /// Add an experiment to the store.
    ///
    /// An experiment with the same name replaces the name index entry.
    pub fn add_experiment(&mut self, experiment: ExperimentRecord) {
        self.experiment_names.insert(
            experiment.name().to_string(),
            experiment.experiment_id().to_string(),
        );
        self.experiments
            .insert(experiment.experiment_id().to_string(), experiment);
    }

    /// Get an experiment by ID.
    #[must_use]
    pub fn get_experiment(&self, experiment_id: &str) -> Option<&ExperimentRecord> {
        self.experiments.get(experiment_id)
    }

    /// Get an experiment by its unique name.
    #[must_use]
    pub fn get_experiment_by_name(&self, name: &str) -> Option<&ExperimentRecord> {
        self.experiment_names
            .get(name)
            .and_then(|id| self.experiments.get(id))
    }

    /// Add a run to the store.
    pub fn add_run(&mut self, run: RunRecord) {
        self.runs.insert(run.run_id().to_string(), run);
    }

    /// Get a run by ID.
    #[must_use]
    pub fn get_run(&self, run_id: &str) -> Option<&RunRecord> {
        self.runs.get(run_id)
    }

    /// Get a run by ID for in-place updates.
    #[must_use]
    pub fn get_run_mut(&mut self, run_id: &str) -> Option<&mut RunRecord> {
        self.runs.get_mut(run_id)
    }

    /// Get all runs for an experiment.
    #[must_use]
    pub fn get_runs_for_experiment(&self, experiment_id: &str) -> Vec<&RunRecord> {
        self.runs
            .values()
            .filter(|run| run.experiment_id() == experiment_id)
            .collect()
    }

    /// Add a parameter to the store.
    pub fn add_param(&mut self, param: ParamRecord) {
        self.params.push(param);
    }

    /// Get the parameters of a run, in logging order.
    #[must_use]
    pub fn get_params_for_run(&self, run_id: &str) -> Vec<&ParamRecord> {
        self.params.iter().filter(|p| p.run_id() == run_id).collect()
    }

    /// Add a metric point to the store.
    pub fn add_metric(&mut self, metric: MetricRecord) {
        self.metrics.push(metric);
    }

    /// Get the history of one metric of a run.
    ///
    /// Points are sorted by step; points sharing a step keep the order in
    /// which they were logged.
    ///
    /// ## Example
    ///
    /// ```rust
    /// use runlog::experiment::{ExperimentStore, MetricRecord};
    ///
    /// let mut store = ExperimentStore::new();
    /// for (i, loss) in [0.9, 0.5, 0.2].into_iter().enumerate() {
    ///     store.add_metric(MetricRecord::new("run-001", "loss", loss, i as i64, 0));
    /// }
    ///
    /// let history = store.get_metrics_for_run("run-001", "loss");
    /// let values: Vec<f64> = history.iter().map(|m| m.value()).collect();
    /// assert_eq!(values, vec![0.9, 0.5, 0.2]);
    /// ```
    #[must_use]
    pub fn get_metrics_for_run(&self, run_id: &str, key: &str) -> Vec<MetricRecord> {
        let mut metrics: Vec<MetricRecord> = self
            .metrics
            .iter()
            .filter(|m| m.run_id() == run_id && m.key() == key)
            .cloned()
            .collect();

        // Stable sort: ties stay in logging order
        metrics.sort_by_key(MetricRecord::step);

        metrics
    }

    /// Add an artifact record to the store.
    pub fn add_artifact(&mut self, artifact: ArtifactRecord) {
        self.artifacts.push(artifact);
    }

    /// Get the artifacts of a run, in upload order.
    #[must_use]
    pub fn get_artifacts_for_run(&self, run_id: &str) -> Vec<&ArtifactRecord> {
        self.artifacts
            .iter()
            .filter(|a| a.run_id() == run_id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_default() {
        let store = ExperimentStore::new();
        assert!(store.is_empty());
        assert_eq!(store.experiment_count(), 0);
        assert_eq!(store.run_count(), 0);
        assert_eq!(store.metric_count(), 0);
    }

    #[test]
    fn test_store_add_and_get() {
        let mut store = ExperimentStore::new();

        store.add_experiment(ExperimentRecord::new("1", "Test"));
        store.add_run(RunRecord::new("run-1", "1"));
        store.add_param(ParamRecord::new("run-1", "lr", "0.01"));
        store.add_metric(MetricRecord::new("run-1", "loss", 0.5, 0, 0));

        assert!(!store.is_empty());
        assert!(store.get_experiment("1").is_some());
        assert_eq!(
            store.get_experiment_by_name("Test").map(ExperimentRecord::experiment_id),
            Some("1")
        );
        assert!(store.get_run("run-1").is_some());
        assert_eq!(store.get_params_for_run("run-1").len(), 1);
    }

    #[test]
    fn test_get_metrics_for_run_ordering() {
        let mut store = ExperimentStore::new();

        // Add out of order
        store.add_metric(MetricRecord::new("run-1", "loss", 0.2, 0, 2));
        store.add_metric(MetricRecord::new("run-1", "loss", 0.0, 0, 0));
        store.add_metric(MetricRecord::new("run-1", "loss", 0.1, 0, 1));

        let metrics = store.get_metrics_for_run("run-1", "loss");

        assert_eq!(metrics.len(), 3);
        assert_eq!(metrics[0].step(), 0);
        assert_eq!(metrics[1].step(), 1);
        assert_eq!(metrics[2].step(), 2);
    }

    #[test]
    fn test_same_step_keeps_logging_order() {
        let mut store = ExperimentStore::new();
        store.add_metric(MetricRecord::new("run-1", "acc", 0.3, 5, 0));
        store.add_metric(MetricRecord::new("run-1", "acc", 0.1, 5, 0));
        store.add_metric(MetricRecord::new("run-2", "acc", 0.9, 5, 0));

        let values: Vec<f64> = store
            .get_metrics_for_run("run-1", "acc")
            .iter()
            .map(MetricRecord::value)
            .collect();
        assert_eq!(values, vec![0.3, 0.1]);
    }
}
