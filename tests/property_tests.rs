//! Property-based tests for runlog
//!
//! - Metric series expand to exactly one point per element, in order
//! - Params round-trip to one call per key
//! - Run with ProptestConfig::with_cases(100)

use std::collections::BTreeMap;

use proptest::prelude::*;
use runlog::client::TrackingCall;
use runlog::{MemoryTrackingClient, MetricValue, RunLogger, TrackingConfig};

// ============================================================================
// Property Test Generators (Strategies)
// ============================================================================

/// Generate metric names
fn arb_key() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,15}"
}

/// Generate a metric value: scalar or short series
fn arb_metric_value() -> impl Strategy<Value = MetricValue> {
    prop_oneof![
        (-1.0e6f64..1.0e6).prop_map(MetricValue::Scalar),
        proptest::collection::vec(-1.0e6f64..1.0e6, 0..20).prop_map(MetricValue::Series),
    ]
}

fn session() -> RunLogger<MemoryTrackingClient> {
    let config = TrackingConfig::builder("http://tracking.local:5000", "prop").build();
    let mut logger = RunLogger::new(MemoryTrackingClient::new(), config).unwrap();
    logger.start_run("prop-run").unwrap();
    logger
}

fn logged_metrics(client: &MemoryTrackingClient) -> Vec<(String, f64)> {
    client
        .calls()
        .iter()
        .filter_map(|call| match call {
            TrackingCall::LogMetric { key, value, .. } => Some((key.clone(), *value)),
            _ => None,
        })
        .collect()
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Property: a series produces one call per element, in order
    #[test]
    fn prop_series_expands_in_order(
        key in arb_key(),
        values in proptest::collection::vec(-1.0e6f64..1.0e6, 0..50)
    ) {
        let mut logger = session();
        logger.log_metrics([(key.as_str(), values.clone())]).unwrap();

        let logged = logged_metrics(logger.client());
        prop_assert_eq!(logged.len(), values.len());
        for ((k, v), expected) in logged.iter().zip(&values) {
            prop_assert_eq!(k, &key);
            prop_assert_eq!(v.to_bits(), expected.to_bits());
        }
    }

    /// Property: total calls equal total points across a whole mapping
    #[test]
    fn prop_mapping_call_count_matches_points(
        metrics in proptest::collection::btree_map(arb_key(), arb_metric_value(), 0..10)
    ) {
        let mut logger = session();
        let expected: Vec<(String, f64)> = metrics
            .iter()
            .flat_map(|(k, v)| v.points().iter().map(move |p| (k.clone(), *p)))
            .collect();

        logger.log_metrics(metrics).unwrap();

        prop_assert_eq!(logged_metrics(logger.client()), expected);
    }

    /// Property: one param call per key
    #[test]
    fn prop_one_call_per_param(
        params in proptest::collection::btree_map(arb_key(), any::<i64>(), 0..20)
    ) {
        let mut logger = session();
        logger.log_params(params.clone()).unwrap();

        let logged: BTreeMap<String, String> = logger
            .client()
            .calls()
            .iter()
            .filter_map(|call| match call {
                TrackingCall::LogParam { key, value, .. } => Some((key.clone(), value.clone())),
                _ => None,
            })
            .collect();

        prop_assert_eq!(logged.len(), params.len());
        for (key, value) in &params {
            prop_assert_eq!(logged.get(key), Some(&value.to_string()));
        }
    }
}
