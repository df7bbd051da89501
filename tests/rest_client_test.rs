//! Integration tests for MlflowClient.
//!
//! Uses wiremock for the tracking server. The client is blocking, so each
//! exchange runs on the blocking pool while the mock server keeps serving.

use std::fs;

use runlog::client::RunInfo;
use runlog::{
    log_experiment, Error, ExperimentReport, MlflowClient, RunLogger, RunStatus, RunTags,
    TrackingClient, TrackingConfig,
};
use serde_json::json;
use wiremock::matchers::{body_json, body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_config(mock_server: &MockServer) -> TrackingConfig {
    TrackingConfig::builder(mock_server.uri(), "purchase-invoice")
        .user_id("sagemaker")
        .build()
}

async fn blocking<T, F>(f: F) -> T
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.expect("blocking task panicked")
}

fn run_response(run_id: &str, artifact_uri: &str) -> serde_json::Value {
    json!({
        "run": {
            "info": {
                "run_id": run_id,
                "run_uuid": run_id,
                "experiment_id": "7",
                "user_id": "sagemaker",
                "status": "RUNNING",
                "start_time": 1_700_000_000_000_i64,
                "artifact_uri": artifact_uri,
                "lifecycle_stage": "active"
            },
            "data": {}
        }
    })
}

#[tokio::test(flavor = "multi_thread")]
async fn test_get_experiment_by_name_found() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/2.0/mlflow/experiments/get-by-name"))
        .and(query_param("experiment_name", "purchase-invoice"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "experiment": {
                "experiment_id": "7",
                "name": "purchase-invoice",
                "artifact_location": "s3://bucket/mlflow",
                "lifecycle_stage": "active"
            }
        })))
        .mount(&mock_server)
        .await;

    let config = test_config(&mock_server);
    let experiment = blocking(move || {
        let mut client = MlflowClient::new(&config).unwrap();
        client.get_experiment_by_name("purchase-invoice")
    })
    .await
    .expect("lookup failed")
    .expect("expected Some");

    assert_eq!(experiment.experiment_id, "7");
    assert_eq!(experiment.artifact_location.as_deref(), Some("s3://bucket/mlflow"));
    assert!(!experiment.is_deleted());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_get_experiment_by_name_missing_is_none() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/2.0/mlflow/experiments/get-by-name"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error_code": "RESOURCE_DOES_NOT_EXIST",
            "message": "Could not find experiment with name 'purchase-invoice'"
        })))
        .mount(&mock_server)
        .await;

    let config = test_config(&mock_server);
    let experiment = blocking(move || {
        let mut client = MlflowClient::new(&config).unwrap();
        client.get_experiment_by_name("purchase-invoice")
    })
    .await
    .expect("lookup failed");

    assert!(experiment.is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_session_creates_missing_experiment_with_artifact_location() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/2.0/mlflow/experiments/get-by-name"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error_code": "RESOURCE_DOES_NOT_EXIST",
            "message": "not found"
        })))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/2.0/mlflow/experiments/create"))
        .and(body_json(json!({
            "name": "purchase-invoice",
            "artifact_location": "s3://bucket/mlflow"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"experiment_id": "12"})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = TrackingConfig::builder(mock_server.uri(), "purchase-invoice")
        .artifact_location("s3://bucket/mlflow")
        .build();
    let experiment_id = blocking(move || {
        let client = MlflowClient::new(&config).unwrap();
        RunLogger::new(client, config).map(|l| l.experiment_id().to_string())
    })
    .await
    .expect("session failed");

    assert_eq!(experiment_id, "12");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_create_run_sends_tags() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/2.0/mlflow/runs/create"))
        .and(body_partial_json(json!({
            "experiment_id": "7",
            "tags": [
                {"key": "mlflow.runName", "value": "baseline"},
                {"key": "mlflow.user", "value": "sagemaker"}
            ]
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(run_response("abc123", "mlflow-artifacts:/7/abc123/artifacts")),
        )
        .mount(&mock_server)
        .await;

    let config = test_config(&mock_server);
    let run = blocking(move || {
        let mut client = MlflowClient::new(&config).unwrap();
        let tags = RunTags::builder()
            .user("sagemaker")
            .run_name("baseline")
            .build();
        client.create_run("7", &tags)
    })
    .await
    .expect("create run failed");

    assert_eq!(run.run_id, "abc123");
    assert_eq!(run.experiment_id, "7");
    assert_eq!(run.status, RunStatus::Running);
    assert_eq!(run.artifact_uri, "mlflow-artifacts:/7/abc123/artifacts");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_log_metric_and_param_bodies() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/2.0/mlflow/runs/log-parameter"))
        .and(body_json(json!({"run_id": "abc123", "key": "C", "value": "1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/2.0/mlflow/runs/log-metric"))
        .and(body_partial_json(json!({
            "run_id": "abc123",
            "key": "loss",
            "value": 0.5,
            "step": 0
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = test_config(&mock_server);
    blocking(move || -> runlog::Result<()> {
        let mut client = MlflowClient::new(&config)?;
        client.log_param("abc123", "C", "1")?;
        client.log_metric("abc123", "loss", 0.5)
    })
    .await
    .expect("logging failed");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_server_error_is_surfaced() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/2.0/mlflow/runs/log-parameter"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error_code": "INVALID_PARAMETER_VALUE",
            "message": "Changing param values is not allowed"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = test_config(&mock_server);
    let err = blocking(move || {
        let mut client = MlflowClient::new(&config).unwrap();
        client.log_param("abc123", "C", "2")
    })
    .await
    .unwrap_err();

    match err {
        Error::Tracking {
            status,
            error_code,
            message,
        } => {
            assert_eq!(status, 400);
            assert_eq!(error_code, "INVALID_PARAMETER_VALUE");
            assert!(message.contains("not allowed"));
        }
        other => panic!("expected Tracking error, got {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_bearer_token_sent() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/2.0/mlflow/runs/update"))
        .and(header("authorization", "Bearer test-token"))
        .and(body_partial_json(json!({"run_id": "abc123", "status": "FINISHED"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = TrackingConfig::builder(mock_server.uri(), "exp")
        .token("test-token")
        .build();
    blocking(move || {
        let mut client = MlflowClient::new(&config).unwrap();
        client.set_terminated("abc123", RunStatus::Finished)
    })
    .await
    .expect("update failed");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_proxied_artifacts_one_put_per_file() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path(
            "/api/2.0/mlflow-artifacts/artifacts/7/abc123/artifacts/artifacts/model.pkl",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("PUT"))
        .and(path(
            "/api/2.0/mlflow-artifacts/artifacts/7/abc123/artifacts/artifacts/vectorizer/vocab.json",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let out = tempfile::tempdir().unwrap();
    fs::write(out.path().join("model.pkl"), b"weights").unwrap();
    fs::create_dir(out.path().join("vectorizer")).unwrap();
    fs::write(out.path().join("vectorizer/vocab.json"), b"{}").unwrap();

    let config = test_config(&mock_server);
    let dir = out.path().to_path_buf();
    blocking(move || {
        let mut client = MlflowClient::new(&config).unwrap();
        let run = RunInfo {
            run_id: "abc123".to_string(),
            experiment_id: "7".to_string(),
            artifact_uri: "mlflow-artifacts:/7/abc123/artifacts".to_string(),
            status: RunStatus::Running,
            start_time: 0,
        };
        client.log_artifacts(&run, &dir, Some("artifacts"))
    })
    .await
    .expect("upload failed");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_object_store_artifact_root_is_unsupported() {
    let mock_server = MockServer::start().await;
    let out = tempfile::tempdir().unwrap();
    let file = out.path().join("model.pkl");
    fs::write(&file, b"weights").unwrap();

    let config = test_config(&mock_server);
    let err = blocking(move || {
        let mut client = MlflowClient::new(&config).unwrap();
        let run = RunInfo {
            run_id: "abc123".to_string(),
            experiment_id: "7".to_string(),
            artifact_uri: "s3://bucket/mlflow/abc123/artifacts".to_string(),
            status: RunStatus::Running,
            start_time: 0,
        };
        client.log_artifact(&run, &file, None)
    })
    .await
    .unwrap_err();

    assert!(matches!(err, Error::UnsupportedArtifactStore(ref uri) if uri.starts_with("s3://")));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_log_experiment_missing_dir_sends_nothing() {
    let mock_server = MockServer::start().await;

    // Any request at all fails the test on drop
    Mock::given(wiremock::matchers::any())
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&mock_server)
        .await;

    let config = test_config(&mock_server);
    let err = blocking(move || {
        let client = MlflowClient::new(&config).unwrap();
        let report = ExperimentReport::new("r", "/no/such/artifacts");
        log_experiment(client, config, &report)
    })
    .await
    .unwrap_err();

    assert!(matches!(err, Error::NotFound { .. }));
}
