//! MLflow REST client (tracking API 2.0).
//!
//! Every request is a single blocking HTTP exchange. Status mapping lives in
//! `send`; the endpoint methods never look at status codes.

use std::fs::File;
use std::path::Path;
use std::time::Duration;

use chrono::Utc;
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;
use url::Url;

use super::{Experiment, RunInfo, RunStatus, TrackingClient};
use crate::artifact::{self, ArtifactRoot};
use crate::config::TrackingConfig;
use crate::tags::RunTags;
use crate::{Error, Result};

const USER_AGENT_VALUE: &str = concat!("runlog/", env!("CARGO_PKG_VERSION"));

const GET_EXPERIMENT_BY_NAME: &str = "api/2.0/mlflow/experiments/get-by-name";
const CREATE_EXPERIMENT: &str = "api/2.0/mlflow/experiments/create";
const CREATE_RUN: &str = "api/2.0/mlflow/runs/create";
const LOG_PARAMETER: &str = "api/2.0/mlflow/runs/log-parameter";
const LOG_METRIC: &str = "api/2.0/mlflow/runs/log-metric";
const UPDATE_RUN: &str = "api/2.0/mlflow/runs/update";
const ARTIFACTS: &str = "api/2.0/mlflow-artifacts/artifacts";

#[derive(Debug, Clone)]
enum Auth {
    None,
    Bearer(String),
    Basic { username: String, password: String },
}

/// Blocking client for an MLflow tracking server.
///
/// Artifact uploads follow the run's artifact root: `mlflow-artifacts:` roots
/// go through the server's artifact proxy, local roots are copied on disk,
/// and anything else is rejected with [`Error::UnsupportedArtifactStore`].
#[derive(Debug, Clone)]
pub struct MlflowClient {
    http: Client,
    base_url: Url,
    auth: Auth,
}

impl MlflowClient {
    /// Build a client for the tracking server named in `config`.
    ///
    /// Credentials and timeout are taken from the config as well.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the tracking URI is not an
    /// `http`/`https` URL, or [`Error::Http`] if the HTTP client cannot be built.
    pub fn new(config: &TrackingConfig) -> Result<Self> {
        let base_url = Url::parse(config.tracking_uri()).map_err(|e| {
            Error::Configuration(format!(
                "invalid tracking_uri '{}': {e}",
                config.tracking_uri()
            ))
        })?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(Error::Configuration(format!(
                "tracking_uri must be http or https, got '{}'",
                base_url.scheme()
            )));
        }

        let mut default_headers = HeaderMap::new();
        default_headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));

        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs()))
            .default_headers(default_headers)
            .build()?;

        let auth = match (config.token(), config.basic_auth()) {
            (Some(token), _) => Auth::Bearer(token.to_string()),
            (None, Some((username, password))) => Auth::Basic {
                username: username.to_string(),
                password: password.to_string(),
            },
            (None, None) => Auth::None,
        };

        Ok(Self {
            http,
            base_url,
            auth,
        })
    }

    /// Tracking server base URL.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                Error::Configuration(format!(
                    "tracking_uri cannot be a base URL: {}",
                    self.base_url
                ))
            })?
            .pop_if_empty()
            .extend(segments.into_iter().filter(|s| !s.is_empty()));
        Ok(url)
    }

    fn endpoint(&self, endpoint: &str) -> Result<Url> {
        self.url(endpoint.split('/'))
    }

    fn send(&self, request: RequestBuilder) -> Result<Response> {
        let request = match &self.auth {
            Auth::None => request,
            Auth::Bearer(token) => request.bearer_auth(token),
            Auth::Basic { username, password } => request.basic_auth(username, Some(password)),
        };

        let response = request.send()?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().unwrap_or_default();
        Err(server_error(status.as_u16(), &body))
    }

    fn get<T: DeserializeOwned>(&self, endpoint: &str, query: &[(&str, &str)]) -> Result<T> {
        let url = self.endpoint(endpoint)?;
        debug!(%url, "GET");
        let response = self.send(self.http.get(url).query(query))?;
        Ok(response.json()?)
    }

    fn post<B: Serialize, T: DeserializeOwned>(&self, endpoint: &str, body: &B) -> Result<T> {
        let url = self.endpoint(endpoint)?;
        debug!(%url, "POST");
        let response = self.send(self.http.post(url).json(body))?;
        Ok(response.json()?)
    }

    fn post_unit<B: Serialize>(&self, endpoint: &str, body: &B) -> Result<()> {
        let url = self.endpoint(endpoint)?;
        debug!(%url, "POST");
        self.send(self.http.post(url).json(body))?;
        Ok(())
    }

    fn upload_proxied(&self, root: &str, local_path: &Path, artifact_path: Option<&str>) -> Result<()> {
        let name = artifact::file_name(local_path)?;
        let url = self.url(
            ARTIFACTS
                .split('/')
                .chain(root.split('/'))
                .chain(artifact_path.unwrap_or_default().split('/'))
                .chain(std::iter::once(name.as_str())),
        )?;
        debug!(%url, file = %local_path.display(), "PUT artifact");
        let file = File::open(local_path)?;
        self.send(self.http.put(url).body(file))?;
        Ok(())
    }
}

/// Build an [`Error::Tracking`] from a failed response.
///
/// MLflow error bodies look like `{"error_code": "...", "message": "..."}`;
/// anything else is passed through as the message.
fn server_error(status: u16, body: &str) -> Error {
    #[derive(Deserialize)]
    struct ErrorBody {
        #[serde(default)]
        error_code: Option<String>,
        #[serde(default)]
        message: Option<String>,
    }

    let (error_code, message) = serde_json::from_str::<ErrorBody>(body)
        .map_or((None, None), |b| (b.error_code, b.message));

    Error::Tracking {
        status,
        error_code: error_code.unwrap_or_else(|| "UNKNOWN".to_string()),
        message: message.unwrap_or_else(|| body.trim().to_string()),
    }
}

// Wire types

#[derive(Deserialize)]
struct GetExperimentResponse {
    experiment: Experiment,
}

#[derive(Serialize)]
struct CreateExperimentRequest<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    artifact_location: Option<&'a str>,
}

#[derive(Deserialize)]
struct CreateExperimentResponse {
    experiment_id: String,
}

#[derive(Serialize)]
struct WireTag<'a> {
    key: &'a str,
    value: &'a str,
}

#[derive(Serialize)]
struct CreateRunRequest<'a> {
    experiment_id: &'a str,
    start_time: i64,
    tags: Vec<WireTag<'a>>,
}

#[derive(Deserialize)]
struct CreateRunResponse {
    run: WireRun,
}

#[derive(Deserialize)]
struct WireRun {
    info: WireRunInfo,
}

#[derive(Deserialize)]
struct WireRunInfo {
    #[serde(default)]
    run_id: Option<String>,
    #[serde(default)]
    run_uuid: Option<String>,
    experiment_id: String,
    #[serde(default)]
    artifact_uri: String,
    #[serde(default = "running")]
    status: RunStatus,
    #[serde(default, deserialize_with = "lenient_i64")]
    start_time: i64,
}

const fn running() -> RunStatus {
    RunStatus::Running
}

/// int64 fields may arrive as JSON numbers or strings.
fn lenient_i64<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<i64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumOrString {
        Num(i64),
        Str(String),
    }

    match NumOrString::deserialize(deserializer)? {
        NumOrString::Num(n) => Ok(n),
        NumOrString::Str(s) => s.parse().map_err(serde::de::Error::custom),
    }
}

#[derive(Serialize)]
struct LogParamRequest<'a> {
    run_id: &'a str,
    key: &'a str,
    value: &'a str,
}

#[derive(Serialize)]
struct LogMetricRequest<'a> {
    run_id: &'a str,
    key: &'a str,
    value: f64,
    timestamp: i64,
    step: i64,
}

#[derive(Serialize)]
struct UpdateRunRequest<'a> {
    run_id: &'a str,
    status: RunStatus,
    end_time: i64,
}

impl TrackingClient for MlflowClient {
    fn get_experiment_by_name(&mut self, name: &str) -> Result<Option<Experiment>> {
        match self.get::<GetExperimentResponse>(GET_EXPERIMENT_BY_NAME, &[("experiment_name", name)]) {
            Ok(response) => Ok(Some(response.experiment)),
            Err(e) if e.is_resource_missing() => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn create_experiment(
        &mut self,
        name: &str,
        artifact_location: Option<&str>,
    ) -> Result<String> {
        let response: CreateExperimentResponse = self.post(
            CREATE_EXPERIMENT,
            &CreateExperimentRequest {
                name,
                artifact_location,
            },
        )?;
        Ok(response.experiment_id)
    }

    fn create_run(&mut self, experiment_id: &str, tags: &RunTags) -> Result<RunInfo> {
        let request = CreateRunRequest {
            experiment_id,
            start_time: Utc::now().timestamp_millis(),
            tags: tags.iter().map(|(key, value)| WireTag { key, value }).collect(),
        };
        let response: CreateRunResponse = self.post(CREATE_RUN, &request)?;
        let info = response.run.info;

        let run_id = info.run_id.or(info.run_uuid).ok_or_else(|| Error::Tracking {
            status: 200,
            error_code: "INVALID_RESPONSE".to_string(),
            message: "runs/create response carries no run_id".to_string(),
        })?;

        Ok(RunInfo {
            run_id,
            experiment_id: info.experiment_id,
            artifact_uri: info.artifact_uri,
            status: info.status,
            start_time: info.start_time,
        })
    }

    fn log_param(&mut self, run_id: &str, key: &str, value: &str) -> Result<()> {
        self.post_unit(LOG_PARAMETER, &LogParamRequest { run_id, key, value })
    }

    fn log_metric(&mut self, run_id: &str, key: &str, value: f64) -> Result<()> {
        self.post_unit(
            LOG_METRIC,
            &LogMetricRequest {
                run_id,
                key,
                value,
                timestamp: Utc::now().timestamp_millis(),
                step: 0,
            },
        )
    }

    fn log_artifact(
        &mut self,
        run: &RunInfo,
        local_path: &Path,
        artifact_path: Option<&str>,
    ) -> Result<()> {
        artifact::ensure_exists(local_path)?;
        match ArtifactRoot::parse(&run.artifact_uri) {
            ArtifactRoot::Proxied(root) => self.upload_proxied(&root, local_path, artifact_path),
            ArtifactRoot::Local(root) => {
                let bytes = artifact::copy_to_local(&root, local_path, artifact_path)?;
                debug!(dest = %root.display(), bytes, "copied artifact");
                Ok(())
            }
            ArtifactRoot::Unsupported(uri) => Err(Error::UnsupportedArtifactStore(uri)),
        }
    }

    fn set_terminated(&mut self, run_id: &str, status: RunStatus) -> Result<()> {
        self.post_unit(
            UPDATE_RUN,
            &UpdateRunRequest {
                run_id,
                status,
                end_time: Utc::now().timestamp_millis(),
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_non_http_uri() {
        let config = TrackingConfig::builder("file:///tmp/mlruns", "exp").build();
        let err = MlflowClient::new(&config).unwrap_err();
        assert!(matches!(err, Error::Configuration(ref m) if m.contains("http")));
    }

    #[test]
    fn test_endpoint_keeps_path_prefix() {
        let config = TrackingConfig::builder("http://host:5000/mlflow/", "exp").build();
        let client = MlflowClient::new(&config).unwrap();
        let url = client.endpoint(CREATE_RUN).unwrap();
        assert_eq!(
            url.as_str(),
            "http://host:5000/mlflow/api/2.0/mlflow/runs/create"
        );
    }

    #[test]
    fn test_server_error_parses_mlflow_body() {
        let err = server_error(
            400,
            r#"{"error_code": "INVALID_PARAMETER_VALUE", "message": "bad key"}"#,
        );
        assert!(matches!(
            err,
            Error::Tracking { status: 400, ref error_code, ref message }
                if error_code == "INVALID_PARAMETER_VALUE" && message == "bad key"
        ));
    }

    #[test]
    fn test_server_error_plain_body() {
        let err = server_error(502, "Bad Gateway\n");
        assert!(matches!(
            err,
            Error::Tracking { status: 502, ref error_code, ref message }
                if error_code == "UNKNOWN" && message == "Bad Gateway"
        ));
    }

    #[test]
    fn test_run_info_accepts_string_start_time() {
        let info: WireRunInfo = serde_json::from_str(
            r#"{"run_uuid": "abc", "experiment_id": "1", "status": "RUNNING", "start_time": "42"}"#,
        )
        .unwrap();
        assert_eq!(info.start_time, 42);
        assert_eq!(info.run_uuid.as_deref(), Some("abc"));
    }
}
