//! Backend client for publishing and executing workflows
//!
//! Requests are single-shot: no retry and no timeout unless one is
//! configured. Failures are logged before they are returned.

use std::time::Duration;

use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::constants::api;
use crate::dsl::WorkflowDsl;
use crate::error::{Result, WorkflowError};

#[derive(Debug, Serialize)]
struct PublishRequest<'a> {
    dsl: &'a WorkflowDsl,
    name: &'a str,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PublishResponse {
    pub workflow_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExecuteRequest<'a> {
    workflow_id: &'a str,
    input_variables: &'a Map<String, Value>,
}

/// Lifecycle state reported by the backend for an execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExecutionStatus {
    Running,
    Completed,
    Failed,
    Paused,
    WaitingAuth,
    #[serde(other)]
    Unknown,
}

impl ExecutionStatus {
    pub fn is_finished(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Execution descriptor returned by execute and status lookups
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Execution {
    pub id: String,
    #[serde(default)]
    pub workflow_id: Option<String>,
    #[serde(default = "running")]
    pub status: ExecutionStatus,
    #[serde(default)]
    pub current_node_id: Option<String>,
    #[serde(default)]
    pub node_results: Map<String, Value>,
    #[serde(default)]
    pub error: Option<String>,
}

fn running() -> ExecutionStatus {
    ExecutionStatus::Running
}

/// HTTP client for the workflow backend
#[derive(Debug, Clone)]
pub struct BackendClient {
    client: Client,
    base_url: String,
}

impl BackendClient {
    /// Create a client without a request timeout
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_timeout(base_url, None)
    }

    pub fn with_timeout(base_url: &str, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Publish a compiled workflow, returning its backend ID
    pub async fn publish(&self, dsl: &WorkflowDsl, name: &str) -> Result<String> {
        let response: PublishResponse = self
            .post(api::PUBLISH, &PublishRequest { dsl, name })
            .await?;
        log::info!("Published workflow '{}' as {}", name, response.workflow_id);
        Ok(response.workflow_id)
    }

    /// Start an execution of a published workflow
    pub async fn execute(
        &self,
        workflow_id: &str,
        input_variables: &Map<String, Value>,
    ) -> Result<Execution> {
        let execution: Execution = self
            .post(
                api::EXECUTE,
                &ExecuteRequest {
                    workflow_id,
                    input_variables,
                },
            )
            .await?;
        log::info!("Started execution {} of {}", execution.id, workflow_id);
        Ok(execution)
    }

    /// Look up the current state of an execution
    pub async fn execution_status(&self, execution_id: &str) -> Result<Execution> {
        let url = self.execution_url(execution_id)?;
        log::debug!("GET {}", url);
        let response = self.client.get(url).send().await.map_err(|e| {
            log::error!("Status lookup for {} failed: {}", execution_id, e);
            e
        })?;
        Self::read_json(response, "GET").await
    }

    /// Status URL with the ID as one escaped path segment
    fn execution_url(&self, execution_id: &str) -> Result<Url> {
        let base = format!("{}{}", self.base_url, api::EXECUTIONS);
        let mut url =
            Url::parse(&base).map_err(|e| WorkflowError::InvalidUrl(format!("{}: {}", base, e)))?;
        url.path_segments_mut()
            .map_err(|_| WorkflowError::InvalidUrl(base.clone()))?
            .push(execution_id);
        Ok(url)
    }

    async fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        log::debug!("POST {}", url);
        let response = self.client.post(&url).json(body).send().await.map_err(|e| {
            log::error!("POST {} failed: {}", url, e);
            e
        })?;
        Self::read_json(response, "POST").await
    }

    async fn read_json<T: DeserializeOwned>(response: reqwest::Response, verb: &str) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            log::error!("HTTP {} failed: {} - {}", verb, status, body);
            return Err(WorkflowError::backend(status.as_u16(), body));
        }
        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sample_dsl() -> WorkflowDsl {
        WorkflowDsl {
            name: "demo".to_string(),
            nodes: Vec::new(),
            edges: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_publish_returns_workflow_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/workflows/publish"))
            .and(body_json(json!({
                "dsl": {"name": "demo", "nodes": [], "edges": []},
                "name": "demo"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"workflow_id": "wf-1"})))
            .mount(&server)
            .await;

        let client = BackendClient::new(&format!("{}/", server.uri())).unwrap();
        let id = client.publish(&sample_dsl(), "demo").await.unwrap();
        assert_eq!(id, "wf-1");
    }

    #[tokio::test]
    async fn test_execute_sends_camel_case_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/workflows/execute"))
            .and(body_json(json!({
                "workflowId": "wf-1",
                "inputVariables": {"url": "https://example.com"}
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"id": "ex-9", "status": "running"})),
            )
            .mount(&server)
            .await;

        let client = BackendClient::new(&server.uri()).unwrap();
        let mut inputs = Map::new();
        inputs.insert("url".to_string(), json!("https://example.com"));
        let execution = client.execute("wf-1", &inputs).await.unwrap();
        assert_eq!(execution.id, "ex-9");
        assert_eq!(execution.status, ExecutionStatus::Running);
    }

    #[tokio::test]
    async fn test_execution_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/workflows/executions/ex-9"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "ex-9",
                "workflowId": "wf-1",
                "status": "waiting-auth",
                "currentNodeId": "agent_2"
            })))
            .mount(&server)
            .await;

        let client = BackendClient::new(&server.uri()).unwrap();
        let execution = client.execution_status("ex-9").await.unwrap();
        assert_eq!(execution.status, ExecutionStatus::WaitingAuth);
        assert_eq!(execution.current_node_id.as_deref(), Some("agent_2"));
        assert!(!execution.status.is_finished());
    }

    #[tokio::test]
    async fn test_execution_id_is_one_path_segment() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/workflows/executions/a%2Fb%3Fx"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "a/b?x",
                "status": "completed"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = BackendClient::new(&server.uri()).unwrap();
        let execution = client.execution_status("a/b?x").await.unwrap();
        assert_eq!(execution.id, "a/b?x");
        assert!(execution.status.is_finished());
    }

    #[test]
    fn test_unparseable_base_url_is_an_error() {
        let client = BackendClient::new("not a url").unwrap();
        assert!(matches!(
            client.execution_url("ex-1"),
            Err(WorkflowError::InvalidUrl(_))
        ));
    }

    #[tokio::test]
    async fn test_backend_error_is_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/workflows/publish"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let client = BackendClient::new(&server.uri()).unwrap();
        let err = client.publish(&sample_dsl(), "demo").await.unwrap_err();
        match err {
            WorkflowError::Backend { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body, "boom");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unknown_status_is_tolerated() {
        let execution: Execution =
            serde_json::from_value(json!({"id": "x", "status": "exploded"})).unwrap();
        assert_eq!(execution.status, ExecutionStatus::Unknown);
    }
}
