//! OQC QCaaS REST API client.
//!
//! ## Endpoints
//!
//! | Method | Path | Purpose |
//! |--------|------|---------|
//! | `POST` | `/tasks/submit?qpu_id=` | schedule tasks, returns their ids |
//! | `GET`  | `/tasks/{id}/status?qpu_id=` | poll task state |
//! | `GET`  | `/tasks/{id}/results?qpu_id=` | fetch the result document |
//! | `GET`  | `/tasks/{id}/error?qpu_id=` | fetch the failure message |

// Allow dead code for API response fields deserialized but not yet consumed.
#![allow(dead_code)]

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use qcounts_core::{QpuTask, TaskResults};

use crate::error::{OqcError, OqcResult};

/// User agent sent with every request.
const USER_AGENT: &str = concat!("qcounts-adapter-oqc/", env!("CARGO_PKG_VERSION"));

/// Low-level QCaaS HTTP client.
pub struct OqcApi {
    /// HTTP client with timeouts configured.
    client: Client,
    /// API base URL (without trailing slash).
    base_url: String,
    /// Bearer token for authentication.
    token: String,
}

impl std::fmt::Debug for OqcApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OqcApi")
            .field("base_url", &self.base_url)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

impl OqcApi {
    /// Create a client for `base_url`.
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> OqcResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(USER_AGENT)
            .build()
            .map_err(OqcError::Http)?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn get<T: for<'de> Deserialize<'de>>(&self, path: &str, qpu_id: &str) -> OqcResult<T> {
        let url = self.url(path);
        debug!("GET {}", url);

        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .query(&[("qpu_id", qpu_id)])
            .send()
            .await?;

        handle_response(resp).await
    }

    async fn post<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        qpu_id: &str,
        body: &impl Serialize,
    ) -> OqcResult<T> {
        let url = self.url(path);
        debug!("POST {}", url);

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .query(&[("qpu_id", qpu_id)])
            .json(body)
            .send()
            .await?;

        handle_response(resp).await
    }

    /// Schedule tasks on `qpu_id`.
    #[instrument(skip(self, tasks))]
    pub async fn submit_tasks(
        &self,
        tasks: &[QpuTask],
        qpu_id: &str,
    ) -> OqcResult<Vec<ScheduledTask>> {
        debug!("Submitting {} task(s) to {}", tasks.len(), qpu_id);
        self.post("tasks/submit", qpu_id, &SubmitRequest { tasks })
            .await
    }

    #[instrument(skip(self))]
    pub async fn task_status(&self, task_id: &str, qpu_id: &str) -> OqcResult<TaskStatusResponse> {
        self.get(&format!("tasks/{task_id}/status"), qpu_id).await
    }

    #[instrument(skip(self))]
    pub async fn task_results(
        &self,
        task_id: &str,
        qpu_id: &str,
    ) -> OqcResult<TaskResultsResponse> {
        self.get(&format!("tasks/{task_id}/results"), qpu_id).await
    }

    /// Fetch the error document of a failed task.
    #[instrument(skip(self))]
    pub async fn task_error(&self, task_id: &str, qpu_id: &str) -> OqcResult<TaskErrorResponse> {
        self.get(&format!("tasks/{task_id}/error"), qpu_id).await
    }
}

/// Deserialize a success body, or turn the failure into an [`OqcError`].
async fn handle_response<T: for<'de> Deserialize<'de>>(response: reqwest::Response) -> OqcResult<T> {
    let status = response.status();

    if status.is_success() {
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    } else {
        let body = response.text().await.unwrap_or_default();
        Err(OqcError::ApiError {
            status: status.as_u16(),
            message: error_message(status, &body),
        })
    }
}

/// Pull the human-readable message out of an error body.
///
/// QCaaS answers with `{"detail": ...}` on most errors; plain-text bodies
/// are passed through; empty bodies fall back to the status reason.
pub(crate) fn error_message(status: StatusCode, body: &str) -> String {
    #[derive(Deserialize)]
    struct ErrorBody {
        #[serde(default)]
        detail: Option<String>,
        #[serde(default)]
        message: Option<String>,
        #[serde(default)]
        error: Option<String>,
    }

    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        if let Some(msg) = parsed.detail.or(parsed.message).or(parsed.error) {
            return msg;
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    } else {
        trimmed.to_string()
    }
}

// ---------------------------------------------------------------------------
// Request / response serde types
// ---------------------------------------------------------------------------

/// Request body for `POST /tasks/submit`.
#[derive(Debug, Serialize)]
pub struct SubmitRequest<'a> {
    pub tasks: &'a [QpuTask],
}

/// One entry of the `POST /tasks/submit` response.
#[derive(Debug, Clone, Deserialize)]
pub struct ScheduledTask {
    pub task_id: String,
    #[serde(default)]
    pub qpu_id: Option<String>,
}

/// Lifecycle state reported by `GET /tasks/{id}/status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Pending,
    Completed,
    Failed,
    Cancelled,
}

/// Response from `GET /tasks/{id}/status`.
#[derive(Debug, Deserialize)]
pub struct TaskStatusResponse {
    /// `CREATED | SUBMITTED | RUNNING | COMPLETED | FAILED | CANCELLED | EXPIRED | UNKNOWN`.
    pub status: String,
}

impl TaskStatusResponse {
    pub fn state(&self) -> TaskState {
        match self.status.to_ascii_uppercase().as_str() {
            "COMPLETED" => TaskState::Completed,
            "FAILED" | "EXPIRED" => TaskState::Failed,
            "CANCELLED" => TaskState::Cancelled,
            _ => TaskState::Pending,
        }
    }
}

/// Response from `GET /tasks/{id}/results`.
#[derive(Debug, Deserialize)]
pub struct TaskResultsResponse {
    #[serde(default)]
    pub task_id: Option<String>,
    /// Per-register counts; absent while the task is still running.
    #[serde(default)]
    pub results: Option<TaskResults>,
}

/// Response from `GET /tasks/{id}/error`.
#[derive(Debug, Deserialize)]
pub struct TaskErrorResponse {
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub error_code: Option<i64>,
}
