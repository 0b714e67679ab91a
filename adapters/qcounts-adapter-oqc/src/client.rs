//! [`RemoteJobClient`] implementation for OQC QCaaS.

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use qcounts_core::{
    BridgeConfig, ClientResult, QpuTask, RemoteError, RemoteJobClient, TaskId, TaskResults,
};

use crate::api::{OqcApi, TaskState};
use crate::error::{OqcError, OqcResult};

/// Default interval between status polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Default upper bound on waiting for a task.
pub const DEFAULT_MAX_WAIT: Duration = Duration::from_secs(10 * 60);

/// OQC cloud QPU client.
///
/// Owns one HTTP session. Schedules a single task per call and polls its
/// status until it reaches a terminal state.
///
/// # Example
///
/// ```ignore
/// use qcounts_adapter_oqc::OqcClient;
/// use qcounts_core::BridgeConfig;
///
/// let client = OqcClient::from_config(&BridgeConfig::from_env())?
///     .with_poll_interval(std::time::Duration::from_millis(500));
/// ```
#[derive(Debug)]
pub struct OqcClient {
    api: OqcApi,
    poll_interval: Duration,
    max_wait: Duration,
}

impl OqcClient {
    /// Open a session using the token and URL from `config`.
    pub fn from_config(config: &BridgeConfig) -> OqcResult<Self> {
        let token = config.auth_token()?;
        let url = config.url()?;
        Self::new(url, token)
    }

    /// Open a session against an explicit URL (useful for testing).
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> OqcResult<Self> {
        Ok(Self {
            api: OqcApi::new(base_url, token)?,
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_wait: DEFAULT_MAX_WAIT,
        })
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = max_wait;
        self
    }

    pub fn base_url(&self) -> &str {
        self.api.base_url()
    }

    async fn submit(&self, task: &QpuTask, device: &str) -> OqcResult<TaskId> {
        let scheduled = self
            .api
            .submit_tasks(std::slice::from_ref(task), device)
            .await?;
        let first = scheduled
            .into_iter()
            .next()
            .ok_or_else(|| OqcError::MalformedResponse("submit returned no task id".into()))?;
        Ok(TaskId::new(first.task_id))
    }

    /// Poll until the task is terminal or `max_wait` elapses.
    async fn wait_for_completion(&self, task_id: &str, device: &str) -> OqcResult<()> {
        let deadline = Instant::now() + self.max_wait;

        loop {
            let status = self.api.task_status(task_id, device).await?;
            match status.state() {
                TaskState::Completed => return Ok(()),
                TaskState::Failed => return Err(self.failure_reason(task_id, device).await),
                TaskState::Cancelled => return Err(OqcError::TaskCancelled(task_id.to_string())),
                TaskState::Pending => {
                    debug!("Task {} is {}", task_id, status.status);
                }
            }

            if Instant::now() >= deadline {
                return Err(OqcError::Timeout(task_id.to_string()));
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn failure_reason(&self, task_id: &str, device: &str) -> OqcError {
        match self.api.task_error(task_id, device).await {
            Ok(err) => OqcError::TaskFailed(
                err.error_message
                    .unwrap_or_else(|| format!("task {task_id} failed")),
            ),
            Err(e) => {
                warn!("Could not fetch error for task {}: {}", task_id, e);
                OqcError::TaskFailed(format!("task {task_id} failed"))
            }
        }
    }
}

/// Re-label generic service failures raised while scheduling.
fn scheduling_error(e: OqcError) -> RemoteError {
    match RemoteError::from(e) {
        RemoteError::Service(msg) => RemoteError::Scheduling(msg),
        other => other,
    }
}

/// Re-label generic service failures raised while retrieving results.
fn retrieval_error(e: OqcError) -> RemoteError {
    match RemoteError::from(e) {
        RemoteError::Service(msg) => RemoteError::Retrieval(msg),
        other => other,
    }
}

#[async_trait]
impl RemoteJobClient for OqcClient {
    fn name(&self) -> &str {
        "oqc"
    }

    #[instrument(skip(self, task))]
    async fn schedule(&self, task: &QpuTask, device: &str) -> ClientResult<TaskId> {
        let task_id = self.submit(task, device).await.map_err(|e| {
            if e.is_auth() {
                warn!("OQC rejected the credentials for {}", device);
            }
            scheduling_error(e)
        })?;
        info!("OQC task scheduled: {}", task_id);
        Ok(task_id)
    }

    #[instrument(skip(self))]
    async fn fetch_results(&self, task_id: &TaskId, device: &str) -> ClientResult<TaskResults> {
        self.wait_for_completion(task_id.as_str(), device)
            .await
            .map_err(retrieval_error)?;

        let response = self
            .api
            .task_results(task_id.as_str(), device)
            .await
            .map_err(retrieval_error)?;

        response.results.ok_or_else(|| {
            RemoteError::Retrieval(format!("task {task_id} completed without results"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qcounts_core::ConfigError;

    #[test]
    fn test_from_config_requires_token() {
        let config = BridgeConfig::default().with_url("https://qcaas.example");
        let err = OqcClient::from_config(&config).unwrap_err();
        assert!(matches!(err, OqcError::Config(ConfigError::Missing(_))));
    }

    #[test]
    fn test_from_config_requires_url() {
        let config = BridgeConfig::default().with_auth_token("tok");
        let err = OqcClient::from_config(&config).unwrap_err();
        assert!(matches!(err, OqcError::Config(ConfigError::Missing(_))));
    }

    #[test]
    fn test_from_config_builds_session() {
        let config = BridgeConfig::default()
            .with_auth_token("tok")
            .with_url("https://qcaas.example/");
        let client = OqcClient::from_config(&config).unwrap();
        assert_eq!(client.base_url(), "https://qcaas.example");
        assert_eq!(client.name(), "oqc");
    }

    #[test]
    fn test_scheduling_error_relabels_service_failures() {
        let remote = scheduling_error(OqcError::ApiError {
            status: 422,
            message: "program does not parse".into(),
        });
        assert!(matches!(remote, RemoteError::Scheduling(msg) if msg.contains("program does not parse")));
    }

    #[test]
    fn test_scheduling_error_keeps_auth() {
        let remote = scheduling_error(OqcError::ApiError {
            status: 401,
            message: "invalid token".into(),
        });
        assert_eq!(remote, RemoteError::Authentication("invalid token".into()));
    }

    #[test]
    fn test_retrieval_error_relabels_service_failures() {
        let remote = retrieval_error(OqcError::MalformedResponse("bad".into()));
        assert!(matches!(remote, RemoteError::Retrieval(_)));
    }

    #[tokio::test]
    async fn test_unreachable_service_is_scheduling_failure() {
        // Port 9 (discard) on localhost is not expected to run an HTTP server.
        let client = OqcClient::new("http://127.0.0.1:9", "tok").unwrap();
        let task = QpuTask::from_request(&qcounts_core::CircuitJobRequest::new("x", 1, 1));
        let err = client.schedule(&task, "qpu").await.unwrap_err();
        assert!(matches!(err, RemoteError::Scheduling(_)));
    }

    // -- Poll loop against a local QCaaS stand-in --

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    /// `(path prefix, status code, JSON body)`.
    type Route = (&'static str, u16, &'static str);

    /// Serve canned responses on a loopback port; returns the base URL.
    async fn serve(routes: Vec<Route>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let routes = routes.clone();
                tokio::spawn(async move {
                    let head = read_request(&mut socket).await;
                    let path = head.split_whitespace().nth(1).unwrap_or("").to_string();
                    let (status, body) = routes
                        .iter()
                        .find(|(prefix, _, _)| path.starts_with(prefix))
                        .map(|&(_, status, body)| (status, body))
                        .unwrap_or((404, r#"{"detail": "no such route"}"#));
                    let response = format!(
                        "HTTP/1.1 {status} Stub\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                        body.len()
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });

        format!("http://{addr}")
    }

    /// Read one request, body included; returns the head.
    async fn read_request(socket: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = socket.read(&mut chunk).await.unwrap_or(0);
            if n == 0 {
                return String::from_utf8_lossy(&buf).into_owned();
            }
            buf.extend_from_slice(&chunk[..n]);

            let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
                continue;
            };
            let head = String::from_utf8_lossy(&buf[..end]).into_owned();
            let body_len = head
                .lines()
                .filter_map(|line| line.split_once(':'))
                .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
                .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                .unwrap_or(0);
            while buf.len() < end + 4 + body_len {
                let n = socket.read(&mut chunk).await.unwrap_or(0);
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
            }
            return head;
        }
    }

    const SUBMITTED: Route = ("/tasks/submit", 200, r#"[{"task_id": "t-1"}]"#);

    fn stub_client(url: &str) -> OqcClient {
        OqcClient::new(url, "tok")
            .unwrap()
            .with_poll_interval(Duration::from_millis(10))
    }

    fn bell_task() -> QpuTask {
        QpuTask::from_request(&qcounts_core::CircuitJobRequest::new("OPENQASM 2.0;", 8, 2))
    }

    #[tokio::test]
    async fn test_completed_task_returns_cbits() {
        let url = serve(vec![
            SUBMITTED,
            ("/tasks/t-1/status", 200, r#"{"status": "COMPLETED"}"#),
            (
                "/tasks/t-1/results",
                200,
                r#"{"task_id": "t-1", "results": {"cbits": {"00": 5, "11": 3}}}"#,
            ),
        ])
        .await;
        let client = stub_client(&url);

        let task_id = client.schedule(&bell_task(), "qpu:test").await.unwrap();
        assert_eq!(task_id.as_str(), "t-1");

        let cbits = client
            .fetch_results(&task_id, "qpu:test")
            .await
            .unwrap()
            .cbits()
            .unwrap();
        let entries: Vec<_> = cbits.iter().collect();
        assert_eq!(entries, vec![("00", 5), ("11", 3)]);
    }

    #[tokio::test]
    async fn test_failed_task_reports_service_error_message() {
        let url = serve(vec![
            ("/tasks/t-1/status", 200, r#"{"status": "FAILED"}"#),
            (
                "/tasks/t-1/error",
                200,
                r#"{"error_message": "calibration in progress", "error_code": 7}"#,
            ),
        ])
        .await;

        let err = stub_client(&url)
            .fetch_results(&TaskId::new("t-1"), "qpu:test")
            .await
            .unwrap_err();
        assert_eq!(err, RemoteError::Retrieval("calibration in progress".into()));
    }

    #[tokio::test]
    async fn test_cancelled_task_is_retrieval_failure() {
        let url = serve(vec![("/tasks/t-1/status", 200, r#"{"status": "CANCELLED"}"#)]).await;

        let err = stub_client(&url)
            .fetch_results(&TaskId::new("t-1"), "qpu:test")
            .await
            .unwrap_err();
        assert_eq!(err, RemoteError::Retrieval("Task cancelled: t-1".into()));
    }

    #[tokio::test]
    async fn test_zero_max_wait_times_out() {
        let url = serve(vec![("/tasks/t-1/status", 200, r#"{"status": "RUNNING"}"#)]).await;

        let err = stub_client(&url)
            .with_max_wait(Duration::ZERO)
            .fetch_results(&TaskId::new("t-1"), "qpu:test")
            .await
            .unwrap_err();
        assert_eq!(
            err,
            RemoteError::Retrieval("Timeout waiting for task: t-1".into())
        );
    }

    #[tokio::test]
    async fn test_completed_without_results_is_retrieval_failure() {
        let url = serve(vec![
            ("/tasks/t-1/status", 200, r#"{"status": "COMPLETED"}"#),
            ("/tasks/t-1/results", 200, r#"{"task_id": "t-1", "results": null}"#),
        ])
        .await;

        let err = stub_client(&url)
            .fetch_results(&TaskId::new("t-1"), "qpu:test")
            .await
            .unwrap_err();
        assert_eq!(
            err,
            RemoteError::Retrieval("task t-1 completed without results".into())
        );
    }

    #[tokio::test]
    async fn test_unparseable_status_body_is_json_error() {
        let url = serve(vec![("/tasks/t-1/status", 200, "not json")]).await;

        let err = stub_client(&url)
            .fetch_results(&TaskId::new("t-1"), "qpu:test")
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteError::Retrieval(msg) if msg.starts_with("JSON error")));
    }

    #[tokio::test]
    async fn test_rejected_token_is_authentication_failure() {
        let url = serve(vec![(
            "/tasks/submit",
            401,
            r#"{"detail": "invalid token"}"#,
        )])
        .await;

        let err = stub_client(&url)
            .schedule(&bell_task(), "qpu:test")
            .await
            .unwrap_err();
        assert_eq!(err, RemoteError::Authentication("invalid token".into()));
    }
}
