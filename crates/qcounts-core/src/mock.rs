//! Scripted in-memory client.
//!
//! Enabled for this crate's own tests and, through the `mock-client`
//! feature, for downstream crates that need a bridge without a network.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::client::{RemoteJobClient, TaskResults};
use crate::error::{ClientResult, RemoteError};
use crate::job::{QpuTask, TaskId};

/// What the mock does when driven.
#[derive(Debug, Clone)]
pub enum MockBehaviour {
    /// Schedule succeeds; fetch returns this JSON document.
    Results(String),
    /// Schedule fails with this error.
    FailSchedule(RemoteError),
    /// Schedule succeeds; fetch fails with this error.
    FailFetch(RemoteError),
    /// Schedule panics with this message.
    Panic(String),
}

/// A task the mock accepted, with the device it was sent to.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledTask {
    pub task_id: TaskId,
    pub task: QpuTask,
    pub device: String,
}

/// In-memory [`RemoteJobClient`].
#[derive(Debug)]
pub struct MockClient {
    behaviour: MockBehaviour,
    latency: Option<Duration>,
    scheduled: Mutex<Vec<ScheduledTask>>,
    next_id: AtomicU64,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockClient {
    pub fn new(behaviour: MockBehaviour) -> Self {
        Self {
            behaviour,
            latency: None,
            scheduled: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Succeed with a `{"cbits": {..}}` document built from `counts`.
    pub fn with_counts(counts: &[(&str, u64)]) -> Self {
        let cbits: serde_json::Map<String, serde_json::Value> = counts
            .iter()
            .map(|(k, v)| ((*k).to_string(), serde_json::Value::from(*v)))
            .collect();
        let doc = serde_json::json!({ "cbits": cbits });
        Self::new(MockBehaviour::Results(doc.to_string()))
    }

    /// Succeed with a raw result document.
    pub fn with_results_json(json: impl Into<String>) -> Self {
        Self::new(MockBehaviour::Results(json.into()))
    }

    pub fn failing_schedule(error: RemoteError) -> Self {
        Self::new(MockBehaviour::FailSchedule(error))
    }

    pub fn failing_fetch(error: RemoteError) -> Self {
        Self::new(MockBehaviour::FailFetch(error))
    }

    pub fn panicking(message: impl Into<String>) -> Self {
        Self::new(MockBehaviour::Panic(message.into()))
    }

    /// Sleep this long inside every round trip.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Tasks accepted so far, in order.
    pub fn scheduled(&self) -> Vec<ScheduledTask> {
        self.scheduled
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// Highest number of round trips observed running at once.
    pub fn max_concurrency(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteJobClient for MockClient {
    fn name(&self) -> &str {
        "mock"
    }

    async fn schedule(&self, task: &QpuTask, device: &str) -> ClientResult<TaskId> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        match &self.behaviour {
            MockBehaviour::FailSchedule(err) => {
                self.in_flight.fetch_sub(1, Ordering::SeqCst);
                return Err(err.clone());
            }
            MockBehaviour::Panic(msg) => {
                self.in_flight.fetch_sub(1, Ordering::SeqCst);
                panic!("{msg}");
            }
            MockBehaviour::Results(_) | MockBehaviour::FailFetch(_) => {}
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let task_id = TaskId::new(format!("mock-task-{id}"));
        self.scheduled
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(ScheduledTask {
                task_id: task_id.clone(),
                task: task.clone(),
                device: device.to_string(),
            });
        Ok(task_id)
    }

    async fn fetch_results(&self, task_id: &TaskId, _device: &str) -> ClientResult<TaskResults> {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match &self.behaviour {
            MockBehaviour::Results(json) => TaskResults::from_json(json.clone()).map_err(|e| {
                RemoteError::Retrieval(format!("mock result for {task_id} is not JSON: {e}"))
            }),
            MockBehaviour::FailFetch(err) => Err(err.clone()),
            MockBehaviour::FailSchedule(err) => Err(err.clone()),
            MockBehaviour::Panic(msg) => Err(RemoteError::Service(msg.clone())),
        }
    }
}
