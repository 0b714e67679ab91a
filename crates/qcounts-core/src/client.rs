//! The remote job client seam.
//!
//! The bridge never talks to a service directly. It drives a
//! [`RemoteJobClient`] through exactly one round trip:
//!
//! ```text
//!   schedule(task, device) ──→ TaskId ──→ fetch_results(task_id, device) ──→ TaskResults
//! ```
//!
//! Any implementation satisfies the contract: an HTTP client, a subprocess,
//! an RPC to a sidecar. Polling, retries, and timeouts live inside
//! `fetch_results`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

use crate::error::{ClientResult, DecodeError, DecodeResult};
use crate::histogram::RemoteResult;
use crate::job::{QpuTask, TaskId};

/// A client that can schedule a task and wait for its results.
#[async_trait]
pub trait RemoteJobClient: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Submit a task to `device`. The task MUST be queued when this returns.
    async fn schedule(&self, task: &QpuTask, device: &str) -> ClientResult<TaskId>;

    /// Wait for a scheduled task to finish and return its result document.
    async fn fetch_results(&self, task_id: &TaskId, device: &str) -> ClientResult<TaskResults>;
}

/// Raw result document for a completed task.
///
/// Kept as unparsed JSON until the bridge extracts the `cbits` register, so
/// duplicate keys in the service's answer are still visible to the decoder.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskResults {
    raw: Box<RawValue>,
}

impl TaskResults {
    /// Wrap a JSON document. Fails if `json` is not valid JSON.
    pub fn from_json(json: impl Into<String>) -> serde_json::Result<Self> {
        Ok(Self {
            raw: RawValue::from_string(json.into())?,
        })
    }

    pub fn as_json(&self) -> &str {
        self.raw.get()
    }

    /// Extract the sparse `cbits` distribution.
    pub fn cbits(&self) -> DecodeResult<RemoteResult> {
        #[derive(Deserialize)]
        struct Registers {
            #[serde(default)]
            cbits: Option<RemoteResult>,
        }

        let registers: Registers = serde_json::from_str(self.raw.get())
            .map_err(|e| DecodeError::MalformedPayload(e.to_string()))?;
        registers
            .cbits
            .ok_or_else(|| DecodeError::MalformedPayload("result has no 'cbits' register".into()))
    }
}
