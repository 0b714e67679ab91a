//! The job invocation bridge.
//!
//! [`JobBridge`] turns one blocking call into one remote round trip:
//!
//! ```text
//!   submit_and_await(request)
//!     ├─ validate request, resolve device
//!     ├─ lock client ─────────────────────────────┐
//!     │    block_on(schedule → fetch_results)     │ exclusive
//!     │    catch_unwind around the whole trip     │
//!     ├─ unlock ──────────────────────────────────┘
//!     └─ extract "cbits" ──→ RemoteResult
//!
//!   run(request) = submit_and_await + decode ──→ CountHistogram
//! ```
//!
//! Every error, including a panic inside the client, comes back as an
//! [`InvocationFailure`]. A failure and a histogram are never both produced.
//!
//! The client sits behind a mutex: no two in-flight calls share one client
//! instance. Callers wanting parallelism create one bridge per client.
//! Calling from inside an async runtime is not supported; the nested
//! `block_on` panic is caught and reported as a failure.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Mutex, PoisonError};

use tokio::runtime::{Builder, Runtime};
use tracing::{debug, info, instrument, warn};

use crate::client::{RemoteJobClient, TaskResults};
use crate::config::BridgeConfig;
use crate::error::{ClientResult, InvocationFailure, InvocationResult};
use crate::histogram::{CountHistogram, MAX_DENSE_QUBITS, RemoteResult, decode};
use crate::job::{CircuitJobRequest, QpuTask};

/// Synchronous front end over a [`RemoteJobClient`].
pub struct JobBridge<C> {
    /// Guarded client; the lock is the execution lock.
    client: Mutex<C>,
    config: BridgeConfig,
    runtime: Runtime,
}

impl<C> std::fmt::Debug for JobBridge<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobBridge")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<C: RemoteJobClient> JobBridge<C> {
    /// Create a bridge owning `client` and a private single-threaded runtime.
    pub fn new(client: C, config: BridgeConfig) -> InvocationResult<Self> {
        let runtime = Builder::new_current_thread().enable_all().build()?;
        Ok(Self {
            client: Mutex::new(client),
            config,
            runtime,
        })
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Run `f` with exclusive access to the client.
    pub fn with_client<R>(&self, f: impl FnOnce(&C) -> R) -> R {
        let client = self.client.lock().unwrap_or_else(PoisonError::into_inner);
        f(&client)
    }

    /// Submit the request's circuit and block until the service answers.
    #[instrument(skip(self, request), fields(shots = request.shots(), device = request.device()))]
    pub fn submit_and_await(&self, request: &CircuitJobRequest) -> InvocationResult<RemoteResult> {
        validate_request(request)?;
        let device = self.config.resolve_device(request.device())?;
        let task = QpuTask::from_request(request);

        debug!(
            extra_config_len = request.extra_config().len(),
            "extra config carried unparsed"
        );

        let outcome = {
            let client = self.client.lock().unwrap_or_else(PoisonError::into_inner);
            info!(
                "Submitting circuit to {} on {}: {} shots",
                client.name(),
                device,
                request.shots()
            );
            panic::catch_unwind(AssertUnwindSafe(|| {
                self.runtime.block_on(round_trip(&*client, &task, device))
            }))
        };

        let results = match outcome {
            Ok(Ok(results)) => results,
            Ok(Err(err)) => {
                warn!("Remote call failed: {}", err);
                debug!(circuit = request.circuit(), "failing circuit");
                return Err(err.into());
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                warn!("Remote client panicked: {}", message);
                return Err(InvocationFailure::Panicked(message));
            }
        };

        Ok(results.cbits()?)
    }

    /// Submit, wait, and reshape the answer into a dense histogram.
    pub fn run(&self, request: &CircuitJobRequest) -> InvocationResult<CountHistogram> {
        let result = self.submit_and_await(request)?;
        let histogram = decode(&result, request.num_qubits())?;

        let delivered = histogram.total();
        let requested = u64::from(request.shots());
        if delivered < requested {
            warn!(
                "Service returned {} of {} requested shots",
                delivered, requested
            );
        }

        Ok(histogram)
    }
}

async fn round_trip<C: RemoteJobClient + ?Sized>(
    client: &C,
    task: &QpuTask,
    device: &str,
) -> ClientResult<TaskResults> {
    let task_id = client.schedule(task, device).await?;
    debug!("Task scheduled: {}", task_id);
    client.fetch_results(&task_id, device).await
}

fn validate_request(request: &CircuitJobRequest) -> InvocationResult<()> {
    if request.circuit().trim().is_empty() {
        return Err(InvocationFailure::InvalidRequest(
            "circuit source is empty".into(),
        ));
    }
    if request.shots() == 0 {
        return Err(InvocationFailure::InvalidRequest(
            "shot count must be at least 1".into(),
        ));
    }
    if request.num_qubits() > MAX_DENSE_QUBITS {
        return Err(InvocationFailure::InvalidRequest(format!(
            "{} qubits exceeds the dense histogram limit of {}",
            request.num_qubits(),
            MAX_DENSE_QUBITS
        )));
    }
    Ok(())
}

/// Best-effort text of a panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "remote client panicked".to_string()
    }
}
