//! qcounts core
//!
//! Submit a circuit to a cloud QPU service, wait for it, and get back a dense
//! measurement histogram indexed by bitstring value.
//!
//! # Overview
//!
//! ```text
//!   caller ──→ JobBridge ──→ RemoteJobClient (schedule, fetch_results)
//!                 │
//!                 └──→ decode ──→ CountHistogram (2^n slots, caller-owned)
//! ```
//!
//! - [`JobBridge`] owns one client behind an execution lock, runs exactly one
//!   blocking round trip per call, and funnels every failure into
//!   [`InvocationFailure`].
//! - [`decode`] reshapes the service's sparse `{bitstring: count}` map into a
//!   [`CountHistogram`], rejecting malformed, out-of-range, or duplicate keys.
//! - [`RemoteJobClient`] is the seam to the service; see the
//!   `qcounts-adapter-oqc` crate for the HTTP implementation.
//!
//! # Example
//!
//! ```ignore
//! use qcounts_core::{BridgeConfig, CircuitJobRequest, JobBridge};
//! use qcounts_adapter_oqc::OqcClient;
//!
//! let config = BridgeConfig::from_env();
//! let bridge = JobBridge::new(OqcClient::from_config(&config)?, config)?;
//!
//! let request = CircuitJobRequest::new(std::fs::read_to_string("bell.qasm")?, 1000, 2);
//! let histogram = bridge.run(&request)?;
//! println!("{:?}", histogram.as_slice()); // e.g. [503, 0, 0, 497]
//! ```

pub mod bridge;
pub mod client;
pub mod config;
pub mod error;
pub mod histogram;
pub mod job;

#[cfg(any(test, feature = "mock-client"))]
pub mod mock;

pub use bridge::{JobBridge, panic_message};
pub use client::{RemoteJobClient, TaskResults};
pub use config::BridgeConfig;
pub use error::{
    ClientResult, ConfigError, ConfigResult, DecodeError, DecodeResult, InvocationFailure,
    InvocationResult, RemoteError,
};
pub use histogram::{CountHistogram, MAX_DENSE_QUBITS, RemoteResult, decode, parse_bitstring};
pub use job::{CircuitJobRequest, CompilerConfig, QpuTask, TaskId};
