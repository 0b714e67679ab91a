//! qcounts adapter for OQC (Oxford Quantum Circuits) cloud QPUs
//!
//! This crate provides a [`RemoteJobClient`] for the OQC Quantum Computing
//! as a Service (QCaaS) REST API, so a [`JobBridge`](qcounts_core::JobBridge)
//! can submit circuits to OQC hardware and simulators.
//!
//! # Configuration
//!
//! ```bash
//! export OQC_AUTH_TOKEN="your-qcaas-token"
//! export OQC_URL="https://cloud.oqc.app"
//! export OQC_DEVICE="qpu:uk:2:d865b5a184"   # optional default device
//! ```
//!
//! # Job settings
//!
//! Every task is sent with the same compiler configuration: binary-count
//! results, a 90 µs repetition period, Tket optimisation level one, and
//! optimised-instruction-count metrics. Only the shot count varies.
//!
//! # Example
//!
//! ```ignore
//! use qcounts_adapter_oqc::OqcClient;
//! use qcounts_core::{BridgeConfig, CircuitJobRequest, JobBridge};
//!
//! let config = BridgeConfig::from_env();
//! let bridge = JobBridge::new(OqcClient::from_config(&config)?, config)?;
//! let histogram = bridge.run(&CircuitJobRequest::new(qasm, 1000, 2))?;
//! ```

mod api;
mod client;
mod error;

pub use client::{DEFAULT_MAX_WAIT, DEFAULT_POLL_INTERVAL, OqcClient};
pub use error::{OqcError, OqcResult};

// Re-export the seam for convenience.
pub use qcounts_core::RemoteJobClient;
