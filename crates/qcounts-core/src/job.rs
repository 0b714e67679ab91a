//! Request and task types.
//!
//! ```text
//!   CircuitJobRequest ──→ QpuTask { program, CompilerConfig } ──schedule──→ TaskId
//!     (caller input)         (what the service receives)
//! ```
//!
//! The compiler configuration is fixed: callers choose the shot count and
//! nothing else. Results are always requested as binary counts.

use serde::{Deserialize, Serialize};

/// Time between shots on the device, in seconds.
pub const REPETITION_PERIOD_SECS: f64 = 90e-6;

/// One caller invocation: what to run, where, and how often.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircuitJobRequest {
    circuit: String,
    device: String,
    shots: u32,
    num_qubits: u32,
    extra_config: String,
}

impl CircuitJobRequest {
    /// Create a request targeting the environment's default device.
    pub fn new(circuit: impl Into<String>, shots: u32, num_qubits: u32) -> Self {
        Self {
            circuit: circuit.into(),
            device: String::new(),
            shots,
            num_qubits,
            extra_config: String::new(),
        }
    }

    /// Target a specific device. An empty string means the environment default.
    pub fn with_device(mut self, device: impl Into<String>) -> Self {
        self.device = device.into();
        self
    }

    /// Attach the opaque keyword-argument blob. It is carried, never parsed.
    pub fn with_extra_config(mut self, extra_config: impl Into<String>) -> Self {
        self.extra_config = extra_config.into();
        self
    }

    /// Program source, passed to the service as-is.
    pub fn circuit(&self) -> &str {
        &self.circuit
    }

    pub fn device(&self) -> &str {
        &self.device
    }

    pub fn shots(&self) -> u32 {
        self.shots
    }

    pub fn num_qubits(&self) -> u32 {
        self.num_qubits
    }

    pub fn extra_config(&self) -> &str {
        &self.extra_config
    }
}

/// Service-assigned task identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(pub String);

impl TaskId {
    /// Create a new task ID.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for TaskId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Result encoding requested from the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultsFormat {
    /// `{bitstring: count}` per classical register.
    BinaryCount,
}

/// Metrics the service reports alongside results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetricsType {
    OptimizedInstructionCount,
}

/// Tket optimisation level applied by the service's compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TketOptimizations {
    One,
}

/// Compiler optimisation selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Optimizations {
    pub tket_optimizations: TketOptimizations,
}

/// Per-task compiler settings sent with the program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompilerConfig {
    /// Number of shots.
    pub repeats: u32,
    /// Seconds between shots.
    pub repetition_period: f64,
    pub results_format: ResultsFormat,
    pub metrics: MetricsType,
    pub optimizations: Optimizations,
}

impl CompilerConfig {
    /// The fixed configuration, parameterised only by shot count.
    pub fn for_shots(shots: u32) -> Self {
        Self {
            repeats: shots,
            repetition_period: REPETITION_PERIOD_SECS,
            results_format: ResultsFormat::BinaryCount,
            metrics: MetricsType::OptimizedInstructionCount,
            optimizations: Optimizations {
                tket_optimizations: TketOptimizations::One,
            },
        }
    }
}

/// A program plus its compiler configuration, ready to schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QpuTask {
    pub program: String,
    pub config: CompilerConfig,
}

impl QpuTask {
    /// Build the task for a request.
    pub fn from_request(request: &CircuitJobRequest) -> Self {
        Self {
            program: request.circuit().to_string(),
            config: CompilerConfig::for_shots(request.shots()),
        }
    }
}
