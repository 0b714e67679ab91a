//! C ABI for qcounts.
//!
//! Exposes one blocking call, [`counts`], that submits a circuit to the
//! OQC cloud and returns a dense count histogram of `2^num_qubits`
//! machine words. The host owns the returned buffer and releases it with
//! [`counts_free`].
//!
//! ```c
//! size_t *hist = counts(qasm, "qpu:uk:2:d865b5a184", 1000, 2, "");
//! if (hist == NULL) {
//!     fprintf(stderr, "qcounts: %s\n", counts_last_error());
//! } else {
//!     /* hist[0] .. hist[3] */
//!     counts_free(hist, 2);
//! }
//! ```
//!
//! # Buffer ownership
//!
//! The histogram buffer is allocated by Rust, not by `malloc`. Release it
//! with [`counts_free`] and the same `num_qubits`; passing it to `free()`
//! is undefined behaviour.
//!
//! Configuration comes from `OQC_AUTH_TOKEN`, `OQC_URL` and `OQC_DEVICE`.
//! Logging goes to stderr, filtered by `QCOUNTS_LOG` (default `warn`).
//!
//! Calls from many threads are accepted; they are executed one at a time.

mod last_error;
mod shared;

use std::ffi::{CStr, c_char};
use std::panic::{self, AssertUnwindSafe};
use std::ptr;

use qcounts_core::{
    CircuitJobRequest, InvocationFailure, InvocationResult, JobBridge, MAX_DENSE_QUBITS,
    RemoteJobClient, panic_message,
};
use tracing::{error, warn};

pub use shared::LOG_ENV;

/// Submit `circuit` and block until its histogram is available.
///
/// Returns a buffer of `2^num_qubits` counts, index `i` holding the number
/// of shots that measured the bit pattern of `i` (MSB = highest qubit). The
/// buffer must be released with [`counts_free`], never `free()`. On failure
/// returns null and records a diagnostic for [`counts_last_error`].
///
/// `device` may be null or empty to use `OQC_DEVICE`. `extra_config` may
/// be null; it is accepted and ignored.
///
/// # Safety
///
/// Every non-null pointer argument must point at a NUL-terminated string
/// that stays valid for the duration of the call.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn counts(
    circuit: *const c_char,
    device: *const c_char,
    shots: usize,
    num_qubits: usize,
    extra_config: *const c_char,
) -> *mut usize {
    shared::init_logging();
    last_error::clear();

    guarded(|| {
        let request = unsafe { request_from_raw(circuit, device, shots, num_qubits, extra_config) }?;
        let bridge = shared::bridge()?;
        run_request(&bridge, &request)
    })
}

/// Same as [`counts`], against a caller-supplied bridge.
///
/// Lets Rust hosts embed the C calling convention around their own client.
///
/// # Safety
///
/// Same contract as [`counts`].
pub unsafe fn counts_on<C: RemoteJobClient>(
    bridge: &JobBridge<C>,
    circuit: *const c_char,
    device: *const c_char,
    shots: usize,
    num_qubits: usize,
    extra_config: *const c_char,
) -> *mut usize {
    last_error::clear();

    guarded(|| {
        let request = unsafe { request_from_raw(circuit, device, shots, num_qubits, extra_config) }?;
        run_request(bridge, &request)
    })
}

/// Release a buffer returned by [`counts`].
///
/// Null is ignored. `num_qubits` must be the value passed to the call that
/// produced the buffer.
///
/// # Safety
///
/// `ptr` must be null or a buffer returned by [`counts`] that has not been
/// freed yet.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn counts_free(ptr: *mut usize, num_qubits: usize) {
    if ptr.is_null() {
        return;
    }
    let Some(len) = dense_len(num_qubits) else {
        // No buffer this wide was ever handed out; leaking beats a bad free.
        error!("counts_free called with num_qubits = {}", num_qubits);
        return;
    };
    drop(unsafe { Box::from_raw(ptr::slice_from_raw_parts_mut(ptr, len)) });
}

/// Diagnostic of the last failed call on this thread, or null.
///
/// The pointer stays valid until the next call into this library from the
/// same thread. Do not free it.
#[unsafe(no_mangle)]
pub extern "C" fn counts_last_error() -> *const c_char {
    last_error::as_ptr()
}

/// Drop the cached OQC session so the next call re-reads the environment.
#[unsafe(no_mangle)]
pub extern "C" fn counts_reset() {
    shared::reset();
}

/// Run `f`, turning errors and panics into a null return plus a diagnostic.
fn guarded(f: impl FnOnce() -> InvocationResult<Box<[usize]>>) -> *mut usize {
    let failure = match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(buffer)) => return Box::into_raw(buffer).cast::<usize>(),
        Ok(Err(failure)) => failure,
        Err(payload) => InvocationFailure::Panicked(panic_message(payload.as_ref())),
    };

    warn!(kind = failure.kind(), "counts failed: {}", failure);
    last_error::set(&failure.diagnostic());
    ptr::null_mut()
}

fn run_request<C: RemoteJobClient>(
    bridge: &JobBridge<C>,
    request: &CircuitJobRequest,
) -> InvocationResult<Box<[usize]>> {
    let histogram = bridge.run(request)?;
    Ok(histogram
        .into_vec()
        .into_iter()
        .map(|count| usize::try_from(count).unwrap_or(usize::MAX))
        .collect())
}

/// Copy the raw arguments into an owned request.
///
/// # Safety
///
/// Non-null pointers must be valid NUL-terminated strings.
unsafe fn request_from_raw(
    circuit: *const c_char,
    device: *const c_char,
    shots: usize,
    num_qubits: usize,
    extra_config: *const c_char,
) -> InvocationResult<CircuitJobRequest> {
    let circuit = unsafe { read_str(circuit, "circuit") }?
        .ok_or_else(|| InvocationFailure::InvalidRequest("circuit is null".into()))?;
    let device = unsafe { read_str(device, "device") }?.unwrap_or_default();
    let extra_config = unsafe { read_str(extra_config, "extra_config") }?.unwrap_or_default();

    let shots = u32::try_from(shots).map_err(|_| {
        InvocationFailure::InvalidRequest(format!("shot count {shots} is too large"))
    })?;
    let num_qubits = u32::try_from(num_qubits).map_err(|_| {
        InvocationFailure::InvalidRequest(format!("qubit count {num_qubits} is too large"))
    })?;

    Ok(CircuitJobRequest::new(circuit, shots, num_qubits)
        .with_device(device)
        .with_extra_config(extra_config))
}

unsafe fn read_str(ptr: *const c_char, what: &str) -> InvocationResult<Option<String>> {
    if ptr.is_null() {
        return Ok(None);
    }
    let cstr = unsafe { CStr::from_ptr(ptr) };
    cstr.to_str()
        .map(|s| Some(s.to_owned()))
        .map_err(|e| InvocationFailure::InvalidRequest(format!("{what} is not valid UTF-8: {e}")))
}

fn dense_len(num_qubits: usize) -> Option<usize> {
    let n = u32::try_from(num_qubits).ok()?;
    (n <= MAX_DENSE_QUBITS).then(|| 1usize << n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use qcounts_core::mock::MockClient;
    use qcounts_core::{BridgeConfig, RemoteError};
    use std::ffi::CString;

    fn mock_bridge(client: MockClient) -> JobBridge<MockClient> {
        JobBridge::new(client, BridgeConfig::default().with_device("qpu:test")).unwrap()
    }

    fn last_error_text() -> Option<String> {
        let ptr = counts_last_error();
        (!ptr.is_null()).then(|| unsafe { CStr::from_ptr(ptr) }.to_str().unwrap().to_string())
    }

    /// Run `counts_on` and copy the buffer out before freeing it.
    fn call(
        bridge: &JobBridge<MockClient>,
        circuit: Option<&CStr>,
        shots: usize,
        num_qubits: usize,
    ) -> Option<Vec<usize>> {
        let circuit = circuit.map_or(ptr::null(), CStr::as_ptr);
        let ptr = unsafe { counts_on(bridge, circuit, ptr::null(), shots, num_qubits, ptr::null()) };
        if ptr.is_null() {
            return None;
        }
        let len = dense_len(num_qubits).unwrap();
        let out = unsafe { std::slice::from_raw_parts(ptr, len) }.to_vec();
        unsafe { counts_free(ptr, num_qubits) };
        Some(out)
    }

    #[test]
    fn test_dense_histogram_is_returned() {
        let bridge = mock_bridge(MockClient::with_counts(&[("00", 5), ("11", 3)]));
        let circuit = CString::new("OPENQASM 2.0;").unwrap();

        let hist = call(&bridge, Some(&circuit), 8, 2).unwrap();
        assert_eq!(hist, vec![5, 0, 0, 3]);
        assert!(last_error_text().is_none());
    }

    #[test]
    fn test_remote_message_is_reported_verbatim() {
        let bridge = mock_bridge(MockClient::failing_schedule(RemoteError::Authentication(
            "invalid token".into(),
        )));
        let circuit = CString::new("OPENQASM 2.0;").unwrap();

        assert!(call(&bridge, Some(&circuit), 8, 2).is_none());
        assert_eq!(last_error_text().as_deref(), Some("invalid token"));
    }

    #[test]
    fn test_success_clears_previous_error() {
        let failing = mock_bridge(MockClient::failing_fetch(RemoteError::Retrieval(
            "task expired".into(),
        )));
        let ok = mock_bridge(MockClient::with_counts(&[("1", 4)]));
        let circuit = CString::new("x").unwrap();

        assert!(call(&failing, Some(&circuit), 4, 1).is_none());
        assert_eq!(last_error_text().as_deref(), Some("task expired"));

        assert_eq!(call(&ok, Some(&circuit), 4, 1).unwrap(), vec![0, 4]);
        assert!(last_error_text().is_none());
    }

    #[test]
    fn test_null_circuit_is_rejected() {
        let bridge = mock_bridge(MockClient::with_counts(&[("0", 1)]));
        assert!(call(&bridge, None, 1, 1).is_none());
        assert!(last_error_text().unwrap().contains("circuit"));
        assert!(bridge.with_client(|c| c.scheduled().is_empty()));
    }

    #[test]
    fn test_null_circuit_through_c_entry_point() {
        let ptr = unsafe { counts(ptr::null(), ptr::null(), 1, 1, ptr::null()) };
        assert!(ptr.is_null());
        assert!(last_error_text().unwrap().contains("circuit"));
    }

    #[test]
    fn test_missing_environment_through_c_entry_point() {
        let _env = shared::lock_env();
        shared::clear_env();

        let circuit = CString::new("OPENQASM 2.0;").unwrap();
        let ptr = unsafe { counts(circuit.as_ptr(), ptr::null(), 8, 2, ptr::null()) };
        assert!(ptr.is_null());
        assert!(last_error_text().unwrap().contains("OQC_AUTH_TOKEN"));
    }

    #[test]
    fn test_reset_through_c_entry_point() {
        let _env = shared::lock_env();
        shared::clear_env();
        unsafe {
            std::env::set_var("OQC_AUTH_TOKEN", "tok");
            std::env::set_var("OQC_URL", "https://qcaas.example");
        }
        assert!(shared::bridge().is_ok());

        unsafe { std::env::remove_var("OQC_AUTH_TOKEN") };
        counts_reset();
        assert!(shared::bridge().is_err());

        shared::clear_env();
    }

    #[test]
    fn test_invalid_utf8_is_rejected() {
        let bridge = mock_bridge(MockClient::with_counts(&[("0", 1)]));
        let circuit = CString::new(vec![0x66, 0xff, 0x66]).unwrap();
        assert!(call(&bridge, Some(&circuit), 1, 1).is_none());
        assert!(last_error_text().unwrap().contains("UTF-8"));
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn test_oversized_shot_count_is_rejected() {
        let bridge = mock_bridge(MockClient::with_counts(&[("0", 1)]));
        let circuit = CString::new("x").unwrap();
        assert!(call(&bridge, Some(&circuit), usize::MAX, 1).is_none());
        assert!(last_error_text().unwrap().contains("too large"));
    }

    #[test]
    fn test_decode_failure_returns_null() {
        let bridge = mock_bridge(MockClient::with_counts(&[("10", 1)]));
        let circuit = CString::new("x").unwrap();
        assert!(call(&bridge, Some(&circuit), 1, 1).is_none());
        assert!(last_error_text().unwrap().contains("10"));
    }

    #[test]
    fn test_client_panic_is_contained() {
        let bridge = mock_bridge(MockClient::panicking("backend exploded"));
        let circuit = CString::new("x").unwrap();
        assert!(call(&bridge, Some(&circuit), 1, 1).is_none());
        assert!(last_error_text().unwrap().contains("backend exploded"));
    }

    #[test]
    fn test_guarded_contains_panics() {
        let ptr = guarded(|| panic!("boom"));
        assert!(ptr.is_null());
        assert_eq!(last_error_text().as_deref(), Some("boom"));
    }

    #[test]
    fn test_counts_free_ignores_null() {
        unsafe { counts_free(ptr::null_mut(), 3) };
    }

    #[test]
    fn test_dense_len() {
        assert_eq!(dense_len(0), Some(1));
        assert_eq!(dense_len(3), Some(8));
        assert_eq!(dense_len(MAX_DENSE_QUBITS as usize + 1), None);
    }
}
