//! Process-wide bridge and logging setup.

use std::sync::{Arc, Mutex, Once, PoisonError};

use qcounts_adapter_oqc::{OqcClient, OqcError};
use qcounts_core::{BridgeConfig, InvocationFailure, InvocationResult, JobBridge};
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Log filter variable, in `EnvFilter` syntax.
pub const LOG_ENV: &str = "QCOUNTS_LOG";

/// The cached bridge. Empty until the first call whose configuration is valid.
static BRIDGE: Mutex<Option<Arc<JobBridge<OqcClient>>>> = Mutex::new(None);

static LOGGING: Once = Once::new();

/// Install a stderr subscriber once, unless the host already has one.
pub(crate) fn init_logging() {
    LOGGING.call_once(|| {
        let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    });
}

/// The shared bridge, built from the environment on first successful use.
///
/// A configuration error is returned without caching anything, so fixing
/// the environment takes effect on the next call.
pub(crate) fn bridge() -> InvocationResult<Arc<JobBridge<OqcClient>>> {
    let mut slot = BRIDGE.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(bridge) = slot.as_ref() {
        return Ok(Arc::clone(bridge));
    }

    let config = BridgeConfig::from_env();
    debug!("Opening OQC session: {:?}", config);
    let client = OqcClient::from_config(&config).map_err(session_failure)?;
    let bridge = Arc::new(JobBridge::new(client, config)?);
    *slot = Some(Arc::clone(&bridge));
    Ok(bridge)
}

/// Drop the cached bridge; the next call re-reads the environment.
pub(crate) fn reset() {
    let mut slot = BRIDGE.lock().unwrap_or_else(PoisonError::into_inner);
    *slot = None;
}

fn session_failure(e: OqcError) -> InvocationFailure {
    match e {
        OqcError::Config(config) => InvocationFailure::Configuration(config),
        other => InvocationFailure::Remote(other.into()),
    }
}

/// Serializes tests that touch the process environment or the cached bridge.
#[cfg(test)]
pub(crate) fn lock_env() -> std::sync::MutexGuard<'static, ()> {
    static ENV_LOCK: Mutex<()> = Mutex::new(());
    ENV_LOCK.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Unset every `OQC_*` variable and drop the cached bridge.
#[cfg(test)]
pub(crate) fn clear_env() {
    use qcounts_core::config::{AUTH_TOKEN_VAR, DEVICE_VAR, URL_VAR};

    for var in [AUTH_TOKEN_VAR, DEVICE_VAR, URL_VAR] {
        unsafe { std::env::remove_var(var) };
    }
    reset();
}
