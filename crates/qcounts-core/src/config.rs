//! Environment configuration.
//!
//! Three variables are read and passed through to the client:
//!
//! | Variable | Meaning | Required |
//! |----------|---------|----------|
//! | `OQC_AUTH_TOKEN` | Bearer token for the service | yes |
//! | `OQC_DEVICE` | Device used when a request names none | no |
//! | `OQC_URL` | Service base URL | yes |
//!
//! Empty values are treated as unset.

use std::fmt;

use crate::error::{ConfigError, ConfigResult};

/// Authentication token variable.
pub const AUTH_TOKEN_VAR: &str = "OQC_AUTH_TOKEN";

/// Default device variable.
pub const DEVICE_VAR: &str = "OQC_DEVICE";

/// Service base URL variable.
pub const URL_VAR: &str = "OQC_URL";

/// Credentials, default device, and service URL.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct BridgeConfig {
    auth_token: Option<String>,
    device: Option<String>,
    url: Option<String>,
}

impl BridgeConfig {
    /// Read the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        Self {
            auth_token: read(AUTH_TOKEN_VAR),
            device: read(DEVICE_VAR),
            url: read(URL_VAR),
        }
    }

    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into()).filter(|t| !t.is_empty());
        self
    }

    pub fn with_device(mut self, device: impl Into<String>) -> Self {
        self.device = Some(device.into()).filter(|d| !d.is_empty());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into()).filter(|u| !u.is_empty());
        self
    }

    /// The authentication token.
    pub fn auth_token(&self) -> ConfigResult<&str> {
        self.auth_token
            .as_deref()
            .ok_or(ConfigError::Missing(AUTH_TOKEN_VAR))
    }

    /// The service base URL, which must be http or https.
    pub fn url(&self) -> ConfigResult<&str> {
        let url = self.url.as_deref().ok_or(ConfigError::Missing(URL_VAR))?;
        if url.starts_with("https://") || url.starts_with("http://") {
            Ok(url)
        } else {
            Err(ConfigError::InvalidUrl {
                var: URL_VAR,
                value: url.to_string(),
            })
        }
    }

    /// The environment's default device, if any.
    pub fn default_device(&self) -> Option<&str> {
        self.device.as_deref()
    }

    /// Pick the device for a request: the request's own, else the default.
    pub fn resolve_device<'a>(&'a self, requested: &'a str) -> ConfigResult<&'a str> {
        if !requested.is_empty() {
            return Ok(requested);
        }
        self.default_device().ok_or(ConfigError::NoDevice(DEVICE_VAR))
    }

    /// Check that everything needed to open a session is present.
    pub fn validate(&self) -> ConfigResult<()> {
        self.auth_token()?;
        self.url()?;
        Ok(())
    }
}

impl fmt::Debug for BridgeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BridgeConfig")
            .field("auth_token", &"[REDACTED]")
            .field("device", &self.device)
            .field("url", &self.url)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_from_lookup_reads_all_three() {
        let config = BridgeConfig::from_lookup(lookup(&[
            (AUTH_TOKEN_VAR, "tok"),
            (DEVICE_VAR, "qpu:uk:2:d865b5a184"),
            (URL_VAR, "https://cloud.oqc.app"),
        ]));
        assert_eq!(config.auth_token().unwrap(), "tok");
        assert_eq!(config.default_device(), Some("qpu:uk:2:d865b5a184"));
        assert_eq!(config.url().unwrap(), "https://cloud.oqc.app");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_values_are_unset() {
        let config = BridgeConfig::from_lookup(lookup(&[(AUTH_TOKEN_VAR, "  ")]));
        assert_eq!(
            config.auth_token(),
            Err(ConfigError::Missing(AUTH_TOKEN_VAR))
        );
    }

    #[test]
    fn test_missing_url() {
        let config = BridgeConfig::default().with_auth_token("tok");
        assert_eq!(config.validate(), Err(ConfigError::Missing(URL_VAR)));
    }

    #[test]
    fn test_invalid_url_scheme() {
        let config = BridgeConfig::default()
            .with_auth_token("tok")
            .with_url("ftp://example.com");
        assert!(matches!(
            config.url(),
            Err(ConfigError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_resolve_device_prefers_request() {
        let config = BridgeConfig::default().with_device("env-device");
        assert_eq!(config.resolve_device("qpu-a").unwrap(), "qpu-a");
        assert_eq!(config.resolve_device("").unwrap(), "env-device");
    }

    #[test]
    fn test_resolve_device_without_default() {
        let config = BridgeConfig::default();
        assert_eq!(
            config.resolve_device(""),
            Err(ConfigError::NoDevice(DEVICE_VAR))
        );
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = BridgeConfig::default().with_auth_token("secret-token");
        let debug = format!("{config:?}");
        assert!(!debug.contains("secret-token"));
        assert!(debug.contains("[REDACTED]"));
    }
}
