//! Reconciler configuration

use core::time::Duration;
use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

/// Default client port used when the endpoint comes from SRV lookup
pub const DEFAULT_CLIENT_PORT: u16 = 5222;

/// Tunables for a connection reconciler
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcilerConfig {
    /// See-other-host redirects followed per connect cycle before giving up
    pub max_redirects: u32,
    /// Port paired with the server name when SRV lookup is used
    pub default_port: u16,
    /// Upper bound on a background graceful disconnect, in milliseconds
    pub teardown_timeout_ms: u64,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            max_redirects: 5,
            default_port: DEFAULT_CLIENT_PORT,
            teardown_timeout_ms: 5000,
        }
    }
}

impl ReconcilerConfig {
    /// Short timeouts for tests
    pub fn testing() -> Self {
        Self {
            max_redirects: 3,
            default_port: DEFAULT_CLIENT_PORT,
            teardown_timeout_ms: 100,
        }
    }

    /// Follow every redirect the server sends
    pub fn unbounded_redirects() -> Self {
        Self {
            max_redirects: u32::MAX,
            ..Self::default()
        }
    }

    pub fn teardown_timeout(&self) -> Duration {
        Duration::from_millis(self.teardown_timeout_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "default_port",
                reason: "port must be non-zero".to_string(),
            });
        }
        if self.teardown_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "teardown_timeout_ms",
                reason: "timeout must be non-zero".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ReconcilerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.default_port, 5222);
        assert_eq!(config.teardown_timeout(), Duration::from_secs(5));
        assert!(ReconcilerConfig::testing().validate().is_ok());
    }

    #[test]
    fn test_zero_port_rejected() {
        let config = ReconcilerConfig {
            default_port: 0,
            ..ReconcilerConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { field: "default_port", .. })
        ));
    }

    #[test]
    fn test_partial_toml_falls_back_to_defaults() {
        let config: ReconcilerConfig = toml::from_str("max_redirects = 1").unwrap();
        assert_eq!(config.max_redirects, 1);
        assert_eq!(config.default_port, DEFAULT_CLIENT_PORT);
    }
}
