//! Connection settings
//!
//! Describes how to reach and authenticate to a server. Settings are owned by
//! a single reconciler; only the password changes after construction.

use core::fmt;
use serde::{Deserialize, Serialize};

use crate::errors::SettingsError;

// ----------------------------------------------------------------------------
// Enumerations
// ----------------------------------------------------------------------------

/// Account protocol flavour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    #[default]
    Xmpp,
    Gtalk,
}

/// TLS negotiation policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TlsMode {
    /// Direct TLS on connect (old-style SSL port)
    Legacy,
    /// Refuse to continue without STARTTLS
    Required,
    /// Use STARTTLS when the server offers it
    #[default]
    Enabled,
}

/// Proxy kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProxyType {
    #[default]
    None,
    Http,
    Socks4,
    Socks5,
    Orbot,
}

impl fmt::Display for ProxyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProxyType::None => "none",
            ProxyType::Http => "http",
            ProxyType::Socks4 => "socks4",
            ProxyType::Socks5 => "socks5",
            ProxyType::Orbot => "orbot",
        };
        f.write_str(name)
    }
}

// ----------------------------------------------------------------------------
// Proxy Settings
// ----------------------------------------------------------------------------

/// Proxy to tunnel the connection through
#[derive(Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxySettings {
    pub kind: ProxyType,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
}

impl fmt::Debug for ProxySettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxySettings")
            .field("kind", &self.kind)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &redact(&self.password))
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Endpoint
// ----------------------------------------------------------------------------

/// Where an attempt should connect
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
    /// Resolve the real host through DNS SRV records
    pub use_srv: bool,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16, use_srv: bool) -> Self {
        Self {
            host: host.into(),
            port,
            use_srv,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.use_srv {
            write!(f, "{}:{} (srv)", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

// ----------------------------------------------------------------------------
// Connection Settings
// ----------------------------------------------------------------------------

/// Configuration bundle for one logical connection
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionSettings {
    #[serde(default)]
    pub protocol: Protocol,
    /// When set, `host`/`port` are authoritative and SRV lookup is skipped
    #[serde(default)]
    pub custom_host: bool,
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub port: u16,
    pub server_name: String,
    pub user_name: String,
    #[serde(default)]
    pub resource: String,
    #[serde(default)]
    password: String,
    #[serde(default = "default_true")]
    pub store_password: bool,
    #[serde(default = "default_true")]
    pub sasl_enabled: bool,
    #[serde(default)]
    pub tls_mode: TlsMode,
    #[serde(default)]
    pub compression: bool,
    #[serde(default)]
    pub proxy: ProxySettings,
}

fn default_true() -> bool {
    true
}

impl ConnectionSettings {
    /// Create settings for a server reached through SRV lookup
    pub fn new(server_name: impl Into<String>, user_name: impl Into<String>) -> Self {
        Self {
            protocol: Protocol::Xmpp,
            custom_host: false,
            host: String::new(),
            port: 0,
            server_name: server_name.into(),
            user_name: user_name.into(),
            resource: String::new(),
            password: String::new(),
            store_password: true,
            sasl_enabled: true,
            tls_mode: TlsMode::Enabled,
            compression: false,
            proxy: ProxySettings::default(),
        }
    }

    /// Pin the connection to an explicit host and port
    pub fn with_custom_host(mut self, host: impl Into<String>, port: u16) -> Self {
        self.custom_host = true;
        self.host = host.into();
        self.port = port;
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = password.into();
        self
    }

    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = resource.into();
        self
    }

    pub fn with_proxy(mut self, proxy: ProxySettings) -> Self {
        self.proxy = proxy;
        self
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn set_password(&mut self, password: impl Into<String>) {
        self.password = password.into();
    }

    /// Bare address `user@server`
    pub fn bare_address(&self) -> String {
        format!("{}@{}", self.user_name, self.server_name)
    }

    /// Resolve the endpoint an attempt should use
    ///
    /// Custom host settings connect directly; otherwise the server name is
    /// resolved through SRV records, falling back to `default_port`.
    pub fn endpoint(&self, default_port: u16) -> Endpoint {
        if self.custom_host {
            Endpoint::new(self.host.clone(), self.port, false)
        } else {
            Endpoint::new(self.server_name.clone(), default_port, true)
        }
    }

    /// Copy suitable for persisting: the password is dropped unless the
    /// account asked for it to be stored
    pub fn redacted_for_storage(&self) -> Self {
        let mut copy = self.clone();
        if !copy.store_password {
            copy.password.clear();
        }
        copy
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.server_name.trim().is_empty() {
            return Err(SettingsError::EmptyServerName);
        }
        if self.custom_host {
            if self.host.trim().is_empty() {
                return Err(SettingsError::EmptyCustomHost);
            }
            if self.port == 0 {
                return Err(SettingsError::InvalidPort {
                    context: "custom host",
                    port: self.port,
                });
            }
        }
        if self.proxy.kind != ProxyType::None {
            if self.proxy.host.trim().is_empty() {
                return Err(SettingsError::EmptyProxyHost {
                    kind: self.proxy.kind.to_string(),
                });
            }
            if self.proxy.port == 0 {
                return Err(SettingsError::InvalidPort {
                    context: "proxy",
                    port: self.proxy.port,
                });
            }
        }
        Ok(())
    }
}

impl fmt::Debug for ConnectionSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionSettings")
            .field("protocol", &self.protocol)
            .field("custom_host", &self.custom_host)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("server_name", &self.server_name)
            .field("user_name", &self.user_name)
            .field("resource", &self.resource)
            .field("password", &redact(&self.password))
            .field("store_password", &self.store_password)
            .field("sasl_enabled", &self.sasl_enabled)
            .field("tls_mode", &self.tls_mode)
            .field("compression", &self.compression)
            .field("proxy", &self.proxy)
            .finish()
    }
}

fn redact(secret: &str) -> &'static str {
    if secret.is_empty() {
        ""
    } else {
        "<redacted>"
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
